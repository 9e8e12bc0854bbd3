//! DCT perceptual hash
//!
//! 32×32 grayscale thumbnail → 2-D DCT-II → top-left 8×8 low frequencies,
//! each bit set when its coefficient exceeds the block median. Robust to
//! rescaling and recompression; sensitive to framing and viewpoint.

use image::imageops::FilterType;
use image::DynamicImage;

use crate::types::{Fingerprint, Fingerprinter, SignalError};

const THUMB_SIZE: usize = 32;
const HASH_SIDE: usize = 8;

#[derive(Debug, Clone)]
pub struct DctFingerprinter {
    /// cos(π/N · (n + ½) · k), indexed [k * N + n]
    cosines: Vec<f64>,
}

impl Default for DctFingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl DctFingerprinter {
    pub fn new() -> Self {
        let n = THUMB_SIZE as f64;
        let cosines = (0..THUMB_SIZE)
            .flat_map(|k| {
                (0..THUMB_SIZE).map(move |i| {
                    (std::f64::consts::PI / n * (i as f64 + 0.5) * k as f64).cos()
                })
            })
            .collect();
        Self { cosines }
    }

    /// Unnormalized 1-D DCT-II over `THUMB_SIZE` samples read with `stride`
    fn dct_1d(&self, input: &[f64], offset: usize, stride: usize, output: &mut [f64]) {
        for (k, out) in output.iter_mut().enumerate() {
            let row = &self.cosines[k * THUMB_SIZE..(k + 1) * THUMB_SIZE];
            *out = row
                .iter()
                .enumerate()
                .map(|(i, c)| input[offset + i * stride] * c)
                .sum();
        }
    }

    /// Low-frequency block of the 2-D DCT, row-major `HASH_SIDE × HASH_SIDE`
    fn low_frequencies(&self, pixels: &[f64]) -> Vec<f64> {
        // Columns first (only the first HASH_SIDE output rows are needed)...
        let mut by_column = vec![0.0; HASH_SIDE * THUMB_SIZE];
        let mut column_out = [0.0; HASH_SIDE];
        for x in 0..THUMB_SIZE {
            self.dct_1d(pixels, x, THUMB_SIZE, &mut column_out);
            for (k, v) in column_out.iter().enumerate() {
                by_column[k * THUMB_SIZE + x] = *v;
            }
        }

        // ...then rows of the partial result
        let mut block = vec![0.0; HASH_SIDE * HASH_SIDE];
        for k in 0..HASH_SIDE {
            self.dct_1d(
                &by_column,
                k * THUMB_SIZE,
                1,
                &mut block[k * HASH_SIDE..(k + 1) * HASH_SIDE],
            );
        }
        block
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

impl Fingerprinter for DctFingerprinter {
    fn fingerprint(&self, image: &DynamicImage) -> Result<Fingerprint, SignalError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SignalError::ImageTooSmall {
                width: image.width(),
                height: image.height(),
                min: 1,
            });
        }

        let thumb = image
            .resize_exact(THUMB_SIZE as u32, THUMB_SIZE as u32, FilterType::Lanczos3)
            .to_luma8();
        let pixels: Vec<f64> = thumb.pixels().map(|p| p.0[0] as f64).collect();

        let block = self.low_frequencies(&pixels);
        let threshold = median(&block);

        let hash = block
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > threshold)
            .fold(0u64, |acc, (i, _)| acc | 1 << (63 - i));
        Ok(Fingerprint::from(hash))
    }
}
