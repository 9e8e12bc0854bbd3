//! FAST corners with BRIEF descriptors
//!
//! Corners come from `imageproc`'s FAST-9 detector, strongest first. Each
//! surviving corner is described by 256 intensity comparisons on a
//! Gaussian-smoothed copy of the image, using a fixed pseudo-random
//! sampling pattern so descriptors from separate calls are comparable.
//!
//! No non-maximum suppression is applied; clustered responses on one
//! physical corner are left for the cross-check matcher to sort out.

use image::GrayImage;
use imageproc::corners::{corners_fast9, Corner};
use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::types::{BinaryDescriptor, FeatureDetector, SignalError};

/// Half-width of the square patch the test pattern samples from
pub const PATCH_RADIUS: i32 = 15;

const DESCRIPTOR_BITS: usize = 256;
const PATTERN_SEED: u64 = 0x5EED_B71E_F000_0001;
const DEFAULT_FAST_THRESHOLD: u8 = 20;
const SMOOTHING_SIGMA: f32 = 2.0;

/// One intensity comparison: (dx1, dy1) vs (dx2, dy2)
type TestPair = (i32, i32, i32, i32);

#[derive(Debug, Clone)]
pub struct FastBriefDetector {
    threshold: u8,
    pattern: Vec<TestPair>,
}

impl Default for FastBriefDetector {
    fn default() -> Self {
        Self::new(DEFAULT_FAST_THRESHOLD)
    }
}

fn sampling_pattern() -> Vec<TestPair> {
    let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
    let range = -PATCH_RADIUS..=PATCH_RADIUS;
    (0..DESCRIPTOR_BITS)
        .map(|_| {
            (
                rng.gen_range(range.clone()),
                rng.gen_range(range.clone()),
                rng.gen_range(range.clone()),
                rng.gen_range(range.clone()),
            )
        })
        .collect()
}

impl FastBriefDetector {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            pattern: sampling_pattern(),
        }
    }

    fn describe(&self, smoothed: &GrayImage, corner: &Corner) -> BinaryDescriptor {
        let (cx, cy) = (corner.x as i32, corner.y as i32);
        let sample = |dx: i32, dy: i32| smoothed.get_pixel((cx + dx) as u32, (cy + dy) as u32).0[0];

        let mut words = [0u64; 4];
        for (bit, &(x1, y1, x2, y2)) in self.pattern.iter().enumerate() {
            if sample(x1, y1) < sample(x2, y2) {
                words[bit / 64] |= 1 << (bit % 64);
            }
        }
        BinaryDescriptor(words)
    }
}

impl FeatureDetector for FastBriefDetector {
    fn detect(
        &self,
        image: &GrayImage,
        max_features: usize,
    ) -> Result<Vec<BinaryDescriptor>, SignalError> {
        let (width, height) = image.dimensions();
        let margin = (PATCH_RADIUS + 1) as u32;
        if max_features == 0 || width <= 2 * margin || height <= 2 * margin {
            return Ok(Vec::new());
        }

        let mut corners: Vec<Corner> = corners_fast9(image, self.threshold)
            .into_iter()
            .filter(|c| {
                c.x >= margin && c.y >= margin && c.x < width - margin && c.y < height - margin
            })
            .collect();
        corners.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.y.cmp(&b.y))
                .then(a.x.cmp(&b.x))
        });
        corners.truncate(max_features);

        if corners.is_empty() {
            return Ok(Vec::new());
        }

        let smoothed = gaussian_blur_f32(image, SMOOTHING_SIGMA);
        let descriptors: Vec<BinaryDescriptor> =
            corners.iter().map(|c| self.describe(&smoothed, c)).collect();

        trace!(
            width,
            height,
            keypoints = descriptors.len(),
            "Keypoints described"
        );
        Ok(descriptors)
    }
}
