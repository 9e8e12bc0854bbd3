//! Windowed structural similarity (SSIM)
//!
//! Uniform square windows slid over every valid position, sample
//! (unbiased) variances, and the standard stabilizing constants for 8-bit
//! data. The score is the mean over all windows, so it lies in [-1, 1].

use image::GrayImage;

use crate::types::{SignalError, StructuralSimilarity};

/// Default window side in pixels
pub const DEFAULT_WINDOW: u32 = 7;

const DYNAMIC_RANGE: f64 = 255.0;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

#[derive(Debug, Clone, Copy)]
pub struct WindowedSsim {
    window: u32,
}

impl Default for WindowedSsim {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Running sums for one window column band
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    x: i64,
    y: i64,
    xx: i64,
    yy: i64,
    xy: i64,
}

impl Moments {
    fn of(a: u8, b: u8) -> Self {
        let (a, b) = (a as i64, b as i64);
        Self {
            x: a,
            y: b,
            xx: a * a,
            yy: b * b,
            xy: a * b,
        }
    }

    fn add(&mut self, other: &Moments) {
        self.x += other.x;
        self.y += other.y;
        self.xx += other.xx;
        self.yy += other.yy;
        self.xy += other.xy;
    }

    fn sub(&mut self, other: &Moments) {
        self.x -= other.x;
        self.y -= other.y;
        self.xx -= other.xx;
        self.yy -= other.yy;
        self.xy -= other.xy;
    }
}

impl WindowedSsim {
    /// `window` is clamped to at least 2 so the sample variance is defined
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(2),
        }
    }

    fn window_score(&self, m: &Moments) -> f64 {
        let n = (self.window * self.window) as f64;
        let c1 = (K1 * DYNAMIC_RANGE).powi(2);
        let c2 = (K2 * DYNAMIC_RANGE).powi(2);

        let (sx, sy) = (m.x as f64, m.y as f64);
        let mu_x = sx / n;
        let mu_y = sy / n;
        let var_x = (m.xx as f64 - sx * sx / n) / (n - 1.0);
        let var_y = (m.yy as f64 - sy * sy / n) / (n - 1.0);
        let cov = (m.xy as f64 - sx * sy / n) / (n - 1.0);

        ((2.0 * mu_x * mu_y + c1) * (2.0 * cov + c2))
            / ((mu_x * mu_x + mu_y * mu_y + c1) * (var_x + var_y + c2))
    }
}

impl StructuralSimilarity for WindowedSsim {
    fn compare(&self, first: &GrayImage, second: &GrayImage) -> Result<f64, SignalError> {
        if first.dimensions() != second.dimensions() {
            return Err(SignalError::DimensionMismatch(
                first.dimensions(),
                second.dimensions(),
            ));
        }

        let (width, height) = first.dimensions();
        let win = self.window;
        if width < win || height < win {
            return Err(SignalError::ImageTooSmall {
                width,
                height,
                min: win,
            });
        }

        let (w, h, win) = (width as usize, height as usize, win as usize);
        let a = first.as_raw();
        let b = second.as_raw();
        let pixel = |x: usize, y: usize| Moments::of(a[y * w + x], b[y * w + x]);

        // Column sums over rows [top, top + win)
        let mut columns = vec![Moments::default(); w];
        for y in 0..win {
            for (x, column) in columns.iter_mut().enumerate() {
                column.add(&pixel(x, y));
            }
        }

        let mut total = 0.0;
        let mut count = 0usize;
        for top in 0..=(h - win) {
            if top > 0 {
                let (leaving, entering) = (top - 1, top + win - 1);
                for (x, column) in columns.iter_mut().enumerate() {
                    column.sub(&pixel(x, leaving));
                    column.add(&pixel(x, entering));
                }
            }

            let mut window = Moments::default();
            for column in &columns[..win] {
                window.add(column);
            }
            for left in 0..=(w - win) {
                if left > 0 {
                    window.sub(&columns[left - 1]);
                    window.add(&columns[left + win - 1]);
                }
                total += self.window_score(&window);
                count += 1;
            }
        }

        Ok(total / count as f64)
    }
}
