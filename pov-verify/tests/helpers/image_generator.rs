//! Photo fixture generator
//!
//! Synthetic "scenes": smooth gradients plus a scatter of bright and dark
//! rectangles, so every visual signal has something to work with.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

/// Configuration for a generated scene
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub width: u32,
    pub height: u32,
    /// Side of the grid cell holding one rectangle
    pub cell: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            cell: 20,
        }
    }
}

fn scene_pixel(config: &SceneConfig, x: u32, y: u32) -> Rgb<u8> {
    let (fx, fy) = (x as f64, y as f64);
    let base = 110.0 + 50.0 * (fx / 23.0).sin() + 40.0 * (fy / 17.0 + fx / 41.0).cos();

    let (cx, cy) = (x / config.cell, y / config.cell);
    let (ox, oy) = (x % config.cell, y % config.cell);
    let inside = (4..12).contains(&ox) && (6..14).contains(&oy);
    let value = if inside {
        if (cx * 7 + cy * 3) % 2 == 0 {
            240.0
        } else {
            15.0
        }
    } else {
        base
    };

    let v = value.clamp(0.0, 255.0) as u8;
    Rgb([v, v.saturating_add(10), v.saturating_sub(10)])
}

/// Write a PNG scene and return its path
pub fn write_scene(dir: &Path, name: &str, config: &SceneConfig) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(config.width, config.height, |x, y| scene_pixel(config, x, y))
        .save(&path)
        .unwrap();
    path
}

/// Write the photographic negative of the default scene
pub fn write_inverted_scene(dir: &Path, name: &str, config: &SceneConfig) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(config.width, config.height, |x, y| {
        let Rgb([r, g, b]) = scene_pixel(config, x, y);
        Rgb([255 - r, 255 - g, 255 - b])
    })
    .save(&path)
    .unwrap();
    path
}
