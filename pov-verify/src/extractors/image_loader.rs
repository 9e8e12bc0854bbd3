//! Image decoding from local storage

use image::DynamicImage;
use tracing::debug;

use crate::types::{ImageHandle, ImageLoadError, ImageLoader};

/// Decodes images with the `image` crate, format taken from the file extension
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn load(&self, image: &ImageHandle) -> Result<DynamicImage, ImageLoadError> {
        let decoded = image::open(image.path()).map_err(|e| ImageLoadError {
            path: image.path().to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(
            file = ?image.path(),
            width = decoded.width(),
            height = decoded.height(),
            "Image decoded"
        );
        Ok(decoded)
    }
}
