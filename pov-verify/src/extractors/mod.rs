//! Default collaborators
//!
//! Concrete implementations of the loader, metadata reader and the three
//! visual signal traits declared in `types`.

pub mod exif_reader;
pub mod fingerprint;
pub mod image_loader;
pub mod keypoints;
pub mod ssim;

pub use exif_reader::ExifMetadataReader;
pub use fingerprint::DctFingerprinter;
pub use image_loader::FsImageLoader;
pub use keypoints::FastBriefDetector;
pub use ssim::WindowedSsim;
