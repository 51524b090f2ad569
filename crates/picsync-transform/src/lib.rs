//! picsync Transform - post-download image processing
//!
//! Scales each downloaded picture to a fixed width, keeping its aspect
//! ratio, and writes it as PNG into a separate directory. The step is
//! synchronous and never touches sync state; a picture that fails to
//! convert is logged and skipped.
//!
//! ## Key Components
//!
//! - [`resize`] - Target dimension math and the resampling call
//! - [`TransformPipeline`] - `IImageTransformer` implementation

pub mod pipeline;
pub mod resize;

use std::path::PathBuf;

pub use pipeline::TransformPipeline;

/// Errors raised while converting a single picture
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Decoding or encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem error around the conversion
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The target width must be positive
    #[error("Invalid resize width: {0}")]
    InvalidWidth(u32),

    /// The input path has no file name to derive the output name from
    #[error("Input has no file name: {0}")]
    MissingFileName(PathBuf),
}
