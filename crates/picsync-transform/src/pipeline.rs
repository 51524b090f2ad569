//! TransformPipeline - IImageTransformer implementation
//!
//! ## Design Notes
//!
//! - The output keeps the input's file stem with a `.png` extension, so
//!   `IMG_0001.jpg` becomes `<convert_dir>/IMG_0001.png`.
//! - Inputs are processed one at a time; a failure is logged with the input
//!   path and the pipeline moves on.

use std::path::{Path, PathBuf};

use picsync_core::config::{expand_tilde, TransformConfig};
use picsync_core::ports::IImageTransformer;
use tracing::{info, instrument, warn};

use crate::resize::resize_to_width;
use crate::TransformError;

/// Resizes pictures to a fixed width and stores them as PNG
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    output_dir: PathBuf,
    resize_width: u32,
}

impl TransformPipeline {
    /// # Errors
    /// Returns `TransformError::InvalidWidth` when `resize_width` is zero
    pub fn new(output_dir: PathBuf, resize_width: u32) -> Result<Self, TransformError> {
        if resize_width == 0 {
            return Err(TransformError::InvalidWidth(resize_width));
        }
        Ok(Self {
            output_dir,
            resize_width,
        })
    }

    /// Builds the pipeline from the `transform` config section
    pub fn from_config(config: &TransformConfig) -> Result<Self, TransformError> {
        Self::new(expand_tilde(&config.convert_dir), config.resize_width)
    }

    pub fn resize_width(&self) -> u32 {
        self.resize_width
    }

    /// Output location for `input`
    pub fn output_path(&self, input: &Path) -> Result<PathBuf, TransformError> {
        let stem = input
            .file_stem()
            .ok_or_else(|| TransformError::MissingFileName(input.to_path_buf()))?;
        let mut name = stem.to_os_string();
        name.push(".png");
        Ok(self.output_dir.join(name))
    }

    /// Converts one picture and returns the written path
    #[instrument(skip(self), fields(input = %input.display(), width = self.resize_width))]
    pub fn convert_one(&self, input: &Path) -> Result<PathBuf, TransformError> {
        let output = self.output_path(input)?;
        let img = image::open(input)?;
        let resized = resize_to_width(&img, self.resize_width);
        resized.save_with_format(&output, image::ImageFormat::Png)?;
        Ok(output)
    }
}

impl IImageTransformer for TransformPipeline {
    fn transform(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            warn!(
                dir = %self.output_dir.display(),
                error = %e,
                "Cannot create convert directory, skipping transform"
            );
            return Vec::new();
        }

        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            match self.convert_one(input) {
                Ok(output) => {
                    info!(output = %output.display(), "Resize and Convert");
                    outputs.push(output);
                }
                Err(e) => warn!(input = %input.display(), error = %e, "Resize and Convert failed"),
            }
        }
        outputs
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
