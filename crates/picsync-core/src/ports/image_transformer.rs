//! Image transformer port
//!
//! Consumes the local paths downloaded by a cycle and produces derived
//! files. The call is synchronous and shares no state with the sync engine;
//! a failure for one input must not affect the others.

use std::path::{Path, PathBuf};

/// Port trait for the post-download transform step
pub trait IImageTransformer: Send + Sync {
    /// Transforms each input, returning the paths of the outputs that were
    /// produced. Inputs that fail are logged and left out of the result.
    fn transform(&self, inputs: &[PathBuf]) -> Vec<PathBuf>;

    /// Directory the outputs are written to
    fn output_dir(&self) -> &Path;
}
