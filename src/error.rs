//! Error kinds callers may want to match on.
//!
//! Everything else in the crate travels as `anyhow::Error`; these variants
//! are wrapped into it and can be recovered with `downcast_ref::<PipelineError>()`.

use std::path::PathBuf;

use crate::mask::MaskDomain;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unsupported mesh format '{extension}' (expecting obj or ply)")]
    UnsupportedMeshFormat { extension: String },

    #[error("mask convention mismatch: expected {expected:?} mask, got {found:?}")]
    MaskDomain {
        expected: MaskDomain,
        found: MaskDomain,
    },

    #[error("missing placeholder render at {}", .path.display())]
    MissingPlaceholder { path: PathBuf },
}

impl PipelineError {
    pub fn config<T: ToString>(msg: T) -> Self {
        PipelineError::Config(msg.to_string())
    }
}
