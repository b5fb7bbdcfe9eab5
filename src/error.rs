//! Errors surfaced by the caller-facing API.
//!
//! Planner calls fail synchronously. Load/Save failures are returned directly
//! in inline mode and handed to the completion handler in deferred mode.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WandError {
    /// Bad planner or load/save input. The message is call-usage text.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The session has no decoded image attached.
    #[error("no image loaded")]
    NotLoaded,
    /// The codec rejected one of the load/save steps.
    #[error("{step} failed: {message}")]
    Codec { step: &'static str, message: String },
    /// The codec lane could not be acquired, or a codec call aborted.
    #[error("resource error: {0}")]
    Resource(String),
}

impl WandError {
    pub(crate) fn usage(text: impl Into<String>) -> Self {
        Self::InvalidArgument(text.into())
    }
}

pub type Result<T> = std::result::Result<T, WandError>;
