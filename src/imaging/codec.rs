//! Codec adapter trait and shared types.
//!
//! The [`Codec`] trait is everything the session needs from an image library:
//! decode, crop, resample, quality, format, metadata stripping, encode, and a
//! last-error diagnostic. A codec instance is one handle on one decoded image
//! and is **not** safe for concurrent use; the
//! [dispatcher](crate::dispatch) serializes every call made through it.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_codec::RustCodec). Sessions obtain handles from a
//! [`CodecFactory`] so that a reload can discard a handle and start fresh.

use super::params::Quality;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Failed(String),
}

/// Result of a decode: natural size and the detected source format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

/// One handle on an image library.
///
/// Steps operate on the handle's in-memory image, in call order.
pub trait Codec: Send {
    /// Decode `path`, replacing any image held by this handle.
    fn decode(&mut self, path: &Path) -> Result<Decoded, CodecError>;

    /// Cut a `width`x`height` window at `(x, y)`.
    fn crop(&mut self, width: u32, height: u32, x: u32, y: u32) -> Result<(), CodecError>;

    /// Resample to exactly `width`x`height`.
    fn resample(&mut self, width: u32, height: u32) -> Result<(), CodecError>;

    fn set_quality(&mut self, quality: Quality) -> Result<(), CodecError>;

    /// Force the output format (e.g. `"png"`, `"JPEG"`).
    fn set_format(&mut self, format: &str) -> Result<(), CodecError>;

    /// Drop embedded profiles and metadata from the output.
    fn strip_metadata(&mut self) -> Result<(), CodecError>;

    /// Encode the current image and write it to `path`.
    fn encode(&mut self, path: &Path) -> Result<(), CodecError>;

    /// Diagnostic text of the most recent failure, if any.
    fn last_error(&self) -> Option<String>;
}

/// Produces fresh codec handles.
pub trait CodecFactory: Send + Sync {
    fn create(&self) -> Box<dyn Codec>;
}

impl<F> CodecFactory for F
where
    F: Fn() -> Box<dyn Codec> + Send + Sync,
{
    fn create(&self) -> Box<dyn Codec> {
        self()
    }
}
