//! Image sessions: per-image directive state and the shared handle callers hold.
//!
//! A [`SessionState`] is plain data: natural size, pending crop/resize,
//! quality, formats. The [`planner`](crate::planner) mutates it; the
//! [`operations`](crate::imaging::operations) read it when loading and saving.
//!
//! An [`Image`] wraps one session and its codec handle behind shared
//! ownership. Cloning an `Image` is cheap and every clone refers to the same
//! session, so a deferred task can hold the session alive after the caller
//! drops its own handle. The codec handle is released when the last clone
//! goes away.
//!
//! ## Directive persistence
//!
//! Reloading replaces the natural size, source format, and source path but
//! keeps crop, resize, quality, and target format. A crop planned against a
//! previous, larger image can therefore exceed the new image; the load logs a
//! warning when that happens and the save fails at the crop step.

use crate::dispatch::{self, Dispatcher, Task};
use crate::error::Result;
use crate::imaging::calculations::{CropRect, aspect_of};
use crate::imaging::codec::{Codec, CodecFactory, Decoded};
use crate::imaging::params::{Align, Quality};
use crate::imaging::rust_codec::RustCodecFactory;
use crate::planner;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Width, height, and their ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
    pub aspect: f64,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            aspect: aspect_of(width, height),
        }
    }
}

/// Target dimensions of a pending resample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Directive state of one session.
///
/// `natural` is present exactly while an image is loaded. `crop` and
/// `resize` are present while the corresponding directive is active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub(crate) source_path: Option<PathBuf>,
    pub(crate) source_format: Option<String>,
    pub(crate) natural: Option<Extent>,
    pub(crate) crop: Option<CropRect>,
    pub(crate) resize: Option<Dimensions>,
    pub(crate) quality: Quality,
    pub(crate) target_format: Option<String>,
}

impl SessionState {
    pub fn is_loaded(&self) -> bool {
        self.natural.is_some()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn source_format(&self) -> Option<&str> {
        self.source_format.as_deref()
    }

    pub fn target_format(&self) -> Option<&str> {
        self.target_format.as_deref()
    }

    pub fn natural(&self) -> Option<Extent> {
        self.natural
    }

    pub fn crop(&self) -> Option<CropRect> {
        self.crop
    }

    pub fn resize(&self) -> Option<Dimensions> {
        self.resize
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Store a quality, clamped into 0–100.
    pub fn set_quality(&mut self, value: u32) {
        self.quality = Quality::new(value);
    }

    /// Override the output format. Empty names are ignored.
    pub fn set_format(&mut self, format: &str) {
        if !format.is_empty() {
            self.target_format = Some(format.to_string());
        }
    }

    /// Output size: the resize if active, else the crop, else the natural size.
    pub fn output_size(&self) -> Dimensions {
        if let Some(resize) = self.resize {
            return resize;
        }
        match (self.crop, self.natural) {
            (Some(crop), _) => Dimensions {
                width: crop.width,
                height: crop.height,
            },
            (None, Some(natural)) => Dimensions {
                width: natural.width,
                height: natural.height,
            },
            (None, None) => Dimensions {
                width: 0,
                height: 0,
            },
        }
    }

    /// Record a successful decode. Directives are left as they are.
    pub(crate) fn attach(&mut self, path: &Path, decoded: Decoded) {
        self.natural = Some(Extent::new(decoded.width, decoded.height));
        self.source_format = Some(decoded.format);
        self.source_path = Some(path.to_path_buf());
    }

    /// Forget the decoded image. Directives are left as they are.
    pub(crate) fn detach(&mut self) {
        self.natural = None;
        self.source_format = None;
        self.source_path = None;
    }
}

/// Serializable snapshot of a session, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub loaded: bool,
    pub source: Option<PathBuf>,
    pub format: Option<String>,
    pub target_format: Option<String>,
    pub raw_width: u32,
    pub raw_height: u32,
    pub width: u32,
    pub height: u32,
    pub quality: u32,
    pub crop: Option<CropRect>,
    pub resize: Option<Dimensions>,
}

impl From<&SessionState> for ImageInfo {
    fn from(state: &SessionState) -> Self {
        let natural = state.natural.map(|n| (n.width, n.height)).unwrap_or((0, 0));
        let output = state.output_size();
        Self {
            loaded: state.is_loaded(),
            source: state.source_path.clone(),
            format: state.source_format.clone(),
            target_format: state.target_format.clone(),
            raw_width: natural.0,
            raw_height: natural.1,
            width: output.width,
            height: output.height,
            quality: state.quality.value(),
            crop: state.crop,
            resize: state.resize,
        }
    }
}

pub(crate) struct Session {
    pub(crate) state: SessionState,
    pub(crate) codec: Box<dyn Codec>,
}

struct ImageInner {
    factory: Arc<dyn CodecFactory>,
    session: Mutex<Session>,
}

/// Shared handle on one image session.
#[derive(Clone)]
pub struct Image {
    inner: Arc<ImageInner>,
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("state", &self.lock().state)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Empty session backed by [`RustCodec`](crate::imaging::RustCodec).
    pub fn new() -> Self {
        Self::with_codec(RustCodecFactory)
    }

    /// Empty session whose codec handles come from `factory`.
    pub fn with_codec(factory: impl CodecFactory + 'static) -> Self {
        let factory: Arc<dyn CodecFactory> = Arc::new(factory);
        let codec = factory.create();
        Self {
            inner: Arc::new(ImageInner {
                factory,
                session: Mutex::new(Session {
                    state: SessionState::default(),
                    codec,
                }),
            }),
        }
    }

    /// Session state stays consistent across a panicking codec call (every
    /// mutation is a plain field store), so a poisoned lock is recovered.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn factory(&self) -> &dyn CodecFactory {
        self.inner.factory.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    // ------------------------------------------------------------------
    // Load / save
    // ------------------------------------------------------------------

    /// Decode `path` on the calling thread.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        dispatch::run_inline(self, &Task::Load(path.as_ref().to_path_buf()))
    }

    /// Decode `path` on the global worker lane; `on_done` runs when the
    /// caller drives [`Dispatcher::run_pending`] or
    /// [`Dispatcher::run_until_idle`] on [`Dispatcher::global`].
    pub fn load_deferred<F>(&self, path: impl Into<PathBuf>, on_done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        Dispatcher::global().submit(self.clone(), Task::Load(path.into()), Box::new(on_done));
    }

    /// Apply pending directives and write to `path` on the calling thread.
    ///
    /// Crop and resample replace the decoded pixels and the directives stay
    /// planned, so saving a cropped session a second time crops the already
    /// cropped image and fails at the `crop` step. Reload before saving again.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        dispatch::run_inline(self, &Task::Save(path.as_ref().to_path_buf()))
    }

    /// Deferred counterpart of [`Image::save`].
    pub fn save_deferred<F>(&self, path: impl Into<PathBuf>, on_done: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        Dispatcher::global().submit(self.clone(), Task::Save(path.into()), Box::new(on_done));
    }

    // ------------------------------------------------------------------
    // Planner
    // ------------------------------------------------------------------

    /// Plan a crop to `aspect`. Returns whether a crop is now active.
    pub fn crop(&self, aspect: f64, align: Align) -> Result<bool> {
        planner::plan_crop(&mut self.lock().state, aspect, align)
    }

    pub fn scale(&self, percent: f64) -> Result<()> {
        planner::plan_scale(&mut self.lock().state, percent)
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        planner::plan_resize(&mut self.lock().state, width, height)
    }

    pub fn resize_by_width(&self, width: u32) -> Result<()> {
        planner::plan_resize_by_width(&mut self.lock().state, width)
    }

    pub fn resize_by_height(&self, height: u32) -> Result<()> {
        planner::plan_resize_by_height(&mut self.lock().state, height)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn is_loaded(&self) -> bool {
        self.lock().state.is_loaded()
    }

    pub fn quality(&self) -> u32 {
        self.lock().state.quality.value()
    }

    pub fn set_quality(&self, value: u32) {
        self.lock().state.set_quality(value);
    }

    /// Format reported by the codec at load.
    pub fn format(&self) -> Option<String> {
        self.lock().state.source_format.clone()
    }

    /// Set the output format. Read back through [`Image::target_format`].
    pub fn set_format(&self, format: &str) {
        self.lock().state.set_format(format);
    }

    pub fn target_format(&self) -> Option<String> {
        self.lock().state.target_format.clone()
    }

    pub fn raw_width(&self) -> u32 {
        self.lock().state.natural.map_or(0, |n| n.width)
    }

    pub fn raw_height(&self) -> u32 {
        self.lock().state.natural.map_or(0, |n| n.height)
    }

    pub fn width(&self) -> u32 {
        self.lock().state.output_size().width
    }

    pub fn height(&self) -> u32 {
        self.lock().state.output_size().height
    }

    /// Copy of the current directive state.
    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo::from(&self.lock().state)
    }
}
