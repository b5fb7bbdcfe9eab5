//! Load and save against a codec handle.
//!
//! These functions combine session state with codec execution. They assume
//! the caller already holds the codec lane; the
//! [dispatcher](crate::dispatch) is the only caller outside tests.

use super::calculations::CropRect;
use super::codec::{Codec, CodecError, CodecFactory};
use super::params::Quality;
use crate::error::{Result, WandError};
use crate::session::{Dimensions, SessionState};
use std::path::{Path, PathBuf};

/// One codec call of a save, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStep {
    Crop(CropRect),
    Resample(Dimensions),
    SetQuality(Quality),
    SetFormat(String),
    StripMetadata,
    Encode(PathBuf),
}

impl SaveStep {
    /// Step name used in error reports.
    pub fn name(&self) -> &'static str {
        match self {
            SaveStep::Crop(_) => "crop",
            SaveStep::Resample(_) => "resample",
            SaveStep::SetQuality(_) => "set_quality",
            SaveStep::SetFormat(_) => "set_format",
            SaveStep::StripMetadata => "strip_metadata",
            SaveStep::Encode(_) => "encode",
        }
    }

    fn run(&self, codec: &mut dyn Codec) -> std::result::Result<(), CodecError> {
        match self {
            SaveStep::Crop(rect) => {
                codec.crop(rect.width, rect.height, rect.offset_x, rect.offset_y)
            }
            SaveStep::Resample(dims) => codec.resample(dims.width, dims.height),
            SaveStep::SetQuality(quality) => codec.set_quality(*quality),
            SaveStep::SetFormat(format) => codec.set_format(format),
            SaveStep::StripMetadata => codec.strip_metadata(),
            SaveStep::Encode(path) => codec.encode(path),
        }
    }
}

fn require_path(path: &Path, usage: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(WandError::usage(usage));
    }
    Ok(())
}

/// Map a codec failure to a caller error, preferring the codec's own diagnostic.
fn codec_failure(codec: &dyn Codec, step: &'static str, err: CodecError) -> WandError {
    WandError::Codec {
        step,
        message: codec.last_error().unwrap_or_else(|| err.to_string()),
    }
}

/// Plan a save without executing it.
///
/// Crop and resample appear only while their directives are active, format
/// only when a target format is set. Quality and metadata stripping are
/// always applied.
pub fn plan_save(state: &SessionState, path: &Path) -> Result<Vec<SaveStep>> {
    require_path(path, "save(path: non-empty)")?;
    if !state.is_loaded() {
        return Err(WandError::NotLoaded);
    }

    let mut steps = Vec::with_capacity(6);
    if let Some(rect) = state.crop() {
        steps.push(SaveStep::Crop(rect));
    }
    if let Some(dims) = state.resize() {
        steps.push(SaveStep::Resample(dims));
    }
    steps.push(SaveStep::SetQuality(state.quality()));
    if let Some(format) = state.target_format() {
        steps.push(SaveStep::SetFormat(format.to_string()));
    }
    steps.push(SaveStep::StripMetadata);
    steps.push(SaveStep::Encode(path.to_path_buf()));
    Ok(steps)
}

/// Apply pending directives and write the result to `path`.
///
/// Stops at the first failing step; later steps are not attempted.
pub fn save_image(codec: &mut dyn Codec, state: &SessionState, path: &Path) -> Result<()> {
    for step in plan_save(state, path)? {
        step.run(codec)
            .map_err(|err| codec_failure(codec, step.name(), err))?;
    }
    Ok(())
}

/// Decode `path` into the session.
///
/// A session that already holds an image gets a fresh codec handle first and
/// stays unloaded if the decode fails. Pending directives are kept.
pub fn load_image(
    codec: &mut Box<dyn Codec>,
    factory: &dyn CodecFactory,
    state: &mut SessionState,
    path: &Path,
) -> Result<()> {
    require_path(path, "load(path: non-empty)")?;

    if state.is_loaded() {
        *codec = factory.create();
        state.detach();
    }

    let decoded = codec
        .decode(path)
        .map_err(|err| codec_failure(&**codec, "decode", err))?;
    state.attach(path, decoded);

    let (Some(natural), Some(crop)) = (state.natural(), state.crop()) else {
        return Ok(());
    };
    if crop.offset_x + crop.width > natural.width || crop.offset_y + crop.height > natural.height {
        tracing::warn!(
            path = %path.display(),
            crop = ?(crop.width, crop.height, crop.offset_x, crop.offset_y),
            natural = ?(natural.width, natural.height),
            "persisted crop exceeds the reloaded image"
        );
    }
    Ok(())
}
