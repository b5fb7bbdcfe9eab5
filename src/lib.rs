//! # Simple Wand
//!
//! Image sessions with planned geometry and serialized codec access.
//!
//! A caller loads one image into an [`Image`], describes what should happen
//! to it (crop to an aspect ratio, scale, resize, change quality or format)
//! and saves. Nothing touches pixels until the save: planner calls only
//! record directives, so they are cheap and can be repeated freely.
//!
//! ```text
//! load ─→ crop / scale / resize / quality / format ─→ save
//!          (planner: pure arithmetic)                 (codec: blocking I/O)
//! ```
//!
//! Load and save run either inline on the calling thread or deferred to a
//! worker pool with a completion handler. Either way every codec call in the
//! process passes through one lane, one task at a time.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | `Image` handle, `SessionState` directives, `ImageInfo` snapshot |
//! | [`planner`] | crop/scale/resize arithmetic against the session state |
//! | [`dispatch`] | codec lane, inline execution, deferred `Dispatcher` |
//! | [`imaging`] | geometry math, `Codec` trait, `RustCodec`, load/save sequences |
//! | [`recipe`] | serializable bundle of directives applied in planner order |
//! | [`config`] | `config.toml` loading, validation, merging |
//! | [`output`] | CLI output formatting |
//! | [`error`] | `WandError` surfaced to callers |
//!
//! # Design Decisions
//!
//! ## Directives, Not Pixels
//!
//! Crop and resize are stored as pending directives and applied at save in a
//! fixed order: crop, resample, quality, format, strip metadata, encode. Crop
//! is always computed against the natural size. Resize operations read the
//! current crop, so a crop planned after a resize does not rescale it.
//!
//! ## One Codec Lane Per Process
//!
//! Codec handles are not safe for concurrent use, and the library behind them
//! may share global state between handles. Every load and save, inline or
//! deferred, from any session, holds the same lane for its full duration.
//!
//! ## Caller-Driven Completion
//!
//! Deferred tasks run on the rayon pool but their handlers do not. Results
//! queue up in the [`Dispatcher`] until the caller drives
//! [`Dispatcher::run_pending`] or [`Dispatcher::run_until_idle`], so handlers
//! run on the caller's thread, exactly once each. A task keeps its session
//! alive until its handler has returned.
//!
//! ## Pure-Rust Codec
//!
//! [`RustCodec`](imaging::RustCodec) is built on the `image` crate. Resampling
//! is point sampling (`FilterType::Nearest`), which keeps output pixels exact
//! copies of source pixels.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod imaging;
pub mod output;
pub mod planner;
pub mod recipe;
pub mod session;

pub use dispatch::{Dispatcher, Handler, Task};
pub use error::{Result, WandError};
pub use imaging::{Align, Quality};
pub use recipe::Recipe;
pub use session::{Image, ImageInfo, SessionState};
