//! Image processing: geometry math, codec adapter, and load/save execution.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` + `ImageDecoder::icc_profile` |
//! | **Crop** | `DynamicImage::crop_imm` |
//! | **Resample** | `resize_exact` with `FilterType::Nearest` (point sampling) |
//! | **Encode** | per-format encoders (JPEG quality, PNG, AVIF, `write_to`) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and resize geometry (unit testable)
//! - **Parameters**: [`Quality`] and [`Align`]
//! - **Codec**: [`Codec`] trait + [`RustCodec`]
//! - **Operations**: load and save sequences against a codec handle

pub mod calculations;
pub mod codec;
pub mod operations;
pub mod params;
pub mod rust_codec;

pub use calculations::{CropRect, calculate_crop, calculate_scaled};
pub use codec::{Codec, CodecError, CodecFactory, Decoded};
pub use operations::SaveStep;
pub use params::{Align, Quality};
pub use rust_codec::{RustCodec, RustCodecFactory};
