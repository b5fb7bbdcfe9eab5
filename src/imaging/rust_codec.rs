//! Pure Rust codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `ImageReader::with_guessed_format` + `DynamicImage::from_decoder` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Resample | `DynamicImage::resize_exact` with `Nearest` (point sampling) |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` (alpha dropped) |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → other | `DynamicImage::write_to` |
//!
//! AVIF is write-only: the `"avif"` feature only enables the rav1e encoder.

use super::codec::{Codec, CodecError, CodecFactory, Decoded};
use super::params::Quality;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Upper-case format name, as reported by [`Codec::decode`].
pub fn format_name(format: ImageFormat) -> String {
    format!("{format:?}").to_uppercase()
}

/// Parse a format name or extension (`"png"`, `"JPEG"`, `"jpg"`).
fn parse_format(name: &str) -> Option<ImageFormat> {
    ImageFormat::from_extension(name.to_ascii_lowercase())
}

/// A single decoded image plus the pending output settings.
#[derive(Default)]
pub struct RustCodec {
    image: Option<DynamicImage>,
    source_format: Option<ImageFormat>,
    output_format: Option<ImageFormat>,
    quality: Quality,
    icc_profile: Option<Vec<u8>>,
    last_error: Option<String>,
}

impl RustCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an ICC profile would be embedded on encode.
    pub fn has_profile(&self) -> bool {
        self.icc_profile.is_some()
    }

    /// Remember the diagnostic of a failed step.
    fn record<T>(&mut self, result: Result<T, CodecError>) -> Result<T, CodecError> {
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }

    fn image_mut(&mut self) -> Result<&mut DynamicImage, CodecError> {
        self.image
            .as_mut()
            .ok_or_else(|| CodecError::Failed("no image decoded".into()))
    }

    fn read(&mut self, path: &Path) -> Result<Decoded, CodecError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            CodecError::Failed(format!("unrecognized image format: {}", path.display()))
        })?;
        let decode_failed = |e: image::ImageError| {
            CodecError::Failed(format!("Failed to decode {}: {e}", path.display()))
        };
        let mut decoder = reader.into_decoder().map_err(decode_failed)?;
        let icc_profile = decoder.icc_profile().map_err(decode_failed)?;
        let img = DynamicImage::from_decoder(decoder).map_err(decode_failed)?;

        let decoded = Decoded {
            width: img.width(),
            height: img.height(),
            format: format_name(format),
        };
        debug!(
            path = %path.display(),
            width = decoded.width,
            height = decoded.height,
            format = %decoded.format,
            "decoded"
        );

        self.image = Some(img);
        self.source_format = Some(format);
        self.icc_profile = icc_profile;
        Ok(decoded)
    }

    fn write(&mut self, path: &Path) -> Result<(), CodecError> {
        let format = self
            .output_format
            .or_else(|| ImageFormat::from_path(path).ok())
            .or(self.source_format)
            .ok_or_else(|| {
                CodecError::Failed(format!("no output format for {}", path.display()))
            })?;
        let img = self
            .image
            .as_ref()
            .ok_or_else(|| CodecError::Failed("no image decoded".into()))?;
        let quality = self.quality.value().max(1) as u8;
        let encode_failed = |e: image::ImageError| {
            CodecError::Failed(format!("{} encode failed: {e}", format_name(format)))
        };

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        match format {
            ImageFormat::Jpeg => {
                let mut encoder = JpegEncoder::new_with_quality(writer, quality);
                embed_profile(&mut encoder, self.icc_profile.as_ref());
                DynamicImage::ImageRgb8(img.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(encode_failed)
            }
            ImageFormat::Png => {
                let mut encoder = PngEncoder::new(writer);
                embed_profile(&mut encoder, self.icc_profile.as_ref());
                img.write_with_encoder(encoder).map_err(encode_failed)
            }
            ImageFormat::Avif => {
                let encoder = AvifEncoder::new_with_speed_quality(writer, 6, quality);
                img.write_with_encoder(encoder).map_err(encode_failed)
            }
            other => img.write_to(&mut writer, other).map_err(encode_failed),
        }?;
        debug!(path = %path.display(), format = %format_name(format), "encoded");
        Ok(())
    }
}

fn embed_profile(encoder: &mut impl ImageEncoder, profile: Option<&Vec<u8>>) {
    let Some(profile) = profile else {
        return;
    };
    if encoder.set_icc_profile(profile.clone()).is_err() {
        debug!("encoder does not support ICC profiles; profile dropped");
    }
}

impl Codec for RustCodec {
    fn decode(&mut self, path: &Path) -> Result<Decoded, CodecError> {
        let result = self.read(path);
        self.record(result)
    }

    fn crop(&mut self, width: u32, height: u32, x: u32, y: u32) -> Result<(), CodecError> {
        let result = self.image_mut().and_then(|img| {
            let fits_x = x.checked_add(width).is_some_and(|right| right <= img.width());
            let fits_y = y.checked_add(height).is_some_and(|bottom| bottom <= img.height());
            if width == 0 || height == 0 || !fits_x || !fits_y {
                return Err(CodecError::Failed(format!(
                    "crop {width}x{height}+{x}+{y} outside {}x{} image",
                    img.width(),
                    img.height()
                )));
            }
            *img = img.crop_imm(x, y, width, height);
            Ok(())
        });
        self.record(result)
    }

    fn resample(&mut self, width: u32, height: u32) -> Result<(), CodecError> {
        let result = self.image_mut().and_then(|img| {
            if width == 0 || height == 0 {
                return Err(CodecError::Failed(format!(
                    "cannot resample to {width}x{height}"
                )));
            }
            *img = img.resize_exact(width, height, FilterType::Nearest);
            Ok(())
        });
        self.record(result)
    }

    fn set_quality(&mut self, quality: Quality) -> Result<(), CodecError> {
        self.quality = quality;
        Ok(())
    }

    fn set_format(&mut self, format: &str) -> Result<(), CodecError> {
        let result = match parse_format(format) {
            Some(parsed) if parsed.writing_enabled() => {
                self.output_format = Some(parsed);
                Ok(())
            }
            _ => Err(CodecError::Failed(format!(
                "unsupported output format: {format}"
            ))),
        };
        self.record(result)
    }

    fn strip_metadata(&mut self) -> Result<(), CodecError> {
        self.icc_profile = None;
        Ok(())
    }

    fn encode(&mut self, path: &Path) -> Result<(), CodecError> {
        let result = self.write(path);
        self.record(result)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

/// Factory for [`RustCodec`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCodecFactory;

impl CodecFactory for RustCodecFactory {
    fn create(&self) -> Box<dyn Codec> {
        Box::new(RustCodec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    /// Create a small PNG with a position-derived gradient.
    fn create_test_png(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn decode_reports_dimensions_and_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.png");
        create_test_png(&path, 200, 150);

        let mut codec = RustCodec::new();
        let decoded = codec.decode(&path).unwrap();
        assert_eq!(
            decoded,
            Decoded {
                width: 200,
                height: 150,
                format: "PNG".into()
            }
        );
    }

    #[test]
    fn decode_detects_format_from_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let png = tmp.path().join("real.png");
        create_test_png(&png, 20, 10);
        let disguised = tmp.path().join("image.dat");
        std::fs::copy(&png, &disguised).unwrap();

        let decoded = RustCodec::new().decode(&disguised).unwrap();
        assert_eq!(decoded.format, "PNG");
    }

    #[test]
    fn decode_nonexistent_file_records_diagnostic() {
        let mut codec = RustCodec::new();
        let result = codec.decode(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(CodecError::Io(_))));
        assert!(codec.last_error().unwrap().starts_with("IO error"));
    }

    #[test]
    fn crop_then_resample_then_encode() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 400, 200);
        let output = tmp.path().join("out.png");

        let mut codec = RustCodec::new();
        codec.decode(&source).unwrap();
        codec.crop(200, 200, 100, 0).unwrap();
        codec.resample(50, 50).unwrap();
        codec.strip_metadata().unwrap();
        codec.encode(&output).unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (50, 50));
    }

    #[test]
    fn crop_outside_bounds_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 100, 100);

        let mut codec = RustCodec::new();
        codec.decode(&source).unwrap();
        assert!(codec.crop(80, 80, 30, 0).is_err());
        assert!(codec.last_error().unwrap().contains("outside 100x100"));
    }

    #[test]
    fn steps_before_decode_fail() {
        let mut codec = RustCodec::new();
        assert!(codec.resample(10, 10).is_err());
        assert_eq!(codec.last_error().as_deref(), Some("no image decoded"));
    }

    #[test]
    fn explicit_format_overrides_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 40, 30);
        let output = tmp.path().join("out.png");

        let mut codec = RustCodec::new();
        codec.decode(&source).unwrap();
        codec.set_format("jpeg").unwrap();
        codec.encode(&output).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn falls_back_to_source_format_without_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 16, 16);
        let output = tmp.path().join("out");

        let mut codec = RustCodec::new();
        codec.decode(&source).unwrap();
        codec.encode(&output).unwrap();

        assert_eq!(
            image::ImageReader::open(&output)
                .unwrap()
                .with_guessed_format()
                .unwrap()
                .format(),
            Some(ImageFormat::Png)
        );
    }

    #[test]
    fn unsupported_format_rejected() {
        let mut codec = RustCodec::new();
        assert!(codec.set_format("gif").is_err());
        assert!(codec.set_format("nonsense").is_err());
        assert!(codec.last_error().unwrap().contains("unsupported output format"));
    }

    #[test]
    fn jpeg_output_drops_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("alpha.png");
        RgbaImage::from_pixel(32, 32, Rgba([10, 20, 30, 128]))
            .save(&source)
            .unwrap();
        let output = tmp.path().join("out.jpg");

        let mut codec = RustCodec::new();
        codec.decode(&source).unwrap();
        codec.set_quality(Quality::new(40)).unwrap();
        codec.encode(&output).unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (32, 32));
    }

    #[test]
    fn zero_quality_still_encodes_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 16, 16);

        let mut codec = RustCodec::new();
        codec.decode(&source).unwrap();
        codec.set_quality(Quality::new(0)).unwrap();
        codec.encode(&tmp.path().join("q0.jpg")).unwrap();
    }

    #[test]
    fn strip_metadata_clears_profile() {
        let mut codec = RustCodec {
            icc_profile: Some(vec![0u8; 8]),
            ..RustCodec::default()
        };
        assert!(codec.has_profile());
        codec.strip_metadata().unwrap();
        assert!(!codec.has_profile());
    }

    #[test]
    fn format_names_are_upper_case() {
        assert_eq!(format_name(ImageFormat::Jpeg), "JPEG");
        assert_eq!(format_name(ImageFormat::WebP), "WEBP");
    }
}
