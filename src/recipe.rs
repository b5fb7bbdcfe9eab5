//! A bundle of planner directives, applied to an image in a fixed order.
//!
//! Recipes come from CLI flags or from serialized form:
//!
//! ```
//! # use simple_wand::Recipe;
//! let json = r#"{"aspect": 1.0, "align": "left", "scale": 50}"#;
//! let recipe: Recipe = serde_json::from_str(json).unwrap();
//! assert_eq!(recipe.scale, Some(50.0));
//! ```

use crate::error::Result;
use crate::imaging::params::Align;
use crate::session::Image;
use serde::{Deserialize, Serialize};

/// Optional crop, resize, quality, and format directives.
///
/// [`apply`](Recipe::apply) runs crop first, then scale, resize, width,
/// height, and finally quality and format, so every resize sees the crop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Recipe {
    /// Target aspect ratio (width / height) for the crop.
    pub aspect: Option<f64>,
    /// Crop alignment on the trimmed axis. Center when absent.
    pub align: Option<Align>,
    /// Percentage of the cropped (or natural) size.
    pub scale: Option<f64>,
    /// Exact `[width, height]`.
    pub resize: Option<[u32; 2]>,
    /// Target width, height follows the aspect.
    pub width: Option<u32>,
    /// Target height, width follows the aspect.
    pub height: Option<u32>,
    pub quality: Option<u32>,
    pub format: Option<String>,
}

impl Recipe {
    /// Plan every present directive on `image`. Stops at the first rejected one.
    pub fn apply(&self, image: &Image) -> Result<()> {
        if let Some(aspect) = self.aspect {
            image.crop(aspect, self.align.unwrap_or(Align::Center))?;
        }
        if let Some(percent) = self.scale {
            image.scale(percent)?;
        }
        if let Some([width, height]) = self.resize {
            image.resize(width, height)?;
        }
        if let Some(width) = self.width {
            image.resize_by_width(width)?;
        }
        if let Some(height) = self.height {
            image.resize_by_height(height)?;
        }
        if let Some(quality) = self.quality {
            image.set_quality(quality);
        }
        if let Some(format) = &self.format {
            image.set_format(format);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WandError;
    use crate::imaging::codec::tests::MockCodecFactory;

    fn loaded(width: u32, height: u32) -> Image {
        let image = Image::with_codec(MockCodecFactory::with_image(width, height, "JPEG"));
        image.load("/in.jpg").unwrap();
        image
    }

    #[test]
    fn empty_recipe_changes_nothing() {
        let image = loaded(800, 600);
        let before = image.state();
        Recipe::default().apply(&image).unwrap();
        assert_eq!(image.state(), before);
    }

    #[test]
    fn crop_then_scale() {
        let image = loaded(1000, 500);
        let recipe = Recipe {
            aspect: Some(1.0),
            scale: Some(50.0),
            ..Recipe::default()
        };
        recipe.apply(&image).unwrap();

        let crop = image.state().crop().unwrap();
        assert_eq!(crop.offset_x, 250);
        assert_eq!((image.width(), image.height()), (250, 250));
    }

    #[test]
    fn width_uses_crop_aspect() {
        let image = loaded(1000, 500);
        let recipe = Recipe {
            aspect: Some(1.0),
            align: Some(Align::End),
            width: Some(120),
            ..Recipe::default()
        };
        recipe.apply(&image).unwrap();

        assert_eq!(image.state().crop().unwrap().offset_x, 500);
        assert_eq!((image.width(), image.height()), (120, 120));
    }

    #[test]
    fn quality_and_format() {
        let image = loaded(10, 10);
        let recipe = Recipe {
            quality: Some(250),
            format: Some("png".into()),
            ..Recipe::default()
        };
        recipe.apply(&image).unwrap();

        assert_eq!(image.quality(), 100);
        assert_eq!(image.target_format().as_deref(), Some("png"));
    }

    #[test]
    fn rejected_directive_stops_apply() {
        let image = loaded(1000, 500);
        let recipe = Recipe {
            scale: Some(-5.0),
            quality: Some(10),
            ..Recipe::default()
        };
        assert!(matches!(
            recipe.apply(&image),
            Err(WandError::InvalidArgument(_))
        ));
        // Later directives were not applied
        assert_eq!(image.quality(), 100);
    }

    #[test]
    fn deserializes_from_toml() {
        let recipe: Recipe = toml::from_str(
            r#"
aspect = 1.5
align = "bottom"
resize = [300, 200]
format = "webp"
"#,
        )
        .unwrap();
        assert_eq!(recipe.aspect, Some(1.5));
        assert_eq!(recipe.align, Some(Align::End));
        assert_eq!(recipe.resize, Some([300, 200]));
        assert_eq!(recipe.format.as_deref(), Some("webp"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Recipe>(r#"{"sacle": 50}"#).is_err());
    }
}
