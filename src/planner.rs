//! Geometry planner: turns crop/scale/resize requests into pending directives.
//!
//! Every operation is synchronous, validates its arguments before looking at
//! the session, and never calls the codec. Crop is always computed against
//! the natural size; resize operations read the crop live, so a crop planned
//! after a resize does not rescale it.
//!
//! | Operation | Base | Sets `resize` when |
//! |---|---|---|
//! | [`plan_scale`] | crop, else natural | always |
//! | [`plan_resize`] | crop, else natural | `(w, h)` differs from base |
//! | [`plan_resize_by_width`] | crop, else natural | width differs from base |
//! | [`plan_resize_by_height`] | crop, else natural | height differs from base |

use crate::error::{Result, WandError};
use crate::imaging::calculations::{
    calculate_crop, calculate_scaled, height_for_width, width_for_height,
};
use crate::imaging::params::Align;
use crate::session::{Dimensions, Extent, SessionState};

/// The extent resize directives are computed against.
fn resize_base(state: &SessionState) -> Result<Extent> {
    match (state.crop, state.natural) {
        (_, None) => Err(WandError::NotLoaded),
        (Some(crop), Some(_)) => Ok(Extent {
            width: crop.width,
            height: crop.height,
            aspect: crop.aspect,
        }),
        (None, Some(natural)) => Ok(natural),
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Plan a crop of the natural image to `target_aspect`.
///
/// Returns `true` when a crop is now active. A target equal to the natural
/// aspect clears any previous crop and returns `false`.
pub fn plan_crop(state: &mut SessionState, target_aspect: f64, align: Align) -> Result<bool> {
    if !positive(target_aspect) {
        return Err(WandError::usage(format!(
            "crop(aspect: number > 0, align): got aspect {target_aspect}"
        )));
    }
    let natural = state.natural.ok_or(WandError::NotLoaded)?;

    state.crop = calculate_crop((natural.width, natural.height), target_aspect, align);
    Ok(state.crop.is_some())
}

/// Plan a resample to `percent` of the base size.
pub fn plan_scale(state: &mut SessionState, percent: f64) -> Result<()> {
    if !positive(percent) {
        return Err(WandError::usage(format!(
            "scale(percent: number > 0): got {percent}"
        )));
    }
    let base = resize_base(state)?;

    let (width, height) = calculate_scaled((base.width, base.height), percent);
    state.resize = Some(Dimensions { width, height });
    Ok(())
}

/// Plan a resample to exactly `width`x`height`.
pub fn plan_resize(state: &mut SessionState, width: u32, height: u32) -> Result<()> {
    if width < 1 || height < 1 {
        return Err(WandError::usage(format!(
            "resize(width: number > 0, height: number > 0): got {width}x{height}"
        )));
    }
    let base = resize_base(state)?;

    if (width, height) != (base.width, base.height) {
        state.resize = Some(Dimensions { width, height });
    }
    Ok(())
}

/// Plan a resample to `width`, keeping the base aspect.
pub fn plan_resize_by_width(state: &mut SessionState, width: u32) -> Result<()> {
    if width < 1 {
        return Err(WandError::usage(format!(
            "resizeByWidth(width: number > 0): got {width}"
        )));
    }
    let base = resize_base(state)?;

    if width != base.width {
        state.resize = Some(Dimensions {
            width,
            height: height_for_width(width, base.aspect),
        });
    }
    Ok(())
}

/// Plan a resample to `height`, keeping the base aspect.
pub fn plan_resize_by_height(state: &mut SessionState, height: u32) -> Result<()> {
    if height < 1 {
        return Err(WandError::usage(format!(
            "resizeByHeight(height: number > 0): got {height}"
        )));
    }
    let base = resize_base(state)?;

    if height != base.height {
        state.resize = Some(Dimensions {
            width: width_for_height(height, base.aspect),
            height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::codec::Decoded;
    use std::path::Path;

    fn loaded(width: u32, height: u32) -> SessionState {
        let mut state = SessionState::default();
        state.attach(
            Path::new("/src.jpg"),
            Decoded {
                width,
                height,
                format: "JPEG".into(),
            },
        );
        state
    }

    fn dims(width: u32, height: u32) -> Option<Dimensions> {
        Some(Dimensions { width, height })
    }

    // =========================================================================
    // plan_crop
    // =========================================================================

    #[test]
    fn crop_then_scale_scenario() {
        let mut state = loaded(1000, 500);

        assert!(plan_crop(&mut state, 1.0, Align::Center).unwrap());
        let crop = state.crop().unwrap();
        assert_eq!((crop.width, crop.height), (500, 500));
        assert_eq!((crop.offset_x, crop.offset_y), (250, 0));

        plan_scale(&mut state, 50.0).unwrap();
        assert_eq!(state.resize(), dims(250, 250));
    }

    #[test]
    fn crop_matching_aspect_clears_previous_crop() {
        let mut state = loaded(1000, 500);
        plan_crop(&mut state, 1.0, Align::Center).unwrap();

        assert!(!plan_crop(&mut state, 2.0, Align::Center).unwrap());
        assert_eq!(state.crop(), None);
    }

    #[test]
    fn crop_rejects_non_positive_aspect() {
        let mut state = loaded(1000, 500);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                plan_crop(&mut state, bad, Align::Center),
                Err(WandError::InvalidArgument(_))
            ));
        }
        assert_eq!(state.crop(), None);
    }

    #[test]
    fn crop_uses_natural_not_previous_crop() {
        let mut state = loaded(1000, 500);
        plan_crop(&mut state, 1.0, Align::Center).unwrap();
        plan_crop(&mut state, 1.5, Align::LEFT).unwrap();

        let crop = state.crop().unwrap();
        assert_eq!((crop.width, crop.height), (750, 500));
        assert_eq!(crop.offset_x, 0);
    }

    #[test]
    fn crop_requires_loaded_image() {
        let mut state = SessionState::default();
        assert!(matches!(
            plan_crop(&mut state, 1.0, Align::Center),
            Err(WandError::NotLoaded)
        ));
    }

    // =========================================================================
    // plan_scale
    // =========================================================================

    #[test]
    fn scale_100_without_crop_is_natural() {
        let mut state = loaded(1234, 567);
        plan_scale(&mut state, 100.0).unwrap();
        assert_eq!(state.resize(), dims(1234, 567));
    }

    #[test]
    fn scale_rejects_non_positive() {
        let mut state = loaded(100, 100);
        assert!(plan_scale(&mut state, 0.0).is_err());
        assert!(plan_scale(&mut state, -10.0).is_err());
        assert_eq!(state.resize(), None);
    }

    // =========================================================================
    // plan_resize
    // =========================================================================

    #[test]
    fn resize_sets_explicit_dimensions() {
        let mut state = loaded(800, 600);
        plan_resize(&mut state, 400, 100).unwrap();
        assert_eq!(state.resize(), dims(400, 100));
    }

    #[test]
    fn resize_to_base_keeps_prior_resize() {
        let mut state = loaded(800, 600);
        plan_resize(&mut state, 400, 300).unwrap();
        plan_resize(&mut state, 800, 600).unwrap();
        assert_eq!(state.resize(), dims(400, 300));
    }

    #[test]
    fn resize_to_base_without_prior_is_inactive() {
        let mut state = loaded(800, 600);
        plan_resize(&mut state, 800, 600).unwrap();
        assert_eq!(state.resize(), None);
    }

    #[test]
    fn resize_compares_against_crop() {
        let mut state = loaded(1000, 500);
        plan_crop(&mut state, 1.0, Align::Center).unwrap();
        // Equal to the crop → no-op
        plan_resize(&mut state, 500, 500).unwrap();
        assert_eq!(state.resize(), None);
        // Equal to natural but not crop → applies
        plan_resize(&mut state, 1000, 500).unwrap();
        assert_eq!(state.resize(), dims(1000, 500));
    }

    #[test]
    fn resize_zero_is_invalid_before_load_check() {
        let mut state = SessionState::default();
        assert!(matches!(
            plan_resize(&mut state, 0, 10),
            Err(WandError::InvalidArgument(_))
        ));
    }

    // =========================================================================
    // plan_resize_by_width / plan_resize_by_height
    // =========================================================================

    #[test]
    fn resize_by_width_keeps_natural_aspect() {
        let mut state = loaded(1000, 500);
        plan_resize_by_width(&mut state, 300).unwrap();
        assert_eq!(state.resize(), dims(300, 150));
    }

    #[test]
    fn resize_by_width_uses_crop_aspect() {
        let mut state = loaded(1000, 500);
        plan_crop(&mut state, 1.0, Align::Center).unwrap();
        plan_resize_by_width(&mut state, 300).unwrap();
        assert_eq!(state.resize(), dims(300, 300));
    }

    #[test]
    fn resize_by_width_equal_to_base_is_noop() {
        let mut state = loaded(1000, 500);
        plan_resize_by_width(&mut state, 1000).unwrap();
        assert_eq!(state.resize(), None);
    }

    #[test]
    fn resize_by_height_keeps_aspect() {
        let mut state = loaded(1000, 500);
        plan_resize_by_height(&mut state, 100).unwrap();
        assert_eq!(state.resize(), dims(200, 100));
    }

    #[test]
    fn resize_by_height_equal_to_base_is_noop() {
        let mut state = loaded(1000, 500);
        plan_resize_by_height(&mut state, 500).unwrap();
        assert_eq!(state.resize(), None);
    }

    #[test]
    fn resize_by_zero_is_invalid() {
        let mut state = loaded(1000, 500);
        assert!(plan_resize_by_width(&mut state, 0).is_err());
        assert!(plan_resize_by_height(&mut state, 0).is_err());
    }

    #[test]
    fn resize_reads_live_crop() {
        let mut state = loaded(1000, 500);
        plan_scale(&mut state, 50.0).unwrap();
        assert_eq!(state.resize(), dims(500, 250));

        // Crop after resize does not rescale, the next resize does see it
        plan_crop(&mut state, 1.0, Align::Center).unwrap();
        assert_eq!(state.resize(), dims(500, 250));
        plan_scale(&mut state, 50.0).unwrap();
        assert_eq!(state.resize(), dims(250, 250));
    }
}
