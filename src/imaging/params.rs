//! Parameter types for image directives.
//!
//! ## Types
//!
//! - [`Quality`]: compression quality (0–100, default 100). Clamped on construction.
//! - [`Align`]: where a crop window sits on the axis being trimmed.

use crate::error::WandError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compression quality for encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub const MAX: u32 = 100;

    pub fn new(value: u32) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Crop alignment along the axis that gets trimmed.
///
/// A landscape source cropped to a narrower aspect is trimmed horizontally,
/// so `Start`/`Center`/`End` read as left/center/right. A portrait source
/// is trimmed vertically and the same values read as top/middle/bottom.
/// The numeric codes (0–3) are stable and accepted by [`Align::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    None = 0,
    #[serde(alias = "left", alias = "top")]
    Start = 1,
    #[serde(alias = "middle")]
    Center = 2,
    #[serde(alias = "right", alias = "bottom")]
    End = 3,
}

impl Align {
    pub const LEFT: Align = Align::Start;
    pub const RIGHT: Align = Align::End;
    pub const TOP: Align = Align::Start;
    pub const MIDDLE: Align = Align::Center;
    pub const BOTTOM: Align = Align::End;

    pub fn from_code(code: u32) -> Result<Self, WandError> {
        match code {
            0 => Ok(Align::None),
            1 => Ok(Align::Start),
            2 => Ok(Align::Center),
            3 => Ok(Align::End),
            other => Err(WandError::usage(format!(
                "crop(aspect > 0, align: 0..=3): unknown align code {other}"
            ))),
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

impl FromStr for Align {
    type Err = WandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Align::None),
            "left" | "top" | "start" => Ok(Align::Start),
            "center" | "middle" => Ok(Align::Center),
            "right" | "bottom" | "end" => Ok(Align::End),
            other => match other.parse::<u32>() {
                Ok(code) => Align::from_code(code),
                Err(_) => Err(WandError::usage(format!(
                    "align: expected left|center|right|top|middle|bottom|none, got {s:?}"
                ))),
            },
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Align::None => "none",
            Align::Start => "start",
            Align::Center => "center",
            Align::End => "end",
        };
        f.write_str(name)
    }
}
