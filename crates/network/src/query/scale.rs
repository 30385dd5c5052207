//! Scale transforms from raw magnitudes to render sizes.
//!
//! A global scale step `s` (odd, 1 to 9, default 5) maps to a multiplier of
//! `exp((s - 5) / 2)`. Each layer has its own multiplier on top. All sizes
//! are whole pixels and never smaller than 1.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::types::Metadata;

pub const DEFAULT_SCALE_STEP: u8 = 5;

/// Render scale settings. Deserializing always yields normalized values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ScaleOptions")]
pub struct DisplayScale {
    #[serde(rename = "s")]
    pub step: u8,
    pub link_scale: f64,
    pub node_scale: f64,
    pub place_scale: f64,
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self {
            step: DEFAULT_SCALE_STEP,
            link_scale: 1.0,
            node_scale: 1.0,
            place_scale: 1.0,
        }
    }
}

/// Scale keys as written, before normalization
#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScaleOptions {
    #[serde(rename = "s")]
    step: u8,
    link_scale: f64,
    node_scale: f64,
    place_scale: f64,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        let defaults = DisplayScale::default();
        Self {
            step: defaults.step,
            link_scale: defaults.link_scale,
            node_scale: defaults.node_scale,
            place_scale: defaults.place_scale,
        }
    }
}

impl From<ScaleOptions> for DisplayScale {
    fn from(options: ScaleOptions) -> Self {
        DisplayScale {
            step: options.step,
            link_scale: options.link_scale,
            node_scale: options.node_scale,
            place_scale: options.place_scale,
        }
        .normalized()
    }
}

impl DisplayScale {
    /// Read the scale keys of a dataset `option` block, ignoring anything
    /// missing or unreadable
    pub fn from_options(options: &Metadata) -> Self {
        let number = |key: &str| options.get(key).and_then(Value::as_f64);
        let defaults = Self::default();

        Self {
            step: number("s")
                .filter(|s| s.is_finite())
                .map(|s| s.round().clamp(0.0, 255.0) as u8)
                .unwrap_or(defaults.step),
            link_scale: number("linkScale").unwrap_or(defaults.link_scale),
            node_scale: number("nodeScale").unwrap_or(defaults.node_scale),
            place_scale: number("placeScale").unwrap_or(defaults.place_scale),
        }
        .normalized()
    }

    /// Clamp the step to an odd value in 1..=9 (even steps round up) and
    /// replace unusable layer multipliers with 1
    pub fn normalized(self) -> Self {
        let step = self.step.clamp(1, 9) | 1;
        let usable = |m: f64| if m.is_finite() && m > 0.0 { m } else { 1.0 };

        Self {
            step,
            link_scale: usable(self.link_scale),
            node_scale: usable(self.node_scale),
            place_scale: usable(self.place_scale),
        }
    }

    pub fn multiplier(&self) -> f64 {
        ((f64::from(self.step) - 5.0) / 2.0).exp()
    }

    /// Stroke weight for a route line
    pub fn line_weight(&self, volume: f64) -> u32 {
        let k = self.link_scale * 4.0 * self.multiplier();
        pixels((1.0 + non_negative(volume) / k).ln() * k)
    }

    /// Circle radius for a stop
    pub fn node_radius(&self, volume: f64) -> u32 {
        let k = self.node_scale * 2.0 * self.multiplier();
        pixels((1.0 + non_negative(volume) / (k * 2.0)).ln() * k)
    }

    /// Circle radius for a place
    pub fn place_radius(&self, population: f64) -> u32 {
        pixels((non_negative(population) * self.place_scale * self.multiplier() / 666.0).sqrt())
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn pixels(size: f64) -> u32 {
    // NaN.max(1.0) is 1.0, and the cast saturates
    size.ceil().max(1.0) as u32
}
