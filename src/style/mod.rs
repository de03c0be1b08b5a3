//! Editor options and colors
//!
//! One explicit options value is handed to the scene and the controller at
//! construction. It loads from partial JSON: missing fields take defaults.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EditorError, EditorResult};
use crate::geometry::LinkParams;

#[cfg(test)]
mod tests;

/// RGBA color, serialised as `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#')?;
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Color {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Color::from_hex(&text).ok_or_else(|| serde::de::Error::custom(format!("invalid color '{}'", text)))
    }
}

/// Visual configuration of the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    pub state_radius: f64,
    pub self_link_height: f64,
    pub curvature: f64,
    pub state_fill: Color,
    pub state_stroke: Color,
    pub initial_state_stroke: Color,
    pub current_state_fill: Color,
    pub text_color: Color,
    pub background_color: Color,
    pub selectable_states: bool,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            state_radius: 30.0,
            self_link_height: 100.0,
            curvature: 30.0,
            state_fill: Color::rgb(0x18, 0x00, 0x19),
            state_stroke: Color::rgb(0xc5, 0xcb, 0xd3),
            initial_state_stroke: Color::ORANGE,
            current_state_fill: Color::rgb(0x40, 0x00, 0x42),
            text_color: Color::WHITE,
            background_color: Color::rgb(0x33, 0x00, 0x31),
            selectable_states: true,
            min_zoom: 0.01,
            max_zoom: 20.0,
        }
    }
}

impl EditorOptions {
    pub fn link_params(&self) -> LinkParams {
        LinkParams {
            radius: self.state_radius,
            curvature: self.curvature,
            loop_height: self.self_link_height,
        }
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.max(self.min_zoom).min(self.max_zoom)
    }

    /// Check sizes and zoom bounds; the viewport divides by the zoom
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let positive = [
            ("stateRadius", self.state_radius),
            ("selfLinkHeight", self.self_link_height),
            ("minZoom", self.min_zoom),
            ("maxZoom", self.max_zoom),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{} must be a positive number, got {}", field, value));
            }
        }
        if !self.curvature.is_finite() {
            errors.push(format!("curvature must be finite, got {}", self.curvature));
        }
        if self.min_zoom > self.max_zoom {
            errors.push(format!(
                "minZoom {} is greater than maxZoom {}",
                self.min_zoom, self.max_zoom
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Parse partial JSON options and validate the result
    pub fn from_json(source: &str) -> EditorResult<Self> {
        let options: Self = serde_json::from_str(source)?;
        options.validate().map_err(EditorError::Validation)?;
        Ok(options)
    }

    pub fn load(path: &Path) -> EditorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Deterministic color for a transition label
///
/// BKDR string hash spread over hue, with saturation and lightness picked
/// from three steps each, so equal event names always share a color.
pub fn color_for_label(label: &str) -> Color {
    const STEPS: [f64; 3] = [0.35, 0.5, 0.65];
    let mut hash: u64 = 0;
    for c in label.chars() {
        hash = hash.wrapping_mul(131).wrapping_add(c as u64) % 9_007_199_254_740_991;
    }
    let hue = (hash % 359) as f64 / 360.0;
    let rest = hash / 360;
    let saturation = STEPS[(rest % 3) as usize];
    let lightness = STEPS[((rest / 3) % 3) as usize];
    hsl_to_color(hue, saturation, lightness)
}

fn hsl_to_color(h: f64, s: f64, l: f64) -> Color {
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |offset: f64| {
        let mut t = h + offset;
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Color::rgb(channel(1.0 / 3.0), channel(0.0), channel(-1.0 / 3.0))
}
