//! Runtime-tunable options, loadable from a TOML preset file.

use std::fmt;
use std::path::Path;

use glam::Vec4;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PyreError;
use crate::geometry::MAX_LEVEL;

/// An sRGB color, serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Parse a `#rrggbb` hex string.
    ///
    /// # Errors
    ///
    /// Returns [`PyreError::OptionsParse`] on anything that is not exactly
    /// `#` plus six hex digits.
    pub fn from_hex(s: &str) -> Result<Self, PyreError> {
        let digits = s.strip_prefix('#').ok_or_else(|| {
            PyreError::OptionsParse(format!("color '{s}' must start with '#'"))
        })?;
        if digits.len() != 6 {
            return Err(PyreError::OptionsParse(format!(
                "color '{s}' must be '#' plus six hex digits"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|e| {
                PyreError::OptionsParse(format!("color '{s}': {e}"))
            })
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Format as a `#rrggbb` hex string.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Normalized RGBA with full alpha, the form shaders consume.
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            1.0,
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

/// The user-tunable controls. Every field has a default, so a preset file
/// only needs to name the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Icosphere subdivision level, clamped to
    /// [`MAX_LEVEL`](crate::geometry::MAX_LEVEL) on load.
    pub tessellation: u32,
    /// Base fireball color.
    pub base_color: Color,
    /// Gradient end color, blended in by displacement when
    /// [`Options::use_gradient`] is set.
    pub gradient_color: Color,
    /// Override colors with a cycling cosine palette.
    pub use_rainbow: bool,
    /// Blend toward [`Options::gradient_color`] by displacement.
    pub use_gradient: bool,
    /// Spatial frequency of the displacement noise.
    pub noise_frequency: f32,
    /// Also draw the reference cube and quad.
    pub show_reference: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tessellation: 5,
            base_color: Color { r: 0xff, g: 0x00, b: 0x00 },
            gradient_color: Color { r: 0xff, g: 0xf0, b: 0x00 },
            use_rainbow: false,
            use_gradient: true,
            noise_frequency: 2.25,
            show_reference: false,
        }
    }
}

impl Options {
    /// Load options from a TOML preset file. Missing fields take their
    /// defaults; the tessellation level is clamped.
    ///
    /// # Errors
    ///
    /// Returns [`PyreError::Io`] if the file cannot be read or
    /// [`PyreError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, PyreError> {
        let text = std::fs::read_to_string(path)?;
        let mut options: Self = toml::from_str(&text)
            .map_err(|e| PyreError::OptionsParse(e.to_string()))?;
        options.tessellation = options.tessellation.min(MAX_LEVEL);
        Ok(options)
    }

    /// Write options to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PyreError::OptionsParse`] if serialization fails or
    /// [`PyreError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), PyreError> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| PyreError::OptionsParse(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// The reset control: hand back a fresh set of defaults, discarding
    /// every accumulated change.
    #[must_use]
    pub fn reset(self) -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_and_format() {
        let c = Color::from_hex("#ff8001").unwrap();
        assert_eq!((c.r, c.g, c.b), (0xff, 0x80, 0x01));
        assert_eq!(c.to_hex(), "#ff8001");
    }

    #[test]
    fn bad_hex_colors_are_rejected() {
        assert!(Color::from_hex("ff0000").is_err());
        assert!(Color::from_hex("#ff00").is_err());
        assert!(Color::from_hex("#ff00zz").is_err());
        assert!(Color::from_hex("#ff000000").is_err());
    }

    #[test]
    fn color_to_vec4_normalizes_with_full_alpha() {
        let v = Color { r: 255, g: 0, b: 51 }.to_vec4();
        assert!((v.x - 1.0).abs() < 1e-6);
        assert!(v.y.abs() < 1e-6);
        assert!((v.z - 0.2).abs() < 1e-6);
        assert!((v.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn options_round_trip_through_toml() {
        let options = Options {
            tessellation: 3,
            base_color: Color { r: 1, g: 2, b: 3 },
            use_rainbow: true,
            ..Options::default()
        };
        let text = toml::to_string_pretty(&options).unwrap();
        let back: Options = toml::from_str(&text).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let options: Options =
            toml::from_str("tessellation = 2\nuse_rainbow = true").unwrap();
        assert_eq!(options.tessellation, 2);
        assert!(options.use_rainbow);
        assert_eq!(options.base_color, Options::default().base_color);
        assert!((options.noise_frequency - 2.25).abs() < f32::EPSILON);
    }

    #[test]
    fn save_then_load_round_trips_through_a_file() {
        let path = std::env::temp_dir()
            .join(format!("pyre-options-{}.toml", std::process::id()));
        let options = Options {
            tessellation: 4,
            gradient_color: Color { r: 0x10, g: 0x20, b: 0x30 },
            show_reference: true,
            ..Options::default()
        };
        options.save(&path).unwrap();
        let back = Options::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, options);
    }

    #[test]
    fn load_clamps_the_tessellation_level() {
        let path = std::env::temp_dir()
            .join(format!("pyre-options-clamp-{}.toml", std::process::id()));
        std::fs::write(&path, "tessellation = 99").unwrap();
        let options = Options::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(options.tessellation, MAX_LEVEL);
    }

    #[test]
    fn reset_restores_defaults() {
        let options = Options {
            tessellation: 8,
            use_rainbow: true,
            noise_frequency: 9.0,
            ..Options::default()
        };
        assert_eq!(options.reset(), Options::default());
    }
}
