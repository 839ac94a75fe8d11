use crate::error::MapError;
use macroquad::prelude::Vec2;
use serde::{Deserialize, Serialize};

/// How pixel quantities are converted before they reach the host.
///
/// In JSON this is either a bool (`true` = normalize by the smaller tile side)
/// or a number (explicit factor).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleUnits {
    Enabled(bool),
    Factor(f32),
}

impl Default for ScaleUnits {
    fn default() -> Self {
        ScaleUnits::Enabled(true)
    }
}

impl ScaleUnits {
    /// Turns the option into a concrete mode for a map with the given tile size.
    pub fn resolve(self, tile_w: u32, tile_h: u32) -> ScaleMode {
        match self {
            ScaleUnits::Enabled(false) => ScaleMode::Disabled,
            ScaleUnits::Enabled(true) => ScaleMode::Normalized(1.0 / tile_w.min(tile_h) as f32),
            ScaleUnits::Factor(f) => ScaleMode::Normalized(f),
        }
    }
}

/// Resolved scale applied to every pixel value passed outward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ScaleMode {
    #[default]
    Disabled,
    Normalized(f32),
}

impl ScaleMode {
    /// Multiplier from pixels to output units.
    #[inline]
    pub fn factor(self) -> f32 {
        match self {
            ScaleMode::Disabled => 1.0,
            ScaleMode::Normalized(f) => f,
        }
    }

    #[inline]
    pub fn apply(self, px: Vec2) -> Vec2 {
        px * self.factor()
    }
}

/// Load-time options.
///
/// ```
/// let opts = macroquad_tmx::MapOptions::from_json(r#"{ "scale_units": 0.5, "discard_structure": true }"#)?;
/// assert!(opts.discard_structure);
/// # Ok::<(), macroquad_tmx::MapError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapOptions {
    /// Divide pixel quantities by the tile size (or multiply by an explicit factor).
    pub scale_units: ScaleUnits,
    /// Drop tile sets, layers and object groups once the tile cache is built.
    pub discard_structure: bool,
    /// Drop only the layers.
    pub discard_layer_info: bool,
    /// Drop only the tile sets.
    pub discard_tile_info: bool,
    /// Drop only the object groups.
    pub discard_object_info: bool,
}

impl MapOptions {
    /// Parses options from JSON and validates them.
    pub fn from_json(text: &str) -> Result<Self, MapError> {
        let opts: MapOptions = serde_json::from_str(text)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Everything off: pixel units, nothing discarded.
    pub fn unscaled() -> Self {
        MapOptions {
            scale_units: ScaleUnits::Enabled(false),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), MapError> {
        if let ScaleUnits::Factor(f) = self.scale_units {
            if !f.is_finite() || f <= 0.0 {
                return Err(MapError::Options(format!(
                    "scale_units factor must be a positive finite number, got {f}"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn discards_layers(&self) -> bool {
        self.discard_structure || self.discard_layer_info
    }

    pub(crate) fn discards_tile_sets(&self) -> bool {
        self.discard_structure || self.discard_tile_info
    }

    pub(crate) fn discards_objects(&self) -> bool {
        self.discard_structure || self.discard_object_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scale_by_smaller_tile_side() {
        let opts = MapOptions::default();
        assert_eq!(opts.scale_units.resolve(32, 16), ScaleMode::Normalized(1.0 / 16.0));
        assert!(!opts.discard_structure);
    }

    #[test]
    fn parses_bool_and_numeric_scale() {
        let off = MapOptions::from_json(r#"{"scale_units": false}"#).unwrap();
        assert_eq!(off.scale_units.resolve(32, 32), ScaleMode::Disabled);

        let explicit = MapOptions::from_json(r#"{"scale_units": 0.25, "discard_tile_info": true}"#).unwrap();
        assert_eq!(explicit.scale_units, ScaleUnits::Factor(0.25));
        assert!(explicit.discards_tile_sets());
        assert!(!explicit.discards_layers());
    }

    #[test]
    fn rejects_bad_options() {
        assert!(matches!(
            MapOptions::from_json(r#"{"scale_units": -1}"#),
            Err(MapError::Options(_))
        ));
        assert!(matches!(
            MapOptions::from_json(r#"{"discard_everything": true}"#),
            Err(MapError::Options(_))
        ));
    }
}
