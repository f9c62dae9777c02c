//! Configuration constants and settings for a viewport.

use serde::{Deserialize, Serialize};

use crate::model::{LineStyle, Rgb, Rgba};

/// Default wireframe color (red).
pub const DEFAULT_FOREGROUND: Rgba = Rgba::new(0.9, 0.1, 0.1, 1.0);

/// Default clear color (dark navy).
pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(0.0, 0.0, 0.125);

/// Default line width in backend units.
pub const DEFAULT_LINE_WIDTH: u32 = 1;

/// Stipple repeat factor for dashed lines.
pub const DASH_STIPPLE_FACTOR: u16 = 1;

/// Stipple bit pattern for dashed lines.
pub const DASH_STIPPLE_PATTERN: u16 = 0xCF33;

/// Ambient share of the foreground color for lit surfaces.
pub const AMBIENT_FACTOR: f32 = 0.2;

/// Diffuse share of the foreground color for lit surfaces.
pub const DIFFUSE_FACTOR: f32 = 0.6;

/// Specular share of the foreground color for lit surfaces.
pub const SPECULAR_FACTOR: f32 = 0.2;

/// Back-face diffuse share of the foreground color.
pub const BACK_DIFFUSE_FACTOR: f32 = 0.3;

/// Initial render attributes of a viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub foreground: Rgba,
    pub background: Rgb,
    pub line_width: u32,
    pub line_style: LineStyle,
    pub lighting: bool,
    pub transparency: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
            line_width: DEFAULT_LINE_WIDTH,
            line_style: LineStyle::Solid,
            lighting: true,
            transparency: false,
        }
    }
}

impl ViewportConfig {
    /// Wireframe-only configuration: no lighting, no blending.
    pub fn wireframe() -> Self {
        Self {
            lighting: false,
            ..Default::default()
        }
    }

    /// Stipple parameters for a line style, `None` for solid lines.
    pub fn stipple(style: LineStyle) -> Option<(u16, u16)> {
        match style {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some((DASH_STIPPLE_FACTOR, DASH_STIPPLE_PATTERN)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ViewportConfig = serde_json::from_str(r#"{"line_width": 3}"#).unwrap();
        assert_eq!(config.line_width, 3);
        assert_eq!(config.foreground, DEFAULT_FOREGROUND);
        assert!(config.lighting);
    }

    #[test]
    fn test_stipple_only_for_dashed() {
        assert_eq!(ViewportConfig::stipple(LineStyle::Solid), None);
        assert_eq!(ViewportConfig::stipple(LineStyle::Dashed), Some((1, 0xCF33)));
    }

    #[test]
    fn test_wireframe_disables_lighting() {
        assert!(!ViewportConfig::wireframe().lighting);
    }
}
