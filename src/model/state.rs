//! Render state tracked by a viewport.

use serde::{Deserialize, Serialize};

use super::color::{Rgb, Rgba};
use crate::config::{
    ViewportConfig, AMBIENT_FACTOR, BACK_DIFFUSE_FACTOR, DIFFUSE_FACTOR, SPECULAR_FACTOR,
};

/// Line rasterization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

/// Snapshot of the attributes applied to subsequent draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Wire/surface color; alpha is the transparency factor.
    pub foreground: Rgba,
    /// Clear color used at the start of a frame.
    pub background: Rgb,
    /// Line width in backend-native units, always positive.
    pub line_width: u32,
    pub line_style: LineStyle,
    pub lighting: bool,
    pub transparency: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self::from_config(&ViewportConfig::default())
    }
}

impl RenderState {
    /// Seed a render state from viewport configuration.
    pub fn from_config(config: &ViewportConfig) -> Self {
        Self {
            foreground: config.foreground,
            background: config.background,
            line_width: config.line_width.max(1),
            line_style: config.line_style,
            lighting: config.lighting,
            transparency: config.transparency,
        }
    }

    /// Material for the given primitive class under this state.
    pub fn material(&self, class: MaterialClass) -> Material {
        match class {
            MaterialClass::Wire => Material::wire(self.foreground),
            MaterialClass::Surface => Material::surface(self.foreground),
        }
    }

    /// Whether blending must be enabled for draws under this state.
    pub fn blending(&self) -> bool {
        self.lighting && self.transparency
    }
}

/// Which lighting material a primitive needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialClass {
    /// Lines and points: flat foreground color.
    Wire,
    /// Triangles and polygons: lit foreground color.
    Surface,
}

/// Front/back material coefficients passed to the graphics context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: Rgba,
    pub diffuse: Rgba,
    pub specular: Rgba,
    pub back_diffuse: Rgba,
}

impl Material {
    /// Lines ignore lighting: the color lives entirely in the ambient term.
    pub fn wire(color: Rgba) -> Self {
        let black = Rgba::new(0.0, 0.0, 0.0, color.a);
        Self {
            ambient: color,
            diffuse: black,
            specular: black,
            back_diffuse: black,
        }
    }

    /// Lit surfaces. Back faces get a darker diffuse so inside-out
    /// geometry stays distinguishable.
    pub fn surface(color: Rgba) -> Self {
        Self {
            ambient: color.scaled(AMBIENT_FACTOR),
            diffuse: color.scaled(DIFFUSE_FACTOR),
            specular: color.scaled(SPECULAR_FACTOR),
            back_diffuse: color.scaled(BACK_DIFFUSE_FACTOR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_matches_config() {
        let state = RenderState::default();
        assert_eq!(state.foreground, Rgba::new(0.9, 0.1, 0.1, 1.0));
        assert_eq!(state.background, Rgb::new(0.0, 0.0, 0.125));
        assert_eq!(state.line_width, 1);
        assert_eq!(state.line_style, LineStyle::Solid);
        assert!(state.lighting);
        assert!(!state.transparency);
    }

    #[test]
    fn test_surface_material_factors() {
        let m = Material::surface(Rgba::new(1.0, 1.0, 1.0, 0.5));
        assert!((m.ambient.r - 0.2).abs() < 1e-6);
        assert!((m.diffuse.g - 0.6).abs() < 1e-6);
        assert!((m.specular.b - 0.2).abs() < 1e-6);
        assert!((m.back_diffuse.r - 0.3).abs() < 1e-6);
        assert_eq!(m.diffuse.a, 0.5);
    }

    #[test]
    fn test_wire_material_is_flat() {
        let color = Rgba::new(0.3, 0.4, 0.5, 1.0);
        let m = Material::wire(color);
        assert_eq!(m.ambient, color);
        assert_eq!(m.diffuse.r, 0.0);
    }

    #[test]
    fn test_blending_requires_lighting() {
        let mut state = RenderState::default();
        state.transparency = true;
        assert!(state.blending());
        state.lighting = false;
        assert!(!state.blending());
    }
}
