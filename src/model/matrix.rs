//! 4x4 transformation matrices.

use serde::{Deserialize, Serialize};

use super::vlist::Vec3;

/// Which matrix stack a load targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixMode {
    ModelView,
    Projection,
}

/// A 4x4 matrix stored column-major, the layout the graphics context consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix4(pub [f32; 16]);

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Pure translation.
    pub fn translation(v: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.0[12] = v.x as f32;
        m.0[13] = v.y as f32;
        m.0[14] = v.z as f32;
        m
    }

    /// Transform a point (w = 1) by this matrix, dropping the projective row.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let m = self.0.map(f64::from);
        Vec3::new(
            m[0] * p.x + m[4] * p.y + m[8] * p.z + m[12],
            m[1] * p.x + m[5] * p.y + m[9] * p.z + m[13],
            m[2] * p.x + m[6] * p.y + m[10] * p.z + m[14],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_moves_point() {
        let m = Matrix4::translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.transform_point(Vec3::new(1.0, 1.0, 1.0)), Vec3::new(2.0, 3.0, 4.0));
    }
}
