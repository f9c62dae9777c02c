//! Data model for viewport rendering.

pub mod color;
pub mod handle;
pub mod matrix;
pub mod state;
pub mod vlist;

pub use color::{Rgb, Rgba};
pub use handle::DisplayListHandle;
pub use matrix::{Matrix4, MatrixMode};
pub use state::{LineStyle, Material, MaterialClass, RenderState};
pub use vlist::{Element, Vec3, VectorList};
