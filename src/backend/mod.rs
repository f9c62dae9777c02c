//! Graphics-context abstraction the viewport adapts over.
//!
//! The trait mirrors a fixed-function, immediate-mode API: primitives are
//! opened, fed vertices and closed; attributes are global state; display
//! lists are integer-named command buffers compiled between `new_list` and
//! `end_list`. Every call may report [`ViewportError::ContextLost`], which
//! callers treat as fatal to the current frame.
//!
//! [`ViewportError::ContextLost`]: crate::error::ViewportError::ContextLost

pub mod recording;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{DisplayListHandle, Material, Matrix4, MatrixMode, Rgb, Rgba, Vec3};

pub use recording::{Command, RecordingContext};

/// Kind of primitive opened by [`GraphicsContext::begin_primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    LineStrip,
    Polygon,
    Triangles,
    Points,
}

/// Toggleable pipeline features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Lighting,
    Blend,
}

/// Immediate-mode graphics capability set.
pub trait GraphicsContext {
    // === Primitives ===

    fn begin_primitive(&mut self, primitive: Primitive) -> Result<()>;
    fn vertex(&mut self, position: Vec3) -> Result<()>;
    fn normal(&mut self, normal: Vec3) -> Result<()>;
    fn end_primitive(&mut self) -> Result<()>;

    // === Attributes ===

    fn set_color(&mut self, color: Rgba) -> Result<()>;
    fn set_material(&mut self, material: &Material) -> Result<()>;
    fn set_line_width(&mut self, width: f32) -> Result<()>;
    /// `None` disables stippling; `Some((factor, pattern))` enables it.
    fn set_line_stipple(&mut self, stipple: Option<(u16, u16)>) -> Result<()>;
    fn set_point_size(&mut self, size: f32) -> Result<()>;
    fn set_capability(&mut self, capability: Capability, enabled: bool) -> Result<()>;
    fn set_clear_color(&mut self, color: Rgb) -> Result<()>;
    /// Clear color and depth buffers.
    fn clear(&mut self) -> Result<()>;

    // === Transforms and state stacks ===

    /// Replace the matrix of the given stack outright.
    fn load_matrix(&mut self, mode: MatrixMode, matrix: &Matrix4) -> Result<()>;
    /// Push the model-view matrix.
    fn push_matrix(&mut self) -> Result<()>;
    fn pop_matrix(&mut self) -> Result<()>;
    /// Push all matrices and attributes.
    fn push_state(&mut self) -> Result<()>;
    fn pop_state(&mut self) -> Result<()>;

    // === Display lists ===

    /// Reserve `count` contiguous list names, returning the first, or
    /// [`DisplayListHandle::INVALID`] when the range cannot be granted.
    fn gen_lists(&mut self, count: usize) -> Result<DisplayListHandle>;
    /// Start compiling into `handle`; subsequent commands are captured.
    fn new_list(&mut self, handle: DisplayListHandle) -> Result<()>;
    fn end_list(&mut self) -> Result<()>;
    /// Execute a compiled list.
    fn call_list(&mut self, handle: DisplayListHandle) -> Result<()>;
    fn delete_lists(&mut self, first: DisplayListHandle, count: usize) -> Result<()>;
    /// Whether `handle` currently names a list.
    fn is_list(&self, handle: DisplayListHandle) -> bool;
}
