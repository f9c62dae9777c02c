//! The viewport adapter: render-state tracking, display-list caching and
//! vector-list drawing.

pub mod draw;
pub mod manager;

pub use draw::DrawCursor;
pub use manager::{RecordingState, ViewportManager};
