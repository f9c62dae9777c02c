//! arbalest-viewport - Display-list caching viewport adapter for Arbalest.
//!
//! This library translates the vector lists produced by the BRL-CAD geometry
//! kernel into calls against an immediate-mode graphics context, tracking
//! render state so redundant attribute changes are skipped, and compiling
//! object geometry into display lists so later frames can replay it without
//! walking the vector lists again.
//!
//! # Example
//!
//! ```no_run
//! use arbalest_viewport::{RecordingContext, VectorList, Vec3, ViewportManager};
//!
//! let mut viewport = ViewportManager::new(RecordingContext::new());
//! let mut list = VectorList::new();
//! list.polyline(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)]);
//!
//! let handle = viewport.allocate_display_lists(1).unwrap();
//! viewport.begin_display_list(handle).unwrap();
//! viewport.draw_vector_list(&list).unwrap();
//! viewport.end_display_list().unwrap();
//! viewport.replay_display_list(handle).unwrap();
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod scene;
pub mod viewport;

// Re-exports for convenience
pub use backend::{Capability, Command, GraphicsContext, Primitive, RecordingContext};
pub use cache::{DrawOutcome, ObjectCache};
pub use config::ViewportConfig;
pub use error::{ErrorCode, Result, Severity, ViewportError};
pub use model::{
    DisplayListHandle, Element, LineStyle, Matrix4, RenderState, Rgb, Rgba, Vec3, VectorList,
};
pub use scene::{load_scene, render_frame, FrameReport, Scene, SceneObject};
pub use viewport::{RecordingState, ViewportManager};

/// Options for [`replay_scene_file`].
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Render this many frames instead of the scene's own count.
    pub frames: Option<usize>,
    /// Cap on simultaneously allocated display lists.
    pub list_limit: Option<usize>,
    /// Draw every object immediately.
    pub no_cache: bool,
}

/// Result of replaying a scene headlessly.
#[derive(Debug, Clone)]
pub struct SceneReplay {
    pub frames: Vec<FrameReport>,
    /// Commands executed per frame.
    pub command_counts: Vec<usize>,
    /// Commands of the last frame.
    pub last_frame: Vec<Command>,
}

/// Render a scene file against a [`RecordingContext`].
///
/// This is the main high-level entry point:
/// 1. Load and parse the scene
/// 2. Set up a viewport from the scene's configuration
/// 3. Render each frame through an object cache
/// 4. Collect per-frame reports and the executed commands
pub fn replay_scene_file(path: &std::path::Path, options: &ReplayOptions) -> Result<SceneReplay> {
    let scene = load_scene(path)?;

    let context = match options.list_limit {
        Some(limit) => RecordingContext::with_list_limit(limit),
        None => RecordingContext::new(),
    };
    let mut viewport = ViewportManager::with_config(context, scene.config.clone());
    let mut cache = if options.no_cache {
        ObjectCache::disabled()
    } else {
        ObjectCache::new()
    };
    if let Some(suffix) = &scene.suffix {
        viewport.set_suffix(suffix);
    }

    let frame_count = options.frames.unwrap_or(scene.frames);
    let mut replay = SceneReplay {
        frames: Vec::with_capacity(frame_count),
        command_counts: Vec::with_capacity(frame_count),
        last_frame: Vec::new(),
    };

    for frame in 0..frame_count {
        let report = render_frame(&scene, &mut viewport, &mut cache)?;
        let commands = viewport.context_mut().take_commands();
        tracing::debug!("Frame {}: {:?}, {} commands", frame, report, commands.len());

        replay.frames.push(report);
        replay.command_counts.push(commands.len());
        replay.last_frame = commands;
    }

    cache.clear(&mut viewport)?;
    Ok(replay)
}
