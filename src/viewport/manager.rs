//! Per-viewport rendering state and display-list lifecycle.

use std::collections::BTreeMap;
use tracing::{debug, error, trace, warn};

use super::draw::{self, DrawCursor, Pass};
use crate::backend::{Capability, GraphicsContext};
use crate::config::ViewportConfig;
use crate::error::{Result, ViewportError};
use crate::model::{
    DisplayListHandle, Element, LineStyle, Matrix4, MatrixMode, Rgb, RenderState, VectorList,
};

/// Display-list recording mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording(DisplayListHandle),
}

/// Lifecycle of one allocated handle as seen by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListStatus {
    /// Allocated, never recorded.
    Allocated,
    /// Between begin and end.
    Open,
    /// Recorded and closed. `touches_state` is set when replaying the list
    /// changes context attributes outside the geometry itself.
    Compiled { touches_state: bool },
}

/// What [`ViewportManager::push_state`] saves next to the context's own stack.
#[derive(Debug, Clone, Copy)]
struct SavedState {
    model_matrix: Matrix4,
    state: RenderState,
    applied: Option<RenderState>,
}

/// Adapter between vector lists and an immediate-mode graphics context.
///
/// Setters only update the tracked [`RenderState`]; the state is flushed to
/// the context lazily before the next draw or replay, and only the
/// attributes that differ from what the context already holds are sent.
#[derive(Debug)]
pub struct ViewportManager<G: GraphicsContext> {
    context: G,
    config: ViewportConfig,
    state: RenderState,
    /// What the context is known to hold; `None` after anything that may
    /// have changed it behind our back.
    applied: Option<RenderState>,
    recording: RecordingState,
    /// Whether the list being recorded changes attributes on replay.
    recording_touches_state: bool,
    lists: BTreeMap<DisplayListHandle, ListStatus>,
    model_matrix: Matrix4,
    saved: Vec<SavedState>,
    suffix: Option<VectorList>,
}

impl<G: GraphicsContext> ViewportManager<G> {
    /// Create a manager with the default configuration.
    pub fn new(context: G) -> Self {
        Self::with_config(context, ViewportConfig::default())
    }

    /// Create a manager seeded from `config`.
    pub fn with_config(context: G, config: ViewportConfig) -> Self {
        Self {
            context,
            state: RenderState::from_config(&config),
            config,
            applied: None,
            recording: RecordingState::Idle,
            recording_touches_state: false,
            lists: BTreeMap::new(),
            model_matrix: Matrix4::IDENTITY,
            saved: Vec::new(),
            suffix: None,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn render_state(&self) -> &RenderState {
        &self.state
    }

    pub fn recording(&self) -> RecordingState {
        self.recording
    }

    pub fn context(&self) -> &G {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut G {
        &mut self.context
    }

    pub fn into_context(self) -> G {
        self.context
    }

    pub fn suffix(&self) -> Option<&VectorList> {
        self.suffix.as_ref()
    }

    // === Render state ===

    pub fn set_foreground_color(&mut self, r: f32, g: f32, b: f32, transparency: f32) {
        self.state.foreground = Rgb::new(r, g, b).with_alpha(transparency);
    }

    pub fn set_background_color(&mut self, r: f32, g: f32, b: f32) {
        self.state.background = Rgb::new(r, g, b);
    }

    /// Set width and style together. Nothing changes if `width` is invalid.
    pub fn set_line_attributes(&mut self, width: u32, style: LineStyle) -> Result<()> {
        self.set_line_width(width)?;
        self.set_line_style(style);
        Ok(())
    }

    pub fn set_line_style(&mut self, style: LineStyle) {
        self.state.line_style = style;
    }

    pub fn set_line_width(&mut self, width: u32) -> Result<()> {
        if width == 0 {
            error!("Rejected line width {}", width);
            return Err(ViewportError::InvalidLineWidth { width });
        }
        self.state.line_width = width;
        Ok(())
    }

    pub fn set_lighting(&mut self, enabled: bool) {
        self.state.lighting = enabled;
    }

    pub fn set_transparency(&mut self, enabled: bool) {
        self.state.transparency = enabled;
    }

    /// Send pending attribute changes to the context.
    ///
    /// Skipped while recording: compiled lists hold geometry only and pick
    /// up whatever state is current when they are replayed.
    fn flush_state(&mut self) -> Result<()> {
        if self.recording != RecordingState::Idle {
            return Ok(());
        }

        let state = self.state;
        let prev = self.applied.take();
        let ctx = &mut self.context;

        if prev.map(|p| p.foreground) != Some(state.foreground) {
            ctx.set_color(state.foreground)?;
        }
        if prev.map(|p| p.line_width) != Some(state.line_width) {
            ctx.set_line_width(state.line_width as f32)?;
        }
        if prev.map(|p| p.line_style) != Some(state.line_style) {
            ctx.set_line_stipple(ViewportConfig::stipple(state.line_style))?;
        }
        if prev.map(|p| p.lighting) != Some(state.lighting) {
            ctx.set_capability(Capability::Lighting, state.lighting)?;
        }
        if prev.map(|p| p.blending()) != Some(state.blending()) {
            ctx.set_capability(Capability::Blend, state.blending())?;
        }

        self.applied = Some(state);
        Ok(())
    }

    /// The context's line width no longer matches what was flushed.
    fn forget_line_width(&mut self) {
        if let Some(applied) = self.applied.as_mut() {
            // Zero never matches a valid width, so the next flush resends it.
            applied.line_width = 0;
        }
    }

    // === Drawing ===

    /// Start a frame: clear to the background color.
    pub fn draw_begin(&mut self) -> Result<()> {
        self.context
            .set_clear_color(self.state.background)
            .and_then(|()| self.context.clear())
            .inspect_err(log_frame_error)
    }

    /// Draw `list` followed by the suffix, if any, in a single pass.
    pub fn draw_vector_list(&mut self, list: &VectorList) -> Result<()> {
        let suffix = self.suffix.take();
        let suffix_elements = suffix.as_ref().map(VectorList::elements).unwrap_or(&[]);
        let result = self.draw_pass(list.iter().chain(suffix_elements));
        self.suffix = suffix;
        result
    }

    /// Draw `list` alone, ignoring any installed suffix.
    pub fn draw_primary(&mut self, list: &VectorList) -> Result<()> {
        self.draw_pass(list)
    }

    /// Draw only the suffix list. Does nothing when none is installed.
    pub fn draw_suffix(&mut self) -> Result<()> {
        let Some(suffix) = self.suffix.take() else {
            return Ok(());
        };
        let result = self.draw_pass(&suffix);
        self.suffix = Some(suffix);
        result
    }

    pub fn set_suffix(&mut self, list: &VectorList) {
        self.suffix = Some(list.clone());
    }

    pub fn clear_suffix(&mut self) {
        self.suffix = None;
    }

    fn draw_pass<'e, I>(&mut self, elements: I) -> Result<()>
    where
        I: IntoIterator<Item = &'e Element>,
    {
        self.flush_state().inspect_err(log_frame_error)?;

        let pass = Pass {
            state: &self.state,
            model: &self.model_matrix,
        };
        let cursor: DrawCursor =
            draw::draw_elements(&mut self.context, &pass, elements).inspect_err(log_frame_error)?;

        trace!("Draw pass finished ({:?})", self.recording);
        if cursor.touched_attributes {
            match self.recording {
                RecordingState::Idle => self.forget_line_width(),
                RecordingState::Recording(_) => self.recording_touches_state = true,
            }
        }
        Ok(())
    }

    // === Display lists ===

    /// Reserve `count` contiguous handles and return the first.
    ///
    /// [`ViewportError::AllocationFailed`] is recoverable: draw immediately
    /// instead of caching.
    pub fn allocate_display_lists(&mut self, count: usize) -> Result<DisplayListHandle> {
        let first = if count == 0 {
            DisplayListHandle::INVALID
        } else {
            self.context.gen_lists(count).inspect_err(log_frame_error)?
        };

        if !first.is_some() {
            warn!("Display list allocation of {} failed, drawing uncached", count);
            return Err(ViewportError::AllocationFailed { count });
        }

        for handle in first.range(count) {
            self.lists.insert(handle, ListStatus::Allocated);
        }
        debug!("Allocated {} display list(s) starting at {}", count, first);
        Ok(first)
    }

    /// Start capturing draw calls into `handle`.
    ///
    /// Pending render state is flushed first, so it reaches the context
    /// rather than the list.
    pub fn begin_display_list(&mut self, handle: DisplayListHandle) -> Result<()> {
        if let RecordingState::Recording(active) = self.recording {
            error!("Begin {} while {} is recording", handle, active);
            return Err(ViewportError::AlreadyRecording {
                requested: handle,
                active,
            });
        }
        if !self.lists.contains_key(&handle) {
            error!("Begin on unallocated display list {}", handle);
            return Err(ViewportError::InvalidHandle { handle });
        }

        self.flush_state().inspect_err(log_frame_error)?;
        self.context.new_list(handle).inspect_err(log_frame_error)?;
        self.lists.insert(handle, ListStatus::Open);
        self.recording = RecordingState::Recording(handle);
        self.recording_touches_state = false;
        debug!("Recording display list {}", handle);
        Ok(())
    }

    /// Close the list being recorded.
    ///
    /// The manager is idle afterwards even if the context fails; the list
    /// then counts as never recorded.
    pub fn end_display_list(&mut self) -> Result<()> {
        let RecordingState::Recording(handle) = self.recording else {
            error!("End display list while idle");
            return Err(ViewportError::NotRecording);
        };

        self.recording = RecordingState::Idle;
        if let Err(err) = self.context.end_list() {
            log_frame_error(&err);
            self.lists.insert(handle, ListStatus::Allocated);
            return Err(err);
        }
        self.lists.insert(
            handle,
            ListStatus::Compiled {
                touches_state: self.recording_touches_state,
            },
        );
        debug!("Compiled display list {}", handle);
        Ok(())
    }

    /// Execute a compiled list against the current context state.
    ///
    /// State is not restored afterwards.
    pub fn replay_display_list(&mut self, handle: DisplayListHandle) -> Result<()> {
        let touches_state = match self.lists.get(&handle) {
            Some(ListStatus::Compiled { touches_state }) => *touches_state,
            Some(ListStatus::Allocated | ListStatus::Open) => {
                error!("Replay of display list {} before it was closed", handle);
                return Err(ViewportError::ListNotClosed { handle });
            }
            None => {
                error!("Replay of unknown display list {}", handle);
                return Err(ViewportError::InvalidHandle { handle });
            }
        };

        self.flush_state().inspect_err(log_frame_error)?;
        self.context.call_list(handle).inspect_err(log_frame_error)?;
        trace!("Replayed display list {}", handle);

        if touches_state {
            match self.recording {
                RecordingState::Idle => self.forget_line_width(),
                RecordingState::Recording(_) => self.recording_touches_state = true,
            }
        }
        Ok(())
    }

    /// Release `count` contiguous handles starting at `first`.
    ///
    /// Either the whole range is freed or nothing is.
    pub fn free_display_lists(&mut self, first: DisplayListHandle, count: usize) -> Result<()> {
        for handle in first.range(count) {
            match self.lists.get(&handle) {
                None => {
                    error!("Free of unknown display list {}", handle);
                    return Err(ViewportError::InvalidHandle { handle });
                }
                Some(ListStatus::Open) => {
                    error!("Free of display list {} while recording it", handle);
                    return Err(ViewportError::ListStillRecording { handle });
                }
                Some(_) => {}
            }
        }
        if count == 0 {
            return Ok(());
        }

        self.context
            .delete_lists(first, count)
            .inspect_err(log_frame_error)?;
        for handle in first.range(count) {
            self.lists.remove(&handle);
        }
        debug!("Freed {} display list(s) starting at {}", count, first);
        Ok(())
    }

    /// Whether `handle` holds a closed recording that can be replayed.
    pub fn is_display_list_valid(&self, handle: DisplayListHandle) -> bool {
        matches!(self.lists.get(&handle), Some(ListStatus::Compiled { .. }))
            && self.context.is_list(handle)
    }

    /// Whether `handle` is allocated through this manager, recorded or not.
    pub fn is_display_list_allocated(&self, handle: DisplayListHandle) -> bool {
        self.lists.contains_key(&handle)
    }

    // === Transforms and state stack ===

    /// Save matrices and attributes on the context, along with the
    /// tracked render state.
    pub fn push_state(&mut self) -> Result<()> {
        self.context.push_state().inspect_err(log_frame_error)?;
        self.saved.push(SavedState {
            model_matrix: self.model_matrix,
            state: self.state,
            applied: self.applied,
        });
        Ok(())
    }

    /// Restore what the matching [`push_state`](Self::push_state) saved.
    pub fn pop_state(&mut self) -> Result<()> {
        let Some(saved) = self.saved.pop() else {
            error!("Pop with an empty state stack");
            return Err(ViewportError::StateStackUnderflow);
        };
        self.context.pop_state().inspect_err(log_frame_error)?;
        self.model_matrix = saved.model_matrix;
        self.state = saved.state;
        self.applied = saved.applied;
        Ok(())
    }

    /// Replace the model-view matrix.
    pub fn load_matrix(&mut self, matrix: &Matrix4) -> Result<()> {
        self.context
            .load_matrix(MatrixMode::ModelView, matrix)
            .inspect_err(log_frame_error)?;
        self.model_matrix = *matrix;
        Ok(())
    }

    /// Replace the projection matrix.
    pub fn load_projection_matrix(&mut self, matrix: &Matrix4) -> Result<()> {
        self.context
            .load_matrix(MatrixMode::Projection, matrix)
            .inspect_err(log_frame_error)
    }
}

fn log_frame_error(err: &ViewportError) {
    if err.is_frame_fatal() {
        error!("Frame failed: {}", err);
    }
}
