//! In-memory graphics context that records every command.
//!
//! Used as the headless backend of the replay tool and throughout the
//! tests. Display lists are compiled into command buffers; calling a list
//! expands its commands into the frame log, so a replay is observable as
//! the exact command sequence the list captured.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Capability, GraphicsContext, Primitive};
use crate::error::{Result, ViewportError};
use crate::model::{DisplayListHandle, Material, Matrix4, MatrixMode, Rgb, Rgba, Vec3};

/// Maximum nesting depth of list calls, matching common driver limits.
const MAX_CALL_DEPTH: usize = 64;

/// Lists held at once when no explicit limit is configured.
const MAX_LISTS: usize = 1 << 20;

/// A single command as received by the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    BeginPrimitive(Primitive),
    Vertex(Vec3),
    Normal(Vec3),
    EndPrimitive,
    Color(Rgba),
    Material(Material),
    LineWidth(f32),
    LineStipple(Option<(u16, u16)>),
    PointSize(f32),
    Capability { capability: Capability, enabled: bool },
    ClearColor(Rgb),
    Clear,
    LoadMatrix { mode: MatrixMode, matrix: Matrix4 },
    PushMatrix,
    PopMatrix,
    PushState,
    PopState,
    /// Reference to another list, only ever stored inside a compiled list.
    CallList(DisplayListHandle),
}

impl Command {
    /// Whether the command produces geometry rather than changing state.
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Command::BeginPrimitive(_) | Command::Vertex(_) | Command::Normal(_) | Command::EndPrimitive
        )
    }
}

/// Recording graphics context.
#[derive(Debug)]
pub struct RecordingContext {
    /// Commands executed against the "screen".
    log: Vec<Command>,
    /// Allocated lists and their compiled contents.
    lists: HashMap<DisplayListHandle, Vec<Command>>,
    /// List being compiled and the commands captured so far.
    open: Option<(DisplayListHandle, Vec<Command>)>,
    /// Next list name to hand out.
    next_handle: u32,
    /// Maximum number of simultaneously allocated lists.
    list_limit: Option<usize>,
    matrix_depth: usize,
    state_depth: usize,
    list_calls: usize,
    lost: Option<String>,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingContext {
    pub fn new() -> Self {
        Self {
            log: Vec::new(),
            lists: HashMap::new(),
            open: None,
            next_handle: 1,
            list_limit: None,
            matrix_depth: 0,
            state_depth: 0,
            list_calls: 0,
            lost: None,
        }
    }

    /// Context that refuses to hold more than `limit` lists at once.
    pub fn with_list_limit(limit: usize) -> Self {
        Self {
            list_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Simulate losing the underlying device. Every later command fails.
    pub fn lose_context(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Simulated context loss: {}", reason);
        self.lost = Some(reason);
        self.lists.clear();
        self.open = None;
    }

    /// Commands executed so far.
    pub fn commands(&self) -> &[Command] {
        &self.log
    }

    /// Take the executed commands, leaving the log empty.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.log)
    }

    /// Geometry commands executed so far, in order.
    pub fn geometry(&self) -> Vec<Command> {
        self.log.iter().filter(|c| c.is_geometry()).cloned().collect()
    }

    /// Number of primitives opened in the frame log.
    pub fn primitive_count(&self) -> usize {
        self.log
            .iter()
            .filter(|c| matches!(c, Command::BeginPrimitive(_)))
            .count()
    }

    /// Compiled contents of a list, if it exists.
    pub fn list_commands(&self, handle: DisplayListHandle) -> Option<&[Command]> {
        self.lists.get(&handle).map(Vec::as_slice)
    }

    /// Number of lists currently allocated.
    pub fn allocated_lists(&self) -> usize {
        self.lists.len()
    }

    /// Number of top-level list calls executed.
    pub fn list_calls(&self) -> usize {
        self.list_calls
    }

    fn check(&self) -> Result<()> {
        match &self.lost {
            Some(reason) => Err(ViewportError::context_lost(reason.clone())),
            None => Ok(()),
        }
    }

    fn emit(&mut self, command: Command) -> Result<()> {
        self.check()?;
        match &mut self.open {
            Some((_, captured)) => captured.push(command),
            None => self.log.push(command),
        }
        Ok(())
    }

    fn expand(&mut self, handle: DisplayListHandle, depth: usize) {
        if depth >= MAX_CALL_DEPTH {
            tracing::warn!("List call depth limit reached at {}", handle);
            return;
        }
        let Some(commands) = self.lists.get(&handle).cloned() else {
            return;
        };
        for command in commands {
            match command {
                Command::CallList(inner) => self.expand(inner, depth + 1),
                other => self.log.push(other),
            }
        }
    }
}

impl GraphicsContext for RecordingContext {
    fn begin_primitive(&mut self, primitive: Primitive) -> Result<()> {
        self.emit(Command::BeginPrimitive(primitive))
    }

    fn vertex(&mut self, position: Vec3) -> Result<()> {
        self.emit(Command::Vertex(position))
    }

    fn normal(&mut self, normal: Vec3) -> Result<()> {
        self.emit(Command::Normal(normal))
    }

    fn end_primitive(&mut self) -> Result<()> {
        self.emit(Command::EndPrimitive)
    }

    fn set_color(&mut self, color: Rgba) -> Result<()> {
        self.emit(Command::Color(color))
    }

    fn set_material(&mut self, material: &Material) -> Result<()> {
        self.emit(Command::Material(*material))
    }

    fn set_line_width(&mut self, width: f32) -> Result<()> {
        self.emit(Command::LineWidth(width))
    }

    fn set_line_stipple(&mut self, stipple: Option<(u16, u16)>) -> Result<()> {
        self.emit(Command::LineStipple(stipple))
    }

    fn set_point_size(&mut self, size: f32) -> Result<()> {
        self.emit(Command::PointSize(size))
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) -> Result<()> {
        self.emit(Command::Capability { capability, enabled })
    }

    fn set_clear_color(&mut self, color: Rgb) -> Result<()> {
        self.emit(Command::ClearColor(color))
    }

    fn clear(&mut self) -> Result<()> {
        self.emit(Command::Clear)
    }

    fn load_matrix(&mut self, mode: MatrixMode, matrix: &Matrix4) -> Result<()> {
        self.emit(Command::LoadMatrix {
            mode,
            matrix: *matrix,
        })
    }

    fn push_matrix(&mut self) -> Result<()> {
        self.emit(Command::PushMatrix)?;
        if self.open.is_none() {
            self.matrix_depth += 1;
        }
        Ok(())
    }

    fn pop_matrix(&mut self) -> Result<()> {
        self.check()?;
        if self.open.is_none() {
            if self.matrix_depth == 0 {
                return Err(ViewportError::StateStackUnderflow);
            }
            self.matrix_depth -= 1;
        }
        self.emit(Command::PopMatrix)
    }

    fn push_state(&mut self) -> Result<()> {
        self.emit(Command::PushState)?;
        if self.open.is_none() {
            self.state_depth += 1;
        }
        Ok(())
    }

    fn pop_state(&mut self) -> Result<()> {
        self.check()?;
        if self.open.is_none() {
            if self.state_depth == 0 {
                return Err(ViewportError::StateStackUnderflow);
            }
            self.state_depth -= 1;
        }
        self.emit(Command::PopState)
    }

    fn gen_lists(&mut self, count: usize) -> Result<DisplayListHandle> {
        self.check()?;
        if count == 0 {
            return Ok(DisplayListHandle::INVALID);
        }
        let limit = self.list_limit.unwrap_or(MAX_LISTS);
        if self.lists.len().checked_add(count).map_or(true, |n| n > limit) {
            return Ok(DisplayListHandle::INVALID);
        }
        let Some(next) = u32::try_from(count)
            .ok()
            .and_then(|n| self.next_handle.checked_add(n))
        else {
            return Ok(DisplayListHandle::INVALID);
        };

        let first = DisplayListHandle::new(self.next_handle);
        for handle in first.range(count) {
            self.lists.insert(handle, Vec::new());
        }
        self.next_handle = next;
        Ok(first)
    }

    fn new_list(&mut self, handle: DisplayListHandle) -> Result<()> {
        self.check()?;
        if let Some((active, _)) = &self.open {
            return Err(ViewportError::AlreadyRecording {
                requested: handle,
                active: *active,
            });
        }
        self.open = Some((handle, Vec::new()));
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        self.check()?;
        let (handle, captured) = self.open.take().ok_or(ViewportError::NotRecording)?;
        self.lists.insert(handle, captured);
        Ok(())
    }

    fn call_list(&mut self, handle: DisplayListHandle) -> Result<()> {
        self.check()?;
        if self.open.is_some() {
            return self.emit(Command::CallList(handle));
        }
        self.list_calls += 1;
        self.expand(handle, 0);
        Ok(())
    }

    fn delete_lists(&mut self, first: DisplayListHandle, count: usize) -> Result<()> {
        self.check()?;
        for handle in first.range(count) {
            self.lists.remove(&handle);
        }
        Ok(())
    }

    fn is_list(&self, handle: DisplayListHandle) -> bool {
        self.lost.is_none() && self.lists.contains_key(&handle)
    }
}
