//! Error types for viewport rendering and scene loading.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::DisplayListHandle;

/// Error codes for viewport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Backend refused a display-list range (-1)
    AllocationFailed = -1,
    /// Handle never allocated or already freed (-2)
    InvalidHandle = -2,
    /// Display-list recording discipline violated (-3)
    RecordingState = -3,
    /// Attribute stack misuse (-4)
    StateStack = -4,
    /// Out-of-range render attribute (-5)
    InvalidAttribute = -5,
    /// Graphics context is gone (-10)
    ContextLost = -10,
    /// Scene file missing or unreadable (-20)
    FileNotFound = -20,
    /// Scene file could not be parsed (-21)
    ParseError = -21,
    /// Scene parsed but describes something unrenderable (-22)
    InvalidScene = -22,
}

/// How the caller is expected to react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Keep going without the cache (draw immediately).
    Recoverable,
    /// Misuse of the API; the call had no effect.
    ProgrammerError,
    /// The current frame is lost; the owner decides whether to retry.
    FrameFatal,
    /// Bad scene input.
    Input,
}

/// Main error type for the viewport adapter.
#[derive(Debug, Error)]
pub enum ViewportError {
    #[error("Backend could not allocate {count} display list(s)")]
    AllocationFailed { count: usize },

    #[error("Display list {handle} was never allocated or has been freed")]
    InvalidHandle { handle: DisplayListHandle },

    #[error("Display list {handle} has not been closed since it was last opened")]
    ListNotClosed { handle: DisplayListHandle },

    #[error("Display list {handle} is still being recorded")]
    ListStillRecording { handle: DisplayListHandle },

    #[error("Cannot begin display list {requested}: list {active} is already recording")]
    AlreadyRecording {
        requested: DisplayListHandle,
        active: DisplayListHandle,
    },

    #[error("No display list is being recorded")]
    NotRecording,

    #[error("Render state stack is empty")]
    StateStackUnderflow,

    #[error("Invalid line width {width}: must be positive")]
    InvalidLineWidth { width: u32 },

    #[error("Graphics context lost: {reason}")]
    ContextLost { reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Empty file: {path}")]
    EmptyFile { path: PathBuf },

    #[error("Scene parse error at line {line}, column {column}: {message}")]
    SceneParse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid scene: {reason}")]
    InvalidScene { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewportError {
    /// Get the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ViewportError::AllocationFailed { .. } => ErrorCode::AllocationFailed,
            ViewportError::InvalidHandle { .. } => ErrorCode::InvalidHandle,
            ViewportError::ListNotClosed { .. } => ErrorCode::RecordingState,
            ViewportError::ListStillRecording { .. } => ErrorCode::RecordingState,
            ViewportError::AlreadyRecording { .. } => ErrorCode::RecordingState,
            ViewportError::NotRecording => ErrorCode::RecordingState,
            ViewportError::StateStackUnderflow => ErrorCode::StateStack,
            ViewportError::InvalidLineWidth { .. } => ErrorCode::InvalidAttribute,
            ViewportError::ContextLost { .. } => ErrorCode::ContextLost,
            ViewportError::FileNotFound { .. } => ErrorCode::FileNotFound,
            ViewportError::EmptyFile { .. } => ErrorCode::ParseError,
            ViewportError::SceneParse { .. } => ErrorCode::ParseError,
            ViewportError::InvalidScene { .. } => ErrorCode::InvalidScene,
            ViewportError::Io(_) => ErrorCode::FileNotFound,
        }
    }

    /// Get the numeric error code value.
    pub fn code_value(&self) -> i32 {
        self.code() as i32
    }

    /// Classify the error by how callers should react to it.
    pub fn severity(&self) -> Severity {
        match self.code() {
            ErrorCode::AllocationFailed => Severity::Recoverable,
            ErrorCode::ContextLost => Severity::FrameFatal,
            ErrorCode::FileNotFound | ErrorCode::ParseError | ErrorCode::InvalidScene => {
                Severity::Input
            }
            ErrorCode::InvalidHandle
            | ErrorCode::RecordingState
            | ErrorCode::StateStack
            | ErrorCode::InvalidAttribute => Severity::ProgrammerError,
        }
    }

    /// Whether the current frame must be abandoned.
    pub fn is_frame_fatal(&self) -> bool {
        self.severity() == Severity::FrameFatal
    }

    pub(crate) fn context_lost(reason: impl Into<String>) -> Self {
        ViewportError::ContextLost {
            reason: reason.into(),
        }
    }
}

/// Result type alias for viewport operations.
pub type Result<T> = std::result::Result<T, ViewportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_failure_is_recoverable() {
        let err = ViewportError::AllocationFailed { count: 4 };
        assert_eq!(err.severity(), Severity::Recoverable);
        assert_eq!(err.code_value(), -1);
        assert!(!err.is_frame_fatal());
    }

    #[test]
    fn test_context_loss_is_frame_fatal() {
        let err = ViewportError::context_lost("device reset");
        assert!(err.is_frame_fatal());
        assert_eq!(err.to_string(), "Graphics context lost: device reset");
    }

    #[test]
    fn test_recording_misuse_is_programmer_error() {
        let errors = [
            ViewportError::NotRecording,
            ViewportError::ListNotClosed {
                handle: DisplayListHandle::new(3),
            },
            ViewportError::AlreadyRecording {
                requested: DisplayListHandle::new(2),
                active: DisplayListHandle::new(1),
            },
        ];
        for err in &errors {
            assert_eq!(err.code(), ErrorCode::RecordingState);
            assert_eq!(err.severity(), Severity::ProgrammerError);
        }
    }
}
