//! Display-list handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a compiled command list held by the graphics context.
///
/// Handles are context-global integers. `0` is never handed out and serves
/// as the "no list" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayListHandle(u32);

impl DisplayListHandle {
    /// The sentinel returned by backends that cannot allocate.
    pub const INVALID: Self = Self(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw integer value.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is a real handle rather than the sentinel.
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// The handle `n` places after this one in a contiguous range.
    pub fn offset(self, n: usize) -> Self {
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        Self(self.0.saturating_add(n))
    }

    /// Iterate a contiguous range of `count` handles starting here.
    pub fn range(self, count: usize) -> impl Iterator<Item = DisplayListHandle> {
        (0..count).map(move |i| self.offset(i))
    }
}

impl fmt::Display for DisplayListHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
