//! Per-object display-list cache.
//!
//! Decides, for each object drawn through a viewport, whether to replay a
//! previously compiled list or to walk the object's vector list again and
//! compile it. When the context cannot hand out lists the object is drawn
//! immediately and nothing is cached.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

use crate::backend::GraphicsContext;
use crate::error::{Result, Severity};
use crate::model::{DisplayListHandle, VectorList};
use crate::viewport::ViewportManager;

/// How an object ended up on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// An existing compiled list was replayed.
    Replayed,
    /// The vector list was compiled into a new list and replayed.
    Compiled,
    /// The vector list was drawn directly without caching.
    Immediate,
}

/// Maps object keys to their compiled display lists.
#[derive(Debug)]
pub struct ObjectCache<K> {
    entries: HashMap<K, DisplayListHandle>,
    enabled: bool,
}

impl<K> Default for ObjectCache<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            enabled: true,
        }
    }
}

impl<K: Eq + Hash + Clone + Debug> ObjectCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that never compiles; every draw is immediate.
    pub fn disabled() -> Self {
        Self {
            entries: HashMap::new(),
            enabled: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Handle cached for `key`, if any.
    pub fn handle(&self, key: &K) -> Option<DisplayListHandle> {
        self.entries.get(key).copied()
    }

    /// Draw `list` for `key`, through the cache when possible.
    ///
    /// The suffix installed on the viewport is never compiled into object
    /// lists.
    pub fn draw<G: GraphicsContext>(
        &mut self,
        viewport: &mut ViewportManager<G>,
        key: &K,
        list: &VectorList,
    ) -> Result<DrawOutcome> {
        if !self.enabled {
            viewport.draw_primary(list)?;
            return Ok(DrawOutcome::Immediate);
        }

        if let Some(handle) = self.entries.get(key).copied() {
            if viewport.is_display_list_valid(handle) {
                viewport.replay_display_list(handle)?;
                return Ok(DrawOutcome::Replayed);
            }
            debug!("Cached list {} for {:?} is stale, recompiling", handle, key);
            self.release(viewport, key)?;
        }

        let handle = match viewport.allocate_display_lists(1) {
            Ok(handle) => handle,
            Err(err) if err.severity() == Severity::Recoverable => {
                viewport.draw_primary(list)?;
                return Ok(DrawOutcome::Immediate);
            }
            Err(err) => return Err(err),
        };
        self.entries.insert(key.clone(), handle);

        viewport.begin_display_list(handle)?;
        let drawn = viewport.draw_primary(list);
        let ended = viewport.end_display_list();
        drawn?;
        ended?;

        viewport.replay_display_list(handle)?;
        debug!("Compiled {:?} into list {}", key, handle);
        Ok(DrawOutcome::Compiled)
    }

    /// Drop the cached list for `key`, e.g. after its geometry was edited.
    ///
    /// Returns whether an entry existed.
    pub fn invalidate<G: GraphicsContext>(
        &mut self,
        viewport: &mut ViewportManager<G>,
        key: &K,
    ) -> Result<bool> {
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        self.release(viewport, key)?;
        Ok(true)
    }

    /// Free every cached list.
    pub fn clear<G: GraphicsContext>(&mut self, viewport: &mut ViewportManager<G>) -> Result<()> {
        let keys: Vec<K> = self.entries.keys().cloned().collect();
        for key in &keys {
            self.release(viewport, key)?;
        }
        Ok(())
    }

    fn release<G: GraphicsContext>(
        &mut self,
        viewport: &mut ViewportManager<G>,
        key: &K,
    ) -> Result<()> {
        if let Some(handle) = self.entries.remove(key) {
            if viewport.is_display_list_allocated(handle) {
                viewport.free_display_lists(handle, 1)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingContext;
    use crate::config::ViewportConfig;
    use crate::model::Vec3;
    use pretty_assertions::assert_eq;

    fn viewport(limit: Option<usize>) -> ViewportManager<RecordingContext> {
        let ctx = match limit {
            Some(limit) => RecordingContext::with_list_limit(limit),
            None => RecordingContext::new(),
        };
        ViewportManager::with_config(ctx, ViewportConfig::wireframe())
    }

    fn square() -> VectorList {
        let mut list = VectorList::new();
        list.polyline(&[
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
        ]);
        list
    }

    #[test]
    fn test_compile_then_replay() {
        let mut vm = viewport(None);
        let mut cache = ObjectCache::new();
        let key = "arb8.s".to_string();

        assert_eq!(cache.draw(&mut vm, &key, &square()).unwrap(), DrawOutcome::Compiled);
        assert_eq!(cache.draw(&mut vm, &key, &square()).unwrap(), DrawOutcome::Replayed);
        assert_eq!(cache.len(), 1);
        assert_eq!(vm.context().list_calls(), 2);
        assert_eq!(vm.context().primitive_count(), 2);
    }

    #[test]
    fn test_allocation_failure_falls_back_to_immediate() {
        let mut vm = viewport(Some(1));
        let mut cache = ObjectCache::new();

        assert_eq!(cache.draw(&mut vm, &1, &square()).unwrap(), DrawOutcome::Compiled);
        assert_eq!(cache.draw(&mut vm, &2, &square()).unwrap(), DrawOutcome::Immediate);
        assert!(!cache.contains(&2));
        assert_eq!(vm.context().primitive_count(), 2);
    }

    #[test]
    fn test_invalidate_frees_and_recompiles() {
        let mut vm = viewport(None);
        let mut cache = ObjectCache::new();
        cache.draw(&mut vm, &"a", &square()).unwrap();
        let old = cache.handle(&"a").unwrap();

        assert!(cache.invalidate(&mut vm, &"a").unwrap());
        assert!(!vm.is_display_list_allocated(old));
        assert!(!cache.invalidate(&mut vm, &"a").unwrap());

        assert_eq!(cache.draw(&mut vm, &"a", &square()).unwrap(), DrawOutcome::Compiled);
        assert_ne!(cache.handle(&"a"), Some(old));
    }

    #[test]
    fn test_suffix_not_compiled_into_object() {
        let mut vm = viewport(None);
        let mut overlay = VectorList::new();
        overlay.polyline(&[Vec3::new(5.0, 5.0, 0.0), Vec3::new(6.0, 6.0, 0.0)]);
        vm.set_suffix(&overlay);

        let mut cache = ObjectCache::new();
        cache.draw(&mut vm, &"a", &square()).unwrap();
        let handle = cache.handle(&"a").unwrap();
        let begins = vm
            .context()
            .list_commands(handle)
            .unwrap()
            .iter()
            .filter(|c| matches!(c, crate::backend::Command::BeginPrimitive(_)))
            .count();
        assert_eq!(begins, 1);
    }

    #[test]
    fn test_disabled_cache_never_allocates() {
        let mut vm = viewport(None);
        let mut cache = ObjectCache::disabled();
        for _ in 0..3 {
            assert_eq!(cache.draw(&mut vm, &"a", &square()).unwrap(), DrawOutcome::Immediate);
        }
        assert!(cache.is_empty());
        assert_eq!(vm.context().allocated_lists(), 0);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut vm = viewport(None);
        let mut cache = ObjectCache::new();
        cache.draw(&mut vm, &1, &square()).unwrap();
        cache.draw(&mut vm, &2, &square()).unwrap();
        cache.clear(&mut vm).unwrap();
        assert!(cache.is_empty());
        assert_eq!(vm.context().allocated_lists(), 0);
    }

    #[test]
    fn test_context_loss_propagates() {
        let mut vm = viewport(None);
        let mut cache = ObjectCache::new();
        cache.draw(&mut vm, &1, &square()).unwrap();
        vm.context_mut().lose_context("reset");

        let err = cache.draw(&mut vm, &1, &square()).unwrap_err();
        assert!(err.is_frame_fatal());
    }
}
