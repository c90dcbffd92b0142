//! Fixed-capacity object pools addressed by generation-checked handles.
//!
//! This module provides [`ResourcePool<T>`], a slot arena with a fixed
//! number of slots, and [`Handle<T>`], the typed weak reference it hands out.
//!
//! # Generations
//!
//! Every slot carries a generation counter that is bumped whenever the slot
//! is released. A handle remembers the generation it was issued with, so a
//! handle that outlives its resource no longer matches the slot and every
//! lookup through it returns `None`, even after the slot has been reused by
//! another value.
//!
//! # Capacity
//!
//! Pools never grow. When every slot is in use, [`ResourcePool::obtain`]
//! returns `None` and logs an error; callers turn that into their own error
//! type.
//!
//! # Example
//!
//! ```
//! use vesper_core::pool::ResourcePool;
//!
//! let mut pool = ResourcePool::<&str>::new(2);
//!
//! let a = pool.obtain("albedo").unwrap();
//! let b = pool.obtain("normals").unwrap();
//! assert!(pool.obtain("depth").is_none()); // exhausted
//!
//! assert_eq!(pool.release(a), Some("albedo"));
//! assert!(pool.get(a).is_none()); // stale
//!
//! let c = pool.obtain("depth").unwrap();
//! assert_eq!(c.index(), a.index()); // slot reused...
//! assert_ne!(c, a); // ...under a new generation
//! assert_eq!(pool.get(b), Some(&"normals"));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A typed, generation-checked reference into a [`ResourcePool<T>`].
///
/// Handles are plain values: copying one does not keep the resource alive,
/// and a handle whose resource was released simply stops resolving.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The reserved "no resource" handle.
    pub const INVALID: Self = Self {
        index: u32::MAX,
        generation: 0,
        _marker: PhantomData,
    };

    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index inside the owning pool.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the handle was issued with.
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Returns `false` only for [`Handle::INVALID`].
    ///
    /// A valid-looking handle may still be stale; only the pool can tell.
    pub const fn is_valid(self) -> bool {
        self.index != u32::MAX
    }
}

// Manual impls so `T` does not need to implement these traits.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Handle({}v{})", self.index, self.generation)
        } else {
            write!(f, "Handle(INVALID)")
        }
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A fixed-capacity arena of `T` addressed by [`Handle<T>`].
pub struct ResourcePool<T> {
    slots: Vec<Slot<T>>,
    /// Stack of free slot indices; the top is handed out next.
    free_indices: Vec<u32>,
    used_indices: usize,
}

impl<T> ResourcePool<T> {
    /// Creates a pool with `capacity` slots, all free.
    pub fn new(capacity: u32) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                value: None,
            })
            .collect();
        // Reverse so that slot 0 is handed out first.
        let free_indices = (0..capacity).rev().collect();
        Self {
            slots,
            free_indices,
            used_indices: 0,
        }
    }

    /// Stores `value` in a free slot and returns its handle.
    ///
    /// Returns `None` when the pool is exhausted.
    pub fn obtain(&mut self, value: T) -> Option<Handle<T>> {
        let Some(index) = self.free_indices.pop() else {
            log::error!(
                "ResourcePool<{}>: no more free slots (capacity {})",
                std::any::type_name::<T>(),
                self.slots.len()
            );
            return None;
        };
        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.value.is_none());
        slot.value = Some(value);
        self.used_indices += 1;
        Some(Handle::new(index, slot.generation))
    }

    fn slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    /// Returns the value behind `handle`, or `None` if it is invalid or stale.
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Whether `handle` currently resolves to a live value.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some()
    }

    /// Removes the value behind `handle` and recycles its slot.
    ///
    /// The slot generation is bumped, so every copy of `handle` goes stale.
    /// Releasing a stale or invalid handle does nothing and returns `None`.
    pub fn release(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_indices.push(handle.index);
        self.used_indices -= 1;
        Some(value)
    }

    /// Releases every live value, returning them in slot order.
    pub fn release_all(&mut self) -> Vec<T> {
        let mut released = Vec::with_capacity(self.used_indices);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_indices.push(index as u32);
                released.push(value);
            }
        }
        self.used_indices = 0;
        released
    }

    /// Iterates over live values together with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }

    /// Mutable variant of [`iter`](Self::iter).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|value| (Handle::new(index as u32, generation), value))
        })
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.used_indices
    }

    pub fn is_empty(&self) -> bool {
        self.used_indices == 0
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for ResourcePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("capacity", &self.slots.len())
            .field("used", &self.used_indices)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_obtain_hands_out_low_indices_first() {
        let mut pool = ResourcePool::new(4);
        let a = pool.obtain(1).unwrap();
        let b = pool.obtain(2).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_exhaustion_fails_closed() {
        let mut pool = ResourcePool::new(1);
        assert!(pool.obtain(1).is_some());
        assert!(pool.obtain(2).is_none());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_stale_handle_rejected_after_reuse() {
        let mut pool = ResourcePool::new(1);
        let old = pool.obtain("old").unwrap();
        assert_eq!(pool.release(old), Some("old"));

        let new = pool.obtain("new").unwrap();
        assert_eq!(new.index(), old.index());
        assert!(pool.get(old).is_none());
        assert!(pool.get_mut(old).is_none());
        assert!(pool.release(old).is_none());
        assert_eq!(pool.get(new), Some(&"new"));
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool = ResourcePool::new(2);
        let h = pool.obtain(5).unwrap();
        assert_eq!(pool.release(h), Some(5));
        assert_eq!(pool.release(h), None);
        assert_eq!(pool.len(), 0);
        // Free list must not contain the index twice.
        let a = pool.obtain(1).unwrap();
        let b = pool.obtain(2).unwrap();
        assert_ne!(a.index(), b.index());
        assert!(pool.obtain(3).is_none());
    }

    #[test]
    fn test_invalid_handle() {
        let pool = ResourcePool::<u32>::new(4);
        assert!(!Handle::<u32>::INVALID.is_valid());
        assert!(pool.get(Handle::INVALID).is_none());
        assert_eq!(Handle::<u32>::default(), Handle::INVALID);
    }

    #[test]
    fn test_live_handles_never_share_a_slot() {
        let mut pool = ResourcePool::new(8);
        let mut live = Vec::new();
        // Interleave obtains and releases.
        for step in 0..64u32 {
            if step % 3 == 2 && !live.is_empty() {
                let h = live.remove((step as usize) % live.len());
                pool.release(h);
            } else if let Some(h) = pool.obtain(step) {
                live.push(h);
            }
            let indices: HashSet<u32> = live.iter().map(|h| h.index()).collect();
            assert_eq!(indices.len(), live.len());
            assert_eq!(pool.len(), live.len());
        }
    }

    #[test]
    fn test_release_all_invalidates_everything() {
        let mut pool = ResourcePool::new(3);
        let handles: Vec<_> = (0..3).map(|i| pool.obtain(i).unwrap()).collect();
        assert_eq!(pool.release_all(), vec![0, 1, 2]);
        assert!(pool.is_empty());
        for h in handles {
            assert!(!pool.contains(h));
        }
        assert!(pool.obtain(9).is_some());
    }

    #[test]
    fn test_iter_reports_current_handles() {
        let mut pool = ResourcePool::new(3);
        let a = pool.obtain('a').unwrap();
        let b = pool.obtain('b').unwrap();
        pool.release(a);
        let items: Vec<_> = pool.iter().collect();
        assert_eq!(items, vec![(b, &'b')]);

        for (_, value) in pool.iter_mut() {
            *value = 'z';
        }
        assert_eq!(pool.get(b), Some(&'z'));
    }

    #[test]
    fn test_debug_format() {
        let h = Handle::<u8>::new(3, 7);
        assert_eq!(format!("{h:?}"), "Handle(3v7)");
        assert_eq!(format!("{:?}", Handle::<u8>::INVALID), "Handle(INVALID)");
    }
}
