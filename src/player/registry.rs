//! Player registry (§2, §4.3 `create`/`remove`).
//!
//! Manages up to `max_players` players at once. A plain, bounds-checked
//! owned collection — `Vec<Option<T>>` of reusable slots, so a freed
//! handle can be recycled without shifting everyone else's handle.

use crate::error::{Error, Result};

/// A stable handle into a [`PlayerRegistry`], assigned at `insert` and
/// valid until the corresponding `remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerHandle(u32);

impl PlayerHandle {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Owns up to `max_players` slots of `T` (concretely, `Player`). §9's
/// open question about library-wide shutdown on last removal is resolved
/// by an injectable hook, run when `remove` empties the registry; the
/// default is a no-op, so callers who don't care about process-wide
/// shutdown don't pay for it.
pub struct PlayerRegistry<T> {
    slots: Vec<Option<T>>,
    max_players: usize,
    in_use: usize,
    on_empty: Box<dyn FnMut() + Send>,
}

impl<T> PlayerRegistry<T> {
    pub fn new(max_players: usize) -> Self {
        Self::with_shutdown_hook(max_players, || {})
    }

    pub fn with_shutdown_hook(max_players: usize, hook: impl FnMut() + Send + 'static) -> Self {
        Self {
            slots: Vec::new(),
            max_players,
            in_use: 0,
            on_empty: Box::new(hook),
        }
    }

    /// Whether `insert` would currently succeed.
    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(|s| s.is_none()) || self.slots.len() < self.max_players
    }

    /// Reserve a slot for an already-fully-constructed `value`. The
    /// control surface's `create()` builds and activates the audio-graph
    /// client first (so a failure there never leaves a half-initialized
    /// player in the registry) and only calls this once that succeeds.
    pub fn insert(&mut self, value: T) -> Result<PlayerHandle> {
        if let Some(idx) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[idx] = Some(value);
            self.in_use += 1;
            return Ok(PlayerHandle(idx as u32));
        }
        if self.slots.len() < self.max_players {
            self.slots.push(Some(value));
            self.in_use += 1;
            return Ok(PlayerHandle((self.slots.len() - 1) as u32));
        }
        Err(Error::NoFreeSlot(self.max_players))
    }

    pub fn get(&self, handle: PlayerHandle) -> Result<&T> {
        self.slots
            .get(handle.0 as usize)
            .and_then(|s| s.as_ref())
            .ok_or(Error::BadHandle(handle))
    }

    pub fn get_mut(&mut self, handle: PlayerHandle) -> Result<&mut T> {
        self.slots
            .get_mut(handle.0 as usize)
            .and_then(|s| s.as_mut())
            .ok_or(Error::BadHandle(handle))
    }

    /// Free the slot, returning the removed value. Runs the shutdown hook
    /// once the registry becomes empty (§4.3 `remove`).
    pub fn remove(&mut self, handle: PlayerHandle) -> Result<T> {
        let slot = self
            .slots
            .get_mut(handle.0 as usize)
            .ok_or(Error::BadHandle(handle))?;
        let value = slot.take().ok_or(Error::BadHandle(handle))?;
        self.in_use -= 1;
        if self.in_use == 0 {
            (self.on_empty)();
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.in_use
    }

    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn insert_and_fetch() {
        let mut reg: PlayerRegistry<&str> = PlayerRegistry::new(4);
        let h = reg.insert("a").unwrap();
        assert_eq!(*reg.get(h).unwrap(), "a");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_handle_is_bad_handle() {
        let reg: PlayerRegistry<&str> = PlayerRegistry::new(4);
        let bogus = PlayerHandle(7);
        assert!(matches!(reg.get(bogus), Err(Error::BadHandle(_))));
    }

    #[test]
    fn freed_slot_is_recycled() {
        let mut reg: PlayerRegistry<&str> = PlayerRegistry::new(4);
        let h1 = reg.insert("a").unwrap();
        reg.remove(h1).unwrap();
        let h2 = reg.insert("b").unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn no_free_slot_past_capacity() {
        let mut reg: PlayerRegistry<&str> = PlayerRegistry::new(1);
        reg.insert("a").unwrap();
        assert!(!reg.has_free_slot());
        assert!(matches!(reg.insert("b"), Err(Error::NoFreeSlot(1))));
    }

    #[test]
    fn shutdown_hook_runs_only_when_registry_becomes_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let mut reg: PlayerRegistry<&str> =
            PlayerRegistry::with_shutdown_hook(4, move || { calls_clone.fetch_add(1, Ordering::SeqCst); });
        let h1 = reg.insert("a").unwrap();
        let h2 = reg.insert("b").unwrap();
        reg.remove(h1).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        reg.remove(h2).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
