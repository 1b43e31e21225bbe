//! Debounced delayed actions
//!
//! Generation-guarded scheduling: arm once, and when the timer fires, check
//! whether a newer request superseded it. Replaces "try again in 50 ms"
//! recursive re-scheduling, which has no upper bound.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Token returned by [`Debouncer::arm`]; pass it back to
/// [`Debouncer::is_current`] when the timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Supersession guard for one debounced action.
///
/// Clone is cheap; all clones share the generation counter, so the timer
/// task can hold one while the event loop arms through another.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new request, superseding every previously armed one.
    pub fn arm(&self) -> Generation {
        Generation(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `token` is still the newest request. Call when the timer
    /// fires; a `false` means drop the action without re-arming.
    pub fn is_current(&self, token: Generation) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armed_token_is_current() {
        let debouncer = Debouncer::new();
        let token = debouncer.arm();
        assert!(debouncer.is_current(token));
    }

    #[test]
    fn test_rearm_supersedes() {
        let debouncer = Debouncer::new();
        let first = debouncer.arm();
        let second = debouncer.arm();
        assert!(!debouncer.is_current(first));
        assert!(debouncer.is_current(second));
    }

    #[test]
    fn test_clones_share_generation() {
        let debouncer = Debouncer::new();
        let timer_side = debouncer.clone();
        let token = debouncer.arm();
        assert!(timer_side.is_current(token));
        debouncer.arm();
        assert!(!timer_side.is_current(token));
    }
}
