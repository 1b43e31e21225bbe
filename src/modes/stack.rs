//! Activation stack for modes and views
//!
//! One axis (modes for knobs/buttons, views for the pad grid) is governed by
//! one `ActivationStack`. Permanent switches drop the history; temporary
//! overlays push onto a real stack so nesting restores in order.

use std::fmt::Debug;

type Listener<T> = Box<dyn Fn(Option<T>, T) + Send>;

/// Tracks which identifier is foreground on one activation axis.
///
/// Listeners observe every transition as `(previous, new)` synchronously,
/// inside the mutating call — callers rely on seeing the transition before
/// the call returns, not on a deferred notification.
pub struct ActivationStack<T: Copy + Eq + Debug> {
    current: Option<T>,
    previous: Vec<T>,
    listeners: Vec<Listener<T>>,
}

impl<T: Copy + Eq + Debug> ActivationStack<T> {
    pub fn new() -> Self {
        Self {
            current: None,
            previous: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Register a transition listener. Listeners cannot be removed; stacks
    /// live exactly as long as their device session.
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(Option<T>, T) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self, previous: Option<T>, new: T) {
        for listener in &self.listeners {
            listener(previous, new);
        }
    }

    /// Permanent switch: makes `id` current and clears any overlay history.
    pub fn set_active(&mut self, id: T) {
        let previous = self.current;
        self.previous.clear();
        self.current = Some(id);
        self.notify(previous, id);
    }

    /// Temporary overlay: remembers the current id for `restore`. Calling
    /// this while already overridden nests.
    pub fn set_temporary(&mut self, id: T) {
        let previous = self.current;
        if let Some(current) = self.current {
            self.previous.push(current);
        }
        self.current = Some(id);
        self.notify(previous, id);
    }

    /// Pop back to the id remembered by the last `set_temporary`.
    /// A no-op when no temporary activation is in effect.
    pub fn restore(&mut self) {
        let Some(restored) = self.previous.pop() else {
            return;
        };
        let previous = self.current;
        self.current = Some(restored);
        self.notify(previous, restored);
    }

    pub fn active(&self) -> Option<T> {
        self.current
    }

    pub fn is_active(&self, id: T) -> bool {
        self.current == Some(id)
    }

    /// Whether a temporary overlay is currently in effect.
    pub fn is_temporary(&self) -> bool {
        !self.previous.is_empty()
    }
}

impl<T: Copy + Eq + Debug> Default for ActivationStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_restore_law() {
        let mut stack = ActivationStack::new();
        stack.set_active('a');
        stack.set_temporary('b');
        assert_eq!(stack.active(), Some('b'));
        assert!(stack.is_temporary());

        stack.restore();
        assert_eq!(stack.active(), Some('a'));
        assert!(!stack.is_temporary());

        // Restoring with nothing remembered is a no-op.
        stack.restore();
        assert_eq!(stack.active(), Some('a'));
    }

    #[test]
    fn test_set_active_clears_overlay_history() {
        let mut stack = ActivationStack::new();
        stack.set_active('a');
        stack.set_temporary('b');
        stack.set_active('c');
        assert!(!stack.is_temporary());

        // 'a' is forgotten: the switch to 'c' was permanent.
        stack.restore();
        assert_eq!(stack.active(), Some('c'));
    }

    #[test]
    fn test_nested_temporary_restores_in_order() {
        let mut stack = ActivationStack::new();
        stack.set_active('a');
        stack.set_temporary('b');
        stack.set_temporary('c');
        assert_eq!(stack.active(), Some('c'));

        stack.restore();
        assert_eq!(stack.active(), Some('b'));
        stack.restore();
        assert_eq!(stack.active(), Some('a'));
        assert!(!stack.is_temporary());
    }

    #[test]
    fn test_listener_sees_transition_synchronously() {
        let seen: Arc<Mutex<Vec<(Option<char>, char)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let mut stack = ActivationStack::new();
        stack.add_listener(move |prev, new| {
            seen_clone.lock().unwrap().push((prev, new));
        });

        stack.set_active('a');
        stack.set_temporary('b');
        // Both transitions observed before this point, in call order.
        let log = seen.lock().unwrap();
        assert_eq!(log.as_slice(), &[(None, 'a'), (Some('a'), 'b')]);
    }

    #[test]
    fn test_listener_fires_on_restore() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let mut stack = ActivationStack::new();
        stack.add_listener(move |_, _| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        stack.set_active('a');
        stack.set_temporary('b');
        stack.restore();
        assert_eq!(count.load(Ordering::SeqCst), 3);

        // No transition happens on an empty restore, so no notification.
        stack.restore();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_queries() {
        let mut stack = ActivationStack::new();
        assert_eq!(stack.active(), None);
        assert!(!stack.is_active('a'));

        stack.set_active('a');
        assert!(stack.is_active('a'));
        assert!(!stack.is_active('b'));
    }
}
