//! Nesting counter for interrupting, higher-priority sequences.

use tracing::{debug, warn};

/// Notification sent to priority listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityEvent {
    /// Depth left zero.
    Start,
    /// Depth moved from `previous` to `current`.
    Change { previous: u32, current: u32 },
    /// Depth returned to zero.
    End,
}

/// Handle returned by [`PriorityDepth::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(PriorityEvent)>;

/// Owned by the [`Engine`](crate::Engine); steps move it with
/// `priority up` / `priority down`.
#[derive(Default)]
pub struct PriorityDepth {
    depth: u32,
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl PriorityDepth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    pub fn subscribe(&mut self, listener: impl FnMut(PriorityEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    pub fn increase(&mut self) {
        let previous = self.depth;
        self.depth += 1;
        if previous == 0 {
            self.notify(PriorityEvent::Start);
        }
        self.notify(PriorityEvent::Change {
            previous,
            current: self.depth,
        });
    }

    /// Decreasing at depth zero is ignored.
    pub fn decrease(&mut self) {
        if self.depth == 0 {
            warn!("priority depth decreased below zero, ignored");
            return;
        }
        let previous = self.depth;
        self.depth -= 1;
        self.notify(PriorityEvent::Change {
            previous,
            current: self.depth,
        });
        if self.depth == 0 {
            self.notify(PriorityEvent::End);
        }
    }

    fn notify(&mut self, event: PriorityEvent) {
        debug!(?event, "priority");
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for PriorityDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityDepth")
            .field("depth", &self.depth)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(depth: &mut PriorityDepth) -> (ListenerId, Rc<RefCell<Vec<PriorityEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let id = depth.subscribe(move |event| sink.borrow_mut().push(event));
        (id, events)
    }

    #[test]
    fn test_nested_increase_decrease() {
        let mut depth = PriorityDepth::new();
        let (_, events) = recorder(&mut depth);
        for _ in 0..3 {
            depth.increase();
        }
        for _ in 0..3 {
            depth.decrease();
        }
        let events = events.borrow();
        let starts = events.iter().filter(|e| **e == PriorityEvent::Start).count();
        let ends = events.iter().filter(|e| **e == PriorityEvent::End).count();
        let changes = events
            .iter()
            .filter(|e| matches!(e, PriorityEvent::Change { .. }))
            .count();
        assert_eq!((starts, ends, changes), (1, 1, 6));
        assert_eq!(events.first(), Some(&PriorityEvent::Start));
        assert_eq!(events.last(), Some(&PriorityEvent::End));
        assert_eq!(depth.depth(), 0);
    }

    #[test]
    fn test_decrease_at_zero_is_ignored() {
        let mut depth = PriorityDepth::new();
        let (_, events) = recorder(&mut depth);
        depth.decrease();
        assert_eq!(depth.depth(), 0);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let mut depth = PriorityDepth::new();
        let (id, events) = recorder(&mut depth);
        assert!(depth.unsubscribe(id));
        assert!(!depth.unsubscribe(id));
        depth.increase();
        assert!(events.borrow().is_empty());
        assert!(depth.is_active());
    }
}
