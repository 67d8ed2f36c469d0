//! Typed publish/subscribe channel for store notifications.
//!
//! Listeners are plain closures. The channel is single-threaded: `publish`
//! runs every subscriber synchronously, in subscription order.

use serde::Serialize;
use std::fmt;

use crate::ProgressMode;

/// Notification emitted by the progress store
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StoreEvent {
    /// The mode targeted by get/set changed
    #[serde(rename_all = "camelCase")]
    ModeSwitch {
        old_mode: ProgressMode,
        new_mode: ProgressMode,
    },
    /// Pending edits of `mode` were moved into the committed map
    Commit { mode: ProgressMode, count: usize },
    /// The data of `mode` was replaced or its pending edits discarded
    Reset { mode: ProgressMode },
}

impl StoreEvent {
    /// Event name as seen by the host page
    pub fn name(&self) -> &'static str {
        match self {
            StoreEvent::ModeSwitch { .. } => "mode-switch",
            StoreEvent::Commit { .. } => "commit",
            StoreEvent::Reset { .. } => "reset",
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

pub struct EventBus<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a listener; it stays active until unsubscribed
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn publish_reaches_all_listeners_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();

        let a = Rc::clone(&seen);
        bus.subscribe(move |e: &StoreEvent| a.borrow_mut().push(format!("a:{}", e.name())));
        let b = Rc::clone(&seen);
        bus.subscribe(move |e: &StoreEvent| b.borrow_mut().push(format!("b:{}", e.name())));

        bus.publish(&StoreEvent::Reset {
            mode: ProgressMode::Actual,
        });

        assert_eq!(*seen.borrow(), vec!["a:reset", "b:reset"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let c = Rc::clone(&count);
        let id = bus.subscribe(move |_: &StoreEvent| *c.borrow_mut() += 1);

        bus.publish(&StoreEvent::Commit {
            mode: ProgressMode::Planned,
            count: 1,
        });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&StoreEvent::Commit {
            mode: ProgressMode::Planned,
            count: 1,
        });

        assert_eq!(*count.borrow(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn mode_switch_serializes_for_host() {
        let event = StoreEvent::ModeSwitch {
            old_mode: ProgressMode::Planned,
            new_mode: ProgressMode::Actual,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"mode-switch","oldMode":"planned","newMode":"actual"}"#
        );
    }
}
