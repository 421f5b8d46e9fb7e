// src/core/transaction/observers.rs

//! A typed registry of lifecycle callbacks, one list per event kind.

use super::Transaction;

/// The lifecycle events a transaction can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Send,
    Ack,
    Data,
    Error,
    Complete,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Send,
        EventKind::Ack,
        EventKind::Data,
        EventKind::Error,
        EventKind::Complete,
    ];
}

/// Whether an observer is dropped after its first invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverMode {
    Once,
    Persistent,
}

/// Observers run on the receive loop and must not block.
pub type Callback = Box<dyn FnMut(&Transaction) + Send>;

pub(crate) struct Observer {
    callback: Callback,
    mode: ObserverMode,
}

impl Observer {
    pub(crate) fn invoke(&mut self, transaction: &Transaction) {
        (self.callback)(transaction);
    }

    pub(crate) fn is_persistent(&self) -> bool {
        self.mode == ObserverMode::Persistent
    }
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    send: Vec<Observer>,
    ack: Vec<Observer>,
    data: Vec<Observer>,
    error: Vec<Observer>,
    complete: Vec<Observer>,
}

impl ObserverRegistry {
    fn slot(&mut self, kind: EventKind) -> &mut Vec<Observer> {
        match kind {
            EventKind::Send => &mut self.send,
            EventKind::Ack => &mut self.ack,
            EventKind::Data => &mut self.data,
            EventKind::Error => &mut self.error,
            EventKind::Complete => &mut self.complete,
        }
    }

    pub(crate) fn register(&mut self, kind: EventKind, callback: Callback, mode: ObserverMode) {
        self.slot(kind).push(Observer { callback, mode });
    }

    /// Removes and returns every observer of `kind` so they can be invoked
    /// without holding the transaction lock.
    pub(crate) fn take(&mut self, kind: EventKind) -> Vec<Observer> {
        std::mem::take(self.slot(kind))
    }

    /// Puts back the observers that survived an invocation round. Observers
    /// registered while the round was running keep their place after them.
    pub(crate) fn restore(&mut self, kind: EventKind, mut survivors: Vec<Observer>) {
        let slot = self.slot(kind);
        survivors.append(slot);
        *slot = survivors;
    }

    pub(crate) fn clear(&mut self, kind: EventKind) {
        self.slot(kind).clear();
    }

    pub(crate) fn clear_all(&mut self) {
        for kind in EventKind::ALL {
            self.clear(kind);
        }
    }

    pub(crate) fn len(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Send => self.send.len(),
            EventKind::Ack => self.ack.len(),
            EventKind::Data => self.data.len(),
            EventKind::Error => self.error.len(),
            EventKind::Complete => self.complete.len(),
        }
    }
}
