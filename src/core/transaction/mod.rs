// src/core/transaction/mod.rs

//! The per-command state machine.
//!
//! A `Transaction` is created when a command is issued and is then mutated by
//! exactly two parties: the connection's send path (`Created -> Sent`) and the
//! dispatcher (every inbound reply). Callers observe it through callbacks
//! registered with [`Transaction::on`] or through the one-shot awaitables
//! returned by `on_send`, `on_ack`, `on_data`, `on_error` and `on_complete`.

pub mod observers;
pub mod table;

pub use observers::{Callback, EventKind, ObserverMode};
pub use table::TransactionTable;

use self::observers::ObserverRegistry;
use crate::core::errors::{CommandError, IppError, Result};
use crate::core::protocol::{ServerError, decode_response};
use crate::core::tags::Tag;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::debug;

/// The lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Tag allocated, bytes not yet flushed.
    Created,
    Sent,
    Acknowledged,
    /// Terminal. The server rejected or aborted the command.
    Error,
    /// Terminal. The command finished successfully.
    Complete,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Error | TransactionState::Complete)
    }
}

struct Inner {
    state: TransactionState,
    data_lines: Vec<String>,
    error_lines: Vec<String>,
    observers: ObserverRegistry,
    /// Set when the owning connection is torn down.
    closed: bool,
}

/// One in-flight or finished command.
pub struct Transaction {
    tag: Tag,
    command: String,
    inner: Mutex<Inner>,
    /// Awaitables registered and not yet resolved.
    awaiters: AtomicUsize,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Transaction")
            .field("tag", &self.tag)
            .field("command", &self.command)
            .field("state", &inner.state)
            .field("data_lines", &inner.data_lines)
            .field("error_lines", &inner.error_lines)
            .finish()
    }
}

impl Transaction {
    pub fn new(tag: Tag, command: impl Into<String>) -> Self {
        Self {
            tag,
            command: command.into(),
            inner: Mutex::new(Inner {
                state: TransactionState::Created,
                data_lines: Vec::new(),
                error_lines: Vec::new(),
                observers: ObserverRegistry::default(),
                closed: false,
            }),
            awaiters: AtomicUsize::new(0),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn state(&self) -> TransactionState {
        self.inner.lock().state
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// The raw `#` lines received so far, in arrival order.
    pub fn data_lines(&self) -> Vec<String> {
        self.inner.lock().data_lines.clone()
    }

    /// The payload of every data line, with the tag and marker removed.
    pub fn data_payloads(&self) -> Vec<String> {
        self.inner
            .lock()
            .data_lines
            .iter()
            .map(|line| payload_of(line))
            .collect()
    }

    /// The raw `!` lines received so far, in arrival order.
    pub fn error_lines(&self) -> Vec<String> {
        self.inner.lock().error_lines.clone()
    }

    /// `None` while the command is still running, otherwise its typed result.
    pub fn outcome(&self) -> Option<std::result::Result<(), CommandError>> {
        let inner = self.inner.lock();
        match inner.state {
            TransactionState::Complete => Some(Ok(())),
            TransactionState::Error => Some(Err(self.command_error(&inner))),
            _ => None,
        }
    }

    /// True while at least one awaitable is waiting on this transaction.
    pub fn has_pending_awaiters(&self) -> bool {
        self.awaiters.load(Ordering::Acquire) > 0
    }

    pub fn observer_count(&self, kind: EventKind) -> usize {
        self.inner.lock().observers.len(kind)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    // --- Observers ---

    /// Registers a raw lifecycle callback.
    ///
    /// Callbacks run on the connection's receive loop (or on the sending task
    /// for `Send`) outside the transaction lock, so they may inspect the
    /// transaction, but they must return quickly.
    pub fn on<F>(&self, kind: EventKind, mode: ObserverMode, callback: F)
    where
        F: FnMut(&Transaction) + Send + 'static,
    {
        self.inner
            .lock()
            .observers
            .register(kind, Box::new(callback), mode);
    }

    /// Removes every observer for `kind`, or for all kinds when `None`.
    pub fn clear_observers(&self, kind: Option<EventKind>) {
        let mut inner = self.inner.lock();
        match kind {
            Some(kind) => inner.observers.clear(kind),
            None => inner.observers.clear_all(),
        }
    }

    // --- Awaitables ---

    pub fn on_send(self: &Arc<Self>) -> Awaitable {
        self.awaitable(EventKind::Send)
    }

    /// Resolves on `&`, or on `%` when the server completes without
    /// acknowledging first.
    pub fn on_ack(self: &Arc<Self>) -> Awaitable {
        self.awaitable(EventKind::Ack)
    }

    /// Resolves once at least one data line is present, or on completion.
    /// Use a persistent [`EventKind::Data`] observer to follow every line.
    pub fn on_data(self: &Arc<Self>) -> Awaitable {
        self.awaitable(EventKind::Data)
    }

    /// Resolves with the transaction when it fails, and with
    /// [`IppError::CompletedWithoutError`] if it completes instead.
    pub fn on_error(self: &Arc<Self>) -> Awaitable {
        self.awaitable(EventKind::Error)
    }

    /// Resolves with the transaction on `%`, or with [`IppError::Command`]
    /// carrying the accumulated error lines on `!`.
    pub fn on_complete(self: &Arc<Self>) -> Awaitable {
        self.awaitable(EventKind::Complete)
    }

    fn awaitable(self: &Arc<Self>, wanted: EventKind) -> Awaitable {
        let (tx, rx) = oneshot::channel();
        let awaitable = Awaitable {
            transaction: Arc::clone(self),
            rx,
        };

        let mut inner = self.inner.lock();
        if let Some(result) = self.resolved(&inner, wanted) {
            let _ = tx.send(result);
            return awaitable;
        }

        self.awaiters.fetch_add(1, Ordering::AcqRel);
        let slot = Arc::new(Mutex::new(Some(tx)));
        let mut triggers = vec![wanted];
        for kind in [EventKind::Error, EventKind::Complete] {
            if kind != wanted {
                triggers.push(kind);
            }
        }
        for fired in triggers {
            let slot = Arc::clone(&slot);
            inner.observers.register(
                fired,
                Box::new(move |txn: &Transaction| {
                    if let Some(tx) = slot.lock().take() {
                        let _ = txn.awaiters.fetch_update(
                            Ordering::AcqRel,
                            Ordering::Acquire,
                            |n| n.checked_sub(1),
                        );
                        let _ = tx.send(txn.result_for(fired, wanted));
                    }
                }),
                ObserverMode::Once,
            );
        }
        awaitable
    }

    /// The immediate result for an awaitable whose event has already passed.
    fn resolved(&self, inner: &Inner, wanted: EventKind) -> Option<Result<()>> {
        if inner.closed {
            return Some(Err(IppError::ConnectionClosed));
        }
        let state = inner.state;
        let happened = match wanted {
            EventKind::Send => state != TransactionState::Created,
            EventKind::Ack => matches!(
                state,
                TransactionState::Acknowledged | TransactionState::Complete
            ),
            EventKind::Data => {
                !inner.data_lines.is_empty() || state == TransactionState::Complete
            }
            EventKind::Error => state == TransactionState::Error,
            EventKind::Complete => state == TransactionState::Complete,
        };
        if happened {
            return Some(Ok(()));
        }
        match state {
            TransactionState::Error => Some(Err(self.command_error(inner).into())),
            TransactionState::Complete => Some(Err(IppError::CompletedWithoutError(self.tag))),
            _ => None,
        }
    }

    fn result_for(&self, fired: EventKind, wanted: EventKind) -> Result<()> {
        if fired == wanted {
            return Ok(());
        }
        match (fired, wanted) {
            (EventKind::Error, _) => Err(self.command_error(&self.inner.lock()).into()),
            (EventKind::Complete, EventKind::Error) => {
                Err(IppError::CompletedWithoutError(self.tag))
            }
            _ => Ok(()),
        }
    }

    fn command_error(&self, inner: &Inner) -> CommandError {
        let server = inner
            .error_lines
            .first()
            .map(|line| ServerError::parse(&payload_of(line)))
            .unwrap_or_default();
        CommandError {
            tag: self.tag,
            command: self.command.clone(),
            lines: inner.error_lines.clone(),
            server,
        }
    }

    // --- Transitions ---

    /// `Created -> Sent`. Returns false if the transaction had already moved
    /// on, which happens when a reply overtakes the writer.
    pub(crate) fn mark_sent(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state != TransactionState::Created {
                return false;
            }
            inner.state = TransactionState::Sent;
        }
        self.fire(EventKind::Send);
        true
    }

    pub(crate) fn handle_ack(&self) {
        let implicit_send = {
            let mut inner = self.inner.lock();
            match inner.state {
                TransactionState::Created | TransactionState::Sent => {
                    let implicit = inner.state == TransactionState::Created;
                    inner.state = TransactionState::Acknowledged;
                    implicit
                }
                state => {
                    debug!("Ignoring ack for {} in state {:?}.", self.tag, state);
                    return;
                }
            }
        };
        if implicit_send {
            self.fire(EventKind::Send);
        }
        self.fire(EventKind::Ack);
    }

    pub(crate) fn handle_data(&self, line: String) {
        let implicit_send = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                debug!("Ignoring data for {} in state {:?}.", self.tag, inner.state);
                return;
            }
            let implicit = inner.state == TransactionState::Created;
            if implicit {
                inner.state = TransactionState::Sent;
            }
            inner.data_lines.push(line);
            implicit
        };
        if implicit_send {
            self.fire(EventKind::Send);
        }
        self.fire(EventKind::Data);
    }

    pub(crate) fn handle_complete(&self) {
        let implicit_send = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                debug!(
                    "Ignoring completion for {} in state {:?}.",
                    self.tag, inner.state
                );
                return;
            }
            let implicit = inner.state == TransactionState::Created;
            inner.state = TransactionState::Complete;
            implicit
        };
        if implicit_send {
            self.fire(EventKind::Send);
        }
        self.fire(EventKind::Complete);
        self.finish();
    }

    /// Applies an `!` line. A transaction that already failed keeps
    /// collecting further error lines without firing again; a completed one
    /// ignores them. Returns false if the line was ignored.
    pub(crate) fn handle_error(&self, line: String) -> bool {
        let implicit_send = {
            let mut inner = self.inner.lock();
            match inner.state {
                TransactionState::Error => {
                    debug!("Additional error line for {}: {}", self.tag, line);
                    inner.error_lines.push(line);
                    return true;
                }
                TransactionState::Complete => {
                    debug!("Ignoring error for {} after completion.", self.tag);
                    return false;
                }
                _ => {}
            }
            let implicit = inner.state == TransactionState::Created;
            inner.state = TransactionState::Error;
            inner.error_lines.push(line);
            implicit
        };
        if implicit_send {
            self.fire(EventKind::Send);
        }
        self.fire(EventKind::Error);
        self.finish();
        true
    }

    /// The connection is gone: every pending awaitable resolves with
    /// [`IppError::ConnectionClosed`].
    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.observers.clear_all();
        self.awaiters.store(0, Ordering::Release);
    }

    /// The transaction was evicted while unfinished: pending awaitables
    /// resolve with [`IppError::Abandoned`].
    pub(crate) fn abandon(&self) {
        let mut inner = self.inner.lock();
        inner.observers.clear_all();
        self.awaiters.store(0, Ordering::Release);
    }

    /// No further events can fire once terminal.
    fn finish(&self) {
        self.inner.lock().observers.clear_all();
    }

    fn fire(&self, kind: EventKind) {
        let mut batch = self.inner.lock().observers.take(kind);
        if batch.is_empty() {
            return;
        }
        for observer in batch.iter_mut() {
            observer.invoke(self);
        }
        batch.retain(|o| o.is_persistent());
        self.inner.lock().observers.restore(kind, batch);
    }
}

/// Extracts the payload from a raw reply line, falling back to the whole line.
fn payload_of(line: &str) -> String {
    decode_response(line)
        .map(|r| r.payload)
        .unwrap_or_else(|_| line.to_string())
}

/// A one-shot handle on a lifecycle event of a transaction.
///
/// Resolves exactly once. If the connection is torn down first it resolves
/// with [`IppError::ConnectionClosed`]; if the transaction is evicted while
/// unfinished, with [`IppError::Abandoned`].
#[must_use = "awaitables do nothing unless awaited"]
pub struct Awaitable {
    transaction: Arc<Transaction>,
    rx: oneshot::Receiver<Result<()>>,
}

impl Awaitable {
    pub fn transaction(&self) -> &Arc<Transaction> {
        &self.transaction
    }
}

impl Future for Awaitable {
    type Output = Result<Arc<Transaction>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(Ok(()))) => Poll::Ready(Ok(Arc::clone(&self.transaction))),
            Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(e)),
            Poll::Ready(Err(_)) => {
                let err = if self.transaction.is_closed() {
                    IppError::ConnectionClosed
                } else {
                    IppError::Abandoned(self.transaction.tag())
                };
                Poll::Ready(Err(err))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
