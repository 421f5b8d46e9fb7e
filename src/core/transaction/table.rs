// src/core/transaction/table.rs

//! The tag -> transaction table shared by the send path and the dispatcher.

use super::Transaction;
use crate::core::errors::{IppError, Result};
use crate::core::tags::Tag;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Tracks every transaction the caller has not yet removed.
///
/// Insertion order is preserved, which gives the dispatcher a notion of the
/// "oldest outstanding" transaction. Nothing is evicted automatically; long
/// running callers bound growth with [`TransactionTable::evict_finished`].
///
/// Once [`TransactionTable::close_all`] has run the table stays closed and
/// refuses new transactions.
#[derive(Debug, Default)]
pub struct TransactionTable {
    entries: Mutex<IndexMap<Tag, Arc<Transaction>>>,
    /// Only written while `entries` is locked.
    closed: AtomicBool,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transaction under its tag. A finished transaction holding
    /// the same tag (left over from before a wraparound or a session reset)
    /// is replaced; an unfinished one is an error. A closed table rejects
    /// everything with [`IppError::ConnectionClosed`].
    pub fn insert(&self, transaction: Arc<Transaction>) -> Result<()> {
        let tag = transaction.tag();
        let mut entries = self.entries.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(IppError::ConnectionClosed);
        }
        if let Some(existing) = entries.get(&tag) {
            if !existing.is_terminal() {
                return Err(IppError::TagInUse(tag));
            }
            debug!("Replacing finished transaction {} in the table.", tag);
            entries.shift_remove(&tag);
        }
        entries.insert(tag, transaction);
        Ok(())
    }

    pub fn get(&self, tag: &Tag) -> Option<Arc<Transaction>> {
        self.entries.lock().get(tag).cloned()
    }

    /// Removes a transaction. If it is still running, its pending awaitables
    /// resolve with [`IppError::Abandoned`] and later replies for the tag are
    /// dropped as unknown.
    pub fn remove(&self, tag: &Tag) -> Option<Arc<Transaction>> {
        let removed = self.entries.lock().shift_remove(tag);
        if let Some(txn) = &removed
            && !txn.is_terminal()
        {
            txn.abandon();
        }
        removed
    }

    /// Drops every completed or failed transaction. Returns how many went.
    pub fn evict_finished(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, txn| !txn.is_terminal());
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// All tracked transactions, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<Transaction>> {
        self.entries.lock().values().cloned().collect()
    }

    /// The oldest unfinished transaction that someone is waiting on, or the
    /// oldest unfinished one if nobody is waiting.
    pub fn oldest_outstanding(&self) -> Option<Arc<Transaction>> {
        let entries = self.entries.lock();
        let mut fallback = None;
        for txn in entries.values() {
            if txn.is_terminal() {
                continue;
            }
            if txn.has_pending_awaiters() {
                return Some(Arc::clone(txn));
            }
            if fallback.is_none() {
                fallback = Some(Arc::clone(txn));
            }
        }
        fallback
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Empties and closes the table, resolving every pending awaitable with
    /// [`IppError::ConnectionClosed`].
    pub fn close_all(&self) {
        let drained: Vec<_> = {
            let mut entries = self.entries.lock();
            self.closed.store(true, Ordering::Release);
            entries.drain(..).map(|(_, txn)| txn).collect()
        };
        if !drained.is_empty() {
            debug!("Closing {} tracked transaction(s).", drained.len());
        }
        for txn in drained {
            txn.close();
        }
    }
}
