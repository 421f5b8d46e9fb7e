// src/core/dispatcher.rs

//! Routes decoded inbound messages to the transaction they belong to.

use crate::core::protocol::{Response, ResponseKind};
use crate::core::tags::Tag;
use crate::core::transaction::{Transaction, TransactionTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// How an `!` line that does not name a tracked transaction is handled.
///
/// Not every server echoes the failing command's tag on its error line (some
/// use `00000`/`E0000`, some reuse the tag of whatever is queued).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorRouting {
    /// Deliver it to the oldest unfinished transaction, preferring one that
    /// has a pending awaitable.
    #[default]
    Lenient,
    /// Only the transaction named by the line's tag receives the error.
    Strict,
}

/// What happened to a dispatched message. Mostly useful for tests and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Applied to the transaction with the message's own tag.
    Matched,
    /// An error line applied to a different transaction under lenient routing.
    Redirected(Tag),
    /// No transaction took it.
    Dropped,
}

#[derive(Debug)]
pub struct Dispatcher {
    table: Arc<TransactionTable>,
    routing: ErrorRouting,
}

impl Dispatcher {
    pub fn new(table: Arc<TransactionTable>, routing: ErrorRouting) -> Self {
        Self { table, routing }
    }

    pub fn routing(&self) -> ErrorRouting {
        self.routing
    }

    /// Applies one inbound message to the transaction table.
    pub fn dispatch(&self, response: Response) -> Routed {
        let Response { tag, kind, raw, .. } = response;
        match kind {
            ResponseKind::Error => self.dispatch_error(tag, raw),
            kind => self.dispatch_reply(tag, kind, raw),
        }
    }

    fn dispatch_reply(&self, tag: Tag, kind: ResponseKind, raw: String) -> Routed {
        let Some(txn) = self.table.get(&tag) else {
            debug!("Dropping reply for unknown tag {}: {:?}", tag, raw);
            return Routed::Dropped;
        };

        match kind {
            ResponseKind::Ack => txn.handle_ack(),
            ResponseKind::Data => txn.handle_data(raw),
            ResponseKind::Complete => txn.handle_complete(),
            ResponseKind::Error => return apply_error(&txn, raw),
        }
        Routed::Matched
    }

    /// An error line naming a tracked transaction always stays with it, even
    /// if that transaction has already finished. Only lines with an unknown
    /// or reserved tag are candidates for lenient redirection.
    fn dispatch_error(&self, tag: Tag, raw: String) -> Routed {
        if !tag.is_unsolicited()
            && let Some(txn) = self.table.get(&tag)
        {
            debug!("Error for {}: {}", tag, raw);
            return apply_error(&txn, raw);
        }

        if self.routing == ErrorRouting::Strict {
            warn!("Dropping error line with no matching command: {:?}", raw);
            return Routed::Dropped;
        }

        match self.table.oldest_outstanding() {
            Some(txn) => {
                warn!(
                    "Error line {:?} does not name a tracked command; delivering it to {} ({}).",
                    raw,
                    txn.tag(),
                    txn.command()
                );
                let target = txn.tag();
                if txn.handle_error(raw) {
                    Routed::Redirected(target)
                } else {
                    Routed::Dropped
                }
            }
            None => {
                warn!("Dropping error line with no outstanding command: {:?}", raw);
                Routed::Dropped
            }
        }
    }
}

fn apply_error(txn: &Transaction, raw: String) -> Routed {
    if txn.handle_error(raw) {
        Routed::Matched
    } else {
        Routed::Dropped
    }
}
