// src/core/mod.rs

//! The protocol engine: wire codec, tags, transactions and reply dispatch.

pub mod dispatcher;
pub mod errors;
pub mod geometry;
pub mod protocol;
pub mod tags;
pub mod transaction;

pub use dispatcher::{Dispatcher, ErrorRouting, Routed};
pub use errors::{CommandError, IppError, Result};
pub use geometry::{Csy, Float3, Matrix4};
pub use protocol::{Response, ResponseKind, ServerError};
pub use tags::{Queue, Tag, TagAllocator};
pub use transaction::{
    Awaitable, EventKind, ObserverMode, Transaction, TransactionState, TransactionTable,
};
