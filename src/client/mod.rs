// src/client/mod.rs

//! The high-level client: one method per I++ command, plus sequencing and
//! session helpers on top of a [`Connection`].

pub mod commands;
pub mod routines;

use crate::config::Config;
use crate::connection::Connection;
use crate::core::tags::Queue;
use crate::core::transaction::Transaction;
use crate::core::{IppError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A client bound to one I++ server.
///
/// Commands return the [`Transaction`] as soon as it is on the wire; await
/// one of its lifecycle events (`on_ack`, `on_data`, `on_complete`, ...) to
/// follow it.
#[derive(Debug)]
pub struct Client {
    config: Config,
    connection: RwLock<Option<Arc<Connection>>>,
}

impl Client {
    /// Validates `config` and connects to the server it names.
    pub async fn connect(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| IppError::Config(e.to_string()))?;
        let connection = Connection::open(&config).await?;
        Ok(Self {
            config,
            connection: RwLock::new(Some(Arc::new(connection))),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection
            .read()
            .as_ref()
            .is_some_and(|c| c.is_connected())
    }

    /// The current connection, or [`IppError::NotConnected`].
    pub fn connection(&self) -> Result<Arc<Connection>> {
        self.connection
            .read()
            .clone()
            .ok_or(IppError::NotConnected)
    }

    /// Closes the connection. Pending awaitables resolve with
    /// [`IppError::ConnectionClosed`].
    pub async fn disconnect(&self) {
        let connection = self.connection.write().take();
        if let Some(connection) = connection {
            connection.disconnect().await;
        }
    }

    /// Drops the current connection and opens a new one with a fresh
    /// transaction table and both tag pools back at 1.
    pub async fn reconnect(&self) -> Result<()> {
        self.disconnect().await;
        info!("Reconnecting to {}.", self.config.address());
        let connection = Connection::open(&self.config).await?;
        *self.connection.write() = Some(Arc::new(connection));
        Ok(())
    }

    /// Sends an arbitrary command on the normal queue.
    pub async fn command(&self, command: &str) -> Result<Arc<Transaction>> {
        self.connection()?.send(command, Queue::Normal).await
    }

    /// Sends an arbitrary command on the fast queue.
    pub async fn command_e(&self, command: &str) -> Result<Arc<Transaction>> {
        self.connection()?.send(command, Queue::Fast).await
    }

    /// Sends a command after running `prepare` on its transaction, so
    /// observers registered there see every event including `Send`.
    pub async fn command_with<F>(
        &self,
        command: &str,
        queue: Queue,
        prepare: F,
    ) -> Result<Arc<Transaction>>
    where
        F: FnOnce(&Arc<Transaction>),
    {
        self.connection()?.send_with(command, queue, prepare).await
    }

    /// Sends each command only after the previous one completed. Stops at the
    /// first failure and returns it; nothing after it is sent.
    pub async fn run_sequence<I, S>(&self, commands: I) -> Result<Vec<Arc<Transaction>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut done = Vec::new();
        for command in commands {
            let command = command.as_ref();
            let transaction = self.command(command).await?;
            if let Err(e) = transaction.on_complete().await {
                warn!("Sequence stopped at {} {}: {}", transaction.tag(), command, e);
                return Err(e);
            }
            done.push(transaction);
        }
        debug!("Sequence of {} command(s) completed.", done.len());
        Ok(done)
    }

    /// Restarts both tag pools and sends `StartSession()`, which is therefore
    /// issued as `00001`. Fails with [`IppError::TagInUse`] if an earlier
    /// `00001` is still running.
    pub async fn start_session(&self) -> Result<Arc<Transaction>> {
        self.connection()?
            .send_after_reset("StartSession()", Queue::Normal)
            .await
    }

    /// Sends `EndSession()`, then restarts both tag pools.
    pub async fn end_session(&self) -> Result<Arc<Transaction>> {
        self.connection()?
            .send_then_reset("EndSession()", Queue::Normal)
            .await
    }
}
