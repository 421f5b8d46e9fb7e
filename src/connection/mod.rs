// src/connection/mod.rs

//! Owns one TCP connection to an I++ server: the single writer, the receive
//! loop and the transaction table they share.

mod handler;
mod writer;

use self::handler::ReceiveHandler;
use self::writer::CommandWriter;
use crate::config::Config;
use crate::core::protocol::{IppLineCodec, check_command_text};
use crate::core::tags::Queue;
use crate::core::transaction::{Transaction, TransactionTable};
use crate::core::{Dispatcher, IppError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, trace};

/// A live connection to an I++ server.
///
/// Any number of tasks may call [`Connection::send`] concurrently: tag
/// allocation and the write happen under one lock, so tags reach the wire in
/// the order they were issued. Replies are applied by a background receive
/// loop.
#[derive(Debug)]
pub struct Connection {
    peer_addr: SocketAddr,
    writer: Mutex<Option<CommandWriter>>,
    table: Arc<TransactionTable>,
    connected: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    receiver: parking_lot::Mutex<Option<JoinHandle<()>>>,
    write_timeout: Duration,
}

impl Connection {
    /// Opens a connection to `addr` and starts the receive loop.
    pub async fn connect(addr: &str, config: &Config) -> Result<Self> {
        let stream =
            match tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(IppError::connect(addr, e)),
                Err(_) => {
                    return Err(IppError::ConnectTimeout {
                        addr: addr.to_string(),
                        timeout: config.connect_timeout,
                    });
                }
            };
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();

        let table = Arc::new(TransactionTable::new());
        let connected = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handler = ReceiveHandler::new(
            peer_addr,
            FramedRead::new(read_half, IppLineCodec::new(config.max_line_length)),
            Dispatcher::new(Arc::clone(&table), config.error_routing),
            Arc::clone(&table),
            Arc::clone(&connected),
            shutdown_rx,
        );
        let receiver = tokio::spawn(handler.run());

        info!(
            "Connected to I++ server at {} (error routing: {:?}).",
            peer_addr, config.error_routing
        );

        Ok(Self {
            peer_addr,
            writer: Mutex::new(Some(CommandWriter::new(
                write_half,
                IppLineCodec::new(config.max_line_length),
            ))),
            table,
            connected,
            shutdown_tx,
            receiver: parking_lot::Mutex::new(Some(receiver)),
            write_timeout: config.write_timeout,
        })
    }

    /// Opens a connection using the address and settings in `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        Self::connect(&config.address(), config).await
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// False once the connection was closed by either side.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// The table of tracked transactions, for inspection and eviction.
    pub fn transactions(&self) -> &Arc<TransactionTable> {
        &self.table
    }

    /// Issues a command on `queue` and returns its transaction once the bytes
    /// are flushed.
    pub async fn send(&self, command: &str, queue: Queue) -> Result<Arc<Transaction>> {
        self.issue(command, queue, TagReset::Never, |_| {}).await
    }

    /// Like [`Connection::send`], but runs `prepare` on the new transaction
    /// before anything is written, so observers attached there cannot miss an
    /// event.
    pub async fn send_with<F>(
        &self,
        command: &str,
        queue: Queue,
        prepare: F,
    ) -> Result<Arc<Transaction>>
    where
        F: FnOnce(&Arc<Transaction>),
    {
        self.issue(command, queue, TagReset::Never, prepare).await
    }

    /// Restarts both tag pools and issues `command` as the first tag of its
    /// pool, with no other sender able to slip in between.
    pub async fn send_after_reset(&self, command: &str, queue: Queue) -> Result<Arc<Transaction>> {
        self.issue(command, queue, TagReset::Before, |_| {}).await
    }

    /// Issues `command`, then restarts both tag pools before any other sender
    /// can take a tag.
    pub async fn send_then_reset(&self, command: &str, queue: Queue) -> Result<Arc<Transaction>> {
        self.issue(command, queue, TagReset::After, |_| {}).await
    }

    async fn issue<F>(
        &self,
        command: &str,
        queue: Queue,
        reset: TagReset,
        prepare: F,
    ) -> Result<Arc<Transaction>>
    where
        F: FnOnce(&Arc<Transaction>),
    {
        check_command_text(command)?;

        let mut guard = self.writer.lock().await;
        if !self.is_connected() {
            return Err(IppError::NotConnected);
        }
        let Some(writer) = guard.as_mut() else {
            return Err(IppError::NotConnected);
        };

        if reset == TagReset::Before {
            writer.reset_tags();
            debug!("Tag pools reset.");
        }
        let tag = writer.next_tag(queue);
        let transaction = Arc::new(Transaction::new(tag, command));
        self.table.insert(Arc::clone(&transaction))?;
        prepare(&transaction);

        if let Err(e) = writer.write(tag, command, self.write_timeout).await {
            error!("Failed to send {} {}: {}", tag, command, e);
            // Whatever is still buffered will never drain; drop it unflushed.
            drop(guard.take());
            drop(guard);
            self.teardown(None).await;
            return Err(e);
        }
        if reset == TagReset::After {
            writer.reset_tags();
            debug!("Tag pools reset.");
        }
        drop(guard);

        trace!("-> {} {}", tag, command);
        transaction.mark_sent();
        Ok(transaction)
    }

    /// Restarts both tag pools at 1.
    pub async fn reset_tags(&self) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(IppError::NotConnected)?;
        writer.reset_tags();
        debug!("Tag pools reset.");
        Ok(())
    }

    /// Closes the connection. Every pending awaitable resolves with
    /// [`IppError::ConnectionClosed`] and the transaction table is emptied.
    /// Calling it again is a no-op.
    pub async fn disconnect(&self) {
        let writer = self.writer.lock().await.take();
        if writer.is_some() {
            info!("Disconnecting from {}.", self.peer_addr);
        }
        self.teardown(writer).await;
    }

    async fn teardown(&self, writer: Option<CommandWriter>) {
        let _ = self.shutdown_tx.send(());
        if let Some(writer) = writer {
            writer.shutdown(self.write_timeout).await;
        }
        let receiver = self.receiver.lock().take();
        if let Some(receiver) = receiver
            && let Err(e) = receiver.await
        {
            error!("Receive loop for {} ended abnormally: {}", self.peer_addr, e);
        }
        self.connected.store(false, Ordering::Release);
        self.table.close_all();
    }
}

/// Where a tag-pool reset falls relative to a command issued under the same
/// writer lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagReset {
    Never,
    Before,
    After,
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}
