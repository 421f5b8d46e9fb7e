// src/connection/handler.rs

//! The receive loop: reads inbound lines and hands them to the dispatcher.

use crate::core::protocol::{IppLineCodec, decode_response};
use crate::core::transaction::TransactionTable;
use crate::core::{Dispatcher, IppError};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::broadcast;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, trace, warn};

/// Owns the read half of a connection for as long as the connection lives.
pub(crate) struct ReceiveHandler {
    peer: SocketAddr,
    framed: FramedRead<OwnedReadHalf, IppLineCodec>,
    dispatcher: Dispatcher,
    table: Arc<TransactionTable>,
    connected: Arc<AtomicBool>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl ReceiveHandler {
    pub(crate) fn new(
        peer: SocketAddr,
        framed: FramedRead<OwnedReadHalf, IppLineCodec>,
        dispatcher: Dispatcher,
        table: Arc<TransactionTable>,
        connected: Arc<AtomicBool>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            peer,
            framed,
            dispatcher,
            table,
            connected,
            shutdown_rx,
        }
    }

    /// Runs until the peer closes the stream, a fatal read error occurs or a
    /// shutdown is signalled. Every transaction still tracked on exit is
    /// closed, which resolves its pending awaitables.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    debug!("Receive loop for {} stopping on request.", self.peer);
                    break;
                }
                result = self.framed.next() => {
                    match result {
                        Some(Ok(line)) => self.handle_line(line),
                        Some(Err(e)) => {
                            if is_normal_disconnect(&e) {
                                debug!("Connection to {} closed by peer: {}", self.peer, e);
                            } else {
                                warn!("Connection error for {}: {}", self.peer, e);
                            }
                            break;
                        }
                        None => {
                            info!("Connection to {} closed by peer.", self.peer);
                            break;
                        }
                    }
                }
            }
        }

        self.connected.store(false, Ordering::Release);
        self.table.close_all();
    }

    fn handle_line(&self, line: String) {
        if line.trim().is_empty() {
            return;
        }
        match decode_response(&line) {
            Ok(response) => {
                trace!("<- {}", line);
                self.dispatcher.dispatch(response);
            }
            Err(e) => warn!("Dropping line from {}: {}", self.peer, e),
        }
    }
}

fn is_normal_disconnect(e: &IppError) -> bool {
    match e {
        IppError::Io(io) => matches!(
            io.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
