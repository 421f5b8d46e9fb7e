// src/connection/writer.rs

//! The outbound half of a connection and the tag pools it draws from.
//!
//! Both live behind the same lock so that the order tags are issued in is the
//! order commands hit the wire.

use crate::core::protocol::{IppLineCodec, OutboundCommand};
use crate::core::tags::{Queue, Tag, TagAllocator};
use crate::core::{IppError, Result};
use futures::SinkExt;
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio_util::codec::FramedWrite;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct CommandWriter {
    framed: FramedWrite<OwnedWriteHalf, IppLineCodec>,
    tags: TagAllocator,
}

impl CommandWriter {
    pub(crate) fn new(half: OwnedWriteHalf, codec: IppLineCodec) -> Self {
        Self {
            framed: FramedWrite::new(half, codec),
            tags: TagAllocator::new(),
        }
    }

    pub(crate) fn next_tag(&mut self, queue: Queue) -> Tag {
        self.tags.next(queue)
    }

    pub(crate) fn reset_tags(&mut self) {
        self.tags.reset();
    }

    /// Writes and flushes one command. A write that stalls past `timeout`
    /// fails with [`IppError::SendTimeout`].
    pub(crate) async fn write(
        &mut self,
        tag: Tag,
        command: &str,
        timeout: Duration,
    ) -> Result<()> {
        let item = OutboundCommand {
            tag,
            command: command.to_string(),
        };
        match tokio::time::timeout(timeout, self.framed.send(item)).await {
            Ok(result) => result,
            Err(_) => Err(IppError::SendTimeout { tag, timeout }),
        }
    }

    /// Flushes anything buffered and shuts the write half down. If the peer
    /// stops reading, gives up after `timeout` and drops the buffer.
    pub(crate) async fn shutdown(mut self, timeout: Duration) {
        match tokio::time::timeout(timeout, self.framed.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Error while shutting down the write half: {}", e),
            Err(_) => debug!(
                "Write half did not drain within {:?}; dropping {} buffered bytes.",
                timeout,
                self.framed.write_buffer().len()
            ),
        }
    }
}
