// src/core/tags.rs

//! Correlation tags and the two rotating pools they are drawn from.
//!
//! Normal-queue tags are rendered as five digits (`00001`..`99999`), fast-queue
//! (event) tags as `E` plus four digits (`E0001`..`E9999`). The prefix keeps the
//! two pools from ever colliding.

use crate::core::errors::IppError;
use std::fmt;
use std::str::FromStr;

/// Largest tag issued from the normal queue.
pub const MAX_NORMAL_TAG: u32 = 99_999;
/// Largest tag issued from the fast (event) queue.
pub const MAX_EVENT_TAG: u16 = 9_999;
/// Every tag occupies exactly this many characters on the wire.
pub const TAG_WIDTH: usize = 5;

/// Which server queue a command is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    Normal,
    /// The fast queue bypasses the normal command queue (`AbortE()`, `GetPropE()`, ...).
    Fast,
}

/// A correlation tag. Values of zero parse (servers use `00000` and `E0000`
/// for unsolicited messages) but are never issued by [`TagAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Normal(u32),
    Event(u16),
}

impl Tag {
    pub fn queue(&self) -> Queue {
        match self {
            Tag::Normal(_) => Queue::Normal,
            Tag::Event(_) => Queue::Fast,
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Tag::Event(_))
    }

    /// True for `00000` / `E0000`.
    pub fn is_unsolicited(&self) -> bool {
        matches!(self, Tag::Normal(0) | Tag::Event(0))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Normal(n) => write!(f, "{n:05}"),
            Tag::Event(n) => write!(f, "E{n:04}"),
        }
    }
}

impl FromStr for Tag {
    type Err = IppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != TAG_WIDTH {
            return Err(IppError::InvalidTag(s.to_string()));
        }
        if bytes[0] == b'E' {
            let digits = &s[1..];
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(IppError::InvalidTag(s.to_string()));
            }
            digits
                .parse::<u16>()
                .map(Tag::Event)
                .map_err(|_| IppError::InvalidTag(s.to_string()))
        } else {
            if !bytes.iter().all(|b| b.is_ascii_digit()) {
                return Err(IppError::InvalidTag(s.to_string()));
            }
            s.parse::<u32>()
                .map(Tag::Normal)
                .map_err(|_| IppError::InvalidTag(s.to_string()))
        }
    }
}

/// Issues sequential tags from two independent pools.
///
/// Not synchronized: the connection holds it under its single-writer lock so
/// that allocation and the write of the tagged command happen as one step.
#[derive(Debug, Clone)]
pub struct TagAllocator {
    next_normal: u32,
    next_event: u16,
}

impl Default for TagAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TagAllocator {
    pub fn new() -> Self {
        Self {
            next_normal: 1,
            next_event: 1,
        }
    }

    /// Returns the current tag of the given pool and advances it, wrapping
    /// back to 1 after the pool's maximum.
    pub fn next(&mut self, queue: Queue) -> Tag {
        match queue {
            Queue::Normal => {
                let tag = Tag::Normal(self.next_normal);
                self.next_normal = self.next_normal % MAX_NORMAL_TAG + 1;
                tag
            }
            Queue::Fast => {
                let tag = Tag::Event(self.next_event);
                self.next_event = self.next_event % MAX_EVENT_TAG + 1;
                tag
            }
        }
    }

    /// Peeks at the tag `next` would return without advancing.
    pub fn peek(&self, queue: Queue) -> Tag {
        match queue {
            Queue::Normal => Tag::Normal(self.next_normal),
            Queue::Fast => Tag::Event(self.next_event),
        }
    }

    /// Resets both pools to 1. Issued around `StartSession()` / `EndSession()`.
    pub fn reset(&mut self) {
        self.next_normal = 1;
        self.next_event = 1;
    }
}
