use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use pipemux_frame::Frame;

use crate::error::Result;

static NEXT_PIPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique pipe identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipeId(u64);

impl PipeId {
    /// Allocate a fresh identity. Identities are never reused.
    pub fn next() -> Self {
        Self(NEXT_PIPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipe-{}", self.0)
    }
}

/// Opaque peer-identity blob surfaced alongside received messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Credential(Bytes);

impl Credential {
    pub fn new(blob: impl Into<Bytes>) -> Self {
        Self(blob.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for Credential {
    fn from(blob: Bytes) -> Self {
        Self(blob)
    }
}

impl From<&'static str> for Credential {
    fn from(blob: &'static str) -> Self {
        Self(Bytes::from_static(blob.as_bytes()))
    }
}

/// Readiness and lifecycle notifications a pipe delivers to its socket.
///
/// Events are produced on whichever thread changed the pipe's state and are
/// consumed on the socket's owning thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeEvent {
    /// The pipe went from empty to holding at least one frame.
    ReadActivated(PipeId),
    /// The pipe can accept frames again after reporting full.
    WriteActivated(PipeId),
    /// The pipe was terminated and must be forgotten.
    Terminated(PipeId),
}

impl PipeEvent {
    /// The pipe this event refers to.
    pub fn pipe_id(&self) -> PipeId {
        match *self {
            PipeEvent::ReadActivated(id)
            | PipeEvent::WriteActivated(id)
            | PipeEvent::Terminated(id) => id,
        }
    }
}

/// A non-blocking, bidirectional queue endpoint connected to one peer.
///
/// Implementations synchronise internally; every method takes `&self` and
/// returns immediately.
pub trait Pipe: Send + Sync {
    /// Identity of this endpoint.
    fn id(&self) -> PipeId;

    /// Dequeue the next inbound frame, or `None` when nothing is queued.
    fn read(&self) -> Option<Frame>;

    /// Enqueue an outbound frame.
    ///
    /// On failure the frame is returned inside the error.
    fn write(&self, frame: Frame) -> Result<()>;

    /// Whether a frame is available to `read` right now.
    fn check_read(&self) -> bool;

    /// Whether `write` would currently accept a frame.
    fn check_write(&self) -> bool;

    /// Credential of the peer on the other end.
    fn credential(&self) -> Credential;
}

impl fmt::Debug for dyn Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe").field("id", &self.id()).finish()
    }
}
