//! Single-frame discipline.
//!
//! Pipes are shared infrastructure, so a peer speaking a multi-frame pattern
//! can still deliver frames with `more` set. Outbound, such frames are a
//! contract breach. Inbound, the whole stray message is discarded: every
//! frame up to and including the first one with `more` cleared.

use std::collections::HashSet;

use pipemux_frame::Frame;
use pipemux_pipe::PipeId;
use tracing::{error, trace};

use crate::error::{Result, SocketError};

#[derive(Debug, Default)]
pub struct MultiFrameGuard {
    /// Pipes whose stray multi-frame message is being discarded.
    dropping: HashSet<PipeId>,
    discarded: u64,
}

impl MultiFrameGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject an outbound frame that claims to be part of a larger message.
    pub fn check_outbound(&self, frame: &Frame) -> Result<()> {
        if frame.more {
            error!(size = frame.len(), "refusing to send multi-frame message");
            return Err(SocketError::ProtocolViolation(
                "client sockets only send single-frame messages",
            ));
        }
        Ok(())
    }

    /// Decide whether an inbound frame from `from` may reach the caller.
    ///
    /// Returns false for every frame of a stray multi-frame message. Discard
    /// state is kept per pipe and survives across calls, so a tail that
    /// arrives late is still dropped even if other pipes delivered in between.
    pub fn admit(&mut self, frame: &Frame, from: PipeId) -> bool {
        let stray = if frame.more {
            self.dropping.insert(from);
            true
        } else {
            self.dropping.remove(&from)
        };
        if !stray {
            return true;
        }

        self.discarded += 1;
        trace!(pipe_id = %from, more = frame.more, discarded = self.discarded, "discarding stray frame");
        false
    }

    /// Forget discard state tied to a terminated pipe.
    pub fn pipe_terminated(&mut self, id: PipeId) {
        if self.dropping.remove(&id) {
            trace!(pipe_id = %id, "stray message abandoned");
        }
    }

    /// Whether a stray message from `pipe` is being discarded.
    pub fn is_dropping(&self, pipe: PipeId) -> bool {
        self.dropping.contains(&pipe)
    }

    /// Total frames discarded so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
