//! Load-balanced egress.
//!
//! Each outbound message goes to exactly one writable pipe, chosen in
//! rotation. A pipe that refuses a frame leaves the rotation until it
//! signals writable again. There is no fairness guarantee: a pipe that never
//! becomes writable is simply never chosen.

use std::sync::Weak;

use pipemux_frame::Frame;
use pipemux_pipe::{Pipe, PipeId};
use tracing::{debug, trace};

use crate::active::ActiveSet;
use crate::error::{SendError, SendResult, SocketError};

/// Round-robin writer over the pipes that have signalled writable.
#[derive(Debug, Default)]
pub struct LoadBalancer {
    active: ActiveSet,
    /// The last frame sent had `more` set; the cursor is pinned to its pipe.
    more: bool,
    /// The current message lost its pipe; swallow frames until its last one.
    dropping: bool,
}

impl LoadBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a pipe eligible for writing. Repeated activation is a no-op.
    pub fn activated(&mut self, id: PipeId, pipe: Weak<dyn Pipe>) {
        if self.active.insert(id, pipe) {
            trace!(pipe_id = %id, "pipe joined load-balancer");
        }
    }

    /// Forget a pipe. A message in flight to it is dropped.
    pub fn pipe_terminated(&mut self, id: PipeId) {
        if self.more && self.active.current_id() == Some(id) {
            debug!(pipe_id = %id, "pipe terminated mid-message; dropping remainder");
            self.more = false;
            self.dropping = true;
        }
        self.active.remove(id);
    }

    /// Send a frame to the next writable pipe.
    ///
    /// On would-block the frame comes back inside the error.
    pub fn send(&mut self, frame: Frame) -> SendResult<()> {
        self.send_pipe(frame).map(|_| ())
    }

    /// Send a frame and report the pipe that took it.
    ///
    /// Returns `Ok(None)` when the frame belonged to a message whose pipe
    /// went away part-way through; such frames are accepted and discarded.
    pub fn send_pipe(&mut self, mut frame: Frame) -> SendResult<Option<PipeId>> {
        if self.dropping {
            self.dropping = frame.more;
            trace!(size = frame.len(), "dropping frame of abandoned message");
            return Ok(None);
        }

        loop {
            let Some((id, handle)) = self.active.current() else {
                return Err(SendError::new(SocketError::WouldBlock, frame));
            };
            let more = frame.more;

            let refused = match handle {
                Some(pipe) => match pipe.write(frame) {
                    Ok(()) => {
                        self.more = more;
                        if !more {
                            self.active.advance();
                        }
                        trace!(pipe_id = %id, more, "frame sent");
                        return Ok(Some(id));
                    }
                    Err(err) => {
                        debug!(
                            pipe_id = %id,
                            error = %err,
                            transient = err.is_transient(),
                            "pipe refused frame; leaving load-balancer"
                        );
                        err.into_frame()
                    }
                },
                None => {
                    debug!(pipe_id = %id, "pipe handle dropped; leaving load-balancer");
                    frame
                }
            };

            self.active.remove(id);
            if self.more {
                self.more = false;
                self.dropping = more;
                return Ok(None);
            }
            frame = refused;
        }
    }

    /// Whether a frame could be sent right now.
    ///
    /// Pipes that currently report full are pruned from the rotation.
    pub fn has_out(&mut self) -> bool {
        if self.more {
            return true;
        }
        while let Some((id, handle)) = self.active.current() {
            if handle.is_some_and(|pipe| pipe.check_write()) {
                return true;
            }
            trace!(pipe_id = %id, "pipe not writable; leaving load-balancer");
            self.active.remove(id);
        }
        false
    }

    /// Number of pipes in the rotation.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: PipeId) -> bool {
        self.active.contains(id)
    }
}
