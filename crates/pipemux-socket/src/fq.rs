//! Fair-queued ingress.
//!
//! Inbound frames are taken from the active pipes in strict rotation: once a
//! pipe delivers a complete message, every other ready pipe gets a turn
//! before it is served again. A multi-frame message is read to its last
//! frame from the same pipe before the rotation moves on, unless the reader
//! releases it (see [`FairQueue::release`]).

use std::sync::Weak;

use pipemux_frame::Frame;
use pipemux_pipe::{Pipe, PipeId};
use tracing::{debug, trace};

use crate::active::ActiveSet;
use crate::error::{Result, SocketError};

/// Round-robin reader over the pipes that have signalled readable.
#[derive(Debug, Default)]
pub struct FairQueue {
    active: ActiveSet,
    /// The last frame returned had `more` set; the cursor is pinned to its pipe.
    more: bool,
}

impl FairQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a pipe eligible for reading. Repeated activation is a no-op.
    pub fn activated(&mut self, id: PipeId, pipe: Weak<dyn Pipe>) {
        if self.active.insert(id, pipe) {
            trace!(pipe_id = %id, "pipe joined fair-queue");
        }
    }

    /// Forget a pipe.
    ///
    /// Returns true if a multi-frame message from this pipe was cut short.
    pub fn pipe_terminated(&mut self, id: PipeId) -> bool {
        let interrupted = self.more && self.active.current_id() == Some(id);
        if interrupted {
            self.more = false;
            debug!(pipe_id = %id, "pipe terminated mid-message");
        }
        self.active.remove(id);
        interrupted
    }

    /// Receive the next frame from the rotation.
    pub fn recv(&mut self) -> Result<Frame> {
        self.recv_pipe().map(|(frame, _)| frame)
    }

    /// Receive the next frame and report which pipe delivered it.
    ///
    /// Empty pipes are skipped but stay in the rotation. Every pipe is tried
    /// at most once per call; if none has a frame the call would block.
    pub fn recv_pipe(&mut self) -> Result<(Frame, PipeId)> {
        let mut tried = 0usize;
        while tried < self.active.len() {
            let Some((id, handle)) = self.active.current() else {
                break;
            };
            let Some(pipe) = handle else {
                debug!(pipe_id = %id, "pipe handle dropped; leaving fair-queue");
                self.pipe_terminated(id);
                continue;
            };

            match pipe.read() {
                Some(frame) => {
                    self.more = frame.more;
                    if !frame.more {
                        self.active.advance();
                    }
                    trace!(pipe_id = %id, size = frame.len(), more = frame.more, "frame received");
                    return Ok((frame, id));
                }
                // The rest of the message must come from this pipe.
                None if self.more => return Err(SocketError::WouldBlock),
                None => {
                    self.active.advance();
                    tried += 1;
                }
            }
        }
        Err(SocketError::WouldBlock)
    }

    /// Stop waiting for the rest of the message being read from `id`.
    ///
    /// The rotation moves past the pipe, so its remaining frames are read
    /// on later turns like any other frame. Returns false if the queue was
    /// not pinned to `id`.
    pub fn release(&mut self, id: PipeId) -> bool {
        if !self.more || self.active.current_id() != Some(id) {
            return false;
        }
        self.more = false;
        self.active.advance();
        trace!(pipe_id = %id, "pipe released mid-message");
        true
    }

    /// Whether a frame could be received right now.
    pub fn has_in(&self) -> bool {
        if self.more {
            // Only the pinned pipe may serve the next frame.
            return self
                .active
                .current()
                .and_then(|(_, pipe)| pipe)
                .is_some_and(|pipe| pipe.check_read());
        }
        self.active.live().any(|pipe| pipe.check_read())
    }

    /// Number of pipes in the rotation.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: PipeId) -> bool {
        self.active.contains(id)
    }

    /// Whether a multi-frame message is partially read.
    pub fn is_mid_message(&self) -> bool {
        self.more
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{endpoint, frame, more, text};

    #[test]
    fn empty_queue_would_block() {
        let mut fq = FairQueue::new();
        assert_eq!(fq.recv().unwrap_err(), SocketError::WouldBlock);
        assert!(!fq.has_in());
    }

    #[test]
    fn round_robin_across_ready_pipes() {
        let pipes: Vec<_> = ["a", "b", "c"].into_iter().map(endpoint).collect();
        let mut fq = FairQueue::new();
        for (pipe, peer) in &pipes {
            fq.activated(pipe.id(), Arc::downgrade(pipe));
            for _ in 0..3 {
                peer.write(frame("x")).unwrap();
            }
        }

        let served: Vec<PipeId> = (0..6).map(|_| fq.recv_pipe().unwrap().1).collect();
        let ids: Vec<PipeId> = pipes.iter().map(|(p, _)| p.id()).collect();
        assert_eq!(served, vec![ids[0], ids[1], ids[2], ids[0], ids[1], ids[2]]);
    }

    #[test]
    fn empty_pipe_is_skipped_not_removed() {
        let (a, peer_a) = endpoint("a");
        let (b, peer_b) = endpoint("b");
        let mut fq = FairQueue::new();
        fq.activated(a.id(), Arc::downgrade(&a));
        fq.activated(b.id(), Arc::downgrade(&b));

        peer_b.write(frame("from-b")).unwrap();
        let (got, id) = fq.recv_pipe().unwrap();
        assert_eq!(text(&got), "from-b");
        assert_eq!(id, b.id());
        assert_eq!(fq.active_len(), 2);

        peer_a.write(frame("from-a")).unwrap();
        assert_eq!(fq.recv_pipe().unwrap().1, a.id());
    }

    #[test]
    fn exhausted_rotation_would_block() {
        let (a, _peer_a) = endpoint("a");
        let (b, _peer_b) = endpoint("b");
        let mut fq = FairQueue::new();
        fq.activated(a.id(), Arc::downgrade(&a));
        fq.activated(b.id(), Arc::downgrade(&b));

        assert!(fq.recv().unwrap_err().is_would_block());
        assert_eq!(fq.active_len(), 2);
    }

    #[test]
    fn multi_frame_message_stays_on_one_pipe() {
        let (a, peer_a) = endpoint("a");
        let (b, peer_b) = endpoint("b");
        let mut fq = FairQueue::new();
        fq.activated(a.id(), Arc::downgrade(&a));
        fq.activated(b.id(), Arc::downgrade(&b));

        peer_a.write(more("a1")).unwrap();
        peer_a.write(frame("a2")).unwrap();
        peer_b.write(frame("b1")).unwrap();

        let order: Vec<String> = (0..3)
            .map(|_| text(&fq.recv().unwrap()).to_string())
            .collect();
        assert_eq!(order, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn mid_message_gap_blocks_instead_of_switching() {
        let (a, peer_a) = endpoint("a");
        let (b, peer_b) = endpoint("b");
        let mut fq = FairQueue::new();
        fq.activated(a.id(), Arc::downgrade(&a));
        fq.activated(b.id(), Arc::downgrade(&b));

        peer_a.write(more("head")).unwrap();
        peer_b.write(frame("other")).unwrap();

        assert_eq!(text(&fq.recv().unwrap()), "head");
        assert!(fq.is_mid_message());
        // b has a frame, but only the pinned pipe may serve next.
        assert!(!fq.has_in());
        assert!(fq.recv().unwrap_err().is_would_block());

        peer_a.write(frame("tail")).unwrap();
        assert!(fq.has_in());
        assert_eq!(text(&fq.recv().unwrap()), "tail");
        assert_eq!(text(&fq.recv().unwrap()), "other");
    }

    #[test]
    fn release_moves_rotation_past_pinned_pipe() {
        let (a, peer_a) = endpoint("a");
        let (b, peer_b) = endpoint("b");
        let mut fq = FairQueue::new();
        fq.activated(a.id(), Arc::downgrade(&a));
        fq.activated(b.id(), Arc::downgrade(&b));

        peer_a.write(more("head")).unwrap();
        peer_b.write(frame("other")).unwrap();
        assert_eq!(fq.recv_pipe().unwrap().1, a.id());

        assert!(!fq.release(b.id()));
        assert!(fq.release(a.id()));
        assert!(!fq.release(a.id()));
        assert!(!fq.is_mid_message());
        assert!(fq.has_in());

        let (got, id) = fq.recv_pipe().unwrap();
        assert_eq!(text(&got), "other");
        assert_eq!(id, b.id());

        peer_a.write(frame("tail")).unwrap();
        assert_eq!(fq.recv_pipe().unwrap().1, a.id());
        assert_eq!(fq.active_len(), 2);
    }

    #[test]
    fn termination_mid_message_unpins() {
        let (a, peer_a) = endpoint("a");
        let (b, peer_b) = endpoint("b");
        let mut fq = FairQueue::new();
        fq.activated(a.id(), Arc::downgrade(&a));
        fq.activated(b.id(), Arc::downgrade(&b));

        peer_a.write(more("head")).unwrap();
        peer_b.write(frame("other")).unwrap();
        fq.recv().unwrap();

        assert!(fq.pipe_terminated(a.id()));
        assert!(!fq.pipe_terminated(a.id()));
        assert_eq!(text(&fq.recv().unwrap()), "other");
    }

    #[test]
    fn dropped_pipe_handle_leaves_rotation() {
        let (a, _peer_a) = endpoint("a");
        let (b, peer_b) = endpoint("b");
        let mut fq = FairQueue::new();
        fq.activated(a.id(), Arc::downgrade(&a));
        fq.activated(b.id(), Arc::downgrade(&b));
        drop(a);

        peer_b.write(frame("survivor")).unwrap();
        assert_eq!(text(&fq.recv().unwrap()), "survivor");
        assert_eq!(fq.active_len(), 1);
    }

    #[test]
    fn has_in_does_not_consume() {
        let (a, peer_a) = endpoint("a");
        let mut fq = FairQueue::new();
        fq.activated(a.id(), Arc::downgrade(&a));
        assert!(!fq.has_in());

        peer_a.write(frame("x")).unwrap();
        assert!(fq.has_in());
        assert!(fq.has_in());
        assert_eq!(text(&fq.recv().unwrap()), "x");
        assert!(!fq.has_in());
    }
}
