//! The client socket pattern.
//!
//! A client talks to any number of peers over attached pipes. Incoming
//! messages are fair-queued, outgoing messages are load-balanced, and every
//! message is a single frame.

use std::sync::Arc;

use pipemux_frame::Frame;
use pipemux_pipe::{Credential, Pipe, PipeId};
use tracing::{debug, trace, warn};

use crate::config::{SocketContext, SocketOptions, SocketType};
use crate::error::{Result, SendError, SendResult};
use crate::fq::FairQueue;
use crate::guard::MultiFrameGuard;
use crate::lb::LoadBalancer;
use crate::pattern::SocketPattern;
use crate::registry::PipeRegistry;

#[derive(Debug)]
pub struct ClientSocket {
    context: SocketContext,
    options: SocketOptions,
    pipes: PipeRegistry,
    fq: FairQueue,
    lb: LoadBalancer,
    guard: MultiFrameGuard,
    credential: Credential,
}

impl ClientSocket {
    pub fn new(context: SocketContext) -> Self {
        debug!(
            context_id = context.context_id,
            thread_id = context.thread_id,
            socket_id = context.socket_id,
            "creating client socket"
        );
        Self {
            context,
            options: SocketOptions::new(SocketType::Client),
            pipes: PipeRegistry::new(),
            fq: FairQueue::new(),
            lb: LoadBalancer::new(),
            guard: MultiFrameGuard::new(),
            credential: Credential::default(),
        }
    }

    pub fn context(&self) -> &SocketContext {
        &self.context
    }

    pub fn options(&self) -> &SocketOptions {
        &self.options
    }

    /// Receive one message and report the pipe it came from.
    pub fn recv_pipe(&mut self) -> Result<(Frame, PipeId)> {
        loop {
            let (frame, pipe) = self.fq.recv_pipe()?;
            if self.guard.admit(&frame, pipe) {
                self.credential = self
                    .pipes
                    .get(pipe)
                    .and_then(|handle| handle.upgrade())
                    .map(|handle| handle.credential())
                    .unwrap_or_default();
                return Ok((frame, pipe));
            }
            // The guard drops the tail whenever it shows up; other pipes
            // keep their turns meanwhile.
            if frame.more {
                self.fq.release(pipe);
            }
        }
    }

    /// Send one message and report the pipe that took it.
    pub fn send_pipe(&mut self, frame: Frame) -> SendResult<Option<PipeId>> {
        if let Err(kind) = self.guard.check_outbound(&frame) {
            return Err(SendError::new(kind, frame));
        }
        self.lb.send_pipe(frame)
    }

    /// Number of attached pipes.
    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    /// Ids of the attached pipes.
    pub fn pipe_ids(&self) -> Vec<PipeId> {
        self.pipes.ids()
    }

    pub fn is_readable(&self, pipe: PipeId) -> bool {
        self.fq.is_active(pipe)
    }

    pub fn is_writable(&self, pipe: PipeId) -> bool {
        self.lb.is_active(pipe)
    }

    /// Frames dropped because they belonged to multi-frame messages.
    pub fn discarded_frames(&self) -> u64 {
        self.guard.discarded()
    }
}

impl SocketPattern for ClientSocket {
    fn socket_type(&self) -> SocketType {
        self.options.socket_type
    }

    fn attach(&mut self, pipe: &Arc<dyn Pipe>) {
        if self.pipes.attach(pipe) {
            debug!(socket_id = self.context.socket_id, pipe_id = %pipe.id(), "pipe attached");
        } else {
            warn!(socket_id = self.context.socket_id, pipe_id = %pipe.id(), "pipe already attached");
        }
    }

    fn send(&mut self, frame: Frame) -> SendResult<()> {
        self.send_pipe(frame).map(|_| ())
    }

    fn recv(&mut self) -> Result<Frame> {
        self.recv_pipe().map(|(frame, _)| frame)
    }

    fn has_in(&self) -> bool {
        self.fq.has_in()
    }

    fn has_out(&mut self) -> bool {
        self.lb.has_out()
    }

    fn credential(&self) -> Credential {
        self.credential.clone()
    }

    fn activated_for_read(&mut self, pipe: PipeId) {
        match self.pipes.get(pipe) {
            Some(handle) => {
                trace!(socket_id = self.context.socket_id, pipe_id = %pipe, "read activated");
                self.fq.activated(pipe, handle);
            }
            None => {
                warn!(socket_id = self.context.socket_id, pipe_id = %pipe, "read activation for unknown pipe");
            }
        }
    }

    fn activated_for_write(&mut self, pipe: PipeId) {
        match self.pipes.get(pipe) {
            Some(handle) => {
                trace!(socket_id = self.context.socket_id, pipe_id = %pipe, "write activated");
                self.lb.activated(pipe, handle);
            }
            None => {
                warn!(socket_id = self.context.socket_id, pipe_id = %pipe, "write activation for unknown pipe");
            }
        }
    }

    fn terminated(&mut self, pipe: PipeId) {
        if !self.pipes.detach(pipe) {
            trace!(socket_id = self.context.socket_id, pipe_id = %pipe, "pipe already terminated");
            return;
        }
        self.fq.pipe_terminated(pipe);
        self.lb.pipe_terminated(pipe);
        self.guard.pipe_terminated(pipe);
        debug!(
            socket_id = self.context.socket_id,
            pipe_id = %pipe,
            remaining = self.pipes.len(),
            "pipe terminated"
        );
    }
}
