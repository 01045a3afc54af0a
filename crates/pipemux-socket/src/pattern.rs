use std::sync::mpsc::Receiver;
use std::sync::Arc;

use pipemux_frame::Frame;
use pipemux_pipe::{Credential, Pipe, PipeEvent, PipeId};

use crate::client::ClientSocket;
use crate::config::{SocketContext, SocketType};
use crate::error::{Result, SendResult, SocketError};

/// The contract a generic socket layer drives for one messaging pattern.
///
/// Every method runs on the socket's owning thread and returns immediately.
pub trait SocketPattern {
    /// The pattern this socket implements.
    fn socket_type(&self) -> SocketType;

    /// Register a new pipe. It is not used until activated.
    fn attach(&mut self, pipe: &Arc<dyn Pipe>);

    /// Send one message. A refused frame is handed back in the error.
    fn send(&mut self, frame: Frame) -> SendResult<()>;

    /// Receive one message.
    fn recv(&mut self) -> Result<Frame>;

    /// Whether `recv` could succeed right now.
    fn has_in(&self) -> bool;

    /// Whether `send` could succeed right now.
    fn has_out(&mut self) -> bool;

    /// Credential of the peer that sent the last received message.
    fn credential(&self) -> Credential;

    /// The pipe has frames to read.
    fn activated_for_read(&mut self, pipe: PipeId);

    /// The pipe can accept frames.
    fn activated_for_write(&mut self, pipe: PipeId);

    /// The pipe is gone. Idempotent.
    fn terminated(&mut self, pipe: PipeId);

    /// Route a pipe notification to the matching callback.
    fn process_event(&mut self, event: PipeEvent) {
        match event {
            PipeEvent::ReadActivated(id) => self.activated_for_read(id),
            PipeEvent::WriteActivated(id) => self.activated_for_write(id),
            PipeEvent::Terminated(id) => self.terminated(id),
        }
    }

    /// Apply every notification currently queued in `mailbox`.
    ///
    /// Returns the number of events processed.
    fn process_events(&mut self, mailbox: &Receiver<PipeEvent>) -> usize {
        let mut processed = 0usize;
        for event in mailbox.try_iter() {
            self.process_event(event);
            processed += 1;
        }
        processed
    }
}

/// Construct the pattern implementation for `socket_type`.
pub fn create(socket_type: SocketType, context: SocketContext) -> Result<Box<dyn SocketPattern>> {
    match socket_type {
        SocketType::Client => Ok(Box::new(ClientSocket::new(context))),
        other => Err(SocketError::Unsupported(other)),
    }
}
