//! Pipe multiplexing for socket patterns.
//!
//! A socket pattern sits between the application and a changing set of
//! pipes. Reads are fair-queued across every readable pipe, writes are
//! load-balanced across every writable pipe, and the pattern decides which
//! messages are legal. The client pattern only carries single-frame messages.
//!
//! Nothing here blocks or locks: every call runs on the socket's owning
//! thread and reports [`SocketError::WouldBlock`] instead of waiting.

mod active;

pub mod client;
pub mod config;
pub mod error;
pub mod fq;
pub mod guard;
pub mod lb;
pub mod pattern;
pub mod registry;

#[cfg(test)]
mod testing;

pub use client::ClientSocket;
pub use config::{SocketContext, SocketOptions, SocketType};
pub use error::{Result, SendError, SendResult, SocketError};
pub use fq::FairQueue;
pub use guard::MultiFrameGuard;
pub use lb::LoadBalancer;
pub use pattern::{create, SocketPattern};
pub use registry::PipeRegistry;
