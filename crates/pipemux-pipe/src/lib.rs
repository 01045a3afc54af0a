//! Non-blocking pipe abstraction.
//!
//! A pipe is a point-to-point, bidirectional queue between a socket and one
//! peer. Sockets never own pipes; the transport does. This crate provides:
//! - The [`Pipe`] trait every transport endpoint implements
//! - Pipe identities, peer credentials and readiness events
//! - An in-process transport ([`inproc::pair`]) built on shared queues
//!
//! This is the lowest layer of pipemux that knows about peers. Everything
//! else drives pipes through the trait defined here.

pub mod error;
pub mod inproc;
pub mod traits;

pub use error::{PipeError, Result};
pub use inproc::{pair, InprocPipe, PipeConfig};
pub use traits::{Credential, Pipe, PipeEvent, PipeId};
