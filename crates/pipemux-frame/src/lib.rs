//! Frames moved between sockets and pipes.
//!
//! A frame is one payload buffer plus a continuation ("more") flag. A logical
//! message is one or more frames, ending at the first frame with the flag
//! cleared. The byte layout of a frame on any wire belongs to the transport,
//! not to this crate.

pub mod frame;

pub use frame::Frame;
