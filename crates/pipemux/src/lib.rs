//! Pipe multiplexing for single-frame client sockets.
//!
//! pipemux combines a fair-queued reader and a load-balanced writer over a
//! changing set of pipes, and enforces the client pattern's single-frame
//! message discipline.
//!
//! # Crate Structure
//!
//! - [`frame`]: Frames: payload plus continuation flag
//! - [`pipe`]: The pipe abstraction and in-process pipe pairs
//! - [`socket`]: Selectors, lifecycle handling and the client socket

/// Re-export frame types.
pub mod frame {
    pub use pipemux_frame::*;
}

/// Re-export pipe types.
pub mod pipe {
    pub use pipemux_pipe::*;
}

/// Re-export socket types.
pub mod socket {
    pub use pipemux_socket::*;
}
