use pipemux_frame::Frame;

use crate::config::SocketType;

/// Errors surfaced by socket pattern operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// No pipe is ready; retry after the next activation.
    #[error("operation would block")]
    WouldBlock,

    /// The caller broke the pattern's message contract.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// No pattern implementation exists for the requested socket type.
    #[error("socket type {0} is not supported")]
    Unsupported(SocketType),
}

impl SocketError {
    /// Whether the operation may succeed if retried later.
    pub fn is_would_block(&self) -> bool {
        matches!(self, SocketError::WouldBlock)
    }
}

/// A refused send. The caller gets its frame back to retry or discard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct SendError {
    pub kind: SocketError,
    pub frame: Frame,
}

impl SendError {
    pub fn new(kind: SocketError, frame: Frame) -> Self {
        Self { kind, frame }
    }

    pub fn is_would_block(&self) -> bool {
        self.kind.is_would_block()
    }

    /// Recover the frame that was not sent.
    pub fn into_frame(self) -> Frame {
        self.frame
    }
}

impl From<SendError> for SocketError {
    fn from(err: SendError) -> Self {
        err.kind
    }
}

pub type Result<T> = std::result::Result<T, SocketError>;
pub type SendResult<T> = std::result::Result<T, SendError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::frame;

    #[test]
    fn send_error_returns_frame_intact() {
        let err = SendError::new(SocketError::WouldBlock, frame("keep"));
        assert!(err.is_would_block());
        assert_eq!(err.to_string(), "operation would block");
        assert_eq!(err.into_frame(), frame("keep"));
    }

    #[test]
    fn send_error_converts_to_kind() {
        let err = SendError::new(SocketError::ProtocolViolation("multi-frame"), frame("x"));
        assert!(!err.is_would_block());
        assert_eq!(
            SocketError::from(err),
            SocketError::ProtocolViolation("multi-frame")
        );
    }
}
