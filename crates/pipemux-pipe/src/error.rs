use pipemux_frame::Frame;

/// Errors a pipe reports when it cannot accept a frame.
///
/// Both variants hand the rejected frame back so the caller can offer it to
/// another pipe.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// The pipe has reached its high-water mark.
    #[error("pipe full")]
    Full { frame: Frame },

    /// The pipe has been terminated and accepts no more frames.
    #[error("pipe closed")]
    Closed { frame: Frame },
}

impl PipeError {
    /// Recover the frame that was not written.
    pub fn into_frame(self) -> Frame {
        match self {
            PipeError::Full { frame } | PipeError::Closed { frame } => frame,
        }
    }

    /// Whether the pipe may accept frames again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipeError::Full { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipeError>;
