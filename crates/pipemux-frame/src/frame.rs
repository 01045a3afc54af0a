use bytes::Bytes;

/// One part of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// The frame payload.
    pub payload: Bytes,
    /// Set when more frames of the same message follow this one.
    pub more: bool,
}

impl Frame {
    /// Create a frame that completes its message.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            more: false,
        }
    }

    /// Create a frame that is followed by further frames of the same message.
    pub fn with_more(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            more: true,
        }
    }

    /// Whether this frame ends its message.
    pub fn is_last(&self) -> bool {
        !self.more
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Split a multi-part payload list into frames, flagging all but the last.
    pub fn sequence<I, P>(parts: I) -> Vec<Frame>
    where
        I: IntoIterator<Item = P>,
        P: Into<Bytes>,
    {
        let mut frames: Vec<Frame> = parts.into_iter().map(Frame::with_more).collect();
        if let Some(last) = frames.last_mut() {
            last.more = false;
        }
        frames
    }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_has_no_continuation() {
        let frame = Frame::new(Bytes::from_static(b"hello"));
        assert!(frame.is_last());
        assert!(!frame.more);
        assert_eq!(frame.len(), 5);
    }

    #[test]
    fn with_more_sets_continuation() {
        let frame = Frame::with_more(Bytes::from_static(b"head"));
        assert!(frame.more);
        assert!(!frame.is_last());
    }

    #[test]
    fn sequence_flags_all_but_last() {
        let frames = Frame::sequence([
            Bytes::from_static(b"a"),
            Bytes::from_static(b"b"),
            Bytes::from_static(b"c"),
        ]);
        let flags: Vec<bool> = frames.iter().map(|f| f.more).collect();
        assert_eq!(flags, vec![true, true, false]);
        assert_eq!(frames[2].payload.as_ref(), b"c");
    }

    #[test]
    fn sequence_of_nothing_is_empty() {
        let frames = Frame::sequence(Vec::<Bytes>::new());
        assert!(frames.is_empty());
    }

    #[test]
    fn empty_payload_is_allowed() {
        let frame = Frame::new(Bytes::new());
        assert!(frame.is_empty());
        assert!(frame.is_last());
    }
}
