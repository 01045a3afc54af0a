use std::sync::Arc;

use bytes::Bytes;
use pipemux_frame::Frame;
use pipemux_pipe::{pair, Credential, InprocPipe, Pipe, PipeConfig};

/// Socket-side endpoint (as a trait object) plus the peer endpoint.
pub(crate) fn endpoint(credential: &'static str) -> (Arc<dyn Pipe>, InprocPipe) {
    endpoint_with_hwm(credential, 0)
}

pub(crate) fn endpoint_with_hwm(credential: &'static str, hwm: usize) -> (Arc<dyn Pipe>, InprocPipe) {
    let (ours, peer) = pair(PipeConfig {
        hwm,
        left_credential: Credential::from(credential),
        ..PipeConfig::default()
    });
    (Arc::new(ours), peer)
}

pub(crate) fn frame(payload: &'static str) -> Frame {
    Frame::new(Bytes::from_static(payload.as_bytes()))
}

pub(crate) fn more(payload: &'static str) -> Frame {
    Frame::with_more(Bytes::from_static(payload.as_bytes()))
}

pub(crate) fn text(frame: &Frame) -> &str {
    std::str::from_utf8(frame.payload.as_ref()).expect("test payloads are utf-8")
}
