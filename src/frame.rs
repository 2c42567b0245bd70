// ABOUTME: The opaque Modbus ADU type passed between Framer, Upstream and Bridge
// ABOUTME: Frames are never inspected for function-code semantics outside modbus.rs/translate.rs

use bytes::Bytes;
use std::fmt;

/// One complete Modbus ADU (envelope + PDU), exactly as read off the wire.
///
/// A `Frame` is opaque: the gateway passes it through unmodified except where
/// `translate` explicitly rewrites envelope bytes for MBAP⟷RTU translation.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(pub Bytes);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Frame(Bytes::from(bytes))
    }
}

impl From<Bytes> for Frame {
    fn from(bytes: Bytes) -> Self {
        Frame(bytes)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({} bytes)", self.0.len())
    }
}
