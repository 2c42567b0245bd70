// ABOUTME: Modbus TCP (MBAP) framing: fixed 6-byte header, length field gives the rest
// ABOUTME: Request and response frames share the same shape, so one reader serves both directions

use crate::error::GatewayError;
use crate::frame::Frame;
use crate::transport::FrameSource;

const HEADER_LEN: usize = 6;

/// Reads a Modbus TCP ADU: transaction id(2) + protocol id(2) + length(2),
/// followed by `length` more bytes (unit id + PDU).
#[derive(Debug, Clone, Copy, Default)]
pub struct MbapFramer;

impl MbapFramer {
    pub async fn read_frame<S: FrameSource>(&self, source: &mut S) -> Result<Frame, GatewayError> {
        let header = source.read_exactly(HEADER_LEN).await?;
        let size = u16::from_be_bytes([header[4], header[5]]) as usize;
        let rest = source.read_exactly(size).await?;
        let mut adu = header;
        adu.extend_from_slice(&rest);
        Ok(Frame::from(adu))
    }
}
