// ABOUTME: ADU framing: knows how many more bytes complete a frame, nothing about their meaning
// ABOUTME: Two variants only (MBAP/RTU) per spec §9 — dispatch is a match, not a trait object

pub mod mbap;
pub mod rtu;

use crate::error::GatewayError;
use crate::frame::Frame;
use crate::transport::FrameSource;

pub use mbap::MbapFramer;
pub use rtu::RtuFramer;

/// Which side of a conversation a frame is being read as. A request reader
/// and a response reader disagree about byte-counting for RTU (spec §4.2);
/// MBAP reads are symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    Request,
    Response,
}

/// Reads one complete application data unit (ADU) at a time from a
/// `FrameSource`, without knowing what the bytes mean beyond the minimum
/// needed to find the frame boundary.
#[derive(Debug, Clone, Copy)]
pub enum Framer {
    Mbap(MbapFramer),
    Rtu(RtuFramer),
}

impl Framer {
    pub async fn read_frame<S: FrameSource>(
        &self,
        source: &mut S,
        direction: FrameDirection,
    ) -> Result<Frame, GatewayError> {
        match self {
            Framer::Mbap(f) => f.read_frame(source).await,
            Framer::Rtu(f) => f.read_frame(source, direction).await,
        }
    }
}
