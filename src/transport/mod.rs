// ABOUTME: Byte-oriented duplex link to the upstream Modbus device: TCP socket or serial port
// ABOUTME: Represented as a closed enum per spec §9 rather than a trait object — framing sits above this

pub mod client;
pub mod serial;
pub mod tcp;

use crate::error::GatewayError;

pub use client::ClientTransport;
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

/// Anything a `Framer` can read a fixed number of bytes from: the upstream
/// `Transport` or a per-client `ClientTransport`. Kept as a native async
/// trait (no `async-trait` dependency) per the codebase's existing
/// preference for `impl Future` return types on traits.
pub trait FrameSource: Send {
    fn read_exactly(
        &mut self,
        n: usize,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, GatewayError>> + Send;
}

impl FrameSource for Transport {
    async fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>, GatewayError> {
        Transport::read_exactly(self, n).await
    }
}

/// A byte-oriented duplex link to the upstream Modbus device.
///
/// Timeouts are not a `Transport` concern: callers (`Upstream`) wrap whole
/// operations in `tokio::time::timeout`. A `Transport` only ever reports
/// `IncompleteRead` or `Io` failures.
#[derive(Debug)]
pub enum Transport {
    Tcp(TcpTransport),
    Serial(SerialTransport),
}

impl Transport {
    /// (Re)establish the link. Closes any existing connection first.
    pub async fn open(&mut self) -> Result<(), GatewayError> {
        match self {
            Transport::Tcp(t) => t.open().await,
            Transport::Serial(t) => t.open().await,
        }
    }

    /// Close the link. Idempotent.
    pub async fn close(&mut self) {
        match self {
            Transport::Tcp(t) => t.close().await,
            Transport::Serial(t) => t.close().await,
        }
    }

    /// Write the given bytes in full.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), GatewayError> {
        match self {
            Transport::Tcp(t) => t.write(data).await,
            Transport::Serial(t) => t.write(data).await,
        }
    }

    /// Read exactly `n` bytes, aggregating as many underlying reads as needed.
    pub async fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>, GatewayError> {
        match self {
            Transport::Tcp(t) => t.read_exactly(n).await,
            Transport::Serial(t) => t.read_exactly(n).await,
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            Transport::Tcp(t) => t.is_open(),
            Transport::Serial(t) => t.is_open(),
        }
    }
}

/// Shared `read_exactly` loop, mirroring `asyncio.StreamReader.readexactly`:
/// keep reading into the unfilled tail of a fixed `n`-byte buffer until it is
/// full. A read returning `Ok(0)` means the peer closed the stream mid-frame,
/// reported with however many bytes were collected so far.
pub(crate) async fn read_exactly_via<R>(n: usize, reader: &mut R) -> Result<Vec<u8>, GatewayError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;
    let mut buf = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        let read = reader.read(&mut buf[filled..]).await?;
        if read == 0 {
            return Err(GatewayError::IncompleteRead { have: filled, want: n });
        }
        filled += read;
    }
    Ok(buf)
}
