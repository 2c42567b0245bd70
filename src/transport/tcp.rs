// ABOUTME: TCP transport to an upstream Modbus TCP device (MBAP or tunneled RTU)
// ABOUTME: Also backs the rfc2217/serial+tcp schemes, which are plain TCP byte streams at this layer

use super::read_exactly_via;
use crate::error::GatewayError;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

#[derive(Debug)]
pub struct TcpTransport {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        TcpTransport {
            host: host.into(),
            port,
            stream: None,
        }
    }

    pub async fn open(&mut self) -> Result<(), GatewayError> {
        self.close().await;
        info!(host = %self.host, port = self.port, "connecting to modbus TCP device");
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(GatewayError::Connect)?;
        self.stream = Some(stream);
        info!("connected");
        Ok(())
    }

    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!("closing tcp transport");
            let _ = stream.shutdown().await;
        }
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), GatewayError> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            GatewayError::Connect(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "tcp transport not open",
            ))
        })?;
        debug!(len = data.len(), "writing to modbus TCP device");
        stream.write_all(data).await?;
        Ok(())
    }

    pub async fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>, GatewayError> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            GatewayError::Connect(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "tcp transport not open",
            ))
        })?;
        read_exactly_via(n, stream).await
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
