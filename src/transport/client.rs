// ABOUTME: Thin read/write wrapper around an accepted client TcpStream
// ABOUTME: Unlike Transport, a client socket has no reconnect/open semantics — it is dropped on error

use super::{read_exactly_via, FrameSource};
use crate::error::GatewayError;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[derive(Debug)]
pub struct ClientTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl ClientTransport {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        ClientTransport { stream, peer }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), GatewayError> {
        self.stream.write_all(data).await?;
        Ok(())
    }
}

impl FrameSource for ClientTransport {
    async fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>, GatewayError> {
        read_exactly_via(n, &mut self.stream).await
    }
}
