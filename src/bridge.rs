// ABOUTME: Listens on one TCP endpoint, multiplexing every accepted client onto one Upstream
// ABOUTME: Client ↔ bridge is always MBAP over TCP; translates to RTU when the device needs it (spec §4.4)

use crate::config::DeviceConfig;
use crate::error::GatewayError;
use crate::framer::{Framer, MbapFramer, RtuFramer};
use crate::transport::{ClientTransport, SerialTransport, TcpTransport, Transport};
use crate::translate;
use crate::upstream::Upstream;
use crate::url::{parse_url, transport_protocol_for_url, ProtocolKind, TransportKind};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A listening endpoint paired with the one upstream device it bridges to.
pub struct Bridge {
    name: String,
    bind_host: String,
    bind_port: u16,
    upstream: Arc<Upstream>,
    upstream_framing: ProtocolKind,
    listener: Option<TcpListener>,
    clients: JoinSet<()>,
    cancel: CancellationToken,
}

impl Bridge {
    pub fn new(config: &DeviceConfig) -> Result<Self, GatewayError> {
        let bind = parse_url(&config.listen_bind)
            .map_err(|err| GatewayError::Config(format!("invalid listen address: {err}")))?;
        let bind_host = if bind.host == "0" { "0.0.0.0".to_string() } else { bind.host };
        let bind_port = bind.port.unwrap_or(502);

        let device_url = parse_url(&config.upstream_url)
            .map_err(|err| GatewayError::Config(format!("invalid modbus url: {err}")))?;
        let (transport_kind, protocol_kind) = transport_protocol_for_url(&device_url)
            .map_err(|err| GatewayError::Config(format!("invalid modbus url: {err}")))?;

        let transport = match transport_kind {
            TransportKind::Tcp | TransportKind::Rfc2217 | TransportKind::SerialTcp => {
                let port = device_url
                    .port
                    .ok_or_else(|| GatewayError::Config("modbus url missing port".into()))?;
                Transport::Tcp(TcpTransport::new(device_url.host, port))
            }
            TransportKind::Serial => {
                let path = device_url.path.ok_or_else(|| {
                    GatewayError::Config("serial modbus url missing device path".into())
                })?;
                Transport::Serial(SerialTransport::new(path, config.serial))
            }
        };

        let framer = match protocol_kind {
            ProtocolKind::Tcp => Framer::Mbap(MbapFramer),
            ProtocolKind::Rtu => Framer::Rtu(RtuFramer),
        };

        let name = format!("{} <-> {}", config.listen_bind, config.upstream_url);
        Ok(Bridge {
            name,
            bind_host,
            bind_port,
            upstream: Arc::new(Upstream::new(transport, framer, config)),
            upstream_framing: protocol_kind,
            listener: None,
            clients: JoinSet::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn address(&self) -> Option<SocketAddr> {
        self.listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
    }

    pub async fn is_open(&self) -> bool {
        self.upstream.is_open().await
    }

    /// A clone of this bridge's cancellation token, so a supervisor can
    /// trigger shutdown of the accept loop without holding `&mut Bridge`
    /// while it runs.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let listener = TcpListener::bind((self.bind_host.as_str(), self.bind_port)).await?;
        info!(bridge = %self.name, addr = ?listener.local_addr(), "ready to accept requests");
        self.listener = Some(listener);
        Ok(())
    }

    pub async fn serve_forever(&mut self) -> Result<(), GatewayError> {
        if self.listener.is_none() {
            self.start().await?;
        }
        let listener = self.listener.as_ref().expect("just started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(bridge = %self.name, "accept loop cancelled");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    info!(bridge = %self.name, %peer, "client connected");
                    let upstream = Arc::clone(&self.upstream);
                    let upstream_framing = self.upstream_framing;
                    let cancel = self.cancel.child_token();
                    self.clients.spawn(async move {
                        serve_client(stream, peer, upstream, upstream_framing, cancel).await;
                    });
                }
                Some(result) = self.clients.join_next(), if !self.clients.is_empty() => {
                    if let Err(err) = result {
                        if !err.is_cancelled() {
                            error!(bridge = %self.name, error = %err, "client session task panicked");
                        }
                    }
                }
            }
        }
    }

    /// Stop accepting new clients, cancel every in-flight client session,
    /// wait for them all to finish, then close the upstream link. One-way: a
    /// stopped Bridge never re-binds.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        self.listener = None;
        while self.clients.join_next().await.is_some() {}
        self.close().await;
    }

    pub async fn close(&self) {
        self.upstream.close().await;
    }
}

async fn serve_client(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    upstream: Arc<Upstream>,
    upstream_framing: ProtocolKind,
    cancel: CancellationToken,
) {
    let mut client = ClientTransport::new(stream, peer);
    let client_framer = MbapFramer;
    loop {
        let request = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%peer, "client session cancelled");
                return;
            }
            result = client_framer.read_frame(&mut client) => result,
        };

        let request = match request {
            Ok(frame) => frame,
            Err(err) if err.is_clean_disconnect() => {
                info!(%peer, "client closed connection");
                return;
            }
            Err(err) => {
                error!(%peer, error = %err, "reading error");
                return;
            }
        };

        let response = match exchange(&upstream, upstream_framing, &request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%peer, error = %err, "upstream exchange failed, dropping client");
                return;
            }
        };

        if let Err(err) = client.write(response.as_bytes()).await {
            error!(%peer, error = %err, "writing response to client");
            return;
        }
    }
}

/// Run one client request through the upstream, translating MBAP<->RTU at
/// the boundary when the upstream framing differs from the client's.
async fn exchange(
    upstream: &Upstream,
    upstream_framing: ProtocolKind,
    request: &crate::frame::Frame,
) -> Result<crate::frame::Frame, GatewayError> {
    match upstream_framing {
        ProtocolKind::Tcp => upstream.exchange(request).await,
        ProtocolKind::Rtu => {
            let (txid, rtu_request) = translate::mbap_request_to_rtu(request)?;
            let rtu_response = upstream.exchange(&rtu_request).await?;
            translate::rtu_response_to_mbap(txid, &rtu_response)
        }
    }
}

