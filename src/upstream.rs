// ABOUTME: Owns one Transport+Framer pair to the modbus device, serialized behind a single
// ABOUTME: FIFO-fair lock with timeout/retry/reconnect (spec §4.3), grounded on Bridge.write_read_response_frame

use crate::config::DeviceConfig;
use crate::error::GatewayError;
use crate::frame::Frame;
use crate::framer::{Framer, FrameDirection};
use crate::transport::Transport;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{error, info};

/// Lifecycle state of the link to the modbus device (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamState {
    Closed,
    Connecting,
    Open,
    Draining,
}

struct UpstreamInner {
    transport: Transport,
    framer: Framer,
    state: UpstreamState,
}

/// One bridge's exclusive connection to its modbus device. `exchange` is the
/// only way in: it serializes every client's request/response round trip
/// behind one lock so there is never more than one in-flight transaction.
pub struct Upstream {
    inner: Mutex<UpstreamInner>,
    timeout: Option<Duration>,
    connection_time: Duration,
    attempts: u32,
}

impl Upstream {
    pub fn new(transport: Transport, framer: Framer, config: &DeviceConfig) -> Self {
        Upstream {
            inner: Mutex::new(UpstreamInner {
                transport,
                framer,
                state: UpstreamState::Closed,
            }),
            timeout: config.timeout,
            connection_time: config.connection_time,
            attempts: config.attempts.max(1),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.state == UpstreamState::Open
    }

    /// Close the link immediately, regardless of current state.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.transport.close().await;
        inner.state = UpstreamState::Closed;
    }

    /// Write `request` and read back exactly one response frame, retrying
    /// reconnects up to `self.attempts` times. Holds the lock for the whole
    /// operation so exchanges are strictly serialized.
    pub async fn exchange(&self, request: &Frame) -> Result<Frame, GatewayError> {
        let mut inner = self.inner.lock().await;
        let mut last_err = None;
        for attempt in 1..=self.attempts {
            match self.try_exchange(&mut inner, request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if inner.state == UpstreamState::Open {
                        inner.state = UpstreamState::Draining;
                    }
                    inner.transport.close().await;
                    inner.state = UpstreamState::Closed;
                    if attempt == self.attempts {
                        return Err(err);
                    }
                    error!(attempt, attempts = self.attempts, error = %err, "write_read error, retrying");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.expect("attempts >= 1"))
    }

    async fn try_exchange(
        &self,
        inner: &mut UpstreamInner,
        request: &Frame,
    ) -> Result<Frame, GatewayError> {
        if inner.state != UpstreamState::Open {
            self.connect(inner).await?;
        }
        self.run_with_timeout(async {
            inner.transport.write(request.as_bytes()).await?;
            inner
                .framer
                .read_frame(&mut inner.transport, FrameDirection::Response)
                .await
        })
        .await
    }

    async fn connect(&self, inner: &mut UpstreamInner) -> Result<(), GatewayError> {
        inner.state = UpstreamState::Connecting;
        let result = self.run_with_timeout(inner.transport.open()).await;
        match result {
            Ok(()) => {
                inner.state = UpstreamState::Open;
                if !self.connection_time.is_zero() {
                    info!(delay = ?self.connection_time, "delay after connect");
                    sleep(self.connection_time).await;
                }
                Ok(())
            }
            Err(err) => {
                inner.state = UpstreamState::Closed;
                Err(err)
            }
        }
    }

    async fn run_with_timeout<F, T>(&self, fut: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        match self.timeout {
            Some(duration) => tokio::time::timeout(duration, fut)
                .await
                .map_err(|_| GatewayError::Timeout)?,
            None => fut.await,
        }
    }
}
