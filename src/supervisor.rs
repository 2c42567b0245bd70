// ABOUTME: Builds and runs every configured Bridge concurrently, and tears them down on shutdown
// ABOUTME: Grounded on the source's top-level main()/run() wiring plus asyncio.gather over bridges

use crate::bridge::Bridge;
use crate::config::DeviceConfig;
use crate::error::GatewayError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct Supervisor {
    bridges: Vec<Arc<Mutex<Bridge>>>,
}

impl Supervisor {
    pub fn new(devices: &[DeviceConfig]) -> Result<Self, GatewayError> {
        let bridges = devices
            .iter()
            .map(|device| Bridge::new(device).map(|b| Arc::new(Mutex::new(b))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Supervisor { bridges })
    }

    /// Start every bridge, then serve until a shutdown signal (Ctrl-C)
    /// arrives, then stop every bridge and wait for in-flight client
    /// sessions to finish. Returns the process exit code: 0 on orderly
    /// shutdown, 1 if any bridge failed to start.
    pub async fn run(self) -> i32 {
        for bridge in &self.bridges {
            if let Err(err) = bridge.lock().await.start().await {
                error!(error = %err, "bridge failed to start");
                self.stop_all().await;
                return 1;
            }
        }

        let cancel_handles: Vec<CancellationToken> = {
            let mut handles = Vec::with_capacity(self.bridges.len());
            for bridge in &self.bridges {
                handles.push(bridge.lock().await.cancel_handle());
            }
            handles
        };

        let mut tasks = tokio::task::JoinSet::new();
        for bridge in &self.bridges {
            let bridge = Arc::clone(bridge);
            tasks.spawn(async move { bridge.lock().await.serve_forever().await });
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
            }
            Some(joined) = tasks.join_next() => {
                if let Ok(Err(err)) = joined {
                    error!(error = %err, "bridge accept loop failed");
                }
            }
        }

        for handle in &cancel_handles {
            handle.cancel();
        }
        while tasks.join_next().await.is_some() {}

        self.stop_all().await;
        info!("all bridges stopped");
        0
    }

    async fn stop_all(&self) {
        for bridge in &self.bridges {
            bridge.lock().await.stop().await;
        }
    }
}
