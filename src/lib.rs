//! Bridges many TCP clients onto one serialized upstream Modbus link.
//!
//! A gateway process owns one [`Supervisor`], which owns one [`Bridge`] per
//! configured device. Each bridge accepts plain Modbus TCP (MBAP) clients and
//! forwards their requests, one at a time, to whatever the device actually
//! speaks — TCP, RTU-over-TCP, or RTU-over-serial — translating ADUs at the
//! boundary when the framing differs.
//!
//! # Examples
//!
//! ```rust,no_run
//! use modbus_gateway::config::{create_devices, Cli};
//! use modbus_gateway::Supervisor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cli = Cli::parse();
//!     let resolved = create_devices(&cli)?;
//!     let supervisor = Supervisor::new(&resolved.devices)?;
//!     std::process::exit(supervisor.run().await);
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod framer;
pub mod logging;
pub mod modbus;
pub mod supervisor;
pub mod transport;
pub mod translate;
pub mod upstream;
pub mod url;

pub use bridge::Bridge;
pub use config::{Cli, DeviceConfig, GatewayConfig};
pub use error::{GatewayError, Result};
pub use frame::Frame;
pub use supervisor::Supervisor;
