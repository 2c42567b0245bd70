// ABOUTME: Serial transport to an RTU upstream device, opened via tokio-serial
// ABOUTME: Defaults to 19200-8-E-1 per Modbus convention when the config omits serial settings

use super::read_exactly_via;
use crate::config::SerialConfig;
use crate::error::GatewayError;
use tokio::io::AsyncWriteExt;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info};

#[derive(Debug)]
pub struct SerialTransport {
    path: String,
    settings: SerialConfig,
    port: Option<SerialStream>,
}

impl SerialTransport {
    pub fn new(path: impl Into<String>, settings: SerialConfig) -> Self {
        SerialTransport {
            path: path.into(),
            settings,
            port: None,
        }
    }

    pub async fn open(&mut self) -> Result<(), GatewayError> {
        self.close().await;
        info!(path = %self.path, baud = self.settings.baud, "opening modbus serial device");
        let port = tokio_serial::new(&self.path, self.settings.baud)
            .data_bits(self.settings.data_bits.to_tokio_serial())
            .parity(self.settings.parity.to_tokio_serial())
            .stop_bits(self.settings.stop_bits.to_tokio_serial())
            .open_native_async()
            .map_err(|err| GatewayError::Connect(std::io::Error::from(err)))?;
        self.port = Some(port);
        info!("serial port open");
        Ok(())
    }

    pub async fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("closing serial transport");
        }
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), GatewayError> {
        let port = self.port.as_mut().ok_or_else(|| {
            GatewayError::Connect(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "serial transport not open",
            ))
        })?;
        debug!(len = data.len(), "writing to modbus serial device");
        port.write_all(data).await?;
        Ok(())
    }

    pub async fn read_exactly(&mut self, n: usize) -> Result<Vec<u8>, GatewayError> {
        let port = self.port.as_mut().ok_or_else(|| {
            GatewayError::Connect(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "serial transport not open",
            ))
        })?;
        read_exactly_via(n, port).await
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl crate::config::DataBitsConfig {
    fn to_tokio_serial(self) -> DataBits {
        match self {
            crate::config::DataBitsConfig::Five => DataBits::Five,
            crate::config::DataBitsConfig::Six => DataBits::Six,
            crate::config::DataBitsConfig::Seven => DataBits::Seven,
            crate::config::DataBitsConfig::Eight => DataBits::Eight,
        }
    }
}

impl crate::config::ParityConfig {
    fn to_tokio_serial(self) -> Parity {
        match self {
            crate::config::ParityConfig::None => Parity::None,
            crate::config::ParityConfig::Odd => Parity::Odd,
            crate::config::ParityConfig::Even => Parity::Even,
        }
    }
}

impl crate::config::StopBitsConfig {
    fn to_tokio_serial(self) -> StopBits {
        match self {
            crate::config::StopBitsConfig::One => StopBits::One,
            crate::config::StopBitsConfig::Two => StopBits::Two,
        }
    }
}
