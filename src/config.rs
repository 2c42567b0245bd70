// ABOUTME: CLI flags, config file loading (YAML/TOML/JSON) and the DeviceConfig/GatewayConfig model
// ABOUTME: Mirrors the source's parse_args/load_config/create_config pipeline (spec §6)

use crate::error::GatewayError;
use argh::FromArgs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ModBus proxy.
#[derive(FromArgs, Debug)]
pub struct Cli {
    /// config file (YAML/TOML/JSON)
    #[argh(option, short = 'c')]
    pub config_file: Option<PathBuf>,

    /// listen address for the `--modbus` device
    #[argh(option, short = 'b')]
    pub bind: Option<String>,

    /// modbus device address (ex: tcp://plc.acme.org:502)
    #[argh(option)]
    pub modbus: Option<String>,

    /// delay after establishing connection with modbus before first request
    #[argh(option, default = "0.0")]
    pub modbus_connection_time: f64,

    /// modbus connection and request timeout in seconds
    #[argh(option, default = "10.0")]
    pub timeout: f64,

    /// log configuration file (deprecated; use the config file's `logging` section)
    #[argh(option)]
    pub log_config_file: Option<PathBuf>,
}

impl Cli {
    pub fn parse() -> Self {
        argh::from_env()
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.config_file.is_none() && self.modbus.is_none() {
            return Err(GatewayError::Config(
                "must give a config-file or/and a --modbus".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataBitsConfig {
    Five,
    Six,
    Seven,
    Eight,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StopBitsConfig {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default)]
    pub data_bits: DataBitsConfig,
    #[serde(default)]
    pub parity: ParityConfig,
    #[serde(default)]
    pub stop_bits: StopBitsConfig,
}

fn default_baud() -> u32 {
    19200
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baud: default_baud(),
            data_bits: DataBitsConfig::default(),
            parity: ParityConfig::default(),
            stop_bits: StopBitsConfig::default(),
        }
    }
}

impl Default for DataBitsConfig {
    fn default() -> Self {
        DataBitsConfig::Eight
    }
}

impl Default for ParityConfig {
    fn default() -> Self {
        ParityConfig::Even
    }
}

impl Default for StopBitsConfig {
    fn default() -> Self {
        StopBitsConfig::One
    }
}

/// Modbus-side settings for one bridge, nested under `devices[].modbus`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModbusSection {
    pub url: String,
    #[serde(default)]
    pub timeout: Option<f64>,
    #[serde(default)]
    pub connection_time: f64,
    #[serde(default)]
    pub attempts: Option<u32>,
    #[serde(default)]
    pub serial: Option<SerialConfig>,
}

/// Listen-side settings for one bridge, nested under `devices[].listen`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenSection {
    pub bind: String,
}

/// One `devices[]` entry as it appears in a config file.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSection {
    pub modbus: ModbusSection,
    pub listen: ListenSection,
}

/// Immutable, resolved configuration for one bridge (spec §3).
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub upstream_url: String,
    pub listen_bind: String,
    pub timeout: Option<Duration>,
    pub connection_time: Duration,
    pub attempts: u32,
    pub serial: SerialConfig,
}

const DEFAULT_ATTEMPTS: u32 = 2;

impl From<DeviceSection> for DeviceConfig {
    fn from(section: DeviceSection) -> Self {
        // `attempts: 0` would leave Upstream::exchange's retry loop with
        // nothing to run; a config author asking for zero attempts gets one.
        let attempts = section.modbus.attempts.unwrap_or(DEFAULT_ATTEMPTS).max(1);
        DeviceConfig {
            upstream_url: section.modbus.url,
            listen_bind: section.listen.bind,
            timeout: section.modbus.timeout.map(Duration::from_secs_f64),
            connection_time: Duration::from_secs_f64(section.modbus.connection_time),
            attempts,
            serial: section.modbus.serial.unwrap_or_default(),
        }
    }
}

/// The root of a loaded config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub devices: Vec<DeviceSection>,
    #[serde(default)]
    pub logging: Option<crate::logging::LoggingConfig>,
}

/// Parse a config-shaped file, dispatching on its extension exactly like the
/// source's `load_config`: `.toml` → TOML, `.yml`/`.yaml` → YAML,
/// `.json` → JSON. Generic so it can load either a full `GatewayConfig` or
/// a standalone `LoggingConfig` (the `--log-config-file` alias).
fn parse_config_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, GatewayError> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        GatewayError::Config(format!("cannot read config file {}: {err}", path.display()))
    })?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "toml" => toml::from_str(&contents)
            .map_err(|err| GatewayError::Config(format!("invalid toml config: {err}"))),
        "yml" | "yaml" => serde_yaml::from_str(&contents)
            .map_err(|err| GatewayError::Config(format!("invalid yaml config: {err}"))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| GatewayError::Config(format!("invalid json config: {err}"))),
        other => Err(GatewayError::Config(format!(
            "unsupported config file extension: {other:?}"
        ))),
    }
}

pub fn load_config(path: &Path) -> Result<GatewayConfig, GatewayError> {
    parse_config_file(path)
}

/// Load a standalone logging config file, the shape pointed at by the
/// deprecated `--log-config-file` flag.
pub fn load_logging_config(path: &Path) -> Result<crate::logging::LoggingConfig, GatewayError> {
    parse_config_file(path)
}

/// A config file plus any `--modbus` device, fully resolved for startup.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub devices: Vec<DeviceConfig>,
    pub logging: Option<crate::logging::LoggingConfig>,
}

/// Build the final list of `DeviceConfig` from CLI args, mirroring
/// `create_config`/`create_bridges`: load the config file (if any), then
/// append a device built from `--modbus`/`--bind`/`--timeout`/
/// `--modbus-connection-time` (if given).
pub fn create_devices(cli: &Cli) -> Result<ResolvedConfig, GatewayError> {
    cli.validate()?;

    let mut config = match &cli.config_file {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    if let Some(modbus_url) = &cli.modbus {
        let bind = cli.bind.clone().unwrap_or_else(|| ":502".to_string());
        config.devices.push(DeviceSection {
            modbus: ModbusSection {
                url: modbus_url.clone(),
                timeout: Some(cli.timeout),
                connection_time: cli.modbus_connection_time,
                attempts: None,
                serial: None,
            },
            listen: ListenSection { bind },
        });
    }

    let logging = match config.logging {
        Some(logging) => Some(logging),
        None => match &cli.log_config_file {
            Some(path) => Some(load_logging_config(path)?),
            None => None,
        },
    };

    Ok(ResolvedConfig {
        devices: config.devices.into_iter().map(DeviceConfig::from).collect(),
        logging,
    })
}
