// ABOUTME: Modbus device URL parsing — scheme defaulting and transport/protocol resolution
// ABOUTME: Mirrors the source's parse_url/transport_protocol_for_url exactly (spec §6)

use crate::error::GatewayError;

/// The physical transport a URL resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Serial,
    Rfc2217,
    SerialTcp,
}

/// The ADU framing a URL resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Tcp,
    Rtu,
}

#[derive(Debug, Clone)]
pub struct DeviceUrl {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: Option<String>,
}

/// Prepend `tcp://` when no scheme separator is present, and substitute `0`
/// for an empty host (any interface), matching `parse_url` in the source.
pub fn parse_url(url: &str) -> Result<DeviceUrl, GatewayError> {
    let url = if url.contains("://") {
        url.to_string()
    } else {
        format!("tcp://{url}")
    };

    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| GatewayError::Config(format!("invalid device url: {url}")))?;

    // `scheme:///path/to/device` (no host) — a path-style URL, used for
    // local serial devices.
    if let Some(path) = rest.strip_prefix('/') {
        return Ok(DeviceUrl {
            scheme: scheme.to_string(),
            host: String::new(),
            port: None,
            path: Some(format!("/{path}")),
        });
    }

    let (host, port) = match rest.split_once(':') {
        Some((h, p)) => {
            let port = p
                .parse::<u16>()
                .map_err(|_| GatewayError::Config(format!("invalid port in url: {url}")))?;
            (h, Some(port))
        }
        None => (rest, None),
    };
    let host = if host.is_empty() { "0" } else { host };

    Ok(DeviceUrl {
        scheme: scheme.to_string(),
        host: host.to_string(),
        port,
        path: None,
    })
}

/// Resolve `(transport, protocol)` from a device URL's scheme, per spec §6:
///
/// - `tcp` / bare host:port          → (tcp, tcp)
/// - `tcp+rtu`                       → (tcp, rtu)
/// - `serial`                        → (serial, rtu)
/// - `rfc2217`                       → (rfc2217, rtu)
/// - `serial+tcp`                   → (serial, tcp)
/// - `serial+tcp+rtu`                → (serial+tcp, rtu)
pub fn transport_protocol_for_url(
    url: &DeviceUrl,
) -> Result<(TransportKind, ProtocolKind), GatewayError> {
    let scheme = url.scheme.as_str();
    let (transport_name, protocol_name) = if let Some((transport, protocol)) = scheme.rsplit_once('+') {
        (transport, protocol)
    } else if scheme == "tcp" {
        ("tcp", "tcp")
    } else {
        (scheme, "rtu")
    };

    let transport = match transport_name {
        "tcp" => TransportKind::Tcp,
        "serial" => TransportKind::Serial,
        "rfc2217" => TransportKind::Rfc2217,
        "serial+tcp" => TransportKind::SerialTcp,
        other => {
            return Err(GatewayError::Config(format!(
                "unknown modbus transport: {other}"
            )))
        }
    };
    let protocol = match protocol_name {
        "tcp" => ProtocolKind::Tcp,
        "rtu" => ProtocolKind::Rtu,
        other => {
            return Err(GatewayError::Config(format!(
                "unknown modbus protocol: {other}"
            )))
        }
    };
    Ok((transport, protocol))
}
