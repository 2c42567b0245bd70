// ABOUTME: MBAP<->RTU ADU translation at the bridge boundary (spec §4.4)
// ABOUTME: Resolves the source's open question: translation IS implemented, not merely forwarded

use crate::error::GatewayError;
use crate::frame::Frame;
use crate::modbus::crc16_modbus;

const MBAP_HEADER_LEN: usize = 6;
const RTU_CRC_LEN: usize = 2;

/// Extract the PDU (unit id + function code + payload) from an inbound MBAP
/// request and wrap it as an RTU ADU: unit id, PDU, CRC-16/MODBUS.
///
/// Returns the original transaction id alongside the RTU frame so the caller
/// can stitch a matching MBAP header back onto the eventual response.
pub fn mbap_request_to_rtu(mbap: &Frame) -> Result<(u16, Frame), GatewayError> {
    let bytes = mbap.as_bytes();
    if bytes.len() < MBAP_HEADER_LEN + 1 {
        return Err(GatewayError::Frame("mbap frame too short to translate".into()));
    }
    let txid = u16::from_be_bytes([bytes[0], bytes[1]]);
    let pdu = &bytes[MBAP_HEADER_LEN..];
    let mut rtu = pdu.to_vec();
    let crc = crc16_modbus(&rtu);
    rtu.extend_from_slice(&crc);
    Ok((txid, Frame::from(rtu)))
}

/// Prepend an MBAP header (matching `txid`, protocol id 0, length covering
/// the PDU) onto an RTU response, stripping its trailing CRC.
pub fn rtu_response_to_mbap(txid: u16, rtu: &Frame) -> Result<Frame, GatewayError> {
    let bytes = rtu.as_bytes();
    if bytes.len() < RTU_CRC_LEN + 1 {
        return Err(GatewayError::Frame("rtu frame too short to translate".into()));
    }
    let pdu = &bytes[..bytes.len() - RTU_CRC_LEN];
    let length = (pdu.len()) as u16;
    let mut mbap = Vec::with_capacity(MBAP_HEADER_LEN + pdu.len());
    mbap.extend_from_slice(&txid.to_be_bytes());
    mbap.extend_from_slice(&[0x00, 0x00]); // protocol id: always 0 for Modbus
    mbap.extend_from_slice(&length.to_be_bytes());
    mbap.extend_from_slice(pdu);
    Ok(Frame::from(mbap))
}
