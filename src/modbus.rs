// ABOUTME: Modbus function code tables and the request/response static/dynamic groupings
// ABOUTME: that drive the RTU framer's byte-counting, plus CRC-16/MODBUS for ADU translation

use num_enum::TryFromPrimitive;

/// Modbus function codes relevant to framing (data-access and diagnostic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum FunctionCode {
    ReadCoils = 1,
    ReadDiscreteInputs = 2,
    ReadHoldingRegisters = 3,
    ReadInputRegisters = 4,
    WriteSingleCoil = 5,
    WriteSingleRegister = 6,
    ReadExceptionStatus = 7,
    Diagnostics = 8,
    GetCommEventCounter = 11,
    GetCommEventLog = 12,
    WriteMultipleCoils = 15,
    WriteMultipleRegisters = 16,
    ReportServerId = 17,
    ReadFileRecord = 20,
    WriteFileRecord = 21,
    ReadWriteMultipleRegisters = 23,
    ReadFifoQueue = 24,
}

impl FunctionCode {
    /// Requests for these functions are fixed-length: 8 total bytes
    /// (`address, func, starting_address(2), value(2), byte_count` then 1 CRC byte).
    pub fn is_static_request(self) -> bool {
        matches!(
            self,
            FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters
                | FunctionCode::WriteSingleCoil
                | FunctionCode::WriteSingleRegister
        )
    }

    /// Requests for these functions carry a variable-length payload whose size
    /// is given by the request's own `byte_count` field.
    pub fn is_dynamic_request(self) -> bool {
        matches!(
            self,
            FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters
        )
    }

    /// Responses for these functions are fixed at 4 bytes of fixed fields + CRC.
    pub fn is_static_response(self) -> bool {
        matches!(
            self,
            FunctionCode::WriteSingleCoil
                | FunctionCode::WriteSingleRegister
                | FunctionCode::WriteMultipleCoils
                | FunctionCode::WriteMultipleRegisters
        )
    }

    /// Responses for these functions carry a leading byte-count `N` followed
    /// by `N` bytes of data, then CRC. Every other function code (including
    /// ones outside the general set above) is unknown to the RTU framer.
    pub fn is_dynamic_response(self) -> bool {
        matches!(
            self,
            FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters
        )
    }
}

/// Compute CRC-16/MODBUS over `data`, returned as the two wire bytes
/// (low byte first, as Modbus RTU appends it).
pub fn crc16_modbus(data: &[u8]) -> [u8; 2] {
    let crc = crc16::State::<crc16::MODBUS>::calculate(data);
    crc.to_le_bytes()
}
