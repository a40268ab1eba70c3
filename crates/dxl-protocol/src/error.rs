//! 协议层错误类型定义
//!
//! - [`ConfigurationError`]：调用方或数据模型使用错误（未知型号、未知寄存器、访问模式错误等）
//! - [`PacketError`]：帧格式、校验和、设备错误码等线路层问题

use crate::packet::ErrorFlags;
use thiserror::Error;

/// 配置错误
///
/// 这类错误与总线状态无关，重试不会改变结果。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No actuator model for model number {model_number}")]
    UnknownModel { model_number: u16 },

    #[error("Model {model} has no register called {register}")]
    UnknownRegister { model: &'static str, register: String },

    #[error("Register {register} of model {model} is not readable")]
    NotReadable { model: &'static str, register: String },

    #[error("Register {register} of model {model} is not writable")]
    NotWritable { model: &'static str, register: String },

    #[error("Model {model} register {register} has size {expected}: passed size {actual}")]
    SizeMismatch {
        model: &'static str,
        register: String,
        expected: usize,
        actual: usize,
    },

    #[error("Value {value} does not fit register {register} (max {max})")]
    ValueOutOfRange {
        register: String,
        value: u32,
        max: u16,
    },

    #[error("Cannot find actuator ID {id}")]
    UnknownActuator { id: u8 },

    /// 广播 ID 不会应答，不能作为需要应答的目标
    #[error("ID {id} is not a unicast address")]
    NotUnicast { id: u8 },

    /// 只读的 EEPROM 寄存器与期望值不一致，禁止静默跳过
    #[error("Cannot change EEPROM register {register} from {current} to {desired} on actuator ID {id}")]
    PersistentDrift {
        id: u8,
        register: String,
        current: u16,
        desired: u16,
    },
}

/// 帧解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// 长度字段无法容纳错误字节和校验和
    #[error("Malformed length field {length} in status packet from ID {id}")]
    MalformedLength { id: u8, length: u8 },

    #[error("Status packet from ID {id} announced {expected} bytes, got {actual}")]
    BodyLengthMismatch { id: u8, expected: usize, actual: usize },

    /// 设备上报的非零错误字节
    #[error("Received error code from actuator {id}: {flags}")]
    Device { id: u8, flags: ErrorFlags },

    #[error("Invalid checksum from ID {id}: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { id: u8, expected: u8, actual: u8 },

    #[error("Payload of {len} bytes exceeds the maximum frame size")]
    PayloadTooLong { len: usize },

    #[error("Invalid frame header: {found:02X?}")]
    InvalidHeader { found: [u8; 2] },

    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}
