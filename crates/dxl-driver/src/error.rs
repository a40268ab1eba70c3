//! 驱动层错误类型定义

use dxl_protocol::{ConfigurationError, ErrorFlags, PacketError};
use dxl_transport::TransportError;
use thiserror::Error;

/// 通信错误
///
/// 总线上的一次交换失败。驱动不做重试，由调用方决定如何处理。
#[derive(Error, Debug)]
pub enum CommunicationError {
    /// 包头未收齐（超时）
    #[error("Short read of status header: expected 4 bytes, received {received}")]
    ShortHeader { received: usize },

    /// 包体未收齐（超时）
    #[error("Short read of status body from ID {id}: expected {expected} bytes, received {received}")]
    ShortBody {
        id: u8,
        expected: usize,
        received: usize,
    },

    /// 应答参数长度与请求不符
    #[error("Unexpected payload from ID {id} for {register}: expected {expected} bytes, got {actual}")]
    UnexpectedPayload {
        id: u8,
        register: String,
        expected: usize,
        actual: usize,
    },

    /// 帧格式 / 校验和 / 设备错误码
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// 传输层 IO 错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl CommunicationError {
    /// 设备上报的错误字节（仅设备错误）
    pub fn device_flags(&self) -> Option<ErrorFlags> {
        match self {
            CommunicationError::Packet(PacketError::Device { flags, .. }) => Some(*flags),
            _ => None,
        }
    }

    /// 是否为校验和错误
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(
            self,
            CommunicationError::Packet(PacketError::ChecksumMismatch { .. })
        )
    }
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 调用方或数据模型使用错误
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// 总线通信失败
    #[error("Communication error: {0}")]
    Communication(#[from] CommunicationError),
}

impl From<PacketError> for DriverError {
    fn from(err: PacketError) -> Self {
        DriverError::Communication(err.into())
    }
}

impl From<TransportError> for DriverError {
    fn from(err: TransportError) -> Self {
        DriverError::Communication(err.into())
    }
}

impl DriverError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, DriverError::Configuration(_))
    }

    pub fn is_communication(&self) -> bool {
        matches!(self, DriverError::Communication(_))
    }
}
