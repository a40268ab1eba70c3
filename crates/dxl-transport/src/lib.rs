//! # DXL Transport Layer
//!
//! 字节流传输抽象。总线驱动只需要两种能力：
//! - 写入一段字节
//! - 在超时内精确读取 N 个字节，不足时报告实际收到的字节数

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{Fault, SimulatedActuator, SimulatedBus};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// 超时前没有收齐字节
    #[error("Short read: expected {expected} bytes, got {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("Transport is not open")]
    NotOpen,

    #[error("No serial port configured")]
    NoPort,
}

impl TransportError {
    /// 是否为超时导致的短读
    pub fn is_short_read(&self) -> bool {
        matches!(self, TransportError::ShortRead { .. })
    }
}

/// 半双工字节流传输
///
/// 实现者不需要考虑并发，总线驱动保证同一时刻只有一个调用方。
pub trait Transport {
    /// 写入全部字节并刷新输出
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// 在 `timeout` 内精确读取 `len` 个字节
    ///
    /// # 错误
    /// - `TransportError::ShortRead`: 超时前收到的字节不足 `len`（已收到的字节被丢弃）
    fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// 等待输出缓冲区发送完毕
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// 丢弃接收缓冲区中尚未读取的字节
    fn discard_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// 关闭后重新打开
    fn reopen(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// 用于日志的名称（如串口名）
    fn name(&self) -> &str {
        "transport"
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(bytes)
    }

    fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).read_exact(len, timeout)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        (**self).discard_input()
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        (**self).reopen()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
