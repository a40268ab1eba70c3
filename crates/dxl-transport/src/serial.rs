//! 串口传输后端
//!
//! 基于 `serialport` crate。读操作累积接收，直到收齐请求的字节数或到达截止时间。

use crate::{Transport, TransportError};
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 串口传输
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// 打开串口
    ///
    /// # 参数
    /// - `port_name`: 设备路径（如 `/dev/ttyUSB0`、`COM3`）
    /// - `baud_rate`: 波特率（出厂设置为 57142）
    /// - `timeout`: 默认读超时
    pub fn open(
        port_name: impl Into<String>,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let port_name = port_name.into();
        if port_name.is_empty() {
            return Err(TransportError::NoPort);
        }
        let mut transport = Self {
            port_name,
            baud_rate,
            timeout,
            port: None,
        };
        transport.port = Some(transport.open_port()?);
        Ok(transport)
    }

    fn open_port(&self) -> Result<Box<dyn SerialPort>, TransportError> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(self.timeout)
            .open()?;
        info!(
            "Opened serial port {} at {} baud (timeout {:?})",
            self.port_name, self.baud_rate, self.timeout
        );
        Ok(port)
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let port = self.port_mut()?;
        if port.timeout() != timeout {
            port.set_timeout(timeout)?;
        }

        let deadline = Instant::now() + timeout;
        let mut buffer = vec![0u8; len];
        let mut received = 0;
        while received < len {
            match port.read(&mut buffer[received..]) {
                Ok(0) => break,
                Ok(n) => received += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        if received < len {
            return Err(TransportError::ShortRead {
                expected: len,
                received,
            });
        }
        Ok(buffer)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.port_mut()?.flush()?;
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        self.port_mut()?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        self.close()?;
        self.port = Some(self.open_port()?);
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.port_name);
        } else {
            debug!("Serial port {} already closed", self.port_name);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.port_name
    }
}
