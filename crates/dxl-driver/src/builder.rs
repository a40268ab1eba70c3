//! Builder 模式实现
//!
//! 提供链式构造 `ActuatorBus` 实例的便捷方式。

use crate::bus::ActuatorBus;
use crate::config::BusConfig;
use dxl_protocol::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};
use dxl_transport::Transport;
use std::time::Duration;

#[cfg(feature = "serial")]
use crate::error::DriverError;
#[cfg(feature = "serial")]
use dxl_transport::SerialTransport;

/// 总线 Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use dxl_driver::BusBuilder;
/// use std::time::Duration;
///
/// // 使用默认波特率（57142）和超时（40ms）
/// let bus = BusBuilder::new()
///     .port("/dev/ttyUSB0")
///     .build()
///     .unwrap();
///
/// // 自定义超时
/// let bus = BusBuilder::new()
///     .port("COM3")
///     .timeout(Duration::from_millis(100))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct BusBuilder {
    /// 串口设备路径
    port: Option<String>,
    /// 波特率
    baud_rate: Option<u32>,
    /// 读超时
    timeout: Option<Duration>,
}

impl BusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置串口设备路径（如 `/dev/ttyUSB0`、`COM3`）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 设置波特率（可选，默认 57142）
    ///
    /// # 注意
    /// 57142 是舵机的出厂波特率。只有在舵机已经被改为其他波特率时才需要设置。
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// 设置读超时（可选，默认 40ms）
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 从配置文件内容设置全部参数
    ///
    /// 空的 `port` 不会覆盖已经设置的串口。
    pub fn config(mut self, config: &BusConfig) -> Self {
        if !config.port.is_empty() {
            self.port = Some(config.port.clone());
        }
        self.baud_rate = Some(config.baud_rate);
        self.timeout = Some(config.timeout());
        self
    }

    fn effective_baud_rate(&self) -> u32 {
        self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE)
    }

    fn effective_timeout(&self) -> Duration {
        self.timeout
            .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// 打开串口并构建总线
    ///
    /// # 错误
    /// - `TransportError::NoPort`: 未设置串口
    /// - 串口打开失败
    #[cfg(feature = "serial")]
    pub fn build(self) -> Result<ActuatorBus<SerialTransport>, DriverError> {
        let timeout = self.effective_timeout();
        let transport = SerialTransport::open(
            self.port.clone().unwrap_or_default(),
            self.effective_baud_rate(),
            timeout,
        )?;
        Ok(ActuatorBus::with_timeout(transport, timeout))
    }

    /// 使用自定义传输层构建总线（串口参数被忽略）
    pub fn build_with<T: Transport>(self, transport: T) -> ActuatorBus<T> {
        ActuatorBus::with_timeout(transport, self.effective_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxl_transport::SimulatedBus;

    #[test]
    fn test_defaults() {
        let builder = BusBuilder::new();
        assert_eq!(builder.effective_baud_rate(), 57_142);
        assert_eq!(builder.effective_timeout(), Duration::from_millis(40));
    }

    #[test]
    fn test_config_overrides() {
        let config = BusConfig {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 1_000_000,
            timeout_ms: 15,
        };
        let builder = BusBuilder::new().port("/dev/ttyUSB0").config(&config);
        assert_eq!(builder.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(builder.effective_baud_rate(), 1_000_000);
        assert_eq!(builder.effective_timeout(), Duration::from_millis(15));

        // 配置文件未指定串口时保留已有设置，之后的链式调用仍可覆盖
        let builder = BusBuilder::new()
            .port("COM3")
            .config(&BusConfig::default())
            .baud_rate(115_200);
        assert_eq!(builder.port.as_deref(), Some("COM3"));
        assert_eq!(builder.effective_baud_rate(), 115_200);
    }

    #[test]
    fn test_build_with_transport() {
        let sim = SimulatedBus::new().with_actuator(1, 12);
        let bus = BusBuilder::new()
            .timeout(Duration::from_millis(5))
            .build_with(sim);
        assert_eq!(bus.timeout(), Duration::from_millis(5));
        bus.ping(1).unwrap();
    }

    #[cfg(feature = "serial")]
    #[test]
    fn test_build_without_port() {
        let err = BusBuilder::new().build().err().unwrap();
        assert!(err.is_communication());
        assert!(format!("{}", err).contains("No serial port configured"));
    }
}
