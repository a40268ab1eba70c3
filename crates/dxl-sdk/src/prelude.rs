//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use dxl_sdk::prelude::*;
//! ```

// 驱动层
pub use crate::driver::{ActuatorBus, BusBuilder, BusConfig, ReconcileReport, RegisterChange};

// 协议层
pub use crate::protocol::{
    ActuatorModel, Configuration, ConfigurationSnapshot, DesiredConfiguration, RegisterValues,
};

// 传输层（常用 Trait）
pub use crate::transport::Transport;

// 错误类型
pub use crate::driver::{CommunicationError, DriverError};
pub use crate::protocol::{ConfigurationError, PacketError};
pub use crate::transport::TransportError;
