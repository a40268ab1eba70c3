//! 驱动层模块
//!
//! 本模块提供串口舵机总线的驱动功能，包括：
//! - 总线发现（广播 PING + 型号识别）
//! - 按寄存器名读写
//! - 配置快照与配置对齐（reconcile）
//! - 总线配置文件与 Builder
//!
//! # 使用场景
//!
//! 大多数用户通过 `dxl-sdk` 使用本 crate；需要自定义传输层时可以直接使用
//! [`ActuatorBus::new`] 或 [`BusBuilder::build_with`]。

mod builder;
mod bus;
pub mod config;
mod error;
mod report;

pub use builder::BusBuilder;
pub use bus::ActuatorBus;
pub use config::{BusConfig, BusConfigError};
pub use error::{CommunicationError, DriverError};
pub use report::{ReconcileReport, RegisterChange};
