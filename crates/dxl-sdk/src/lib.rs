//! DXL SDK - 串口舵机总线 Rust SDK
//!
//! 适用于 Dynamixel 1.0 协议的半双工串口舵机（AX-12、MX-28、MX-64）。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 帧编解码、寄存器表、型号注册表、配置快照
//! - **传输层** (`transport`): 字节流抽象，支持串口和模拟总线
//! - **驱动层** (`driver`): 总线发现、寄存器读写、配置对齐
//!
//! # 快速开始
//!
//! ```no_run
//! use dxl_sdk::prelude::*;
//!
//! dxl_sdk::init_logging();
//!
//! let bus = BusBuilder::new().port("/dev/ttyUSB0").build()?;
//! for (id, model) in bus.discover_all()? {
//!     println!("ID {}: {}", id, model);
//! }
//!
//! let mut desired = DesiredConfiguration::new();
//! desired.set(2, "goal_pos", 512);
//! let report = bus.reconcile(&desired)?;
//! println!("{} registers written", report.write_count());
//! # Ok::<(), DriverError>(())
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

pub mod driver {
    //! 驱动层：总线、Builder、配置、错误类型
    pub use dxl_driver::*;
}

pub mod protocol {
    //! 协议层：帧、寄存器、型号
    pub use dxl_protocol::*;
}

pub mod transport {
    //! 传输层：`Transport` trait 及其实现
    pub use dxl_transport::*;
}

pub mod prelude;

// --- 用户以此为界 ---

pub use dxl_driver::{
    ActuatorBus, BusBuilder, BusConfig, CommunicationError, DriverError, ReconcileReport,
};
pub use dxl_protocol::{
    ActuatorModel, ConfigurationError, ConfigurationSnapshot, DesiredConfiguration, PacketError,
};
pub use dxl_transport::{Transport, TransportError};

/// 初始化日志
///
/// 安装 `tracing_subscriber::fmt`，过滤规则读取 `RUST_LOG`，未设置时为 `info`。
/// 重复调用不会报错（只有第一次生效）。
pub fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
