//! # DXL Protocol
//!
//! Dynamixel 1.0 串口总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 帧头、ID 范围、指令码、默认串口参数
//! - `packet`: 请求帧构建、状态帧解析、校验和
//! - `register`: 寄存器描述（地址、宽度、访问模式、EEPROM 标记）
//! - `table`: 型号寄存器表（组合构建、按地址排序）
//! - `model`: 型号注册表（AX-12 / MX-28 / MX-64）
//! - `config`: 配置快照与期望配置
//!
//! ## 字节序
//!
//! 双字节寄存器使用小端序（低字节在前）。

pub mod config;
pub mod constants;
mod error;
pub mod model;
pub mod packet;
pub mod register;
pub mod table;

// 重新导出常用类型
pub use config::{Configuration, ConfigurationSnapshot, DesiredConfiguration, RegisterValues};
pub use constants::*;
pub use error::{ConfigurationError, PacketError};
pub use model::ActuatorModel;
pub use packet::{
    ErrorFlags, PacketBuffer, RequestPacket, StatusHeader, StatusPacket, build_request,
    build_status, checksum,
};
pub use register::{Access, Register, RegisterBytes, Width};
pub use table::{RegisterCommand, RegisterDef, RegisterTable};
