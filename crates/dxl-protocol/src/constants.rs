//! 协议常量定义
//!
//! Dynamixel 1.0 协议的帧头、ID 范围、指令码以及串口默认参数。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 帧头同步字节
pub const HEADER: [u8; 2] = [0xFF, 0xFF];

/// 状态包头长度：`FF FF id len`
pub const STATUS_HEADER_LEN: usize = 4;

/// 广播 ID（仅用于请求，永远不会出现在应答中）
pub const BROADCAST_ID: u8 = 0xFE;

/// 最大单播 ID
pub const MAX_UNICAST_ID: u8 = 0xFD;

/// 单帧最大参数长度
///
/// 长度字节 = 参数长度 + 1，且必须能放进一个字节，同时为校验和留出位置。
pub const MAX_PAYLOAD_LEN: usize = 253;

/// 型号寄存器地址（所有型号共用）
pub const MODEL_NUMBER_ADDRESS: u8 = 0x00;

/// 型号寄存器宽度（字节）
pub const MODEL_NUMBER_WIDTH: u8 = 2;

/// 默认波特率
///
/// 57142 bps 是舵机出厂设置，不要修改这个默认值。
pub const DEFAULT_BAUD_RATE: u32 = 57_142;

/// 默认读超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 40;

/// 指令码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Instruction {
    Ping = 0x01,
    ReadData = 0x02,
    WriteData = 0x03,
    /// 预留：寄存写入，等待 ACTION 触发
    RegWrite = 0x04,
    /// 预留
    Action = 0x05,
    /// 预留：恢复出厂设置
    Reset = 0x06,
    /// 预留：多舵机同步写
    SyncWrite = 0x83,
}

impl Instruction {
    /// 指令码字节
    pub fn code(self) -> u8 {
        self.into()
    }
}

/// 判断 ID 是否为合法单播地址
pub fn is_unicast_id(id: u8) -> bool {
    id <= MAX_UNICAST_ID
}
