//! 配置对齐结果

use serde::Serialize;

/// 单个寄存器的取值变化
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterChange {
    pub id: u8,
    pub register: String,
    pub current: u16,
    pub desired: u16,
}

/// 一次 reconcile 的结果
///
/// 舵机按 ID 升序、寄存器按地址升序访问，相同输入得到相同的结果顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// 已写入的寄存器
    pub written: Vec<RegisterChange>,
    /// 只读的易失寄存器不一致（忽略）
    pub tolerated: Vec<RegisterChange>,
    /// 已经一致、无需写入的寄存器数量
    pub unchanged: usize,
}

impl ReconcileReport {
    /// 没有发生任何写入
    pub fn is_noop(&self) -> bool {
        self.written.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.written.len()
    }
}
