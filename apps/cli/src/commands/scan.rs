//! 总线扫描命令

use anyhow::{Context, Result};
use clap::Args;
use dxl_sdk::{ActuatorBus, Transport};
use std::io::Write;

/// 扫描命令参数
#[derive(Args, Debug, Default)]
pub struct ScanCommand {}

impl ScanCommand {
    /// 广播 PING，列出全部舵机
    pub fn execute<T: Transport>(&self, bus: &ActuatorBus<T>, out: &mut dyn Write) -> Result<()> {
        let actuators = bus.discover_all().context("扫描总线失败")?;

        if actuators.is_empty() {
            writeln!(out, "⚠️  总线上没有发现舵机")?;
            return Ok(());
        }

        for (id, model) in &actuators {
            writeln!(out, "  ID {:>3}  {} (model {})", id, model, model.model_number())?;
        }
        writeln!(out, "✅ 共发现 {} 个舵机", actuators.len())?;
        Ok(())
    }
}
