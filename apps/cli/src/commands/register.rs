//! 寄存器读写命令

use anyhow::{Context, Result};
use clap::Args;
use dxl_sdk::{ActuatorBus, Transport};
use std::io::Write;

/// 读寄存器命令参数
#[derive(Args, Debug)]
pub struct GetCommand {
    /// 舵机 ID
    #[arg(short, long)]
    pub id: u8,

    /// 寄存器名称（如 goal_pos、p_gain）
    #[arg(short, long)]
    pub register: String,
}

impl GetCommand {
    pub fn execute<T: Transport>(&self, bus: &ActuatorBus<T>, out: &mut dyn Write) -> Result<()> {
        bus.discover_all().context("扫描总线失败")?;
        let value = bus
            .read_register(self.id, &self.register)
            .with_context(|| format!("读取 ID {} 的 {} 失败", self.id, self.register))?;
        writeln!(out, "{} = {}", self.register, value)?;
        Ok(())
    }
}

/// 写寄存器命令参数
#[derive(Args, Debug)]
pub struct SetCommand {
    /// 舵机 ID
    #[arg(short, long)]
    pub id: u8,

    /// 寄存器名称
    #[arg(short, long)]
    pub register: String,

    /// 写入值
    #[arg(short, long)]
    pub value: u16,
}

impl SetCommand {
    pub fn execute<T: Transport>(&self, bus: &ActuatorBus<T>, out: &mut dyn Write) -> Result<()> {
        bus.discover_all().context("扫描总线失败")?;
        bus.write_register(self.id, &self.register, self.value)
            .with_context(|| format!("写入 ID {} 的 {} 失败", self.id, self.register))?;
        writeln!(out, "✅ ID {}: {} = {}", self.id, self.register, self.value)?;
        Ok(())
    }
}
