//! PING 命令

use anyhow::{Context, Result};
use clap::Args;
use dxl_sdk::{ActuatorBus, ActuatorModel, Transport};
use std::io::Write;

/// PING 命令参数
#[derive(Args, Debug)]
pub struct PingCommand {
    /// 舵机 ID
    #[arg(short, long)]
    pub id: u8,
}

impl PingCommand {
    pub fn execute<T: Transport>(&self, bus: &ActuatorBus<T>, out: &mut dyn Write) -> Result<()> {
        bus.ping(self.id)
            .with_context(|| format!("ID {} 无应答", self.id))?;

        let model_number = bus.model_number(self.id)?;
        let model = ActuatorModel::name_for(model_number).unwrap_or("unknown");
        writeln!(
            out,
            "✅ ID {} 应答，型号 {} ({})",
            self.id, model, model_number
        )?;
        Ok(())
    }
}
