//! 配置快照导出命令

use anyhow::{Context, Result};
use clap::Args;
use dxl_sdk::{ActuatorBus, Transport};
use std::io::Write;
use std::path::PathBuf;

/// 导出命令参数
#[derive(Args, Debug, Default)]
pub struct DumpCommand {
    /// 输出文件（默认输出到标准输出）
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DumpCommand {
    /// 读取全部舵机的全部寄存器，输出 JSON
    pub fn execute<T: Transport>(&self, bus: &ActuatorBus<T>, out: &mut dyn Write) -> Result<()> {
        let snapshot = bus.snapshot().context("读取配置快照失败")?;
        let json = serde_json::to_string_pretty(&snapshot)?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, json + "\n")
                    .with_context(|| format!("写入文件失败: {}", path.display()))?;
                writeln!(
                    out,
                    "✅ 已导出 {} 个舵机的配置到 {}",
                    snapshot.len(),
                    path.display()
                )?;
            },
            None => writeln!(out, "{}", json)?,
        }
        Ok(())
    }
}
