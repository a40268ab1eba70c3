//! 配置对齐命令

use anyhow::{Context, Result};
use clap::Args;
use dxl_sdk::{ActuatorBus, DesiredConfiguration, ReconcileReport, Transport};
use std::io::Write;
use std::path::PathBuf;

/// 对齐命令参数
#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// 期望配置（JSON：{ "<id>": { "<register>": <value> } }）
    pub file: PathBuf,

    /// 整个过程独占总线
    #[arg(long)]
    pub exclusive: bool,

    /// 以 JSON 输出结果
    #[arg(long)]
    pub json: bool,
}

impl ApplyCommand {
    pub fn execute<T: Transport>(&self, bus: &ActuatorBus<T>, out: &mut dyn Write) -> Result<()> {
        let content = std::fs::read_to_string(&self.file)
            .with_context(|| format!("读取文件失败: {}", self.file.display()))?;
        let desired: DesiredConfiguration = serde_json::from_str(&content)
            .with_context(|| format!("解析期望配置失败: {}", self.file.display()))?;

        let report = if self.exclusive {
            bus.reconcile_exclusive(&desired)
        } else {
            bus.reconcile(&desired)
        }
        .context("配置对齐失败")?;

        if self.json {
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        } else {
            print_report(&report, out)?;
        }
        Ok(())
    }
}

fn print_report(report: &ReconcileReport, out: &mut dyn Write) -> Result<()> {
    for change in &report.written {
        writeln!(
            out,
            "  ✏️  ID {} {}: {} -> {}",
            change.id, change.register, change.current, change.desired
        )?;
    }
    for change in &report.tolerated {
        writeln!(
            out,
            "  ⚠️  ID {} {} 为只读寄存器: 当前 {}，期望 {}",
            change.id, change.register, change.current, change.desired
        )?;
    }
    writeln!(
        out,
        "✅ 写入 {} 个寄存器，{} 个已一致",
        report.write_count(),
        report.unchanged
    )?;
    Ok(())
}
