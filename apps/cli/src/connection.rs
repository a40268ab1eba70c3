//! 串口连接参数
//!
//! 优先级：命令行参数 > 配置文件 > 默认值

use anyhow::{Context, Result, bail};
use clap::Args;
use dxl_sdk::transport::SerialTransport;
use dxl_sdk::{ActuatorBus, BusBuilder, BusConfig};
use std::path::PathBuf;
use tracing::debug;

/// 连接参数（所有子命令共用）
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// 串口设备（如 /dev/ttyUSB0、COM3）
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// 波特率（默认 57142，舵机出厂设置）
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// 读超时（毫秒，默认 40）
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// TOML 配置文件
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    /// 合并配置文件与命令行参数
    pub fn resolve(&self) -> Result<BusConfig> {
        let mut config = match &self.config {
            Some(path) => BusConfig::load(path)
                .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
            None => BusConfig::default(),
        };

        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        Ok(config)
    }

    /// 打开串口总线
    pub fn open(&self) -> Result<ActuatorBus<SerialTransport>> {
        let config = self.resolve()?;
        if config.port.is_empty() {
            bail!("未指定串口：请使用 --port 或在配置文件中设置 port");
        }
        debug!("Bus config: {:?}", config);

        BusBuilder::new()
            .config(&config)
            .build()
            .with_context(|| format!("无法打开串口 {}", config.port))
    }
}
