//! 总线配置
//!
//! 支持从 TOML 文件加载，例如：
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! baud_rate = 57142
//! timeout_ms = 40
//! ```
//!
//! 缺省字段使用默认值。

use dxl_protocol::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置文件错误
#[derive(Error, Debug)]
pub enum BusConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid bus config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 总线配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// 串口设备路径
    pub port: String,
    /// 波特率（出厂设置 57142，不要随意修改）
    pub baud_rate: u32,
    /// 读超时（毫秒）
    pub timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BusConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(s: &str) -> Result<Self, BusConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// 从 TOML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BusConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| BusConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
