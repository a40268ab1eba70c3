//! # DXL CLI
//!
//! 串口舵机总线命令行工具。
//!
//! ```bash
//! # 扫描总线
//! dxl-cli --port /dev/ttyUSB0 scan
//!
//! # 读写寄存器
//! dxl-cli --port /dev/ttyUSB0 get --id 2 --register present_position
//! dxl-cli --port /dev/ttyUSB0 set --id 2 --register goal_pos --value 512
//!
//! # 导出配置快照，修改后再对齐
//! dxl-cli --port /dev/ttyUSB0 dump --output bench.json
//! dxl-cli --port /dev/ttyUSB0 apply bench.json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use dxl_sdk::{ActuatorBus, Transport};
use std::io::Write;

mod commands;
mod connection;

use commands::{ApplyCommand, DumpCommand, GetCommand, PingCommand, ScanCommand, SetCommand};
use connection::ConnectionArgs;

/// DXL CLI - 串口舵机总线命令行工具
#[derive(Parser, Debug)]
#[command(name = "dxl-cli")]
#[command(about = "Command-line interface for Dynamixel-class serial actuator buses", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描总线上的全部舵机
    Scan {
        #[command(flatten)]
        args: ScanCommand,
    },

    /// PING 单个舵机
    Ping {
        #[command(flatten)]
        args: PingCommand,
    },

    /// 读取寄存器
    Get {
        #[command(flatten)]
        args: GetCommand,
    },

    /// 写入寄存器
    Set {
        #[command(flatten)]
        args: SetCommand,
    },

    /// 导出全部舵机的配置快照（JSON）
    Dump {
        #[command(flatten)]
        args: DumpCommand,
    },

    /// 使总线配置与 JSON 文件一致
    Apply {
        #[command(flatten)]
        args: ApplyCommand,
    },
}

fn run<T: Transport>(command: &Commands, bus: &ActuatorBus<T>, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Scan { args } => args.execute(bus, out),
        Commands::Ping { args } => args.execute(bus, out),
        Commands::Get { args } => args.execute(bus, out),
        Commands::Set { args } => args.execute(bus, out),
        Commands::Dump { args } => args.execute(bus, out),
        Commands::Apply { args } => args.execute(bus, out),
    }
}

fn main() -> Result<()> {
    // 初始化日志
    dxl_sdk::init_logging();

    let cli = Cli::parse();
    let bus = cli.connection.open()?;

    let mut stdout = std::io::stdout().lock();
    run(&cli.command, &bus, &mut stdout)
}
