//! 命令定义和实现

pub mod apply;
pub mod dump;
pub mod ping;
pub mod register;
pub mod scan;

pub use apply::ApplyCommand;
pub use dump::DumpCommand;
pub use ping::PingCommand;
pub use register::{GetCommand, SetCommand};
pub use scan::ScanCommand;
