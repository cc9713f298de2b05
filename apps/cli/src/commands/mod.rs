//! 命令定义和实现

pub mod config;
pub mod head;
pub mod r#move;
pub mod servo;
pub mod status;
pub mod stop;

pub use config::{CliConfig, ConfigCommand};
pub use head::HeadCommand;
pub use r#move::MoveCommand;
pub use servo::ServoCommand;
pub use status::StatusCommand;
pub use stop::StopCommand;

use clap::Args;

/// 连接参数（覆盖配置文件）
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// 机器人地址（IP、主机名或 host:port）
    #[arg(short, long)]
    pub address: Option<String>,
}
