//! # Strider CLI
//!
//! Command-line remote control for the Strider walking robot.
//!
//! ## 双模式架构
//!
//! ### One-shot 模式（推荐用于脚本）
//!
//! ```bash
//! # 配置默认地址
//! strider-cli config set --address 192.168.4.1
//!
//! # 执行操作（内部：连接 -> 发送 -> 断开）
//! strider-cli move forward --duration-ms 800
//! strider-cli head -30 --offset
//! strider-cli status --power
//! ```
//!
//! ### REPL 模式（推荐用于遥控）
//!
//! ```bash
//! $ strider-cli shell
//! strider> connect 192.168.4.1
//! strider> speed_3
//! strider> forward
//! strider> stop
//! strider> exit
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod commands;
mod modes;

use commands::config::resolve_config_path;
use commands::{
    CliConfig, ConfigCommand, HeadCommand, MoveCommand, ServoCommand, StatusCommand, StopCommand,
};
use modes::oneshot::OneShotMode;
use modes::repl::run_repl;

/// Strider CLI - 机器人遥控命令行工具
#[derive(Parser, Debug)]
#[command(name = "strider-cli")]
#[command(about = "Command-line remote control for the Strider robot", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 `<config_dir>/strider/config.toml`）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 按方向移动一步
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 停止
    Stop {
        #[command(flatten)]
        args: StopCommand,
    },

    /// 转动超声波云台
    Head {
        #[command(flatten)]
        args: HeadCommand,
    },

    /// 舵机上电 / 断电
    Servo {
        #[command(flatten)]
        args: ServoCommand,
    },

    /// 查询连接状态和遥测
    Status {
        #[command(flatten)]
        args: StatusCommand,
    },

    /// 启动交互式 Shell（REPL 模式）
    Shell {
        /// 默认连接地址（覆盖配置文件）
        #[arg(short, long)]
        address: Option<String>,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strider_cli=info".parse()?)
                .add_directive("strider_driver=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Config(cmd) => {
            // One-shot 模式：配置管理
            cmd.execute(&config_path)
        },

        Commands::Shell { address } => {
            // REPL 模式：交互式 Shell
            let config = load_config(&config_path)?;
            run_repl(&config, address)
        },

        Commands::Move { args } => oneshot(&config_path)?.move_to(args),
        Commands::Stop { args } => oneshot(&config_path)?.stop(args),
        Commands::Head { args } => oneshot(&config_path)?.head(args),
        Commands::Servo { args } => oneshot(&config_path)?.servo(args),
        Commands::Status { args } => oneshot(&config_path)?.status(args),
    }
}

fn oneshot(path: &Path) -> Result<OneShotMode> {
    Ok(OneShotMode::new(load_config(path)?))
}

fn load_config(path: &Path) -> Result<CliConfig> {
    CliConfig::load(path).with_context(|| format!("加载配置失败: {}", path.display()))
}
