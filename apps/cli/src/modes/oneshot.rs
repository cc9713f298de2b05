//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 读取配置
//! 2. 连接机器人
//! 3. 执行操作
//! 4. 断开连接

use anyhow::{Context, Result};
use strider_sdk::{ClientBuilder, RobotClient};
use tracing::{debug, warn};

use crate::commands::{
    CliConfig, ConnectArgs, HeadCommand, MoveCommand, ServoCommand, StatusCommand, StopCommand,
};

/// One-shot 模式
pub struct OneShotMode {
    config: CliConfig,
}

impl OneShotMode {
    pub fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// 按配置构造客户端并连接
    fn connect(&self, args: &ConnectArgs) -> Result<RobotClient> {
        let address = self.config.resolve_address(args.address.as_deref())?;

        println!("⏳ 连接到机器人 {}...", address);
        let robot = ClientBuilder::new()
            .address(address.clone())
            .link_config(self.config.link.clone())
            .motion_profile(self.config.motion)
            .connect()
            .with_context(|| format!("连接 {} 失败", address))?;
        println!("✅ 已连接");
        Ok(robot)
    }

    /// 连接、执行、断开（执行失败也会断开）
    fn run(&self, args: &ConnectArgs, action: impl FnOnce(&RobotClient) -> Result<()>) -> Result<()> {
        let robot = self.connect(args)?;
        let result = action(&robot);
        if let Some(err) = robot.last_error() {
            warn!("Link reported an error during one-shot command: {}", err);
        }
        debug!("One-shot command done, metrics: {:?}", robot.metrics());
        robot.disconnect();
        result
    }

    pub fn move_to(&self, args: MoveCommand) -> Result<()> {
        self.run(&args.connect, |robot| args.execute(robot))
    }

    pub fn stop(&self, args: StopCommand) -> Result<()> {
        self.run(&args.connect, |robot| args.execute(robot))
    }

    pub fn head(&self, args: HeadCommand) -> Result<()> {
        self.run(&args.connect, |robot| args.execute(robot))
    }

    pub fn servo(&self, args: ServoCommand) -> Result<()> {
        self.run(&args.connect, |robot| args.execute(robot))
    }

    pub fn status(&self, args: StatusCommand) -> Result<()> {
        self.run(&args.connect, |robot| args.execute(robot))
    }
}
