//! 停止命令
//!
//! 发送速度为 0 的 MOVE 命令，不改变配置中的持久速度。

use super::ConnectArgs;
use anyhow::Result;
use clap::Args;
use strider_sdk::{MotionIntent, RobotClient};

/// 停止命令参数
#[derive(Args, Debug)]
pub struct StopCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl StopCommand {
    /// 执行停止
    pub fn execute(&self, robot: &RobotClient) -> Result<()> {
        println!("🛑 发送停止命令...");
        robot.try_send(MotionIntent::stop().into())?;
        println!("✅ 已停止");
        Ok(())
    }
}
