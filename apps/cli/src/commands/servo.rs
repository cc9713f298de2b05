//! 舵机电源命令

use super::ConnectArgs;
use anyhow::Result;
use clap::{Args, ValueEnum};
use strider_sdk::{Command, RobotClient};

/// 舵机电源状态
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoState {
    On,
    Off,
}

impl ServoState {
    pub fn is_on(self) -> bool {
        self == ServoState::On
    }
}

/// 舵机电源命令参数
#[derive(Args, Debug)]
pub struct ServoCommand {
    /// on 上电，off 断电
    #[arg(value_enum)]
    pub state: ServoState,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl ServoCommand {
    pub fn execute(&self, robot: &RobotClient) -> Result<()> {
        println!("⚡ 舵机{}...", if self.state.is_on() { "上电" } else { "断电" });
        robot.try_send(Command::ServoPower(self.state.is_on()))?;
        println!("✅ 舵机命令已发送");
        Ok(())
    }
}
