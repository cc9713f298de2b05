//! 云台命令

use super::ConnectArgs;
use anyhow::Result;
use clap::Args;
use strider_sdk::{HeadAngle, ProtocolError, RobotClient};

/// 云台命令参数
#[derive(Args, Debug)]
pub struct HeadCommand {
    /// 目标角度（度）；配合 --offset 时为相对中位角的偏移（正 = 右）
    #[arg(allow_negative_numbers = true)]
    pub angle: i32,

    /// 把角度解释为相对中位角的偏移
    #[arg(long)]
    pub offset: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl HeadCommand {
    /// 目标角度（用户视角），超出 0..=180 时返回错误
    pub fn head_angle(&self, head_center: i32) -> Result<HeadAngle, ProtocolError> {
        if self.offset {
            HeadAngle::offset(self.angle, head_center)
        } else {
            HeadAngle::absolute(self.angle)
        }
    }

    pub fn execute(&self, robot: &RobotClient) -> Result<()> {
        let head = self.head_angle(robot.profile().head_center)?;
        println!(
            "🎯 云台转到 {}° (线路值 {})",
            head.requested(),
            head.wire_value()
        );
        robot.try_send(head.into())?;
        println!("✅ 云台命令已发送");
        Ok(())
    }
}
