//! 移动命令
//!
//! 按当前运动参数向某个方向走一步，可选地在指定时间后发送 stop。

use super::ConnectArgs;
use anyhow::Result;
use clap::Args;
use std::time::Duration;
use strider_sdk::{Direction, MotionIntent, RobotClient};

fn parse_direction(s: &str) -> Result<Direction, String> {
    s.parse::<Direction>().map_err(|e| e.to_string())
}

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 方向：forward, backward, left, right, turn_left, turn_right, stop
    #[arg(value_parser = parse_direction)]
    pub direction: Direction,

    /// 持续时间（毫秒），到时自动发送 stop
    #[arg(short, long)]
    pub duration_ms: Option<u64>,

    /// 速度档位（覆盖配置）
    #[arg(long)]
    pub speed: Option<i32>,

    /// 步长（覆盖配置）
    #[arg(long)]
    pub step: Option<i32>,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

impl MoveCommand {
    /// 在已连接的客户端上执行
    pub fn execute(&self, robot: &RobotClient) -> Result<()> {
        if let Some(speed) = self.speed {
            robot.set_speed(speed);
        }
        if let Some(step) = self.step {
            robot.set_step_size(step);
        }

        let intent = robot.profile().intent(self.direction);
        println!(
            "🚶 {} (x={}, y={}, speed={}, angle={})",
            self.direction, intent.x, intent.y, intent.speed, intent.angle
        );
        robot.try_send(intent.into())?;

        if let Some(ms) = self.duration_ms
            && self.direction != Direction::Stop
        {
            std::thread::sleep(Duration::from_millis(ms));
            robot.try_send(MotionIntent::stop().into())?;
            println!("🛑 已停止");
        }

        println!("✅ 移动命令已发送");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: MoveCommand,
    }

    #[test]
    fn test_parse_move_args() {
        let cli = TestCli::parse_from(["test", "turn_left", "--duration-ms", "500", "-a", "10.0.0.2"]);
        assert_eq!(cli.args.direction, Direction::TurnLeft);
        assert_eq!(cli.args.duration_ms, Some(500));
        assert_eq!(cli.args.connect.address.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_parse_direction_case_insensitive() {
        assert_eq!(parse_direction("FORWARD"), Ok(Direction::Forward));
        assert!(parse_direction("sideways").is_err());
    }
}
