//! 运动意图与运动参数
//!
//! 把逻辑方向（前进、左移、左转……）转换为 `(x, y, angle)` 三元组。
//! 转换只依赖两个可调参数（步长、转角增量）和一个持久的速度档位，
//! 是纯函数，不涉及任何 IO。

use crate::ProtocolError;
use crate::command::Command;
use crate::constants::*;
use std::fmt;
use std::str::FromStr;

/// 运动意图（一次 MOVE 命令的参数）
///
/// - `x`: 横向位移（正 = 右）
/// - `y`: 纵向位移（正 = 前）
/// - `speed`: 速度档位
/// - `angle`: 转角（正 = 右转）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionIntent {
    pub x: i32,
    pub y: i32,
    pub speed: i32,
    pub angle: i32,
}

impl MotionIntent {
    /// 创建运动意图
    pub const fn new(x: i32, y: i32, speed: i32, angle: i32) -> Self {
        Self { x, y, speed, angle }
    }

    /// 停止：位移、转角、速度全部为 0
    pub const fn stop() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// 是否为停止意图
    pub fn is_stop(&self) -> bool {
        *self == Self::stop()
    }

    /// 转换为下行命令
    pub fn into_command(self) -> Command {
        Command::Move(self)
    }
}

/// 逻辑运动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    /// 左倾斜转向（横移 + 转角同时生效）
    TurnLeft,
    /// 右倾斜转向
    TurnRight,
    Stop,
}

impl Direction {
    /// 所有方向（用于帮助信息和测试）
    pub const ALL: [Direction; 7] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::TurnLeft,
        Direction::TurnRight,
        Direction::Stop,
    ];

    /// 命令行/REPL 中使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::TurnLeft => "turn_left",
            Direction::TurnRight => "turn_right",
            Direction::Stop => "stop",
        }
    }

    /// 是否为倾斜转向
    pub fn is_turn(self) -> bool {
        matches!(self, Direction::TurnLeft | Direction::TurnRight)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProtocolError::InvalidValue {
                field: "direction".to_string(),
                value: s.to_string(),
            })
    }
}

/// 运动参数
///
/// 对应交互式客户端里的 `step_N` / `angle_N` / `speed_N` 设置。
/// `head_center` 是云台偏移命令的零点。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionProfile {
    /// 每条命令的线位移
    pub step_size: i32,
    /// 每条转向命令的转角增量
    pub angle_size: i32,
    /// 当前速度档位（持久）
    pub speed: i32,
    /// 云台中位角（度）
    pub head_center: i32,
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            angle_size: DEFAULT_ANGLE_SIZE,
            speed: DEFAULT_SPEED,
            head_center: DEFAULT_HEAD_CENTER,
        }
    }
}

impl MotionProfile {
    /// 把逻辑方向转换为运动意图
    ///
    /// | 方向 | x | y | angle | speed |
    /// |---|---|---|---|---|
    /// | Forward | 0 | +step | 0 | 当前速度 |
    /// | Backward | 0 | -step | 0 | 当前速度 |
    /// | Left | -step | 0 | 0 | 当前速度 |
    /// | Right | +step | 0 | 0 | 当前速度 |
    /// | TurnLeft | -step | 0 | -angle_size | 当前速度 |
    /// | TurnRight | +step | 0 | +angle_size | 当前速度 |
    /// | Stop | 0 | 0 | 0 | 0 |
    ///
    /// 倾斜转向同时带横移分量，不是原地旋转。
    pub fn intent(&self, direction: Direction) -> MotionIntent {
        let step = self.step_size;
        let speed = self.speed;
        match direction {
            Direction::Forward => MotionIntent::new(0, step, speed, 0),
            Direction::Backward => MotionIntent::new(0, step.saturating_neg(), speed, 0),
            Direction::Left => MotionIntent::new(step.saturating_neg(), 0, speed, 0),
            Direction::Right => MotionIntent::new(step, 0, speed, 0),
            Direction::TurnLeft => MotionIntent::new(
                step.saturating_neg(),
                0,
                speed,
                self.angle_size.saturating_neg(),
            ),
            Direction::TurnRight => MotionIntent::new(step, 0, speed, self.angle_size),
            Direction::Stop => MotionIntent::stop(),
        }
    }

    /// 以云台中位角为零点的偏移（正 = 右，负 = 左）
    pub fn head_offset(&self, offset: i32) -> Result<HeadAngle, ProtocolError> {
        HeadAngle::offset(offset, self.head_center)
    }
}

/// 云台角度
///
/// 机器人端舵机安装方向与用户视角相反，发送前需要镜像：
/// `wire = 180 - requested`。
///
/// 请求角度始终在 `HEAD_MIN_DEG..=HEAD_MAX_DEG` 内，超出范围的值在构造时拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadAngle {
    requested: i32,
}

impl HeadAngle {
    /// 绝对角度（用户视角，度）
    pub fn absolute(requested: i32) -> Result<Self, ProtocolError> {
        Self::checked(i64::from(requested))
    }

    /// 相对中位角的偏移
    pub fn offset(offset: i32, center: i32) -> Result<Self, ProtocolError> {
        Self::checked(i64::from(center) + i64::from(offset))
    }

    fn checked(requested: i64) -> Result<Self, ProtocolError> {
        match i32::try_from(requested) {
            Ok(deg) if (HEAD_MIN_DEG..=HEAD_MAX_DEG).contains(&deg) => Ok(Self { requested: deg }),
            _ => Err(ProtocolError::HeadAngleOutOfRange(requested)),
        }
    }

    /// 用户视角的角度
    pub fn requested(&self) -> i32 {
        self.requested
    }

    /// 线路上发送的角度（已镜像）
    pub fn wire_value(&self) -> i32 {
        HEAD_MIRROR_DEG - self.requested
    }

    /// 从线路值还原用户视角的角度
    pub fn from_wire(wire: i32) -> Result<Self, ProtocolError> {
        Self::checked(i64::from(HEAD_MIRROR_DEG) - i64::from(wire))
    }

    /// 转换为下行命令
    pub fn into_command(self) -> Command {
        Command::Head(self)
    }
}
