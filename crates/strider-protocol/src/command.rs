//! 下行命令定义
//!
//! 每个物理动作对应一行文本：`VERB#<args>\n`，字段顺序固定。
//!
//! | 意图 | 格式 |
//! |---|---|
//! | 运动 | `MOVE#1#<x>#<y>#<speed>#<angle>` |
//! | 云台 | `HEAD#1#<angle>` |
//! | 舵机电源 | `SERVOPOWER#<0 or 1>` |
//! | 测距查询 | `SONIC` |
//! | 电量查询 | `POWER` |

use crate::ProtocolError;
use crate::constants::*;
use crate::framing::split_fields;
use crate::motion::{HeadAngle, MotionIntent};
use std::fmt;
use std::str::FromStr;

/// 下行命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 运动命令
    Move(MotionIntent),
    /// 云台转动（发送时镜像）
    Head(HeadAngle),
    /// 舵机上电（true）/ 断电（false）
    ServoPower(bool),
    /// 超声波测距查询
    Sonic,
    /// 电量查询
    Power,
}

impl Command {
    /// 命令动词
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Move(_) => CMD_MOVE,
            Command::Head(_) => CMD_HEAD,
            Command::ServoPower(_) => CMD_SERVO_POWER,
            Command::Sonic => CMD_SONIC,
            Command::Power => CMD_POWER,
        }
    }

    /// 是否为周期性查询命令
    pub fn is_poll(&self) -> bool {
        matches!(self, Command::Sonic | Command::Power)
    }

    /// 编码为一行线路文本（包含结尾的 `\n`）
    pub fn to_line(&self) -> String {
        let mut line = self.to_string();
        line.push(FRAME_SEPARATOR);
        line
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = FIELD_SEPARATOR;
        match self {
            Command::Move(m) => write!(
                f,
                "{CMD_MOVE}{sep}{MODE_FIELD}{sep}{}{sep}{}{sep}{}{sep}{}",
                m.x, m.y, m.speed, m.angle
            ),
            Command::Head(h) => {
                write!(f, "{CMD_HEAD}{sep}{MODE_FIELD}{sep}{}", h.wire_value())
            },
            Command::ServoPower(on) => {
                write!(f, "{CMD_SERVO_POWER}{sep}{}", u8::from(*on))
            },
            Command::Sonic => f.write_str(CMD_SONIC),
            Command::Power => f.write_str(CMD_POWER),
        }
    }
}

impl From<MotionIntent> for Command {
    fn from(intent: MotionIntent) -> Self {
        Command::Move(intent)
    }
}

impl From<HeadAngle> for Command {
    fn from(angle: HeadAngle) -> Self {
        Command::Head(angle)
    }
}

fn parse_int(field: &str, value: &str) -> Result<i32, ProtocolError> {
    value.trim().parse::<i32>().map_err(|_| ProtocolError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn expect_fields(verb: &str, fields: &[&str], expected: usize) -> Result<(), ProtocolError> {
    if fields.len() != expected {
        return Err(ProtocolError::InvalidFieldCount {
            verb: verb.to_string(),
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

/// 解析一行下行命令
///
/// 机器人端（或测试用的模拟机器人）使用，与 [`Command::to_line`] 对称。
/// 结尾的 `\n` / `\r\n` 会被忽略。
impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields = split_fields(line);
        let verb = match fields.first() {
            Some(v) if !v.is_empty() => *v,
            _ => return Err(ProtocolError::EmptyFrame),
        };

        match verb {
            CMD_MOVE => {
                expect_fields(verb, &fields, 6)?;
                parse_int("mode", fields[1])?;
                Ok(Command::Move(MotionIntent::new(
                    parse_int("x", fields[2])?,
                    parse_int("y", fields[3])?,
                    parse_int("speed", fields[4])?,
                    parse_int("angle", fields[5])?,
                )))
            },
            CMD_HEAD => {
                expect_fields(verb, &fields, 3)?;
                parse_int("mode", fields[1])?;
                Ok(Command::Head(HeadAngle::from_wire(parse_int(
                    "angle", fields[2],
                )?)?))
            },
            CMD_SERVO_POWER => {
                expect_fields(verb, &fields, 2)?;
                match fields[1].trim() {
                    "0" => Ok(Command::ServoPower(false)),
                    "1" => Ok(Command::ServoPower(true)),
                    other => Err(ProtocolError::InvalidValue {
                        field: "servo_power".to_string(),
                        value: other.to_string(),
                    }),
                }
            },
            CMD_SONIC => Ok(Command::Sonic),
            CMD_POWER => Ok(Command::Power),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}
