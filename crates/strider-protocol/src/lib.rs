//! # Strider Protocol
//!
//! 机器人控制通道的文本协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `constants`: 端口、分隔符、命令动词等协议常量
//! - `command`: 下行命令（MOVE/HEAD/SERVOPOWER/SONIC/POWER）编码
//! - `motion`: 运动意图与步长/角度配置（前进、平移、倾斜转向、云台镜像）
//! - `telemetry`: 上行遥测帧（SONIC/POWER）解析
//! - `framing`: 字节流按 `\n` 切帧
//!
//! ## 线路格式
//!
//! ```text
//! VERB#field1#field2...\n
//! ```
//!
//! 帧之间以 `\n` 分隔，帧内字段以 `#` 分隔。没有长度前缀、校验和或应答，
//! 协议本身是 fire-and-forget 的。

pub mod command;
pub mod constants;
pub mod framing;
pub mod motion;
pub mod telemetry;

// 重新导出常用类型
pub use command::Command;
pub use constants::*;
pub use framing::{LineFramer, split_fields};
pub use motion::{Direction, HeadAngle, MotionIntent, MotionProfile};
pub use telemetry::{Feedback, parse_frame};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 帧为空（只有分隔符或空白）
    #[error("Empty frame")]
    EmptyFrame,

    /// 字段数量不符合该动词的要求
    #[error("Invalid field count for {verb}: expected {expected}, got {actual}")]
    InvalidFieldCount {
        verb: String,
        expected: usize,
        actual: usize,
    },

    /// 字段无法解析为期望的类型
    #[error("Invalid value for field {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    /// 未知动词（仅在解析下行命令时视为错误）
    #[error("Unknown verb: {0}")]
    UnknownVerb(String),

    /// 云台角度超出舵机范围（`HEAD_MIN_DEG..=HEAD_MAX_DEG`）
    #[error("Head angle {0} out of range 0..=180")]
    HeadAngleOutOfRange(i64),
}
