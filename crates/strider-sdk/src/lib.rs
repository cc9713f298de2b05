//! Strider SDK - 机器人遥控 Rust SDK
//!
//! 通过 TCP 文本控制通道（端口 5002）遥控小型机器人：移动、倾斜转向、云台转动、
//! 舵机上电，并在后台周期查询超声波距离（可选电量）。
//!
//! # 架构设计
//!
//! - **协议层** (`protocol`): 命令编码、遥测解析、按行切帧（无 IO）
//! - **驱动层** (`driver`): 连接生命周期、RX / TX / 轮询线程、遥测快照
//!
//! # 快速开始
//!
//! ```no_run
//! use strider_sdk::prelude::*;
//!
//! strider_sdk::init_logger!();
//!
//! let robot = ClientBuilder::new().address("192.168.4.1").build();
//! robot.reconnect();
//! robot.move_forward();
//! robot.turn_head(60);
//! robot.stop();
//! println!("sonar = {:?} cm", robot.sonar_distance());
//! robot.disconnect();
//! ```

pub mod logging;
pub mod prelude;

/// 协议层
pub use strider_protocol as protocol;

/// 驱动层
pub use strider_driver as driver;

pub use strider_driver::{
    ClientBuilder, DriverError, LinkConfig, LinkState, MetricsSnapshot, PowerReading, RobotClient,
    TelemetrySnapshot,
};
pub use strider_protocol::{
    Command, Direction, Feedback, HeadAngle, MotionIntent, MotionProfile, ProtocolError,
};

pub use logging::{init_logger, init_logger_with_filter};
