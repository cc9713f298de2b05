//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use strider_sdk::prelude::*;
//! ```

pub use crate::{
    ClientBuilder, Command, Direction, DriverError, HeadAngle, LinkConfig, LinkState,
    MotionIntent, MotionProfile, PowerReading, ProtocolError, RobotClient, TelemetrySnapshot,
};
