//! 驱动层模块
//!
//! 本模块提供机器人控制通道的连接管理，包括：
//! - 连接生命周期（`Idle → Connecting → Connected → Disconnecting → Idle`）
//! - 后台线程管理（RX / TX 单写者 / 周期查询）
//! - 遥测同步（ArcSwap 无锁读取）
//! - 传输抽象（TCP 实现 + 测试用内存实现）
//!
//! # 使用场景
//!
//! 大多数用户应该通过 `strider-sdk` 使用本 crate。

mod builder;
mod client;
mod connection;
mod error;
pub mod heartbeat;
pub mod link_state;
pub mod metrics;
pub mod pipeline;
pub mod state;
pub mod transport;

pub use builder::ClientBuilder;
pub use client::RobotClient;
pub use connection::Connection;
pub use error::DriverError;
pub use heartbeat::FeedbackMonitor;
pub use link_state::{AtomicLinkState, LinkState};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use pipeline::{FrameOutcome, LinkConfig, dispatch_frame, poll_loop, rx_loop, tx_loop};
pub use state::*;
pub use transport::{Connector, TcpConnector, Transport, TransportReader, TransportWriter};
