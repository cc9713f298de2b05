//! 驱动层错误类型定义

use strider_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 底层 IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 连接建立失败
    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// 当前没有活动连接
    #[error("Not connected")]
    NotConnected,

    /// 命令通道已关闭（TX 线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 命令通道已满
    #[error("Command channel full (capacity: {0})")]
    ChannelFull(usize),

    /// 操作超时（例如断开时后台线程没有按时退出）
    #[error("{what} timed out after {after:?}")]
    Timeout {
        what: &'static str,
        after: std::time::Duration,
    },
}

impl DriverError {
    /// 是否意味着连接已经失效（需要重新 connect）
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            DriverError::NotConnected | DriverError::ChannelClosed | DriverError::ConnectFailed { .. }
        )
    }
}
