//! 传输层抽象
//!
//! 控制通道只需要四个操作：建立连接、读、写、关闭。
//! 连接建立后拆分为读端（RX 线程独占）和写端（TX 线程独占），
//! 与 CAN 适配器的 `SplittableAdapter` 拆分方式相同。
//!
//! 读端约定：
//! - `Ok(0)`：对端已关闭
//! - `Err(WouldBlock | TimedOut)`：读超时，无数据（空闲点）
//! - 其他错误：连接失效

use crate::pipeline::LinkConfig;
use std::io;

mod tcp;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use tcp::{TcpCloser, TcpConnector, TcpReader, TcpTransport, TcpWriter};

/// 读端（RX 线程持有）
pub trait TransportReader {
    /// 读取数据，遵循模块级约定
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// 写端（TX 线程持有）
pub trait TransportWriter {
    /// 写出完整的一帧
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// 关闭连接（两个方向）
    ///
    /// 关闭后阻塞中的读操作必须返回，重复关闭是无害的。
    fn close(&mut self);
}

/// 强制关闭句柄
///
/// 与写端共享同一个连接，但不经过 TX 线程：写操作卡住时，
/// `Connection` 通过它关闭连接，让阻塞中的读写立即返回。
pub trait TransportCloser {
    /// 关闭连接（两个方向），重复调用无害
    fn shutdown(&self);
}

/// 已建立的连接
pub trait Transport {
    type Reader: TransportReader + Send + 'static;
    type Writer: TransportWriter + Send + 'static;
    type Closer: TransportCloser + Send + 'static;

    /// 获取强制关闭句柄（必须在 `split` 之前调用）
    fn closer(&self) -> io::Result<Self::Closer>;

    /// 拆分为读端和写端
    fn split(self) -> io::Result<(Self::Reader, Self::Writer)>;
}

/// 连接工厂
///
/// `RobotClient` 每次 `connect()` 通过它打开一个新连接。
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// 打开到 `address` 的连接
    ///
    /// `address` 可以是主机名或 IP（使用 `config.port`），也可以带端口（`host:port`）。
    fn open(&self, address: &str, config: &LinkConfig) -> io::Result<Self::Transport>;
}

/// 读错误是否只是超时（空闲点）
pub(crate) fn is_idle_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// 写错误是否意味着连接已经失效
///
/// 写超时（`WouldBlock` / `TimedOut`）也算失效：对端长时间不读，且半行可能已经写出。
pub(crate) fn is_fatal_write_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}
