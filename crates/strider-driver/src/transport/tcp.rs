//! TCP 传输实现（`std::net::TcpStream`）

use super::{Connector, Transport, TransportCloser, TransportReader, TransportWriter};
use crate::pipeline::LinkConfig;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

/// TCP 连接工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn open(&self, address: &str, config: &LinkConfig) -> io::Result<TcpTransport> {
        let transport = TcpTransport::connect(
            address,
            config.port,
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.read_timeout_ms),
        )?;
        debug!("TCP link established with {}", transport.peer_addr());
        Ok(transport)
    }
}

/// 已建立的 TCP 连接
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// 解析地址并建立连接
    ///
    /// 依次尝试解析出的每个地址，返回最后一个错误。
    /// 写超时与连接超时相同，对端停止读取时写操作不会永久阻塞。
    pub fn connect(
        address: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> io::Result<Self> {
        let addrs = resolve(address, port)?;

        let mut last_err = None;
        for addr in addrs {
            debug!("Connecting to {} (timeout {:?})", addr, connect_timeout);
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    // 读超时是 RX 线程检查运行标志的空闲点，不能为零
                    stream.set_read_timeout(Some(read_timeout.max(Duration::from_millis(1))))?;
                    stream.set_write_timeout(Some(connect_timeout.max(Duration::from_millis(1))))?;
                    return Ok(Self { stream, peer: addr });
                },
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no address resolved for {address}"),
            )
        }))
    }

    /// 对端地址
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for TcpTransport {
    type Reader = TcpReader;
    type Writer = TcpWriter;
    type Closer = TcpCloser;

    fn closer(&self) -> io::Result<TcpCloser> {
        Ok(TcpCloser {
            stream: self.stream.try_clone()?,
        })
    }

    fn split(self) -> io::Result<(TcpReader, TcpWriter)> {
        let reader = self.stream.try_clone()?;
        Ok((
            TcpReader { stream: reader },
            TcpWriter {
                stream: self.stream,
                closed: false,
            },
        ))
    }
}

/// TCP 读端
#[derive(Debug)]
pub struct TcpReader {
    stream: TcpStream,
}

impl TransportReader for TcpReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

/// TCP 写端
#[derive(Debug)]
pub struct TcpWriter {
    stream: TcpStream,
    closed: bool,
}

impl TransportWriter for TcpWriter {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        self.stream.write_all(buf)?;
        self.stream.flush()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // 对端已经关闭时 shutdown 会返回 NotConnected，忽略即可
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!("TCP shutdown: {}", e);
        }
    }
}

/// TCP 强制关闭句柄
#[derive(Debug)]
pub struct TcpCloser {
    stream: TcpStream,
}

impl TransportCloser for TcpCloser {
    fn shutdown(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!("TCP forced shutdown: {}", e);
        }
    }
}

/// `host:port` 直接使用，否则拼接默认端口
fn resolve(address: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let address = address.trim();
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(vec![addr]);
    }
    if address.contains(':')
        && let Ok(addrs) = address.to_socket_addrs()
    {
        return Ok(addrs.collect());
    }
    Ok((address, port).to_socket_addrs()?.collect())
}
