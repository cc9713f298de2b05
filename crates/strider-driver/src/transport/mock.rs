//! 内存传输（测试用）
//!
//! `MockConnector` 是可克隆的句柄：测试代码保留一份，用于注入上行数据、
//! 模拟对端断开、查看写出的命令；另一份交给 `RobotClient`。

use super::{Connector, Transport, TransportCloser, TransportReader, TransportWriter};
use crate::pipeline::LinkConfig;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// 单个连接的对端
#[derive(Debug)]
struct MockLink {
    inbound_tx: Mutex<Option<Sender<Vec<u8>>>>,
    closed: AtomicBool,
}

impl MockLink {
    fn hang_up(&self) {
        self.inbound_tx.lock().take();
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.hang_up();
    }
}

#[derive(Debug, Default)]
struct MockShared {
    fail_open: AtomicBool,
    stall_writes: AtomicBool,
    opens: AtomicUsize,
    written: Mutex<Vec<String>>,
    current: Mutex<Option<Arc<MockLink>>>,
}

/// 内存连接工厂
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    shared: Arc<MockShared>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让后续的 `open` 失败（ConnectionRefused）
    pub fn set_fail_open(&self, fail: bool) {
        self.shared.fail_open.store(fail, Ordering::SeqCst);
    }

    /// 模拟对端停止读取：写操作阻塞，直到连接被关闭或取消阻塞
    pub fn set_stall_writes(&self, stall: bool) {
        self.shared.stall_writes.store(stall, Ordering::SeqCst);
    }

    /// `open` 被调用的次数
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// 向当前连接注入上行数据，没有活动连接时返回 false
    pub fn feed(&self, bytes: &[u8]) -> bool {
        let current = self.shared.current.lock();
        let Some(link) = current.as_ref() else {
            return false;
        };
        let tx = link.inbound_tx.lock();
        match tx.as_ref() {
            Some(tx) => tx.send(bytes.to_vec()).is_ok(),
            None => false,
        }
    }

    /// 模拟对端关闭（读端随后返回 0）
    pub fn hang_up(&self) {
        if let Some(link) = self.shared.current.lock().as_ref() {
            link.hang_up();
        }
    }

    /// 当前连接是否已被本端关闭
    pub fn is_closed(&self) -> bool {
        self.shared
            .current
            .lock()
            .as_ref()
            .is_none_or(|link| link.closed.load(Ordering::SeqCst))
    }

    /// 所有写出的行（不含 `\n`）
    pub fn written(&self) -> Vec<String> {
        self.shared.written.lock().clone()
    }

    /// 清空写出记录
    pub fn clear_written(&self) {
        self.shared.written.lock().clear();
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn open(&self, _address: &str, config: &LinkConfig) -> io::Result<MockTransport> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_open.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }

        let (inbound_tx, inbound_rx) = unbounded();
        let link = Arc::new(MockLink {
            inbound_tx: Mutex::new(Some(inbound_tx)),
            closed: AtomicBool::new(false),
        });
        // 旧连接的对端随之消失
        if let Some(old) = self.shared.current.lock().replace(link.clone()) {
            old.hang_up();
        }

        Ok(MockTransport {
            link,
            inbound_rx,
            shared: self.shared.clone(),
            read_timeout: Duration::from_millis(config.read_timeout_ms.max(1)),
        })
    }
}

/// 内存连接
#[derive(Debug)]
pub struct MockTransport {
    link: Arc<MockLink>,
    inbound_rx: Receiver<Vec<u8>>,
    shared: Arc<MockShared>,
    read_timeout: Duration,
}

impl Transport for MockTransport {
    type Reader = MockReader;
    type Writer = MockWriter;
    type Closer = MockCloser;

    fn closer(&self) -> io::Result<MockCloser> {
        Ok(MockCloser {
            link: self.link.clone(),
        })
    }

    fn split(self) -> io::Result<(MockReader, MockWriter)> {
        Ok((
            MockReader {
                inbound_rx: self.inbound_rx,
                pending: Vec::new(),
                read_timeout: self.read_timeout,
            },
            MockWriter {
                link: self.link,
                shared: self.shared,
            },
        ))
    }
}

/// 内存读端
#[derive(Debug)]
pub struct MockReader {
    inbound_rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    read_timeout: Duration,
}

impl TransportReader for MockReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.inbound_rx.recv_timeout(self.read_timeout) {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::from(io::ErrorKind::WouldBlock));
                },
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// 内存写端
#[derive(Debug)]
pub struct MockWriter {
    link: Arc<MockLink>,
    shared: Arc<MockShared>,
}

impl TransportWriter for MockWriter {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        while self.shared.stall_writes.load(Ordering::SeqCst)
            && !self.link.closed.load(Ordering::SeqCst)
        {
            std::thread::sleep(Duration::from_millis(1));
        }
        if self.link.closed.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let text = String::from_utf8_lossy(buf);
        let mut written = self.shared.written.lock();
        written.extend(text.lines().map(str::to_string));
        Ok(())
    }

    fn close(&mut self) {
        self.link.close();
    }
}

/// 内存强制关闭句柄
#[derive(Debug)]
pub struct MockCloser {
    link: Arc<MockLink>,
}

impl TransportCloser for MockCloser {
    fn shutdown(&self) {
        self.link.close();
    }
}
