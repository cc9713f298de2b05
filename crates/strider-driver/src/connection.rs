//! 单个连接的线程组
//!
//! `Connection` 拥有一个连接生命周期内的全部后台线程（RX / TX / 轮询）、
//! 命令队列发送端、取消通道发送端和强制关闭句柄。关闭（或 Drop）时按固定顺序退出：
//! 清除运行标志 → 丢弃取消发送端 → 有界 join TX（写完队列）→ 强制关闭 socket →
//! 有界 join 轮询和 RX。TX 卡在写操作上时，强制关闭让它随之返回。

use crate::error::DriverError;
use crate::pipeline::{LinkConfig, poll_loop, rx_loop, tx_loop};
use crate::state::LinkContext;
use crate::transport::{Transport, TransportCloser};
use crossbeam_channel::{Sender, TrySendError, bounded};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};
use std::time::Duration;
use strider_protocol::Command;
use tracing::{error, trace};

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = bounded(1);

        // Watchdog joins the target; on timeout it is left behind
        std::thread::spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                ),
            )),
        }
    }
}

/// 一个已建立连接的线程组
pub struct Connection {
    /// 共享上下文
    ctx: Arc<LinkContext>,
    /// 命令队列发送端（TX 线程是唯一消费者）
    cmd_tx: Option<Sender<Command>>,
    /// 取消通道发送端，丢弃即取消 TX 和轮询线程
    shutdown_tx: Option<Sender<()>>,
    rx_thread: Option<JoinHandle<()>>,
    tx_thread: Option<JoinHandle<()>>,
    poll_thread: Option<JoinHandle<()>>,
    /// 不经过 TX 线程的 socket 关闭句柄
    closer: Option<Box<dyn TransportCloser + Send>>,
    join_timeout: Duration,
    queue_capacity: usize,
}

impl Connection {
    /// 拆分传输并启动三个后台线程
    pub fn start<T: Transport>(
        transport: T,
        ctx: Arc<LinkContext>,
        config: &LinkConfig,
    ) -> Result<Self, DriverError> {
        let closer = transport.closer()?;
        let (reader, writer) = transport.split()?;

        let queue_capacity = config.command_queue_capacity.max(1);
        let (cmd_tx, cmd_rx) = bounded::<Command>(queue_capacity);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let ctx_rx = ctx.clone();
        let rx_thread = Builder::new()
            .name("strider-rx".into())
            .spawn(move || rx_loop(reader, ctx_rx))?;

        let ctx_tx = ctx.clone();
        let shutdown_tx_rx = shutdown_rx.clone();
        let tx_thread = match Builder::new()
            .name("strider-tx".into())
            .spawn(move || tx_loop(writer, cmd_rx, shutdown_tx_rx, ctx_tx))
        {
            Ok(handle) => handle,
            Err(e) => {
                // RX 线程已经启动，靠运行标志让它退出
                ctx.mark_closed();
                return Err(e.into());
            },
        };

        let ctx_poll = ctx.clone();
        let poll_tx = cmd_tx.clone();
        let poll_config = config.clone();
        let poll_thread = match Builder::new()
            .name("strider-poll".into())
            .spawn(move || poll_loop(poll_tx, shutdown_rx, poll_config, ctx_poll))
        {
            Ok(handle) => handle,
            Err(e) => {
                ctx.mark_closed();
                return Err(e.into());
            },
        };

        Ok(Self {
            ctx,
            cmd_tx: Some(cmd_tx),
            shutdown_tx: Some(shutdown_tx),
            rx_thread: Some(rx_thread),
            tx_thread: Some(tx_thread),
            poll_thread: Some(poll_thread),
            closer: Some(Box::new(closer)),
            join_timeout: config.join_timeout(),
            queue_capacity,
        })
    }

    /// 共享上下文
    pub fn context(&self) -> &Arc<LinkContext> {
        &self.ctx
    }

    /// 连接是否存活（所有线程都没有发现连接失效）
    pub fn is_alive(&self) -> bool {
        self.ctx.is_running()
    }

    /// 把命令交给 TX 线程（非阻塞）
    pub fn send(&self, command: Command) -> Result<(), DriverError> {
        if !self.ctx.is_running() {
            return Err(DriverError::NotConnected);
        }
        let cmd_tx = self.cmd_tx.as_ref().ok_or(DriverError::NotConnected)?;
        match cmd_tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.ctx
                    .metrics
                    .tx_dropped
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Err(DriverError::ChannelFull(self.queue_capacity))
            },
            Err(TrySendError::Disconnected(_)) => Err(DriverError::ChannelClosed),
        }
    }

    /// 停止所有线程并关闭连接
    ///
    /// 每个线程最多等待 `join_timeout`，超时的线程记录日志后放弃，
    /// 并以 `DriverError::Timeout` 报告（socket 无论如何都会被关闭）。
    pub fn close(mut self) -> Result<(), DriverError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        // Release: All writes before this are visible to threads that see the false value
        self.ctx.mark_closed();

        // 先丢弃发送端：TX 和轮询线程在 select 中立即醒来
        self.shutdown_tx.take();
        self.cmd_tx.take();

        let mut result = Ok(());
        let tx_thread = self.tx_thread.take();
        self.join_bounded("TX thread", tx_thread, &mut result);

        // TX 正常退出时已经关闭写端；写操作卡住时在这里强制关闭
        if let Some(closer) = self.closer.take() {
            closer.shutdown();
        }

        let poll_thread = self.poll_thread.take();
        self.join_bounded("Poll thread", poll_thread, &mut result);
        let rx_thread = self.rx_thread.take();
        self.join_bounded("RX thread", rx_thread, &mut result);

        trace!("Connection closed");
        result
    }

    fn join_bounded(
        &self,
        name: &'static str,
        handle: Option<JoinHandle<()>>,
        result: &mut Result<(), DriverError>,
    ) {
        let Some(handle) = handle else {
            return;
        };
        if let Err(_e) = handle.join_timeout(self.join_timeout) {
            error!(
                "{} panicked or failed to shut down within {:?}",
                name, self.join_timeout
            );
            if result.is_ok() {
                *result = Err(DriverError::Timeout {
                    what: name,
                    after: self.join_timeout,
                });
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
