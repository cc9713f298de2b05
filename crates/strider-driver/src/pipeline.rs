//! Pipeline IO 循环模块
//!
//! 每个连接三个后台线程：
//! - `rx_loop`：读字节流、切帧、解析遥测、发布快照（唯一的遥测写者）
//! - `tx_loop`：命令队列的唯一消费者，也是唯一的 socket 写者
//! - `poll_loop`：按固定周期向命令队列投递 `SONIC` / `POWER` 查询
//!
//! TX 和轮询线程同时监听取消通道（`bounded::<()>(0)`，丢弃发送端即取消），
//! RX 线程依靠读超时定期检查运行标志。任何一个线程发现连接失效都会清除运行标志，
//! 其余线程在下一个空闲点退出。

use crate::state::LinkContext;
use crate::transport::{TransportReader, TransportWriter, is_fatal_write_error, is_idle_error};
use crossbeam_channel::{Receiver, Sender, TrySendError, never, tick};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use strider_protocol::{CONTROL_PORT, Command, LineFramer, parse_frame};
use tracing::{error, info, trace, warn};

/// RX 读缓冲区大小
const RX_BUFFER_SIZE: usize = 1024;

/// TX / 轮询线程检查运行标志的间隔
const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// 链路配置
///
/// # Example
///
/// ```
/// use strider_driver::LinkConfig;
///
/// // 默认配置（端口 5002，100ms 读超时，100ms 超声波轮询，不轮询电量）
/// let config = LinkConfig::default();
/// assert_eq!(config.port, 5002);
///
/// // 同时每秒查询一次电量
/// let config = LinkConfig {
///     power_poll_interval_ms: Some(1000),
///     ..LinkConfig::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// 控制端口
    pub port: u16,
    /// 建立连接超时（毫秒）
    pub connect_timeout_ms: u64,
    /// 读超时（毫秒），也是 RX 线程检查运行标志的周期
    pub read_timeout_ms: u64,
    /// 超声波查询周期（毫秒），`None` 或 0 表示不查询
    pub sonar_poll_interval_ms: Option<u64>,
    /// 电量查询周期（毫秒），`None` 或 0 表示不查询
    pub power_poll_interval_ms: Option<u64>,
    /// 命令队列容量
    pub command_queue_capacity: usize,
    /// 断开时等待每个线程退出的最长时间（毫秒）
    pub join_timeout_ms: u64,
    /// 超过此时间没有遥测即认为反馈不新鲜（毫秒）
    pub feedback_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: CONTROL_PORT,
            connect_timeout_ms: 3000,
            read_timeout_ms: 100,
            sonar_poll_interval_ms: Some(100),
            power_poll_interval_ms: None,
            command_queue_capacity: 32,
            join_timeout_ms: 2000,
            feedback_timeout_ms: 1000,
        }
    }
}

impl LinkConfig {
    /// 超声波查询周期（已过滤 0）
    pub fn sonar_poll_interval(&self) -> Option<Duration> {
        positive_millis(self.sonar_poll_interval_ms)
    }

    /// 电量查询周期（已过滤 0）
    pub fn power_poll_interval(&self) -> Option<Duration> {
        positive_millis(self.power_poll_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn feedback_timeout(&self) -> Duration {
        Duration::from_millis(self.feedback_timeout_ms)
    }
}

fn positive_millis(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|ms| *ms > 0).map(Duration::from_millis)
}

/// 单帧处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// 识别并更新了遥测
    Applied,
    /// 安全忽略（未知动词、POWER 字段数不符）
    Ignored,
    /// 格式错误，已记录到 last_error
    Malformed,
}

/// RX 循环
///
/// 退出条件：运行标志被清除、对端关闭（读到 0 字节）、读错误。
/// 退出时清除运行标志，连接随之失效（不会重连，调用者通过轮询状态感知）。
pub fn rx_loop(mut reader: impl TransportReader, ctx: Arc<LinkContext>) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; RX_BUFFER_SIZE];

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !ctx.is_running() {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        match reader.read(&mut buf) {
            Ok(0) => {
                if ctx.is_running() {
                    info!("RX thread: connection closed by remote");
                    ctx.last_error.record("connection closed by remote");
                }
                break;
            },
            Ok(n) => {
                ctx.metrics.rx_bytes.fetch_add(n as u64, Ordering::Relaxed);

                let overflows = framer.overflow_count();
                let frames = framer.push(&buf[..n]);
                if framer.overflow_count() > overflows {
                    warn!("RX thread: oversized frame discarded");
                    ctx.metrics.rx_malformed.fetch_add(1, Ordering::Relaxed);
                }

                for frame in frames {
                    dispatch_frame(&frame, &ctx);
                }
            },
            Err(e) if is_idle_error(&e) => {
                // 超时是正常情况（没有数据）
                ctx.metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) => {
                if ctx.is_running() {
                    error!("RX thread: read failed: {}", e);
                    ctx.last_error.record(format!("read failed: {e}"));
                }
                break;
            },
        }
    }

    ctx.mark_closed();
    trace!("RX thread: loop exited");
}

/// 解析一帧并更新遥测快照
///
/// 单写者：只在 RX 线程调用，load-修改-store 不会丢失更新。
pub fn dispatch_frame(frame: &str, ctx: &LinkContext) -> FrameOutcome {
    ctx.metrics.rx_frames.fetch_add(1, Ordering::Relaxed);

    let current = ctx.telemetry.load();
    let (mut next, outcome) = match parse_frame(frame) {
        Ok(Some(feedback)) => {
            trace!("RX: {}", frame);
            ctx.monitor.register_feedback();
            (current.apply(feedback), FrameOutcome::Applied)
        },
        Ok(None) => {
            trace!("RX: ignoring frame {:?}", frame);
            ctx.metrics.rx_ignored.fetch_add(1, Ordering::Relaxed);
            (current.as_ref().clone(), FrameOutcome::Ignored)
        },
        Err(e) => {
            warn!("RX: malformed frame {:?}: {}", frame, e);
            ctx.metrics.rx_malformed.fetch_add(1, Ordering::Relaxed);
            ctx.last_error.record(format!("malformed frame {frame:?}: {e}"));
            (current.as_ref().clone(), FrameOutcome::Malformed)
        },
    };

    next.frames_received += 1;
    ctx.telemetry.store(Arc::new(next));
    outcome
}

/// 线程以任何方式退出（包括 panic 展开）时清除运行标志
struct CloseOnExit<'a>(&'a LinkContext);

impl Drop for CloseOnExit<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("{} thread panicked, marking link closed", current_thread_name());
            self.0.last_error.record("background thread panicked");
        }
        self.0.mark_closed();
    }
}

fn current_thread_name() -> String {
    std::thread::current().name().unwrap_or("unnamed").to_string()
}

/// TX 循环（唯一的写者）
///
/// 写失败只记录不重试；连接已失效的错误（BrokenPipe 等）结束循环。
/// 正常退出时先写完队列中剩余的命令，再关闭写端，阻塞中的读操作随之返回。
/// TX 线程一旦退出连接即失效，之后的命令不会再被写出。
pub fn tx_loop(
    mut writer: impl TransportWriter,
    cmd_rx: Receiver<Command>,
    shutdown_rx: Receiver<()>,
    ctx: Arc<LinkContext>,
) {
    let _close_on_exit = CloseOnExit(&ctx);
    let mut healthy = true;

    loop {
        if !ctx.is_running() {
            trace!("TX thread: is_running flag is false, exiting");
            break;
        }

        let command = crossbeam_channel::select! {
            recv(cmd_rx) -> msg => match msg {
                Ok(command) => command,
                Err(_) => {
                    trace!("TX thread: command channel disconnected");
                    break;
                },
            },
            recv(shutdown_rx) -> _ => {
                trace!("TX thread: shutdown signal received");
                break;
            },
            default(IDLE_CHECK_INTERVAL) => continue,
        };

        if !write_command(&mut writer, command, &ctx) {
            error!("TX thread: connection lost, setting is_running = false");
            ctx.mark_closed();
            healthy = false;
            break;
        }
    }

    if healthy {
        let mut flushed = 0;
        while let Ok(command) = cmd_rx.try_recv() {
            if !write_command(&mut writer, command, &ctx) {
                break;
            }
            flushed += 1;
        }
        if flushed > 0 {
            trace!("TX thread: flushed {} queued commands", flushed);
        }
    }

    writer.close();
    trace!("TX thread: loop exited");
}

/// 写出一条命令，连接已失效时返回 false
fn write_command(writer: &mut impl TransportWriter, command: Command, ctx: &LinkContext) -> bool {
    let line = command.to_line();
    match writer.write_all(line.as_bytes()) {
        Ok(()) => {
            trace!("TX: {}", line.trim_end());
            ctx.metrics.tx_commands.fetch_add(1, Ordering::Relaxed);
            true
        },
        Err(e) => {
            ctx.metrics.tx_failures.fetch_add(1, Ordering::Relaxed);
            // 断开过程中被强制关闭不算错误
            if ctx.is_running() {
                error!("TX thread: failed to send {}: {}", command.verb(), e);
                ctx.last_error.record(format!("send {} failed: {e}", command.verb()));
            } else {
                trace!("TX thread: dropping {} after close: {}", command.verb(), e);
            }
            !is_fatal_write_error(&e)
        },
    }
}

/// 轮询循环
///
/// 不退避：队列满时丢弃本次查询并计数，下一个周期照常投递。
pub fn poll_loop(
    cmd_tx: Sender<Command>,
    shutdown_rx: Receiver<()>,
    config: LinkConfig,
    ctx: Arc<LinkContext>,
) {
    let _close_on_exit = CloseOnExit(&ctx);
    let sonar_tick = config.sonar_poll_interval().map(tick).unwrap_or_else(never);
    let power_tick = config.power_poll_interval().map(tick).unwrap_or_else(never);

    loop {
        if !ctx.is_running() {
            trace!("Poll thread: is_running flag is false, exiting");
            break;
        }

        let command = crossbeam_channel::select! {
            recv(shutdown_rx) -> _ => {
                trace!("Poll thread: shutdown signal received");
                break;
            },
            recv(sonar_tick) -> _ => Command::Sonic,
            recv(power_tick) -> _ => Command::Power,
            default(IDLE_CHECK_INTERVAL) => continue,
        };

        if !enqueue_poll(&cmd_tx, command, &ctx) {
            trace!("Poll thread: command channel disconnected");
            break;
        }
    }

    trace!("Poll thread: loop exited");
}

/// 投递一次查询，通道断开时返回 false
fn enqueue_poll(cmd_tx: &Sender<Command>, command: Command, ctx: &LinkContext) -> bool {
    match cmd_tx.try_send(command) {
        Ok(()) => {
            ctx.metrics.polls_sent.fetch_add(1, Ordering::Relaxed);
            true
        },
        Err(TrySendError::Full(_)) => {
            trace!("Poll thread: command queue full, dropping {}", command.verb());
            ctx.metrics.polls_dropped.fetch_add(1, Ordering::Relaxed);
            true
        },
        Err(TrySendError::Disconnected(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LastError, PowerReading};
    use crate::transport::Connector;
    use crate::transport::Transport;
    use crate::transport::mock::MockConnector;
    use crossbeam_channel::bounded;
    use std::thread;
    use std::time::Instant;

    fn ctx() -> Arc<LinkContext> {
        Arc::new(LinkContext::new(
            Arc::new(LastError::new()),
            Duration::from_secs(1),
        ))
    }

    fn fast_config() -> LinkConfig {
        LinkConfig {
            read_timeout_ms: 10,
            sonar_poll_interval_ms: Some(10),
            join_timeout_ms: 500,
            ..LinkConfig::default()
        }
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_link_config_default() {
        let config = LinkConfig::default();
        assert_eq!(config.port, 5002);
        assert_eq!(config.read_timeout_ms, 100);
        assert_eq!(config.sonar_poll_interval(), Some(Duration::from_millis(100)));
        assert_eq!(config.power_poll_interval(), None);
        assert_eq!(config.command_queue_capacity, 32);
        assert_eq!(config.join_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_interval_disables_polling() {
        let config = LinkConfig {
            sonar_poll_interval_ms: Some(0),
            ..LinkConfig::default()
        };
        assert_eq!(config.sonar_poll_interval(), None);
    }

    #[test]
    fn test_dispatch_sonic_and_power() {
        let ctx = ctx();
        assert_eq!(dispatch_frame("SONIC#37", &ctx), FrameOutcome::Applied);
        assert_eq!(dispatch_frame("POWER#1#5#6", &ctx), FrameOutcome::Applied);

        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.sonar_cm, Some(37));
        assert_eq!(
            snapshot.power,
            Some(PowerReading {
                first: "5".to_string(),
                second: "6".to_string(),
            })
        );
        assert_eq!(snapshot.frames_received, 2);
        assert!(ctx.monitor.is_fresh());
    }

    #[test]
    fn test_dispatch_malformed_keeps_previous_state() {
        let ctx = ctx();
        dispatch_frame("SONIC#37", &ctx);
        assert_eq!(dispatch_frame("SONIC#abc", &ctx), FrameOutcome::Malformed);

        assert_eq!(ctx.snapshot().sonar_cm, Some(37));
        assert_eq!(ctx.metrics.snapshot().rx_malformed, 1);
        assert!(ctx.last_error.get().unwrap().contains("SONIC#abc"));
    }

    #[test]
    fn test_dispatch_short_power_keeps_previous_reading() {
        let ctx = ctx();
        dispatch_frame("POWER#1#5#6", &ctx);
        assert_eq!(dispatch_frame("POWER#1#5", &ctx), FrameOutcome::Ignored);
        assert_eq!(dispatch_frame("LED#1", &ctx), FrameOutcome::Ignored);

        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.power.unwrap().first, "5");
        assert_eq!(snapshot.frames_received, 3);
        assert_eq!(ctx.metrics.snapshot().rx_ignored, 2);
    }

    #[test]
    fn test_rx_loop_handles_split_frames_and_remote_close() {
        let connector = MockConnector::new();
        let (reader, _writer) = connector.open("robot", &fast_config()).unwrap().split().unwrap();
        let ctx = ctx();

        let ctx_rx = ctx.clone();
        let handle = thread::spawn(move || rx_loop(reader, ctx_rx));

        connector.feed(b"SON");
        connector.feed(b"IC#42\r\nPOWER#1#7.9");
        connector.feed(b"#7.8\n");
        assert!(wait_until(Duration::from_secs(1), || ctx.snapshot().power.is_some()));
        assert_eq!(ctx.snapshot().sonar_cm, Some(42));

        connector.hang_up();
        handle.join().unwrap();
        assert!(!ctx.is_running());
        assert_eq!(
            ctx.last_error.get().as_deref(),
            Some("connection closed by remote")
        );
    }

    #[test]
    fn test_rx_loop_exits_on_flag() {
        let connector = MockConnector::new();
        let (reader, _writer) = connector.open("robot", &fast_config()).unwrap().split().unwrap();
        let ctx = ctx();

        let ctx_rx = ctx.clone();
        let handle = thread::spawn(move || rx_loop(reader, ctx_rx));
        ctx.mark_closed();
        handle.join().unwrap();
        // 主动关闭不算错误
        assert_eq!(ctx.last_error.get(), None);
    }

    #[test]
    fn test_tx_loop_writes_in_order_and_closes() {
        let connector = MockConnector::new();
        let (_reader, writer) = connector.open("robot", &fast_config()).unwrap().split().unwrap();
        let ctx = ctx();
        let (cmd_tx, cmd_rx) = bounded(8);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let ctx_tx = ctx.clone();
        let handle = thread::spawn(move || tx_loop(writer, cmd_rx, shutdown_rx, ctx_tx));

        cmd_tx.send(Command::ServoPower(true)).unwrap();
        cmd_tx.send(Command::Sonic).unwrap();
        assert!(wait_until(Duration::from_secs(1), || connector.written().len() == 2));
        assert_eq!(connector.written(), vec!["SERVOPOWER#1", "SONIC"]);

        drop(shutdown_tx);
        handle.join().unwrap();
        assert!(connector.is_closed());
        assert_eq!(ctx.metrics.snapshot().tx_commands, 2);
    }

    #[test]
    fn test_tx_loop_flushes_queue_on_shutdown() {
        let connector = MockConnector::new();
        let (_reader, writer) = connector.open("robot", &fast_config()).unwrap().split().unwrap();
        let ctx = ctx();
        let (cmd_tx, cmd_rx) = bounded(8);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        // 线程启动前就已经取消：队列中的命令仍然要写出
        cmd_tx.send(Command::Move(strider_protocol::MotionIntent::stop())).unwrap();
        ctx.mark_closed();
        drop(shutdown_tx);
        drop(cmd_tx);

        tx_loop(writer, cmd_rx, shutdown_rx, ctx.clone());
        assert_eq!(connector.written(), vec!["MOVE#1#0#0#0#0"]);
        assert!(connector.is_closed());
    }

    #[test]
    fn test_tx_loop_stops_on_fatal_write_error() {
        let connector = MockConnector::new();
        let (_reader, mut writer) = connector.open("robot", &fast_config()).unwrap().split().unwrap();
        writer.close();
        let ctx = ctx();
        let (cmd_tx, cmd_rx) = bounded(8);
        let (_shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let ctx_tx = ctx.clone();
        let handle = thread::spawn(move || tx_loop(writer, cmd_rx, shutdown_rx, ctx_tx));
        cmd_tx.send(Command::Sonic).unwrap();
        handle.join().unwrap();

        assert!(!ctx.is_running());
        assert_eq!(ctx.metrics.snapshot().tx_failures, 1);
        assert!(ctx.last_error.get().unwrap().contains("SONIC"));
    }

    /// 写操作 panic 的写端
    struct PanickingWriter;

    impl TransportWriter for PanickingWriter {
        fn write_all(&mut self, _buf: &[u8]) -> std::io::Result<()> {
            panic!("writer exploded");
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_tx_loop_panic_marks_link_closed() {
        let ctx = ctx();
        let (cmd_tx, cmd_rx) = bounded(8);
        let (_shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let ctx_tx = ctx.clone();
        let handle = thread::Builder::new()
            .name("strider-tx".into())
            .spawn(move || tx_loop(PanickingWriter, cmd_rx, shutdown_rx, ctx_tx))
            .unwrap();
        cmd_tx.send(Command::Sonic).unwrap();

        assert!(handle.join().is_err());
        assert!(!ctx.is_running());
        assert_eq!(
            ctx.last_error.get().as_deref(),
            Some("background thread panicked")
        );
    }

    #[test]
    fn test_poll_loop_emits_sonic_and_stops_on_shutdown() {
        let ctx = ctx();
        let (cmd_tx, cmd_rx) = bounded(64);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let ctx_poll = ctx.clone();
        let handle = thread::spawn(move || poll_loop(cmd_tx, shutdown_rx, fast_config(), ctx_poll));

        let first = cmd_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(first, Command::Sonic);

        drop(shutdown_tx);
        handle.join().unwrap();
        assert!(ctx.metrics.snapshot().polls_sent >= 1);
    }

    #[test]
    fn test_poll_loop_drops_when_queue_full() {
        let ctx = ctx();
        let (cmd_tx, _cmd_rx) = bounded(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let ctx_poll = ctx.clone();
        let handle = thread::spawn(move || poll_loop(cmd_tx, shutdown_rx, fast_config(), ctx_poll));

        assert!(wait_until(Duration::from_secs(1), || {
            ctx.metrics.snapshot().polls_dropped >= 2
        }));
        drop(shutdown_tx);
        handle.join().unwrap();
        assert_eq!(ctx.metrics.snapshot().polls_sent, 1);
    }

    #[test]
    fn test_poll_loop_includes_power_when_configured() {
        let ctx = ctx();
        let (cmd_tx, cmd_rx) = bounded(64);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let config = LinkConfig {
            sonar_poll_interval_ms: None,
            power_poll_interval_ms: Some(10),
            ..fast_config()
        };

        let ctx_poll = ctx.clone();
        let handle = thread::spawn(move || poll_loop(cmd_tx, shutdown_rx, config, ctx_poll));
        assert_eq!(
            cmd_rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            Command::Power
        );
        drop(shutdown_tx);
        handle.join().unwrap();
    }
}
