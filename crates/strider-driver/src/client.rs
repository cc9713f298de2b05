//! Robot API 模块
//!
//! 提供对外的 `RobotClient`，封装连接生命周期、后台线程和状态同步细节。
//!
//! # 错误语义
//!
//! 命令 API（移动、转头、舵机、查询）以及 `connect` / `disconnect` 都不会向调用者返回错误：
//! 失败会通过 `tracing` 记录，并写入 [`last_error`](RobotClient::last_error) 供轮询。
//! 需要显式错误的调用者可以使用 `try_connect` / `try_send`。

use crate::connection::Connection;
use crate::error::DriverError;
use crate::link_state::{AtomicLinkState, LinkState};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::LinkConfig;
use crate::state::{LastError, LinkContext, PowerReading, TelemetrySnapshot};
use crate::transport::{Connector, TcpConnector};
use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use strider_protocol::{Command, Direction, HeadAngle, MotionIntent, MotionProfile, ProtocolError};
use tracing::{debug, error, info, warn};

/// 机器人控制客户端
///
/// 每个实例同一时间最多持有一个连接；每个连接有且只有一个 RX 线程、一个 TX 线程和一个轮询线程。
///
/// # Example
///
/// ```no_run
/// use strider_driver::RobotClient;
///
/// let robot = RobotClient::new();
/// robot.connect("192.168.4.1");
/// if robot.is_connected() {
///     robot.move_forward();
///     robot.stop();
///     println!("sonar: {:?}", robot.sonar_distance());
/// }
/// robot.disconnect();
/// ```
pub struct RobotClient<C: Connector = TcpConnector> {
    connector: C,
    config: LinkConfig,
    /// 最近一次 connect 使用的地址（或 builder 配置的地址）
    address: RwLock<Option<String>>,
    state: AtomicLinkState,
    handshake: AtomicBool,
    /// 当前（或最近一次）连接的上下文，断开后仍可读取遥测
    current: ArcSwapOption<LinkContext>,
    connection: Mutex<Option<Connection>>,
    /// 串行化 connect / disconnect，状态迁移期间不会交错
    lifecycle: Mutex<()>,
    profile: RwLock<MotionProfile>,
    last_error: Arc<LastError>,
}

impl RobotClient<TcpConnector> {
    /// 使用默认配置创建 TCP 客户端
    pub fn new() -> Self {
        Self::with_connector(TcpConnector, LinkConfig::default(), MotionProfile::default())
    }
}

impl Default for RobotClient<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> RobotClient<C> {
    /// 使用自定义传输创建客户端（初始状态为 Idle）
    pub fn with_connector(connector: C, config: LinkConfig, profile: MotionProfile) -> Self {
        Self {
            connector,
            config,
            address: RwLock::new(None),
            state: AtomicLinkState::new(LinkState::Idle),
            handshake: AtomicBool::new(false),
            current: ArcSwapOption::empty(),
            connection: Mutex::new(None),
            lifecycle: Mutex::new(()),
            profile: RwLock::new(profile),
            last_error: Arc::new(LastError::new()),
        }
    }

    pub(crate) fn with_address(self, address: Option<String>) -> Self {
        *self.address.write() = address;
        self
    }

    // ============================================================
    // 连接生命周期
    // ============================================================

    /// 连接到 `address`（端口取 `LinkConfig::port`，也可写成 `host:port`）
    ///
    /// 已经连接时只记录警告。失败不会返回错误，见模块文档。
    pub fn connect(&self, address: &str) {
        if let Err(e) = self.try_connect(address) {
            error!("Failed to connect: {}", e);
            self.last_error.record(e.to_string());
        }
    }

    /// 连接到 builder 配置的地址（或上一次使用的地址）
    pub fn reconnect(&self) {
        match self.address() {
            Some(address) => self.connect(&address),
            None => {
                warn!("reconnect() ignored: no address configured");
                self.last_error.record("no address configured");
            },
        }
    }

    /// `connect` 的显式错误版本
    ///
    /// 已经连接（或另一个线程正在连接）时返回 `Ok(())` 并记录警告，不会创建第二组线程。
    pub fn try_connect(&self, address: &str) -> Result<(), DriverError> {
        let _lifecycle = self.lifecycle.lock();
        self.refresh_state();
        if !self.state.transition(LinkState::Idle, LinkState::Connecting) {
            warn!(
                "connect({}) ignored: link is already {}",
                address,
                self.state.get()
            );
            return Ok(());
        }

        // 对端关闭后遗留的线程组
        let stale = self.connection.lock().take();
        if let Some(stale) = stale {
            debug!("Reaping stale connection before reconnecting");
            if let Err(e) = stale.close() {
                warn!("Stale connection: {}", e);
            }
        }

        *self.address.write() = Some(address.to_string());
        info!("Connecting to {} (port {})", address, self.config.port);

        match self.open(address) {
            Ok(connection) => {
                self.current.store(Some(connection.context().clone()));
                *self.connection.lock() = Some(connection);
                self.handshake.store(true, Ordering::Release);
                self.state.set(LinkState::Connected);
                info!("Connected to {}", address);
                Ok(())
            },
            Err(e) => {
                self.handshake.store(false, Ordering::Release);
                self.state.set(LinkState::Idle);
                Err(e)
            },
        }
    }

    fn open(&self, address: &str) -> Result<Connection, DriverError> {
        let transport =
            self.connector
                .open(address, &self.config)
                .map_err(|source| DriverError::ConnectFailed {
                    addr: format!("{}:{}", address, self.config.port),
                    source,
                })?;

        // 新连接，新上下文：遥测、指标、心跳全部重置
        let ctx = Arc::new(LinkContext::new(
            self.last_error.clone(),
            self.config.feedback_timeout(),
        ));
        Connection::start(transport, ctx, &self.config)
    }

    /// 断开连接
    ///
    /// 取消轮询和 TX 线程、关闭 socket、有界 join 所有线程后回到 Idle。
    /// 未连接时只记录日志。
    pub fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock();
        let connection = self.connection.lock().take();
        let Some(connection) = connection else {
            warn!("disconnect() ignored: not connected");
            return;
        };

        // 对端已关闭时状态可能已经隐式回到 Idle，此时只回收线程
        let was_connected = self.state.transition(LinkState::Connected, LinkState::Disconnecting);
        info!("Disconnecting from {}", self.address().unwrap_or_default());
        if let Err(e) = connection.close() {
            error!("Disconnect: {}", e);
            self.last_error.record(format!("disconnect: {e}"));
        }

        self.handshake.store(false, Ordering::Release);
        if was_connected {
            self.state.transition(LinkState::Disconnecting, LinkState::Idle);
        }
        info!("Disconnected");
    }

    /// 后台线程发现连接失效后，把 Connected 隐式转换为 Idle
    fn refresh_state(&self) {
        if self.state.get() != LinkState::Connected {
            return;
        }
        let alive = self.current.load().as_ref().is_some_and(|ctx| ctx.is_running());
        if !alive && self.state.transition(LinkState::Connected, LinkState::Idle) {
            self.handshake.store(false, Ordering::Release);
            info!("Connection lost, link is now idle");
        }
    }

    // ============================================================
    // 状态查询
    // ============================================================

    /// 当前连接状态
    pub fn state(&self) -> LinkState {
        self.refresh_state();
        self.state.get()
    }

    /// 是否已连接（后台线程仍在运行）
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// 连接是否已完成建立
    pub fn is_handshake_complete(&self) -> bool {
        self.refresh_state();
        self.handshake.load(Ordering::Acquire)
    }

    /// 遥测快照（无锁）
    ///
    /// 断开后仍返回最后一个连接的数据，下一次 `connect` 时重置。
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.current
            .load()
            .as_ref()
            .map(|ctx| ctx.snapshot())
            .unwrap_or_default()
    }

    /// 最近一次超声波距离（厘米）
    pub fn sonar_distance(&self) -> Option<u32> {
        self.telemetry().sonar_cm
    }

    /// 最近一次电量读数
    pub fn power_reading(&self) -> Option<PowerReading> {
        self.telemetry().power
    }

    /// 距离上一次遥测更新的时间
    pub fn telemetry_age(&self) -> Option<Duration> {
        self.telemetry().age()
    }

    /// 反馈是否在 `feedback_timeout_ms` 内更新过
    pub fn is_feedback_fresh(&self) -> bool {
        self.current
            .load()
            .as_ref()
            .is_some_and(|ctx| ctx.monitor.is_fresh())
    }

    /// 当前连接已建立的时长
    pub fn connection_age(&self) -> Option<Duration> {
        if !self.is_connected() {
            return None;
        }
        self.current.load().as_ref().map(|ctx| ctx.established_at.elapsed())
    }

    /// 链路指标快照（当前或最近一次连接）
    pub fn metrics(&self) -> MetricsSnapshot {
        self.current
            .load()
            .as_ref()
            .map(|ctx| ctx.metrics.snapshot())
            .unwrap_or_default()
    }

    /// 最近一次被吞掉的错误
    pub fn last_error(&self) -> Option<String> {
        self.last_error.get()
    }

    pub fn clear_last_error(&self) {
        self.last_error.clear();
    }

    /// 当前使用（或将要使用）的地址
    pub fn address(&self) -> Option<String> {
        self.address.read().clone()
    }

    pub fn link_config(&self) -> &LinkConfig {
        &self.config
    }

    // ============================================================
    // 运动参数
    // ============================================================

    /// 当前运动参数副本
    pub fn profile(&self) -> MotionProfile {
        *self.profile.read()
    }

    pub fn set_profile(&self, profile: MotionProfile) {
        *self.profile.write() = profile;
    }

    pub fn set_speed(&self, speed: i32) {
        self.profile.write().speed = speed;
    }

    pub fn set_step_size(&self, step_size: i32) {
        self.profile.write().step_size = step_size;
    }

    pub fn set_angle_size(&self, angle_size: i32) {
        self.profile.write().angle_size = angle_size;
    }

    pub fn set_head_center(&self, head_center: i32) {
        self.profile.write().head_center = head_center;
    }

    // ============================================================
    // 命令
    // ============================================================

    /// 把命令交给 TX 线程，返回显式错误
    pub fn try_send(&self, command: Command) -> Result<(), DriverError> {
        let connection = self.connection.lock();
        match connection.as_ref() {
            Some(connection) => connection.send(command),
            None => Err(DriverError::NotConnected),
        }
    }

    /// 把命令交给 TX 线程，失败只记录（不重试）
    pub fn send(&self, command: Command) {
        if let Err(e) = self.try_send(command) {
            warn!("Dropping {} command: {}", command.verb(), e);
            self.last_error.record(format!("send {} failed: {e}", command.verb()));
        }
    }

    /// 显式移动命令，同时更新持久速度
    pub fn send_move(&self, x: i32, y: i32, speed: i32, angle: i32) {
        self.set_speed(speed);
        self.send(MotionIntent::new(x, y, speed, angle).into());
    }

    /// 按当前运动参数向某个方向移动一步
    pub fn move_direction(&self, direction: Direction) {
        let intent = self.profile.read().intent(direction);
        self.send(intent.into());
    }

    pub fn move_forward(&self) {
        self.move_direction(Direction::Forward);
    }

    pub fn move_backward(&self) {
        self.move_direction(Direction::Backward);
    }

    pub fn move_left(&self) {
        self.move_direction(Direction::Left);
    }

    pub fn move_right(&self) {
        self.move_direction(Direction::Right);
    }

    /// 左倾斜转向
    pub fn turn_left(&self) {
        self.move_direction(Direction::TurnLeft);
    }

    /// 右倾斜转向
    pub fn turn_right(&self) {
        self.move_direction(Direction::TurnRight);
    }

    /// 停止（速度 0，不改变持久速度）
    pub fn stop(&self) {
        self.move_direction(Direction::Stop);
    }

    /// 云台转到绝对角度（发送前镜像）
    ///
    /// 超出 `0..=180` 的角度不发送，只记录到 last_error。
    pub fn turn_head(&self, angle: i32) {
        self.send_head(HeadAngle::absolute(angle));
    }

    /// 云台相对中位角偏移（正 = 右，负 = 左）
    pub fn turn_head_offset(&self, offset: i32) {
        let head = self.profile.read().head_offset(offset);
        self.send_head(head);
    }

    fn send_head(&self, head: Result<HeadAngle, ProtocolError>) {
        match head {
            Ok(head) => self.send(head.into()),
            Err(e) => {
                warn!("Dropping HEAD command: {}", e);
                self.last_error.record(format!("send HEAD failed: {e}"));
            },
        }
    }

    /// 舵机上电 / 断电
    pub fn set_servo_power(&self, on: bool) {
        self.send(Command::ServoPower(on));
    }

    /// 立即查询一次超声波距离
    pub fn request_sonar(&self) {
        self.send(Command::Sonic);
    }

    /// 立即查询一次电量
    pub fn request_power(&self) {
        self.send(Command::Power);
    }
}

impl<C: Connector> Drop for RobotClient<C> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            let _ = connection.close();
        }
    }
}
