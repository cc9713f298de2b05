//! 状态结构定义模块
//!
//! 包含遥测快照、最近错误以及每个连接共享的上下文。
//!
//! 遥测只有一个写者（RX 线程），整体作为一个快照通过 `ArcSwap` 发布，
//! 读者拿到的永远是一致的副本（两路电量读数不会被撕裂）。

use crate::heartbeat::FeedbackMonitor;
use crate::metrics::LinkMetrics;
use arc_swap::{ArcSwap, ArcSwapOption};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use strider_protocol::Feedback;

/// 电量读数（两路原始字符串，不做解析）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PowerReading {
    pub first: String,
    pub second: String,
}

/// 遥测快照
///
/// 每次 `connect()` 都会从默认值重新开始。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// 最近一次超声波距离（厘米）
    pub sonar_cm: Option<u32>,
    /// 最近一次电量读数
    pub power: Option<PowerReading>,
    /// 本连接收到的帧总数（包括被忽略和格式错误的帧）
    pub frames_received: u64,
    /// SONIC 更新次数
    pub sonar_updates: u64,
    /// POWER 更新次数
    pub power_updates: u64,
    /// 最近一次遥测更新时间
    pub last_update: Option<Instant>,
}

impl TelemetrySnapshot {
    /// 应用一条遥测反馈，返回新快照
    pub fn apply(&self, feedback: Feedback) -> Self {
        let mut next = self.clone();
        match feedback {
            Feedback::Sonic { distance_cm } => {
                next.sonar_cm = Some(distance_cm);
                next.sonar_updates += 1;
            },
            Feedback::Power { first, second } => {
                next.power = Some(PowerReading { first, second });
                next.power_updates += 1;
            },
        }
        next.last_update = Some(Instant::now());
        next
    }

    /// 距离最近一次更新的时间
    pub fn age(&self) -> Option<Duration> {
        self.last_update.map(|t| t.elapsed())
    }
}

/// 最近一次被吞掉的错误
///
/// 命令 API 从不向调用者抛出错误，失败会记录在这里供轮询。
#[derive(Debug, Default)]
pub struct LastError {
    inner: ArcSwapOption<String>,
}

impl LastError {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录错误（覆盖之前的值）
    pub fn record(&self, message: impl Into<String>) {
        self.inner.store(Some(Arc::new(message.into())));
    }

    /// 读取最近一次错误
    pub fn get(&self) -> Option<String> {
        self.inner.load_full().map(|msg| msg.as_ref().clone())
    }

    /// 清除错误
    pub fn clear(&self) {
        self.inner.store(None);
    }
}

/// 单个连接的共享上下文
///
/// RX / TX / 轮询三个线程和 `RobotClient` 共享同一个 `Arc<LinkContext>`。
/// 新连接总是创建新的上下文，因此遥测、指标和心跳都会重置。
#[derive(Debug)]
pub struct LinkContext {
    /// 遥测快照（RX 线程写，任意线程读）
    pub telemetry: ArcSwap<TelemetrySnapshot>,
    /// 运行标志，任何一个线程退出都会把它置为 false
    pub is_running: AtomicBool,
    /// 链路指标
    pub metrics: LinkMetrics,
    /// 反馈新鲜度
    pub monitor: FeedbackMonitor,
    /// 最近错误（与客户端共享，跨连接保留）
    pub last_error: Arc<LastError>,
    /// 连接建立时间
    pub established_at: Instant,
}

impl LinkContext {
    pub fn new(last_error: Arc<LastError>, feedback_timeout: Duration) -> Self {
        Self {
            telemetry: ArcSwap::from_pointee(TelemetrySnapshot::default()),
            is_running: AtomicBool::new(true),
            metrics: LinkMetrics::new(),
            monitor: FeedbackMonitor::new(feedback_timeout),
            last_error,
            established_at: Instant::now(),
        }
    }

    /// 连接是否仍然存活
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 标记连接已结束
    pub fn mark_closed(&self) {
        self.is_running.store(false, Ordering::Release);
    }

    /// 读取遥测快照副本
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.load().as_ref().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_apply_sonic_keeps_power() {
        let snapshot = TelemetrySnapshot::default().apply(Feedback::Power {
            first: "5".to_string(),
            second: "6".to_string(),
        });
        let snapshot = snapshot.apply(Feedback::Sonic { distance_cm: 37 });

        assert_eq!(snapshot.sonar_cm, Some(37));
        assert_eq!(
            snapshot.power,
            Some(PowerReading {
                first: "5".to_string(),
                second: "6".to_string(),
            })
        );
        assert_eq!(snapshot.sonar_updates, 1);
        assert_eq!(snapshot.power_updates, 1);
        assert!(snapshot.last_update.is_some());
    }

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = TelemetrySnapshot::default();
        assert_eq!(snapshot.sonar_cm, None);
        assert_eq!(snapshot.power, None);
        assert_eq!(snapshot.age(), None);
    }

    #[test]
    fn test_last_error_record_and_clear() {
        let last_error = LastError::new();
        assert_eq!(last_error.get(), None);

        last_error.record("first");
        last_error.record("second");
        assert_eq!(last_error.get().as_deref(), Some("second"));

        last_error.clear();
        assert_eq!(last_error.get(), None);
    }

    #[test]
    fn test_link_context_lifecycle() {
        let last_error = Arc::new(LastError::new());
        let ctx = LinkContext::new(last_error.clone(), Duration::from_secs(1));
        assert!(ctx.is_running());
        assert_eq!(ctx.snapshot(), TelemetrySnapshot::default());

        ctx.last_error.record("boom");
        assert_eq!(last_error.get().as_deref(), Some("boom"));

        ctx.mark_closed();
        assert!(!ctx.is_running());
    }
}
