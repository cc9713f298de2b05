//! 链路性能指标模块
//!
//! 提供零开销的原子计数器，用于监控控制通道的健康状态。
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use strider_driver::LinkMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(LinkMetrics::default());
///
/// // 在 RX 线程中更新指标
/// metrics.rx_frames.fetch_add(1, Ordering::Relaxed);
///
/// // 在主线程中读取快照
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.rx_frames, 1);
/// ```
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// RX 接收的总字节数
    pub rx_bytes: AtomicU64,

    /// RX 切出的帧数
    pub rx_frames: AtomicU64,

    /// 格式错误的帧（SONIC 距离无法解析等）
    pub rx_malformed: AtomicU64,

    /// 被忽略的帧（未知动词、POWER 字段数不符）
    pub rx_ignored: AtomicU64,

    /// RX 读超时次数（正常现象，无数据时会超时）
    pub rx_timeouts: AtomicU64,

    /// TX 成功写出的命令数
    pub tx_commands: AtomicU64,

    /// TX 写失败次数
    pub tx_failures: AtomicU64,

    /// 命令队列满导致丢弃的用户命令数
    pub tx_dropped: AtomicU64,

    /// 已入队的查询命令数（SONIC / POWER）
    pub polls_sent: AtomicU64,

    /// 命令队列满导致丢弃的查询命令数
    pub polls_dropped: AtomicU64,
}

impl LinkMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 使用 `Ordering::Relaxed`，不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            rx_frames: self.rx_frames.load(Ordering::Relaxed),
            rx_malformed: self.rx_malformed.load(Ordering::Relaxed),
            rx_ignored: self.rx_ignored.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            tx_commands: self.tx_commands.load(Ordering::Relaxed),
            tx_failures: self.tx_failures.load(Ordering::Relaxed),
            tx_dropped: self.tx_dropped.load(Ordering::Relaxed),
            polls_sent: self.polls_sent.load(Ordering::Relaxed),
            polls_dropped: self.polls_dropped.load(Ordering::Relaxed),
        }
    }

}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rx_bytes: u64,
    pub rx_frames: u64,
    pub rx_malformed: u64,
    pub rx_ignored: u64,
    pub rx_timeouts: u64,
    pub tx_commands: u64,
    pub tx_failures: u64,
    pub tx_dropped: u64,
    pub polls_sent: u64,
    pub polls_dropped: u64,
}

impl MetricsSnapshot {
    /// 格式错误帧占比（百分比）
    ///
    /// 如果 `rx_frames` 为 0，返回 0.0。
    pub fn malformed_rate(&self) -> f64 {
        if self.rx_frames == 0 {
            return 0.0;
        }
        (self.rx_malformed as f64 / self.rx_frames as f64) * 100.0
    }

    /// 查询丢弃率（百分比）
    pub fn poll_drop_rate(&self) -> f64 {
        let total = self.polls_sent + self.polls_dropped;
        if total == 0 {
            return 0.0;
        }
        (self.polls_dropped as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot_rates() {
        let metrics = LinkMetrics::new();
        metrics.rx_frames.fetch_add(4, Ordering::Relaxed);
        metrics.rx_malformed.fetch_add(1, Ordering::Relaxed);
        metrics.polls_sent.fetch_add(3, Ordering::Relaxed);
        metrics.polls_dropped.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rx_frames, 4);
        assert_eq!(snapshot.malformed_rate(), 25.0);
        assert_eq!(snapshot.poll_drop_rate(), 25.0);
    }

    #[test]
    fn test_rates_with_no_traffic() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.malformed_rate(), 0.0);
        assert_eq!(snapshot.poll_drop_rate(), 0.0);
    }
}
