//! 连接状态机
//!
//! ```text
//! Idle ──connect()──▶ Connecting ──ok──▶ Connected ──disconnect()──▶ Disconnecting ──▶ Idle
//!                         │                  │
//!                         └──fail──▶ Idle    └──remote close / read error──▶ Idle（隐式）
//! ```
//!
//! 接收线程因对端关闭或读错误退出时，状态会隐式回到 `Idle`，
//! 不会产生任何事件，调用者需要主动轮询 `state()` / `is_connected()`。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LinkState {
    /// 空闲（未连接）
    #[default]
    Idle = 0,
    /// 正在建立连接
    Connecting = 1,
    /// 已连接，后台线程运行中
    Connected = 2,
    /// 正在断开
    Disconnecting = 3,
}

impl LinkState {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Idle。
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Disconnecting,
            _ => Self::Idle,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否处于连接生命周期中（非 Idle）
    pub fn is_busy(self) -> bool {
        self != Self::Idle
    }

    /// 状态描述
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 连接状态（原子版本，用于线程间共享）
///
/// `connect()` 通过 `Idle → Connecting` 的 CAS 实现幂等保护：
/// 只有一个调用者能赢得 CAS，其余调用直接返回。
#[derive(Debug, Default)]
pub struct AtomicLinkState {
    inner: AtomicU8,
}

impl AtomicLinkState {
    /// 创建新的原子状态
    pub fn new(state: LinkState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 获取当前状态
    pub fn get(&self) -> LinkState {
        LinkState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 设置状态
    pub fn set(&self, state: LinkState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换（Compare-and-Swap）
    ///
    /// 如果当前值等于 `current`，则设置为 `new` 并返回 true，否则返回 false。
    pub fn transition(&self, current: LinkState, new: LinkState) -> bool {
        self.inner
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}
