//! 字节流切帧
//!
//! TCP 是字节流，一次 `read` 可能包含多帧，也可能在帧中间截断。
//! `LineFramer` 按 `\n` 切分，保留未结束的尾部等待下一次读取。

use crate::constants::{FIELD_SEPARATOR, FRAME_SEPARATOR};

/// 单帧最大长度（字节）
///
/// 超过此长度仍未出现 `\n` 时丢弃缓存，直到下一个 `\n`。
pub const MAX_FRAME_LEN: usize = 4096;

/// 行切帧器
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
    /// 超长帧被截断后，丢弃直到下一个 `\n`
    discarding: bool,
    overflows: u64,
}

impl LineFramer {
    /// 创建切帧器
    pub fn new() -> Self {
        Self::default()
    }

    /// 输入一段字节，返回其中所有完整帧
    ///
    /// - 帧末尾的 `\r` 会被去掉
    /// - 空帧被丢弃
    /// - 非 UTF-8 字节按 lossy 方式替换
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();
        let separator = FRAME_SEPARATOR as u8;

        for chunk in bytes.split_inclusive(|b| *b == separator) {
            let complete = chunk.last() == Some(&separator);
            let body = if complete { &chunk[..chunk.len() - 1] } else { chunk };

            if self.discarding {
                self.discarding = !complete;
                continue;
            }

            if self.pending.len() + body.len() > MAX_FRAME_LEN {
                self.pending.clear();
                self.overflows += 1;
                self.discarding = !complete;
                continue;
            }
            self.pending.extend_from_slice(body);

            if complete {
                let line = String::from_utf8_lossy(&self.pending);
                let line = line.trim_end_matches('\r');
                if !line.trim().is_empty() {
                    frames.push(line.to_string());
                }
                self.pending.clear();
            }
        }

        frames
    }

    /// 是否有未结束的尾部数据
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 因超长被丢弃的次数
    pub fn overflow_count(&self) -> u64 {
        self.overflows
    }

    /// 清空缓存（新连接时调用）
    pub fn reset(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }
}

/// 把一帧按 `#` 拆成字段
pub fn split_fields(frame: &str) -> Vec<&str> {
    frame.split(FIELD_SEPARATOR).collect()
}
