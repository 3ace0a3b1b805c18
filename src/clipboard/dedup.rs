//! 去重状态跟踪
//!
//! 单槽记录“引擎认为系统剪贴板当前持有的内容”(类别, 指纹)，
//! 入站采集与出站写回都会覆盖它，进程生命周期内从不显式重置。
//!
//! 判断与提交在同一次加锁内完成，且发生在任何 `.await` 之前，
//! 这样分类期间到达的第二个所有权变化事件看到的一定是新状态。

use std::sync::Mutex;

use super::fingerprint::fingerprint;
use super::payload::{ClipboardPayload, ContentKind};

#[derive(Debug, Clone, PartialEq, Eq)]
struct LastSeen {
    kind: ContentKind,
    fingerprint: String,
}

/// 一次 `record` 前后的状态
#[derive(Debug)]
pub struct Recorded {
    previous: Option<LastSeen>,
    current: LastSeen,
}

#[derive(Debug, Default)]
pub struct DedupTracker {
    last: Mutex<Option<LastSeen>>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否应当采集该载荷；返回 `true` 时状态已被覆盖
    pub fn should_ingest(&self, payload: &ClipboardPayload) -> bool {
        let Some(fingerprint) = fingerprint(payload) else {
            return false;
        };
        if fingerprint.is_empty() {
            return true;
        }
        let kind = payload.content_kind();

        let mut last = self.lock();
        if let Some(prev) = last.as_ref() {
            if prev.fingerprint == fingerprint {
                if prev.kind == kind {
                    return false;
                }
                // 文件的剪贴板所有者消失后，后端会把同一份内容改报为纯文本
                if prev.kind == ContentKind::File && kind == ContentKind::Text {
                    return false;
                }
            }
        }
        *last = Some(LastSeen { kind, fingerprint });
        true
    }

    /// 出站写回前记录指纹，防止引擎重新采集自己写入的内容
    ///
    /// 返回覆盖前的状态，写入失败时交给 [`restore`](Self::restore) 回滚。
    pub fn record(&self, payload: &ClipboardPayload) -> Option<Recorded> {
        let fingerprint = fingerprint(payload)?;
        if fingerprint.is_empty() {
            return None;
        }
        let current = LastSeen {
            kind: payload.content_kind(),
            fingerprint,
        };
        let previous = self.lock().replace(current.clone());
        Some(Recorded { previous, current })
    }

    /// 回滚一次 `record`；期间状态已被其他事件覆盖时保持不变
    pub fn restore(&self, recorded: Recorded) {
        let mut last = self.lock();
        if last.as_ref() == Some(&recorded.current) {
            *last = recorded.previous;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<LastSeen>> {
        match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("去重状态锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }
}
