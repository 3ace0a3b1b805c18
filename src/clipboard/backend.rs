//! 系统剪贴板后端抽象
//!
//! 引擎不直接依赖任何平台 API：枚举 MIME、按 MIME 读写、订阅所有权变化
//! 都通过 [`ClipboardBackend`] 完成。订阅返回显式的 [`Subscription`] 句柄，
//! 丢弃句柄即解除订阅。读写都是异步的，实现方负责把平台的阻塞调用移出运行时线程。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AppError;

/// 选区类型，仅 `Clipboard` 会触发采集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    Clipboard,
    Primary,
}

#[async_trait]
pub trait ClipboardBackend: Send + Sync {
    /// 当前声明的 MIME 类型（X11 的 TARGETS）
    async fn mime_types(&self, selection: Selection) -> Result<Vec<String>, AppError>;

    /// 读取指定 MIME 的原始字节
    async fn content(&self, selection: Selection, mime: &str) -> Result<Vec<u8>, AppError>;

    /// 读取文本
    async fn text(&self, selection: Selection) -> Result<Option<String>, AppError>;

    /// 以指定 MIME 写入字节
    async fn set_content(&self, selection: Selection, mime: &str, bytes: &[u8]) -> Result<(), AppError>;

    /// 写入文本
    async fn set_text(&self, selection: Selection, text: &str) -> Result<(), AppError>;

    /// 订阅所有权变化
    fn subscribe(&self) -> Result<Subscription, AppError>;
}

/// 所有权变化订阅
///
/// 持有事件接收端与一个解除订阅回调；`Drop` 时回调被执行且只执行一次。
pub struct Subscription {
    events: mpsc::UnboundedReceiver<Selection>,
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        events: mpsc::UnboundedReceiver<Selection>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            detach: Some(Box::new(detach)),
        }
    }

    /// 等待下一次所有权变化；后端关闭后返回 `None`
    pub async fn next(&mut self) -> Option<Selection> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn subscription_yields_events_and_detaches_once() {
        let (tx, rx) = mpsc::unbounded_channel();
        let detached = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&detached);
        let mut sub = Subscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tx.send(Selection::Primary).expect("send");
        tx.send(Selection::Clipboard).expect("send");
        assert_eq!(sub.next().await, Some(Selection::Primary));
        assert_eq!(sub.next().await, Some(Selection::Clipboard));

        drop(sub);
        assert_eq!(detached.load(Ordering::SeqCst), 1);
    }
}
