//! 出站写回与粘贴模拟
//!
//! # 设计思路
//!
//! - `deliver`：写入前把指纹记入去重状态，引擎在下一次所有权变化时能认出
//!   自己的写入；写入失败则回滚，去重状态不会指向从未写入的内容。
//! - `deliver_and_paste`：写回后按设置安排一次延迟粘贴。
//! - `replay_entry`：把历史条目还原为载荷后走 `deliver_and_paste`。
//! - `paste`：不改动剪贴板，只安排粘贴。
//!
//! # 实现思路
//!
//! 待执行的粘贴保存在单槽 [`PasteTimer`] 中：新的安排先取消旧任务再写入，
//! 两步在同一次加锁内完成，因此任何时刻至多只有一个待执行的粘贴。

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use super::backend::Selection;
use super::engine::ClipboardEngine;
use super::payload::{ClipboardPayload, Entry, FileOperation, ItemKind, GNOME_COPIED_FILES_MIME};
use super::save::{file_uri, uri_to_path};
use crate::error::AppError;
use crate::input::inject_paste;
use crate::settings::{defaults, keys, SettingsExt};

/// 单槽可取消的延时任务
#[derive(Debug, Default)]
pub struct PasteTimer {
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl PasteTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("粘贴定时器锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 取消旧任务并安排新任务
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.slot().take() {
            previous.abort();
        }
    }

    /// 是否有尚未执行完的任务
    pub fn is_pending(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// 编码为 `x-special/gnome-copied-files`：首行操作标记，其余为 `file://` URI
pub fn encode_gnome_copied_files(paths: &[String], operation: FileOperation) -> Result<String, AppError> {
    let mut lines = Vec::with_capacity(paths.len() + 1);
    lines.push(operation.as_marker().to_string());
    for path in paths {
        if path.starts_with("file://") {
            lines.push(path.clone());
            continue;
        }
        let local = uri_to_path(path)
            .ok_or_else(|| AppError::Clipboard(format!("不是绝对路径: {}", path)))?;
        lines.push(file_uri(&local)?);
    }
    Ok(lines.join("\n"))
}

impl ClipboardEngine {
    /// 把载荷写入系统剪贴板
    ///
    /// 写入失败时去重状态回滚到写入前，随后真实的复制不会被误判为重复。
    pub async fn deliver(&self, payload: &ClipboardPayload) -> Result<(), AppError> {
        // 先记录，所有权变化事件可能在写入返回前就被处理
        let recorded = self.tracker.record(payload);

        if let Err(e) = self.write_payload(payload).await {
            if let Some(recorded) = recorded {
                self.tracker.restore(recorded);
            }
            log::warn!("📤 写回剪贴板失败: {}", e);
            return Err(e);
        }
        log::debug!("📤 已写回剪贴板");
        Ok(())
    }

    async fn write_payload(&self, payload: &ClipboardPayload) -> Result<(), AppError> {
        match payload {
            ClipboardPayload::Text(text) => {
                self.backend.set_text(Selection::Clipboard, text).await?;
                if self.settings.bool_or(keys::SYNC_PRIMARY, defaults::SYNC_PRIMARY) {
                    if let Err(e) = self.backend.set_text(Selection::Primary, text).await {
                        log::warn!("同步 primary 选区失败: {}", e);
                    }
                }
            }
            ClipboardPayload::Image { mime, bytes, .. } => {
                self.backend.set_content(Selection::Clipboard, mime, bytes).await?;
            }
            ClipboardPayload::FileList { paths, operation } => {
                let encoded = encode_gnome_copied_files(paths, *operation)?;
                self.backend
                    .set_content(Selection::Clipboard, GNOME_COPIED_FILES_MIME, encoded.as_bytes())
                    .await?;
            }
        }
        Ok(())
    }

    /// 写回剪贴板，并在允许时安排一次延迟粘贴
    pub async fn deliver_and_paste(&self, payload: &ClipboardPayload) -> Result<(), AppError> {
        self.deliver(payload).await?;
        if self.settings.bool_or(keys::PASTE_ON_COPY, defaults::PASTE_ON_COPY) {
            self.paste();
        }
        Ok(())
    }

    /// 安排一次粘贴按键注入，替换尚未执行的上一次
    pub fn paste(&self) {
        if !self.is_alive() {
            return;
        }
        let injector = Arc::clone(&self.injector);
        let focus = Arc::clone(&self.focus);
        self.paste_timer.schedule(self.config.paste_delay, async move {
            let result =
                tokio::task::spawn_blocking(move || inject_paste(injector.as_ref(), focus.as_ref())).await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("⌨️ 粘贴按键注入失败: {}", e),
                Err(e) => log::warn!("⌨️ 粘贴任务失败: {}", e),
            }
        });
    }

    /// 把历史条目重新写回剪贴板
    ///
    /// 图片的 MIME 从文件内容推断，推断不出图片类型时什么也不做。
    /// `update-date-on-copy` 为真时，调用方持有的 `entry.datetime` 会被更新。
    pub async fn replay_entry(&self, entry: &mut Entry) -> Result<(), AppError> {
        let Some(payload) = self.payload_for(entry).await? else {
            return Ok(());
        };

        if self
            .settings
            .bool_or(keys::UPDATE_DATE_ON_COPY, defaults::UPDATE_DATE_ON_COPY)
        {
            let now = Utc::now();
            entry.datetime = now;
            let store = Arc::clone(&self.store);
            let id = entry.id;
            match tokio::task::spawn_blocking(move || store.touch(id, now)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("❌ 更新条目时间失败: {}", e),
                Err(e) => log::error!("❌ 历史存储任务失败: {}", e),
            }
        }

        self.deliver_and_paste(&payload).await
    }

    async fn payload_for(&self, entry: &Entry) -> Result<Option<ClipboardPayload>, AppError> {
        let payload = match entry.kind {
            ItemKind::Text | ItemKind::Code | ItemKind::Link | ItemKind::Character | ItemKind::Color => {
                ClipboardPayload::Text(entry.content.clone())
            }
            ItemKind::Image => {
                let Some(path) = uri_to_path(&entry.content) else {
                    log::debug!("图片条目 #{} 的路径无法解析: {}", entry.id, entry.content);
                    return Ok(None);
                };
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    log::error!("❌ 读取图片 {} 失败: {}", path.display(), e);
                    AppError::Io(e)
                })?;
                let Some(mime) = infer::get(&bytes)
                    .map(|kind| kind.mime_type())
                    .filter(|mime| mime.starts_with("image/"))
                else {
                    log::debug!("无法识别图片条目 #{} 的 MIME 类型，跳过写回", entry.id);
                    return Ok(None);
                };
                ClipboardPayload::image(mime, bytes)
            }
            ItemKind::File | ItemKind::Files => ClipboardPayload::FileList {
                paths: entry
                    .content
                    .split('\n')
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
                operation: FileOperation::Copy,
            },
        };
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn gnome_copied_files_have_marker_and_uris() {
        let encoded = encode_gnome_copied_files(
            &["/a/b c".to_string(), "file:///x/y".to_string()],
            FileOperation::Cut,
        )
        .expect("encode");
        assert_eq!(encoded, "cut\nfile:///a/b%20c\nfile:///x/y");
    }

    #[test]
    fn relative_paths_cannot_be_delivered() {
        assert!(encode_gnome_copied_files(&["a/b".to_string()], FileOperation::Copy).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_cancels_pending_task() {
        let timer = PasteTimer::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let runs = Arc::clone(&runs);
            timer.schedule(Duration::from_millis(250), async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(timer.is_pending());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_task() {
        let timer = PasteTimer::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        timer.schedule(Duration::from_millis(250), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
