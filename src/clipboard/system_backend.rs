//! 系统剪贴板后端
//!
//! # 设计思路
//!
//! 采集依赖“剪贴板当前声明了哪些 MIME”：敏感标记、文件列表、各种图片格式
//! 都只能从目标列表里看出来。`clipboard-rs` 直接暴露 X11 的 TARGETS
//! （`available_formats`）以及按目标名读写原始字节（`get_buffer` / `set_buffer`），
//! 因此系统剪贴板选区完全交给它。
//!
//! `clipboard-rs` 不支持 primary 选区，Linux 上 primary 的文本读写继续由
//! `arboard` 的 `GetExtLinux` / `SetExtLinux` 完成；其他平台没有 primary 选区，
//! 读取为空，写入为空操作。
//!
//! # 实现思路
//!
//! - 两个上下文都长期持有在 `Arc<Mutex<_>>` 中（Linux 上所有实例释放后内容可能丢失）。
//! - 所有平台调用都经 `spawn_blocking` 执行，异步工作线程上只做加锁以外的零成本操作。
//! - 写入按 MIME 分流：纯文本目标走 `set_text`，其余（图片、文件列表）原样按目标名写入字节。
//! - 订阅由 `clipboard-master` 监听线程提供。

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use clipboard_rs::{Clipboard, ClipboardContext, ContentFormat};

use super::backend::{ClipboardBackend, Selection, Subscription};
use super::listener::start_monitoring;
use super::payload::TEXT_MIME_TYPES;
use crate::error::AppError;

#[cfg(target_os = "linux")]
const PRIMARY_TEXT_MIME: &str = "text/plain;charset=utf-8";

/// 写入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WritePlan {
    Text,
    Buffer,
}

fn write_plan(mime: &str) -> WritePlan {
    if TEXT_MIME_TYPES.contains(&mime) || mime.starts_with("text/plain") {
        WritePlan::Text
    } else {
        WritePlan::Buffer
    }
}

fn clipboard_err(e: impl std::fmt::Display) -> AppError {
    AppError::Clipboard(e.to_string())
}

pub struct SystemBackend {
    clipboard: Arc<Mutex<ClipboardContext>>,
    #[cfg(target_os = "linux")]
    primary: Arc<Mutex<arboard::Clipboard>>,
    event_min_interval_ms: u64,
}

impl SystemBackend {
    pub fn new(event_min_interval_ms: u64) -> Result<Self, AppError> {
        let clipboard = ClipboardContext::new().map_err(clipboard_err)?;
        Ok(Self {
            clipboard: Arc::new(Mutex::new(clipboard)),
            #[cfg(target_os = "linux")]
            primary: Arc::new(Mutex::new(arboard::Clipboard::new().map_err(clipboard_err)?)),
            event_min_interval_ms,
        })
    }

    async fn with_clipboard<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ClipboardContext) -> Result<T, AppError> + Send + 'static,
    {
        blocking(&self.clipboard, f).await
    }
}

/// 在阻塞线程池中访问剪贴板上下文
async fn blocking<C, T, F>(handle: &Arc<Mutex<C>>, f: F) -> Result<T, AppError>
where
    C: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut C) -> Result<T, AppError> + Send + 'static,
{
    let handle = Arc::clone(handle);
    tokio::task::spawn_blocking(move || f(&mut *lock(&handle)))
        .await
        .map_err(|e| AppError::Clipboard(format!("剪贴板任务失败: {}", e)))?
}

fn lock<C>(handle: &Mutex<C>) -> MutexGuard<'_, C> {
    match handle.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("剪贴板锁中毒，继续使用恢复数据");
            poisoned.into_inner()
        }
    }
}

#[cfg(target_os = "linux")]
impl SystemBackend {
    async fn primary_text(&self) -> Result<Option<String>, AppError> {
        use arboard::{GetExtLinux, LinuxClipboardKind};
        blocking(&self.primary, |clipboard| {
            match clipboard.get().clipboard(LinuxClipboardKind::Primary).text() {
                Ok(text) => Ok(Some(text)),
                Err(arboard::Error::ContentNotAvailable) => Ok(None),
                Err(e) => Err(clipboard_err(e)),
            }
        })
        .await
    }

    async fn set_primary_text(&self, text: String) -> Result<(), AppError> {
        use arboard::{LinuxClipboardKind, SetExtLinux};
        blocking(&self.primary, move |clipboard| {
            clipboard
                .set()
                .clipboard(LinuxClipboardKind::Primary)
                .text(text)
                .map_err(clipboard_err)
        })
        .await
    }

    async fn primary_mime_types(&self) -> Result<Vec<String>, AppError> {
        Ok(match self.primary_text().await? {
            Some(_) => vec![PRIMARY_TEXT_MIME.to_string()],
            None => Vec::new(),
        })
    }
}

#[cfg(not(target_os = "linux"))]
impl SystemBackend {
    async fn primary_text(&self) -> Result<Option<String>, AppError> {
        Ok(None)
    }

    async fn set_primary_text(&self, _text: String) -> Result<(), AppError> {
        log::debug!("当前平台没有 primary 选区，跳过写入");
        Ok(())
    }

    async fn primary_mime_types(&self) -> Result<Vec<String>, AppError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl ClipboardBackend for SystemBackend {
    async fn mime_types(&self, selection: Selection) -> Result<Vec<String>, AppError> {
        match selection {
            Selection::Clipboard => {
                self.with_clipboard(|ctx| ctx.available_formats().map_err(clipboard_err))
                    .await
            }
            Selection::Primary => self.primary_mime_types().await,
        }
    }

    async fn content(&self, selection: Selection, mime: &str) -> Result<Vec<u8>, AppError> {
        match selection {
            Selection::Clipboard => {
                let mime = mime.to_string();
                self.with_clipboard(move |ctx| ctx.get_buffer(&mime).map_err(clipboard_err))
                    .await
            }
            Selection::Primary if write_plan(mime) == WritePlan::Text => self
                .primary_text()
                .await?
                .map(String::into_bytes)
                .ok_or_else(|| AppError::Clipboard("primary 选区为空".to_string())),
            Selection::Primary => Err(AppError::Clipboard(format!(
                "primary 选区不支持 MIME 类型: {}",
                mime
            ))),
        }
    }

    async fn text(&self, selection: Selection) -> Result<Option<String>, AppError> {
        match selection {
            Selection::Clipboard => {
                self.with_clipboard(|ctx| {
                    if !ctx.has(ContentFormat::Text) {
                        return Ok(None);
                    }
                    ctx.get_text().map(Some).map_err(clipboard_err)
                })
                .await
            }
            Selection::Primary => self.primary_text().await,
        }
    }

    async fn set_content(&self, selection: Selection, mime: &str, bytes: &[u8]) -> Result<(), AppError> {
        if write_plan(mime) == WritePlan::Text {
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|e| AppError::Clipboard(format!("文本不是合法 UTF-8: {}", e)))?;
            return self.set_text(selection, &text).await;
        }
        if selection == Selection::Primary {
            return Err(AppError::Clipboard(format!(
                "primary 选区不支持写入 MIME 类型: {}",
                mime
            )));
        }
        let mime = mime.to_string();
        let bytes = bytes.to_vec();
        self.with_clipboard(move |ctx| ctx.set_buffer(&mime, bytes).map_err(clipboard_err))
            .await
    }

    async fn set_text(&self, selection: Selection, text: &str) -> Result<(), AppError> {
        let text = text.to_string();
        match selection {
            Selection::Clipboard => {
                self.with_clipboard(move |ctx| ctx.set_text(text).map_err(clipboard_err))
                    .await
            }
            Selection::Primary => self.set_primary_text(text).await,
        }
    }

    fn subscribe(&self) -> Result<Subscription, AppError> {
        let (events, stop) = start_monitoring(self.event_min_interval_ms);
        Ok(Subscription::new(events, move || {
            stop.store(true, Ordering::SeqCst);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_targets_are_written_as_text() {
        assert_eq!(write_plan("text/plain;charset=utf-8"), WritePlan::Text);
        assert_eq!(write_plan("UTF8_STRING"), WritePlan::Text);
        assert_eq!(write_plan("text/plain"), WritePlan::Text);
    }

    #[test]
    fn images_and_file_lists_are_written_as_raw_targets() {
        assert_eq!(write_plan("image/png"), WritePlan::Buffer);
        assert_eq!(write_plan("image/jpeg"), WritePlan::Buffer);
        assert_eq!(write_plan("x-special/gnome-copied-files"), WritePlan::Buffer);
        assert_eq!(write_plan("text/uri-list"), WritePlan::Buffer);
    }
}
