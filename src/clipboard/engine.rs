//! 剪贴板引擎
//!
//! # 设计思路
//!
//! 每次所有权变化驱动一条独立的流水线：
//!
//! ```text
//! Idle → Acquiring → (重复: Idle) → Classifying → (None: Idle) → HandedToStore → Idle
//! ```
//!
//! 任何阶段失败都只记录日志并回到 Idle；去重状态只在 `should_ingest`
//! 这一处提交，且提交发生在第一个 `.await` 之前。
//!
//! # 实现思路
//!
//! - 引擎以 `Arc<ClipboardEngine>` 共享，事件循环只持有 `Weak`，不延长引擎寿命。
//! - 共享状态的 `Mutex` 只在同步代码里加锁，从不跨越 `.await`。
//! - 历史存储调用与焦点窗口查询放在 `spawn_blocking` 中。
//! - `shutdown()` 清除存活标志、取消待执行的粘贴并停止事件循环；
//!   仍在分类中的流水线在交给存储和发通知前都会检查存活标志。

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::acquire::acquire;
use super::backend::{ClipboardBackend, Selection};
use super::classify::{Classifier, CODE_SAMPLE_LIMIT, MIN_CODE_SCORE};
use super::code_detection::LanguageDetector;
use super::dedup::DedupTracker;
use super::delivery::PasteTimer;
use super::payload::{ClipboardPayload, Entry};
use crate::db::HistoryStore;
use crate::error::AppError;
use crate::input::{FocusQuery, KeyInjector};
use crate::settings::{defaults, keys, Settings, SettingsExt};

/// 引擎静态配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 图片内容寻址目录
    pub images_dir: PathBuf,
    /// 写回剪贴板到注入粘贴按键之间的延迟
    pub paste_delay: Duration,
    pub code_sample_limit: usize,
    pub min_code_score: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let images_dir = crate::storage::app_data_dir()
            .map(|dir| dir.join("images"))
            .unwrap_or_else(|_| std::env::temp_dir().join("clipboard-engine").join("images"));
        Self {
            images_dir,
            paste_delay: Duration::from_millis(250),
            code_sample_limit: CODE_SAMPLE_LIMIT,
            min_code_score: MIN_CODE_SCORE,
        }
    }
}

/// 条目保存成功后的通知接收方（通知、音效、界面刷新）
///
/// 所有方法默认空实现；引擎不观察返回值。
pub trait EntryObserver: Send + Sync {
    fn on_entry(&self, _entry: &Entry) {}
    fn on_text(&self, _text: &str) {}
    fn on_image(&self, _bytes: &[u8], _width: u32, _height: u32) {}
}

/// 不关心通知时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EntryObserver for NoopObserver {}

/// 引擎依赖的外部协作者
pub struct Collaborators {
    pub backend: Arc<dyn ClipboardBackend>,
    pub store: Arc<dyn HistoryStore>,
    pub settings: Arc<dyn Settings>,
    pub injector: Arc<dyn KeyInjector>,
    pub focus: Arc<dyn FocusQuery>,
    pub observer: Arc<dyn EntryObserver>,
    /// 未加载时跳过代码判定
    pub detector: Option<Arc<dyn LanguageDetector>>,
}

pub struct ClipboardEngine {
    pub(super) config: EngineConfig,
    pub(super) backend: Arc<dyn ClipboardBackend>,
    pub(super) store: Arc<dyn HistoryStore>,
    pub(super) settings: Arc<dyn Settings>,
    pub(super) injector: Arc<dyn KeyInjector>,
    pub(super) focus: Arc<dyn FocusQuery>,
    observer: Arc<dyn EntryObserver>,
    classifier: Classifier,
    pub(super) tracker: DedupTracker,
    pub(super) paste_timer: PasteTimer,
    alive: AtomicBool,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl ClipboardEngine {
    pub fn new(config: EngineConfig, parts: Collaborators) -> Arc<Self> {
        let classifier = Classifier::new(config.images_dir.clone(), parts.detector)
            .with_code_thresholds(config.code_sample_limit, config.min_code_score);
        Arc::new(Self {
            config,
            backend: parts.backend,
            store: parts.store,
            settings: parts.settings,
            injector: parts.injector,
            focus: parts.focus,
            observer: parts.observer,
            classifier,
            tracker: DedupTracker::new(),
            paste_timer: PasteTimer::new(),
            alive: AtomicBool::new(true),
            event_loop: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// 订阅所有权变化并启动事件循环
    ///
    /// 重复调用会替换旧的事件循环。
    pub fn start(self: &Arc<Self>) -> Result<(), AppError> {
        if !self.is_alive() {
            return Err(AppError::Clipboard("引擎已关闭".to_string()));
        }
        let mut subscription = self.backend.subscribe()?;
        let weak = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            while let Some(selection) = subscription.next().await {
                let Some(engine) = weak.upgrade() else {
                    break;
                };
                if !engine.is_alive() {
                    break;
                }
                if selection != Selection::Clipboard {
                    continue;
                }
                tokio::spawn(async move {
                    engine.handle_owner_change().await;
                });
            }
            log::debug!("📋 事件循环结束");
        });

        if let Some(previous) = self.event_loop_slot().replace(handle) {
            previous.abort();
        }
        log::info!("📋 剪贴板引擎已启动");
        Ok(())
    }

    /// 停止引擎：取消待执行的粘贴、解除订阅；分类中的流水线不再触碰共享状态
    pub fn shutdown(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        self.paste_timer.cancel();
        if let Some(handle) = self.event_loop_slot().take() {
            handle.abort();
        }
        log::info!("📋 剪贴板引擎已关闭");
    }

    fn event_loop_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.event_loop.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("事件循环句柄锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 处理一次剪贴板所有权变化（完整流水线）
    pub async fn handle_owner_change(&self) {
        if !self.is_alive() {
            return;
        }
        if self.settings.bool_or(keys::INCOGNITO, defaults::INCOGNITO) {
            log::debug!("🕶️ 隐身模式，忽略剪贴板变化");
            return;
        }
        if self.focused_window_excluded().await {
            return;
        }

        // Acquiring
        let Some(payload) = acquire(self.backend.as_ref()).await else {
            return;
        };
        if !self.tracker.should_ingest(&payload) {
            log::debug!("⏭️ 剪贴板内容未变化，跳过");
            return;
        }

        // Classifying
        let image_bytes = match &payload {
            ClipboardPayload::Image { bytes, .. } => Some(bytes.clone()),
            _ => None,
        };
        let max_characters = self
            .settings
            .int_or(keys::CHARACTER_MAX_CHARACTERS, defaults::CHARACTER_MAX_CHARACTERS)
            .max(0) as usize;
        let Some(classified) = self.classifier.classify(payload, max_characters).await else {
            return;
        };

        // HandedToStore
        if !self.is_alive() {
            log::debug!("引擎已关闭，丢弃分类结果");
            return;
        }
        let store = Arc::clone(&self.store);
        let entry = match tokio::task::spawn_blocking(move || store.insert(classified)).await {
            Ok(Ok(Some(entry))) => entry,
            Ok(Ok(None)) => {
                log::debug!("历史存储拒绝了该条目");
                return;
            }
            Ok(Err(e)) => {
                log::error!("❌ 保存历史条目失败: {}", e);
                return;
            }
            Err(e) => {
                log::error!("❌ 历史存储任务失败: {}", e);
                return;
            }
        };
        log::info!("📋 已记录 {} 条目 #{}", entry.kind, entry.id);

        if !self.is_alive() {
            return;
        }
        self.notify(&entry, image_bytes.as_deref());
    }

    async fn focused_window_excluded(&self) -> bool {
        let exclusions = self.settings.strv_or_empty(keys::WMCLASS_EXCLUSIONS);
        if exclusions.is_empty() {
            return false;
        }
        // 焦点查询需要连接显示服务器
        let focus = Arc::clone(&self.focus);
        let class = match tokio::task::spawn_blocking(move || focus.focused_wm_class()).await {
            Ok(Some(class)) => class,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("焦点查询任务失败: {}", e);
                return false;
            }
        };
        let excluded = exclusions
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(&class));
        if excluded {
            log::debug!("🚫 焦点窗口 {} 在排除列表中，忽略剪贴板变化", class);
        }
        excluded
    }

    fn notify(&self, entry: &Entry, image_bytes: Option<&[u8]>) {
        self.observer.on_entry(entry);
        if entry.kind.is_textual() {
            self.observer.on_text(&entry.content);
        }
        if let Some(bytes) = image_bytes {
            match image_dimensions(bytes) {
                Ok((width, height)) => self.observer.on_image(bytes, width, height),
                Err(e) => log::warn!("⚠️ 无法解析图片尺寸: {}", e),
            }
        }
    }
}

fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), AppError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|e| AppError::Image(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.paste_delay, Duration::from_millis(250));
        assert_eq!(config.code_sample_limit, 10_000);
        assert_eq!(config.min_code_score, 3.0);
        assert!(config.images_dir.ends_with("images"));
    }

    #[test]
    fn dimensions_are_read_from_png_header() {
        let image = image::RgbaImage::new(7, 5);
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, image::ImageFormat::Png)
            .expect("encode");
        assert_eq!(image_dimensions(png.get_ref()).expect("dimensions"), (7, 5));
        assert!(image_dimensions(b"not an image").is_err());
    }
}
