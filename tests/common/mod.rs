//! 集成测试共用的内存替身
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;

use clipboard_engine::clipboard::{
    ClassifiedEntry, ClipboardBackend, ClipboardEngine, Collaborators, Detection, EngineConfig,
    Entry, EntryObserver, LanguageDetector, PatternDetector, Selection, Subscription,
};
use clipboard_engine::db::HistoryStore;
use clipboard_engine::error::AppError;
use clipboard_engine::input::{FocusQuery, KeyAction, KeyInjector, KeyStep, PasteKey};
use clipboard_engine::settings::JsonSettings;

pub const TEXT_MIME: &str = "text/plain;charset=utf-8";

#[derive(Default)]
struct Selected {
    mimes: Vec<String>,
    content: HashMap<String, Vec<u8>>,
    text: Option<String>,
}

/// 内存剪贴板：写入会替换当前内容，与真实剪贴板一致
///
/// 每次读取都先让出一次执行权，模拟等待剪贴板所有者应答。
#[derive(Default)]
pub struct FakeBackend {
    clipboard: Mutex<Selected>,
    primary: Mutex<Option<String>>,
    writes: Mutex<Vec<(Selection, String, Vec<u8>)>>,
    sender: Mutex<Option<mpsc::UnboundedSender<Selection>>>,
    detached: Arc<AtomicBool>,
    /// 置位后所有写入都失败
    pub reject_writes: AtomicBool,
}

impl FakeBackend {
    pub fn offer_text(&self, text: &str) {
        let mut clipboard = self.clipboard.lock().unwrap();
        *clipboard = Selected {
            mimes: vec![TEXT_MIME.to_string(), "UTF8_STRING".to_string()],
            content: HashMap::new(),
            text: Some(text.to_string()),
        };
    }

    /// 声明一组 MIME，并为每个 MIME 提供同样的字节
    pub fn offer(&self, mimes: &[&str], bytes: &[u8]) {
        let mut clipboard = self.clipboard.lock().unwrap();
        *clipboard = Selected {
            mimes: mimes.iter().map(|m| m.to_string()).collect(),
            content: mimes.iter().map(|m| (m.to_string(), bytes.to_vec())).collect(),
            text: String::from_utf8(bytes.to_vec()).ok(),
        };
    }

    pub fn emit(&self, selection: Selection) -> bool {
        match self.sender.lock().unwrap().as_ref() {
            Some(tx) => tx.send(selection).is_ok(),
            None => false,
        }
    }

    pub fn writes(&self) -> Vec<(Selection, String, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn clipboard_text(&self) -> Option<String> {
        self.clipboard.lock().unwrap().text.clone()
    }

    pub fn primary_text(&self) -> Option<String> {
        self.primary.lock().unwrap().clone()
    }

    pub fn detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

impl FakeBackend {
    fn check_writable(&self) -> Result<(), AppError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(AppError::Clipboard("剪贴板拒绝写入".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClipboardBackend for FakeBackend {
    async fn mime_types(&self, selection: Selection) -> Result<Vec<String>, AppError> {
        tokio::task::yield_now().await;
        Ok(match selection {
            Selection::Clipboard => self.clipboard.lock().unwrap().mimes.clone(),
            Selection::Primary => Vec::new(),
        })
    }

    async fn content(&self, _selection: Selection, mime: &str) -> Result<Vec<u8>, AppError> {
        tokio::task::yield_now().await;
        self.clipboard
            .lock()
            .unwrap()
            .content
            .get(mime)
            .cloned()
            .ok_or_else(|| AppError::Clipboard(format!("no {mime}")))
    }

    async fn text(&self, _selection: Selection) -> Result<Option<String>, AppError> {
        tokio::task::yield_now().await;
        Ok(self.clipboard.lock().unwrap().text.clone())
    }

    async fn set_content(&self, selection: Selection, mime: &str, bytes: &[u8]) -> Result<(), AppError> {
        self.check_writable()?;
        self.writes
            .lock()
            .unwrap()
            .push((selection, mime.to_string(), bytes.to_vec()));
        if selection == Selection::Clipboard {
            self.offer(&[mime], bytes);
        }
        Ok(())
    }

    async fn set_text(&self, selection: Selection, text: &str) -> Result<(), AppError> {
        self.check_writable()?;
        self.writes
            .lock()
            .unwrap()
            .push((selection, TEXT_MIME.to_string(), text.as_bytes().to_vec()));
        match selection {
            Selection::Clipboard => self.offer_text(text),
            Selection::Primary => *self.primary.lock().unwrap() = Some(text.to_string()),
        }
        Ok(())
    }

    fn subscribe(&self) -> Result<Subscription, AppError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        let detached = Arc::clone(&self.detached);
        Ok(Subscription::new(rx, move || {
            detached.store(true, Ordering::SeqCst);
        }))
    }
}

/// 记录所有写入的历史存储
#[derive(Default)]
pub struct RecordingStore {
    entries: Mutex<Vec<Entry>>,
    touched: Mutex<Vec<(i64, DateTime<Utc>)>>,
    next_id: AtomicI64,
    pub veto: AtomicBool,
    /// 每次成功插入后调用
    pub after_insert: Hook,
}

impl RecordingStore {
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn touched(&self) -> Vec<(i64, DateTime<Utc>)> {
        self.touched.lock().unwrap().clone()
    }
}

impl HistoryStore for RecordingStore {
    fn insert(&self, entry: ClassifiedEntry) -> Result<Option<Entry>, AppError> {
        if self.veto.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let entry = Entry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            kind: entry.kind,
            content: entry.content,
            metadata: entry.metadata,
            datetime: Utc::now(),
        };
        self.entries.lock().unwrap().push(entry.clone());
        self.after_insert.fire();
        Ok(Some(entry))
    }

    fn touch(&self, id: i64, datetime: DateTime<Utc>) -> Result<(), AppError> {
        self.touched.lock().unwrap().push((id, datetime));
        Ok(())
    }
}

/// 可在测试中途挂上的回调
#[derive(Default)]
pub struct Hook(Mutex<Option<Box<dyn Fn() + Send + Sync>>>);

impl Hook {
    pub fn set(&self, f: impl Fn() + Send + Sync + 'static) {
        *self.0.lock().unwrap() = Some(Box::new(f));
    }

    fn fire(&self) {
        if let Some(f) = self.0.lock().unwrap().as_ref() {
            f();
        }
    }
}

/// 内置检测器，检测前触发回调
#[derive(Default)]
pub struct HookedDetector {
    inner: PatternDetector,
    pub before_detect: Hook,
}

impl LanguageDetector for HookedDetector {
    fn detect(&self, sample: &str) -> Option<Detection> {
        self.before_detect.fire();
        self.inner.detect(sample)
    }
}

#[derive(Default)]
pub struct RecordingInjector {
    steps: Mutex<Vec<KeyStep>>,
}

impl RecordingInjector {
    pub fn steps(&self) -> Vec<KeyStep> {
        self.steps.lock().unwrap().clone()
    }
}

impl KeyInjector for RecordingInjector {
    fn press(&self, key: PasteKey) -> Result<(), AppError> {
        self.steps.lock().unwrap().push(KeyStep {
            key,
            action: KeyAction::Press,
        });
        Ok(())
    }

    fn release(&self, key: PasteKey) -> Result<(), AppError> {
        self.steps.lock().unwrap().push(KeyStep {
            key,
            action: KeyAction::Release,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub entries: Mutex<Vec<Entry>>,
    pub texts: Mutex<Vec<String>>,
    pub images: Mutex<Vec<(u32, u32)>>,
}

impl EntryObserver for RecordingObserver {
    fn on_entry(&self, entry: &Entry) {
        self.entries.lock().unwrap().push(entry.clone());
    }

    fn on_text(&self, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }

    fn on_image(&self, _bytes: &[u8], width: u32, height: u32) {
        self.images.lock().unwrap().push((width, height));
    }
}

pub struct FixedFocus(pub Option<String>);

impl FocusQuery for FixedFocus {
    fn focused_wm_class(&self) -> Option<String> {
        self.0.clone()
    }
}

pub struct Harness {
    pub engine: Arc<ClipboardEngine>,
    pub backend: Arc<FakeBackend>,
    pub store: Arc<RecordingStore>,
    pub injector: Arc<RecordingInjector>,
    pub observer: Arc<RecordingObserver>,
    pub detector: Arc<HookedDetector>,
    pub images: tempfile::TempDir,
}

impl Harness {
    pub fn new(settings: Value) -> Self {
        Self::with_focus(settings, None)
    }

    pub fn with_focus(settings: Value, wm_class: Option<&str>) -> Self {
        let images = tempfile::tempdir().expect("tempdir");
        let backend = Arc::new(FakeBackend::default());
        let store = Arc::new(RecordingStore::default());
        let injector = Arc::new(RecordingInjector::default());
        let observer = Arc::new(RecordingObserver::default());
        let detector = Arc::new(HookedDetector::default());
        let language_detector: Arc<dyn LanguageDetector> = detector.clone();

        let config = EngineConfig {
            images_dir: images.path().join("images"),
            ..EngineConfig::default()
        };
        let engine = ClipboardEngine::new(
            config,
            Collaborators {
                backend: backend.clone(),
                store: store.clone(),
                settings: Arc::new(JsonSettings::in_memory(settings)),
                injector: injector.clone(),
                focus: Arc::new(FixedFocus(wm_class.map(str::to_string))),
                observer: observer.clone(),
                detector: Some(language_detector),
            },
        );

        Self {
            engine,
            backend,
            store,
            injector,
            observer,
            detector,
            images,
        }
    }

    pub fn images_on_disk(&self) -> usize {
        std::fs::read_dir(self.images.path().join("images"))
            .map(|dir| dir.count())
            .unwrap_or(0)
    }
}

/// 每 10ms 轮询一次，最多约 2 秒
pub async fn wait_until(cond: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// 3x2 的 PNG
pub fn tiny_png() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}
