//! # clipd — 剪贴板引擎守护进程
//!
//! 负责组装各协作者并启动引擎，收到 Ctrl-C 后关闭。
//! 业务逻辑分布在库的各子模块中，详见 `lib.rs` 架构文档。

use std::sync::Arc;

use clipboard_engine::clipboard::{
    ClipboardEngine, Collaborators, EngineConfig, Entry, EntryObserver, LanguageDetector,
    PatternDetector, SystemBackend,
};
use clipboard_engine::db::SqliteHistory;
use clipboard_engine::error::AppError;
use clipboard_engine::input::{EnigoInjector, FocusQuery};
use clipboard_engine::settings::{defaults, keys, JsonSettings, Settings};
use clipboard_engine::storage;

/// 以日志代替桌面通知
struct LogObserver;

impl EntryObserver for LogObserver {
    fn on_entry(&self, entry: &Entry) {
        log::info!("🔔 新条目 #{} ({})", entry.id, entry.kind);
    }

    fn on_image(&self, _bytes: &[u8], width: u32, height: u32) {
        log::info!("🔔 新图片 {}x{}", width, height);
    }
}

#[cfg(target_os = "linux")]
fn focus_query() -> Arc<dyn FocusQuery> {
    Arc::new(clipboard_engine::input::X11Focus)
}

#[cfg(not(target_os = "linux"))]
fn focus_query() -> Arc<dyn FocusQuery> {
    Arc::new(clipboard_engine::input::NoFocus)
}

async fn run() -> Result<(), AppError> {
    let settings = Arc::new(JsonSettings::load(JsonSettings::default_path()?)?);
    log::info!("设置文件: {}", settings.path().display());

    let images_dir = storage::get_images_dir(settings.string(keys::IMAGES_DIR))?;
    let info = storage::images_dir_info(&images_dir);
    log::info!(
        "图片目录: {} ({} 个文件, {} bytes)",
        info.path,
        info.file_count,
        info.total_size
    );

    let store = Arc::new(SqliteHistory::open(&storage::app_data_dir()?.join("history.db"))?);
    let min_interval_ms = settings
        .int(keys::EVENT_MIN_INTERVAL_MS)
        .unwrap_or(defaults::EVENT_MIN_INTERVAL_MS)
        .max(0) as u64;
    let backend = Arc::new(SystemBackend::new(min_interval_ms)?);
    let detector: Arc<dyn LanguageDetector> = Arc::new(PatternDetector::new());

    let config = EngineConfig {
        images_dir,
        ..EngineConfig::default()
    };
    let engine = ClipboardEngine::new(
        config,
        Collaborators {
            backend,
            store,
            settings,
            injector: Arc::new(EnigoInjector::new()),
            focus: focus_query(),
            observer: Arc::new(LogObserver),
            detector: Some(detector),
        },
    );
    engine.start()?;

    tokio::signal::ctrl_c().await?;
    log::info!("收到退出信号");
    engine.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        log::error!("clipd 异常退出: {err}");
        std::process::exit(1);
    }
}
