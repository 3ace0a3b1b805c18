//! 应用设置模块
//!
//! # 设计思路
//!
//! 引擎只通过 [`Settings`] trait 读取设置，并且在使用的那一刻读取（不缓存），
//! 这样设置变更会在下一次采集/粘贴时自然生效。缺失或类型不符的值一律回退到
//! [`defaults`] 中记录的默认值。
//!
//! # 实现思路
//!
//! - 键名集中在 [`keys`]，与外部设置存储保持一致。
//! - [`JsonSettings`] 是参考实现：`settings.json` 保存在应用数据目录，
//!   内存中以 `RwLock<serde_json::Value>` 持有，`apply` 写盘后整体替换。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;

use crate::error::AppError;

/// 设置键名
pub mod keys {
    pub const SYNC_PRIMARY: &str = "sync-primary";
    pub const PASTE_ON_COPY: &str = "paste-on-copy";
    pub const UPDATE_DATE_ON_COPY: &str = "update-date-on-copy";
    pub const INCOGNITO: &str = "incognito";
    pub const WMCLASS_EXCLUSIONS: &str = "wmclass-exclusions";
    pub const CHARACTER_MAX_CHARACTERS: &str = "character-item.max-characters";
    pub const IMAGES_DIR: &str = "images-dir";
    pub const EVENT_MIN_INTERVAL_MS: &str = "clipboard-event-min-interval-ms";
}

/// 各键的默认值
pub mod defaults {
    pub const SYNC_PRIMARY: bool = false;
    pub const PASTE_ON_COPY: bool = true;
    pub const UPDATE_DATE_ON_COPY: bool = true;
    pub const INCOGNITO: bool = false;
    pub const CHARACTER_MAX_CHARACTERS: i64 = 1;
    pub const EVENT_MIN_INTERVAL_MS: i64 = 80;
}

/// 只读设置查询接口
///
/// 返回 `None` 表示键缺失或类型不符，由调用方决定默认值。
pub trait Settings: Send + Sync {
    fn bool(&self, key: &str) -> Option<bool>;
    fn int(&self, key: &str) -> Option<i64>;
    fn string(&self, key: &str) -> Option<String>;
    fn strv(&self, key: &str) -> Option<Vec<String>>;
}

/// 带默认值的便捷读取，供引擎内部使用
pub(crate) trait SettingsExt: Settings {
    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.bool(key).unwrap_or(default)
    }

    fn int_or(&self, key: &str, default: i64) -> i64 {
        self.int(key).unwrap_or(default)
    }

    fn strv_or_empty(&self, key: &str) -> Vec<String> {
        self.strv(key).unwrap_or_default()
    }
}

impl<T: Settings + ?Sized> SettingsExt for T {}

fn lookup_bool(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

fn lookup_int(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

fn lookup_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn lookup_strv(value: &Value, key: &str) -> Option<Vec<String>> {
    let items = value.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

/// 基于 JSON 文件的设置存储
pub struct JsonSettings {
    path: PathBuf,
    value: RwLock<Value>,
}

impl JsonSettings {
    /// 从文件加载设置；文件不存在时以空对象开始
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let value = read_settings_file(&path)?;
        Ok(Self {
            path,
            value: RwLock::new(value),
        })
    }

    /// 不落盘的内存设置，主要用于测试与嵌入场景
    pub fn in_memory(value: Value) -> Self {
        Self {
            path: PathBuf::new(),
            value: RwLock::new(value),
        }
    }

    /// 默认位置：`<data_dir>/clipboard-engine/settings.json`
    pub fn default_path() -> Result<PathBuf, AppError> {
        Ok(crate::storage::app_data_dir()?.join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 重新从磁盘读取
    pub fn reload(&self) -> Result<(), AppError> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let value = read_settings_file(&self.path)?;
        self.replace(value);
        Ok(())
    }

    /// 写入新设置并立即生效
    pub fn apply(&self, settings: Value) -> Result<(), AppError> {
        if !self.path.as_os_str().is_empty() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(&settings)
                .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
            fs::write(&self.path, content)?;
        }
        self.replace(settings);
        Ok(())
    }

    fn replace(&self, settings: Value) {
        match self.value.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => {
                log::warn!("设置锁中毒，继续使用恢复数据");
                *poisoned.into_inner() = settings;
            }
        }
    }

    fn with_value<T>(&self, op: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        match self.value.read() {
            Ok(guard) => op(&guard),
            Err(poisoned) => op(&poisoned.into_inner()),
        }
    }
}

fn read_settings_file(path: &Path) -> Result<Value, AppError> {
    if !path.exists() {
        return Ok(Value::Object(Default::default()));
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str::<Value>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))
}

impl Settings for JsonSettings {
    fn bool(&self, key: &str) -> Option<bool> {
        self.with_value(|v| lookup_bool(v, key))
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.with_value(|v| lookup_int(v, key))
    }

    fn string(&self, key: &str) -> Option<String> {
        self.with_value(|v| lookup_string(v, key))
    }

    fn strv(&self, key: &str) -> Option<Vec<String>> {
        self.with_value(|v| lookup_strv(v, key))
    }
}
