//! 历史存储模块
//!
//! # 设计思路
//!
//! 引擎只通过 [`HistoryStore`] trait 交出分类结果，不关心存储细节。
//! 本模块提供基于 `rusqlite` 的默认实现 [`SqliteHistory`]，供 `clipd` 使用。
//!
//! # 实现思路
//!
//! - trait 方法是同步的：引擎在 `spawn_blocking` 中调用，不阻塞事件循环。
//! - 连接由 `Mutex<Connection>` 保护，锁中毒时沿用恢复数据。
//! - `insert` 返回 `Ok(None)` 表示存储方拒绝（如与最新条目完全重复）。

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::clipboard::{ClassifiedEntry, Entry};
use crate::error::AppError;

mod history;
mod schema;

/// 历史存储接口
pub trait HistoryStore: Send + Sync {
    /// 保存分类结果；`Ok(None)` 表示存储方拒绝
    fn insert(&self, entry: ClassifiedEntry) -> Result<Option<Entry>, AppError>;

    /// 更新条目的采集时间
    fn touch(&self, id: i64, datetime: DateTime<Utc>) -> Result<(), AppError>;
}

/// SQLite 历史存储
pub struct SqliteHistory {
    conn: Mutex<Connection>,
}

impl SqliteHistory {
    /// 打开（必要时创建）数据库文件并初始化 Schema
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Database(format!("创建数据库目录失败: {}", e)))?;
        }
        log::info!("数据库路径: {}", db_path.display());

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Database(format!("打开数据库失败: {}", e)))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("打开内存数据库失败: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, AppError> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("数据库锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 最近的条目，按采集时间倒序
    pub fn recent(&self, limit: usize) -> Result<Vec<Entry>, AppError> {
        history::recent(&self.conn(), limit)
    }

    pub fn get(&self, id: i64) -> Result<Option<Entry>, AppError> {
        history::get(&self.conn(), id)
    }
}

impl HistoryStore for SqliteHistory {
    fn insert(&self, entry: ClassifiedEntry) -> Result<Option<Entry>, AppError> {
        history::insert(&self.conn(), entry, Utc::now())
    }

    fn touch(&self, id: i64, datetime: DateTime<Utc>) -> Result<(), AppError> {
        history::touch(&self.conn(), id, datetime)
    }
}
