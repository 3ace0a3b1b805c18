//! Schema 初始化子模块
//!
//! ## 职责
//! - 创建 `entries` 表与时间索引
//! - 设置 SQLite 运行参数（WAL）
//!
//! ## 错误语义
//! - DDL 失败统一映射为 `AppError::Database`

use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_VERSION: i64 = 1;

fn get_user_version(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), AppError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| AppError::Database(format!("写入数据库版本失败: {}", e)))
}

fn create_tables(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT,
            datetime INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_entries_datetime ON entries(datetime DESC, id DESC);",
    )
    .map_err(|e| AppError::Database(format!("创建基础表失败: {}", e)))
}

pub(super) fn initialize_schema(conn: &Connection) -> Result<(), AppError> {
    // 内存数据库不支持 WAL，忽略失败
    let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

    create_tables(conn)?;

    let version = get_user_version(conn)?;
    if version < SCHEMA_VERSION {
        log::info!("数据库 Schema 升级: {} -> {}", version, SCHEMA_VERSION);
        set_user_version(conn, SCHEMA_VERSION)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        initialize_schema(&conn).expect("first");
        initialize_schema(&conn).expect("second");
        assert_eq!(get_user_version(&conn).expect("version"), SCHEMA_VERSION);
    }
}
