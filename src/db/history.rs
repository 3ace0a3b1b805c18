use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::clipboard::{ClassifiedEntry, Entry, EntryMetadata, ItemKind};
use crate::error::AppError;

const SELECT_COLUMNS: &str = "SELECT id, kind, content, metadata, datetime FROM entries";

fn encode_metadata(metadata: Option<&EntryMetadata>) -> Result<Option<String>, AppError> {
    metadata
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| AppError::Database(format!("序列化元数据失败: {}", e)))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let id: i64 = row.get(0)?;
    let kind: String = row.get(1)?;
    let metadata: Option<String> = row.get(3)?;
    let millis: i64 = row.get(4)?;

    // 未知类型按文本处理，损坏的元数据丢弃
    let kind = ItemKind::parse(&kind).unwrap_or_else(|| {
        log::warn!("条目 {} 的类型 '{}' 无法识别，按文本处理", id, kind);
        ItemKind::Text
    });
    let metadata = metadata.and_then(|raw| match serde_json::from_str(&raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            log::warn!("条目 {} 的元数据解析失败: {}", id, e);
            None
        }
    });

    Ok(Entry {
        id,
        kind,
        content: row.get(2)?,
        metadata,
        datetime: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
    })
}

fn latest(conn: &Connection) -> Result<Option<Entry>, AppError> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} ORDER BY datetime DESC, id DESC LIMIT 1"),
        [],
        row_to_entry,
    )
    .optional()
    .map_err(|e| AppError::Database(format!("查询最新条目失败: {}", e)))
}

pub(super) fn insert(
    conn: &Connection,
    entry: ClassifiedEntry,
    now: DateTime<Utc>,
) -> Result<Option<Entry>, AppError> {
    if let Some(last) = latest(conn)? {
        if last.kind == entry.kind && last.content == entry.content && last.metadata == entry.metadata {
            log::debug!("⏭️ 与最新条目重复，跳过保存");
            return Ok(None);
        }
    }

    let metadata = encode_metadata(entry.metadata.as_ref())?;
    conn.execute(
        "INSERT INTO entries (kind, content, metadata, datetime) VALUES (?1, ?2, ?3, ?4)",
        params![entry.kind.as_str(), entry.content, metadata, now.timestamp_millis()],
    )
    .map_err(|e| AppError::Database(format!("保存条目失败: {}", e)))?;

    Ok(Some(Entry {
        id: conn.last_insert_rowid(),
        kind: entry.kind,
        content: entry.content,
        metadata: entry.metadata,
        datetime: now,
    }))
}

pub(super) fn touch(conn: &Connection, id: i64, datetime: DateTime<Utc>) -> Result<(), AppError> {
    let changed = conn
        .execute(
            "UPDATE entries SET datetime = ?1 WHERE id = ?2",
            params![datetime.timestamp_millis(), id],
        )
        .map_err(|e| AppError::Database(format!("更新条目时间失败: {}", e)))?;
    if changed == 0 {
        return Err(AppError::Database(format!("条目 {} 不存在", id)));
    }
    Ok(())
}

pub(super) fn recent(conn: &Connection, limit: usize) -> Result<Vec<Entry>, AppError> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLUMNS} ORDER BY datetime DESC, id DESC LIMIT ?1"))
        .map_err(|e| AppError::Database(format!("准备查询失败: {}", e)))?;
    let rows = stmt
        .query_map(params![limit as i64], row_to_entry)
        .map_err(|e| AppError::Database(format!("查询历史失败: {}", e)))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| AppError::Database(format!("读取历史失败: {}", e)))
}

pub(super) fn get(conn: &Connection, id: i64) -> Result<Option<Entry>, AppError> {
    conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], row_to_entry)
        .optional()
        .map_err(|e| AppError::Database(format!("查询条目失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::FileOperation;
    use crate::db::{HistoryStore, SqliteHistory};
    use chrono::Duration;

    fn store() -> SqliteHistory {
        SqliteHistory::open_in_memory().expect("open in-memory db")
    }

    #[test]
    fn insert_returns_entry_with_metadata() {
        let db = store();
        let classified = ClassifiedEntry::new(ItemKind::Files, "/a/b\n/a/c").with_metadata(
            EntryMetadata::Files {
                operation: FileOperation::Cut,
            },
        );
        let entry = db.insert(classified.clone()).expect("insert").expect("entry");
        assert_eq!(entry.kind, ItemKind::Files);

        let loaded = db.get(entry.id).expect("get").expect("exists");
        assert_eq!(loaded.content, classified.content);
        assert_eq!(loaded.metadata, classified.metadata);
    }

    #[test]
    fn exact_duplicate_of_latest_is_declined() {
        let db = store();
        let text = ClassifiedEntry::new(ItemKind::Text, "hello");
        assert!(db.insert(text.clone()).expect("first").is_some());
        assert!(db.insert(text.clone()).expect("second").is_none());

        assert!(db.insert(ClassifiedEntry::new(ItemKind::Text, "other")).expect("third").is_some());
        assert!(db.insert(text).expect("fourth").is_some());
    }

    #[test]
    fn touch_moves_entry_to_front() {
        let db = store();
        let conn = db.conn();
        let base = Utc::now();
        let first = insert(&conn, ClassifiedEntry::new(ItemKind::Text, "a"), base)
            .expect("a")
            .expect("entry");
        insert(&conn, ClassifiedEntry::new(ItemKind::Text, "b"), base + Duration::seconds(1))
            .expect("b");

        touch(&conn, first.id, base + Duration::seconds(5)).expect("touch");
        let entries = recent(&conn, 10).expect("recent");
        assert_eq!(entries[0].content, "a");
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn touch_missing_entry_fails() {
        let db = store();
        assert!(db.touch(42, Utc::now()).is_err());
    }

    #[test]
    fn recent_respects_limit() {
        let db = store();
        for i in 0..5 {
            db.insert(ClassifiedEntry::new(ItemKind::Text, format!("item {i}")))
                .expect("insert");
        }
        assert_eq!(db.recent(3).expect("recent").len(), 3);
    }
}
