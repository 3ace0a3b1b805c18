//! 内容采集
//!
//! 所有权变化后按固定优先级协商 MIME：敏感标记 → 图片 → 文件列表 → 文本。
//! 一旦某一类 MIME 存在，就只尝试这一类，后续类别不再尝试。
//! 读取失败、内容为空、敏感内容都静默返回 `None`（高频且属预期情况，不记日志）。

use super::backend::{ClipboardBackend, Selection};
use super::payload::{
    ClipboardPayload, FileOperation, FILE_LIST_MIME_TYPES, IMAGE_MIME_TYPES,
    SENSITIVE_MIME_TYPES, TEXT_MIME_TYPES,
};

/// 从剪贴板采集一份带类型的载荷
pub async fn acquire(backend: &dyn ClipboardBackend) -> Option<ClipboardPayload> {
    let selection = Selection::Clipboard;
    let advertised = backend.mime_types(selection).await.ok()?;
    let has = |mime: &&str| advertised.iter().any(|m| m == mime);

    if SENSITIVE_MIME_TYPES.iter().any(|m| has(m)) {
        return None;
    }

    if let Some(mime) = IMAGE_MIME_TYPES.iter().find(|m| has(m)) {
        let bytes = backend.content(selection, mime).await.ok()?;
        if bytes.is_empty() {
            return None;
        }
        return Some(ClipboardPayload::image(*mime, bytes));
    }

    if let Some(mime) = FILE_LIST_MIME_TYPES.iter().find(|m| has(m)) {
        let bytes = backend.content(selection, mime).await.ok()?;
        let raw = String::from_utf8(bytes).ok()?;
        return parse_file_list(&raw);
    }

    if TEXT_MIME_TYPES.iter().any(|m| has(m)) {
        let text = backend.text(selection).await.ok()??;
        if text.trim().is_empty() {
            return None;
        }
        return Some(ClipboardPayload::Text(text));
    }

    None
}

/// 解析文件列表文本
///
/// 首行若为 `copy` / `cut` 则作为操作标记，否则默认 Copy 且所有行都是路径。
pub fn parse_file_list(raw: &str) -> Option<ClipboardPayload> {
    let mut lines = raw
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .peekable();

    let operation = match lines.peek().and_then(|first| FileOperation::from_marker(first)) {
        Some(operation) => {
            lines.next();
            operation
        }
        None => FileOperation::Copy,
    };

    let paths: Vec<String> = lines.map(str::to_string).collect();
    if paths.is_empty() {
        return None;
    }
    Some(ClipboardPayload::FileList { paths, operation })
}
