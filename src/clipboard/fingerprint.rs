//! 内容指纹
//!
//! 用 SHA-256 十六进制摘要识别“同一份内容”：
//! - 文本：UTF-8 字节
//! - 图片：原始字节（采集时已算好，随载荷携带）
//! - 文件列表：去掉 scheme 并百分号解码后的路径，按 `\n` 拼接；
//!   操作标记不参与计算，因此同一批文件的 Cut 与 Copy 指纹相同，
//!   且与“同样内容的纯文本”指纹相同。

use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};

use super::payload::ClipboardPayload;

/// 任意字节的摘要
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// 计算载荷指纹
///
/// 返回 `None` 表示无法确定内容身份（文件路径解码后不是合法 UTF-8），
/// 调用方应放弃后续处理。图片载荷可能返回空字符串，表示跳过去重。
pub fn fingerprint(payload: &ClipboardPayload) -> Option<String> {
    match payload {
        ClipboardPayload::Text(text) => Some(digest_bytes(text.as_bytes())),
        ClipboardPayload::Image { fingerprint, .. } => Some(fingerprint.clone()),
        ClipboardPayload::FileList { paths, .. } => {
            let normalized = paths
                .iter()
                .map(|path| normalize_path(path))
                .collect::<Option<Vec<_>>>()?;
            Some(digest_bytes(normalized.join("\n").as_bytes()))
        }
    }
}

/// 去掉 `scheme://` 前缀并做百分号解码
pub fn normalize_path(path: &str) -> Option<String> {
    let stripped = strip_scheme(path);
    percent_decode_str(stripped)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn strip_scheme(path: &str) -> &str {
    match path.split_once("://") {
        Some((scheme, rest))
            if !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            rest
        }
        _ => path,
    }
}
