//! 剪贴板数据模型
//!
//! - [`ClipboardPayload`]：采集阶段产出的临时载荷，三选一
//! - [`ClassifiedEntry`]：分类结果，所有权交给历史存储
//! - [`Entry`]：历史存储返回的条目，可被写回剪贴板

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 敏感内容标记（密码管理器等），出现即放弃采集
pub const SENSITIVE_MIME_TYPES: &[&str] = &[
    "x-kde-passwordManagerHint",
    "ExcludeClipboardContentFromMonitorProcessing",
];

/// 图片 MIME 偏好顺序
pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jxl",
    "image/webp",
    "image/avif",
    "image/jpeg",
];

/// GNOME 文件管理器使用的文件列表格式：首行 `copy`/`cut`，其余为 URI
pub const GNOME_COPIED_FILES_MIME: &str = "x-special/gnome-copied-files";
pub const URI_LIST_MIME: &str = "text/uri-list";
pub const FILE_LIST_MIME_TYPES: &[&str] = &[GNOME_COPIED_FILES_MIME, URI_LIST_MIME];

pub const TEXT_MIME_TYPES: &[&str] = &[
    "text/plain;charset=utf-8",
    "UTF8_STRING",
    "text/plain",
    "STRING",
    "TEXT",
];

/// 文件操作标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Copy,
    Cut,
}

impl FileOperation {
    /// 识别文件列表首行的操作标记（忽略 ASCII 大小写）
    pub fn from_marker(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.eq_ignore_ascii_case("copy") {
            Some(Self::Copy)
        } else if line.eq_ignore_ascii_case("cut") {
            Some(Self::Cut)
        } else {
            None
        }
    }

    pub fn as_marker(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Cut => "cut",
        }
    }
}

/// 采集得到的剪贴板内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardPayload {
    Text(String),
    Image {
        mime: String,
        bytes: Vec<u8>,
        /// 采集时已计算；为空字符串表示调用方放弃去重
        fingerprint: String,
    },
    FileList {
        paths: Vec<String>,
        operation: FileOperation,
    },
}

impl ClipboardPayload {
    /// 构造图片载荷并立即计算指纹
    pub fn image(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        let fingerprint = super::fingerprint::digest_bytes(&bytes);
        Self::Image {
            mime: mime.into(),
            bytes,
            fingerprint,
        }
    }

    /// 去重用的内容类别
    pub fn content_kind(&self) -> ContentKind {
        match self {
            Self::Text(_) => ContentKind::Text,
            Self::Image { .. } => ContentKind::Image,
            Self::FileList { paths, .. } if paths.len() == 1 => ContentKind::File,
            Self::FileList { .. } => ContentKind::Files,
        }
    }
}

/// 去重状态中记录的内容类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Image,
    File,
    Files,
}

/// 条目语义类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Code,
    Link,
    Character,
    Color,
    Image,
    File,
    Files,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Link => "link",
            Self::Character => "character",
            Self::Color => "color",
            Self::Image => "image",
            Self::File => "file",
            Self::Files => "files",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value {
            "text" => Self::Text,
            "code" => Self::Code,
            "link" => Self::Link,
            "character" => Self::Character,
            "color" => Self::Color,
            "image" => Self::Image,
            "file" => Self::File,
            "files" => Self::Files,
            _ => return None,
        };
        Some(kind)
    }

    /// 写回剪贴板时按纯文本处理的类型
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Text | Self::Code | Self::Link | Self::Character | Self::Color
        )
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 条目附加信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryMetadata {
    /// 代码：检测到的语言 id 与展示名
    Code { language: String, name: String },
    /// 文件：操作标记
    Files { operation: FileOperation },
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntry {
    pub kind: ItemKind,
    /// 图片/文件为 URI 或路径，其余为文本本身
    pub content: String,
    pub metadata: Option<EntryMetadata>,
}

impl ClassifiedEntry {
    pub fn new(kind: ItemKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// 历史存储中的条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub kind: ItemKind,
    pub content: String,
    pub metadata: Option<EntryMetadata>,
    /// 采集时间
    pub datetime: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_marker_ignores_case_and_whitespace() {
        assert_eq!(FileOperation::from_marker("copy"), Some(FileOperation::Copy));
        assert_eq!(FileOperation::from_marker("Copy"), Some(FileOperation::Copy));
        assert_eq!(FileOperation::from_marker(" CUT "), Some(FileOperation::Cut));
        assert_eq!(FileOperation::from_marker("/a/b"), None);
    }

    #[test]
    fn file_list_kind_depends_on_path_count() {
        let single = ClipboardPayload::FileList {
            paths: vec!["/a".into()],
            operation: FileOperation::Copy,
        };
        let many = ClipboardPayload::FileList {
            paths: vec!["/a".into(), "/b".into()],
            operation: FileOperation::Cut,
        };
        assert_eq!(single.content_kind(), ContentKind::File);
        assert_eq!(many.content_kind(), ContentKind::Files);
    }

    #[test]
    fn item_kind_round_trips_through_str() {
        for kind in [
            ItemKind::Text,
            ItemKind::Code,
            ItemKind::Link,
            ItemKind::Character,
            ItemKind::Color,
            ItemKind::Image,
            ItemKind::File,
            ItemKind::Files,
        ] {
            assert_eq!(ItemKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ItemKind::parse("video"), None);
    }

    #[test]
    fn metadata_serializes_with_type_tag() {
        let meta = EntryMetadata::Files {
            operation: FileOperation::Cut,
        };
        let json = serde_json::to_string(&meta).expect("serialize");
        assert_eq!(json, r#"{"type":"files","operation":"cut"}"#);
    }
}
