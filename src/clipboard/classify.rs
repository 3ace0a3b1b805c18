//! 内容分类器
//!
//! # 设计思路
//!
//! 只有文本载荷需要多阶段判定，按顺序首个命中即返回：
//! 链接 → 字符 → 颜色 → 代码 → 文本。
//! 图片与文件列表几乎直接映射：图片先按内容寻址落盘，再以文件 URI 作为内容；
//! 文件列表按路径数量分为 `File` / `Files`，并始终记录操作标记。
//!
//! # 实现思路
//!
//! - 字符判定按扩展字素簇计数（`unicode-segmentation`），多码点 emoji 记为 1。
//! - 代码判定的相关度按样本长度归一化：`relevance / max(1, len / 100)`，
//!   避免长文本因命中次数多而被误判。
//! - 检测器可选：未安装时跳过代码判定。

use std::path::PathBuf;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;
use url::Url;

use super::code_detection::LanguageDetector;
use super::color::is_color;
use super::payload::{ClassifiedEntry, ClipboardPayload, EntryMetadata, ItemKind};
use super::save::save_image_bytes;

/// 代码检测最多取样的字符数
pub const CODE_SAMPLE_LIMIT: usize = 10_000;
/// 判定为代码所需的最低归一化得分
pub const MIN_CODE_SCORE: f64 = 3.0;

pub struct Classifier {
    detector: Option<Arc<dyn LanguageDetector>>,
    images_dir: PathBuf,
    code_sample_limit: usize,
    min_code_score: f64,
}

impl Classifier {
    pub fn new(images_dir: impl Into<PathBuf>, detector: Option<Arc<dyn LanguageDetector>>) -> Self {
        Self {
            detector,
            images_dir: images_dir.into(),
            code_sample_limit: CODE_SAMPLE_LIMIT,
            min_code_score: MIN_CODE_SCORE,
        }
    }

    pub fn with_code_thresholds(mut self, sample_limit: usize, min_score: f64) -> Self {
        self.code_sample_limit = sample_limit;
        self.min_code_score = min_score;
        self
    }

    pub fn images_dir(&self) -> &std::path::Path {
        &self.images_dir
    }

    /// 对载荷分类；图片落盘失败时记录错误并返回 `None`
    pub async fn classify(
        &self,
        payload: ClipboardPayload,
        max_characters: usize,
    ) -> Option<ClassifiedEntry> {
        match payload {
            ClipboardPayload::Text(text) => Some(self.classify_text(text, max_characters)),
            ClipboardPayload::Image {
                mime,
                bytes,
                fingerprint,
            } => match save_image_bytes(&self.images_dir, &fingerprint, &mime, &bytes).await {
                Ok(uri) => Some(ClassifiedEntry::new(ItemKind::Image, uri)),
                Err(e) => {
                    log::error!("❌ 保存剪贴板图片失败: {}", e);
                    None
                }
            },
            ClipboardPayload::FileList { paths, operation } => {
                let kind = if paths.len() == 1 {
                    ItemKind::File
                } else {
                    ItemKind::Files
                };
                Some(
                    ClassifiedEntry::new(kind, paths.join("\n"))
                        .with_metadata(EntryMetadata::Files { operation }),
                )
            }
        }
    }

    /// 文本多阶段判定
    pub fn classify_text(&self, text: String, max_characters: usize) -> ClassifiedEntry {
        let trimmed = text.trim();

        if is_link(trimmed) {
            return ClassifiedEntry::new(ItemKind::Link, text);
        }
        if is_character(trimmed, max_characters) {
            return ClassifiedEntry::new(ItemKind::Character, text);
        }
        if is_color(trimmed) {
            return ClassifiedEntry::new(ItemKind::Color, text);
        }
        if let Some(metadata) = self.detect_code(&text) {
            return ClassifiedEntry::new(ItemKind::Code, text).with_metadata(metadata);
        }
        ClassifiedEntry::new(ItemKind::Text, text)
    }

    fn detect_code(&self, text: &str) -> Option<EntryMetadata> {
        let detector = self.detector.as_ref()?;

        let sample: String = text.chars().take(self.code_sample_limit).collect();
        let sample_len = sample.chars().count();
        let detection = detector.detect(&sample)?;

        let score = code_score(detection.relevance, sample_len);
        if score < self.min_code_score || detection.language.is_empty() {
            return None;
        }
        log::debug!(
            "🔍 检测到代码: {} (得分 {:.2})",
            detection.language,
            score
        );
        let name = display_name(&detection.language, &detection.name);
        Some(EntryMetadata::Code {
            language: detection.language,
            name,
        })
    }
}

/// `http` 开头、不含空白且能被解析为 URL
pub fn is_link(trimmed: &str) -> bool {
    trimmed.starts_with("http")
        && !trimmed.chars().any(char::is_whitespace)
        && Url::parse(trimmed).is_ok()
}

/// 1 到 `max_characters` 个字素簇
pub fn is_character(trimmed: &str, max_characters: usize) -> bool {
    let count = trimmed.graphemes(true).take(max_characters + 1).count();
    count >= 1 && count <= max_characters
}

/// 按样本长度归一化的代码得分
pub fn code_score(relevance: f64, sample_len: usize) -> f64 {
    relevance / (sample_len as f64 / 100.0).max(1.0)
}

/// 语言展示名：首字母大写的 id 不比检测器名字短 3 个字符以上时优先使用 id
pub fn display_name(id: &str, name: &str) -> String {
    let capitalized = capitalize(id);
    if capitalized.chars().count() + 3 >= name.chars().count() {
        capitalized
    } else {
        name.to_string()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
