//! 剪贴板图片保存模块
//!
//! # 设计思路
//!
//! 图片按内容寻址保存：文件名即内容指纹，扩展名由 MIME 决定。
//! 同样的字节必然得到同样的文件名，因此文件已存在时直接跳过写入。
//!
//! # 实现思路
//!
//! - 使用 `tokio::fs` 异步写盘，不阻塞事件循环。
//! - 目录不存在时自动创建。
//! - 返回 `file://` URI，作为图片条目的规范内容。

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::AppError;

/// 由图片 MIME 得到文件扩展名
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jxl" => "jxl",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

/// 内容寻址路径：`<dir>/<fingerprint>.<ext>`
pub fn content_addressed_path(images_dir: &Path, fingerprint: &str, mime: &str) -> PathBuf {
    images_dir.join(format!("{}.{}", fingerprint, extension_for_mime(mime)))
}

/// 保存图片字节，返回文件 URI
///
/// # 返回
/// - `Ok(uri)`：已写入或文件已存在
/// - `Err(AppError)`：创建目录、写入或生成 URI 失败
pub async fn save_image_bytes(
    images_dir: &Path,
    fingerprint: &str,
    mime: &str,
    bytes: &[u8],
) -> Result<String, AppError> {
    if fingerprint.is_empty() {
        return Err(AppError::Storage("图片指纹为空，无法确定文件名".to_string()));
    }

    tokio::fs::create_dir_all(images_dir).await.map_err(|e| {
        AppError::Storage(format!("创建图片目录 '{}' 失败: {}", images_dir.display(), e))
    })?;

    let file_path = content_addressed_path(images_dir, fingerprint, mime);
    if tokio::fs::try_exists(&file_path).await? {
        log::debug!("🖼️ 图片已存在，跳过写入: {}", file_path.display());
    } else {
        tokio::fs::write(&file_path, bytes).await?;
        log::debug!("🖼️ 图片已保存: {} ({} bytes)", file_path.display(), bytes.len());
    }

    file_uri(&file_path)
}

/// 绝对路径转 `file://` URI
pub fn file_uri(path: &Path) -> Result<String, AppError> {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .map_err(|_| AppError::Storage(format!("无法转换为文件 URI: {}", path.display())))
}

/// `file://` URI 或普通路径转本地路径
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    if uri.starts_with("file://") {
        return Url::parse(uri).ok()?.to_file_path().ok();
    }
    let path = PathBuf::from(uri);
    path.is_absolute().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_bytes_land_on_the_same_path_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = dir.path().join("images");

        let first = save_image_bytes(&images, "abc123", "image/png", b"one")
            .await
            .expect("first save");
        // 已存在则不会被覆盖
        let second = save_image_bytes(&images, "abc123", "image/png", b"two")
            .await
            .expect("second save");

        assert_eq!(first, second);
        let stored = std::fs::read(images.join("abc123.png")).expect("read back");
        assert_eq!(stored, b"one");
    }

    #[tokio::test]
    async fn empty_fingerprint_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(save_image_bytes(dir.path(), "", "image/png", b"x").await.is_err());
    }

    #[test]
    fn uri_and_path_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a b.png");
        let uri = file_uri(&path).expect("uri");
        assert!(uri.starts_with("file://"));
        assert!(uri.contains("a%20b.png"));
        assert_eq!(uri_to_path(&uri), Some(path));
    }

    #[test]
    fn relative_paths_are_not_local_files() {
        assert_eq!(uri_to_path("images/a.png"), None);
    }

    #[test]
    fn jpeg_uses_jpg_extension() {
        let path = content_addressed_path(Path::new("/tmp"), "ff", "image/jpeg");
        assert_eq!(path, PathBuf::from("/tmp/ff.jpg"));
    }
}
