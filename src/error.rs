//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，引擎内部各阶段（采集、分类、写回、
//! 按键注入、历史存储）以及参考适配器都返回 `Result<T, AppError>`。
//!
//! 引擎本身从不因错误终止：错误在流水线边界被记录日志后丢弃，
//! 详见 `clipboard::engine` 中的状态机说明。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `std::io::Error` / `rusqlite::Error` 提供 `From` 转换，便于 `?` 传播。

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 剪贴板读写操作失败
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 图片解码或编码失败
    #[error("图片处理失败: {0}")]
    Image(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 存储目录不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 输入模拟失败
    #[error("输入模拟失败: {0}")]
    Input(String),

    /// 数据库操作失败
    #[error("数据库错误: {0}")]
    Database(String),

    /// 设置文件读写失败
    #[error("设置错误: {0}")]
    Settings(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Database(error.to_string())
    }
}
