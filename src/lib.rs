//! # 剪贴板引擎 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//!   系统剪贴板 ── 所有权变化 ──┐
//!                              ↓
//! ┌─ clipboard ───────────────────────────────────────────────┐
//! │  listener / SystemBackend    (ClipboardBackend trait)     │
//! │       ↓                                                   │
//! │  acquire ── 敏感 → 图片 → 文件列表 → 文本                  │
//! │       ↓                                                   │
//! │  dedup   ── (类别, 指纹) 单槽 ←───────────┐               │
//! │       ↓                                   │ record        │
//! │  classify ── 链接·字符·颜色·代码·文本      │               │
//! │       │      图片落盘 (save)               │               │
//! │       ↓                                   │               │
//! │  engine ── HistoryStore → EntryObserver   │               │
//! │                                           │               │
//! │  delivery ── deliver / replay_entry ──────┘               │
//! │       └── PasteTimer ─→ input::inject_paste               │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`clipboard`] | 采集、去重、分类、写回、监听与系统剪贴板后端 |
//! | [`db`] | `HistoryStore` trait 与 SQLite 实现 |
//! | [`input`] | 粘贴按键脚本、`enigo` 注入、焦点 WM class 查询 |
//! | [`settings`] | 只读设置接口与 JSON 文件实现 |
//! | [`storage`] | 应用数据目录与图片目录 |

pub mod error;
pub mod clipboard;
pub mod db;
pub mod input;
pub mod storage;
pub mod settings;
