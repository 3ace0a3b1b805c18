//! 剪贴板管理模块
//!
//! # 设计思路
//!
//! 采集、分类、写回三条链路围绕同一个去重状态协作：
//! - **采集**：所有权变化后按优先级协商 MIME，得到带类型的载荷
//! - **去重**：单槽记录“系统剪贴板当前持有什么”，入站与出站都会覆盖
//! - **分类**：链接 / 字符 / 颜色 / 代码 / 文本，图片落盘，文件列表区分单复数
//! - **写回**：设置剪贴板、记录指纹、按需安排延迟粘贴
//!
//! # 实现思路
//!
//! - 平台能力全部经由 trait 注入（`ClipboardBackend`、`KeyInjector`、
//!   `FocusQuery`、`HistoryStore`），核心逻辑无需显示服务器即可测试。
//! - `SystemBackend`（`clipboard-rs` + `arboard`）+ `listener` 是默认的真实后端。
//! - 子模块按职责拆分，`engine` 负责编排。

pub mod acquire;
pub mod backend;
pub mod classify;
pub mod code_detection;
pub mod color;
pub mod dedup;
pub mod delivery;
pub mod engine;
pub mod fingerprint;
pub mod listener;
pub mod payload;
pub mod save;
pub mod system_backend;

pub use backend::{ClipboardBackend, Selection, Subscription};
pub use classify::Classifier;
pub use code_detection::{Detection, LanguageDetector, PatternDetector};
pub use dedup::DedupTracker;
pub use delivery::PasteTimer;
pub use engine::{ClipboardEngine, Collaborators, EngineConfig, EntryObserver, NoopObserver};
pub use fingerprint::fingerprint;
pub use payload::{
    ClassifiedEntry, ClipboardPayload, ContentKind, Entry, EntryMetadata, FileOperation, ItemKind,
};
pub use system_backend::SystemBackend;
