//! 输入模拟模块（分层门面）
//!
//! - `keys`：粘贴按键脚本与注入接口
//! - `focus`：焦点窗口 / 输入用途查询
//! - `platform`：平台相关实现（enigo 按键注入、X11 焦点查询）

#[path = "input/keys.rs"]
mod keys;
#[path = "input/focus.rs"]
mod focus;
#[path = "input/platform.rs"]
mod platform;

pub use focus::{is_terminal_class, FocusQuery, InputPurpose, NoFocus};
pub use keys::{inject_paste, paste_sequence, KeyAction, KeyInjector, KeyStep, PasteKey};
pub use platform::EnigoInjector;
#[cfg(target_os = "linux")]
pub use platform::X11Focus;
