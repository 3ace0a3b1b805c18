use crate::error::AppError;

use super::focus::{FocusQuery, InputPurpose};

/// 粘贴序列用到的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasteKey {
    Control,
    Shift,
    V,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStep {
    pub key: PasteKey,
    pub action: KeyAction,
}

impl KeyStep {
    const fn press(key: PasteKey) -> Self {
        Self {
            key,
            action: KeyAction::Press,
        }
    }

    const fn release(key: PasteKey) -> Self {
        Self {
            key,
            action: KeyAction::Release,
        }
    }
}

const STANDARD_PASTE: [KeyStep; 4] = [
    KeyStep::press(PasteKey::Control),
    KeyStep::press(PasteKey::V),
    KeyStep::release(PasteKey::V),
    KeyStep::release(PasteKey::Control),
];

const TERMINAL_PASTE: [KeyStep; 6] = [
    KeyStep::press(PasteKey::Control),
    KeyStep::press(PasteKey::Shift),
    KeyStep::press(PasteKey::V),
    KeyStep::release(PasteKey::V),
    KeyStep::release(PasteKey::Shift),
    KeyStep::release(PasteKey::Control),
];

/// 粘贴按键脚本：终端为 Ctrl+Shift+V，其余为 Ctrl+V
pub fn paste_sequence(is_terminal: bool) -> &'static [KeyStep] {
    if is_terminal {
        &TERMINAL_PASTE
    } else {
        &STANDARD_PASTE
    }
}

/// 按键注入后端
pub trait KeyInjector: Send + Sync {
    fn press(&self, key: PasteKey) -> Result<(), AppError>;
    fn release(&self, key: PasteKey) -> Result<(), AppError>;

    /// 依次执行按键脚本
    ///
    /// 中途失败时释放已按下的键再返回错误，避免修饰键卡住。
    fn play(&self, steps: &[KeyStep]) -> Result<(), AppError> {
        let mut held: Vec<PasteKey> = Vec::new();
        for step in steps {
            let result = match step.action {
                KeyAction::Press => self.press(step.key).map(|_| held.push(step.key)),
                KeyAction::Release => self.release(step.key).map(|_| held.retain(|k| *k != step.key)),
            };
            if let Err(e) = result {
                for key in held.iter().rev() {
                    let _ = self.release(*key);
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

/// 根据焦点输入用途选择脚本并注入
///
/// 盲发送，没有反馈通道，也不重试。
pub fn inject_paste(injector: &dyn KeyInjector, focus: &dyn FocusQuery) -> Result<(), AppError> {
    let is_terminal = focus.input_purpose() == InputPurpose::Terminal;
    log::debug!("⌨️ 注入粘贴按键 (终端: {})", is_terminal);
    injector.play(paste_sequence(is_terminal))
}
