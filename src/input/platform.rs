use enigo::{
    Direction::{Press, Release},
    Enigo, Key, Keyboard, Settings,
};

use crate::error::AppError;

use super::keys::{KeyAction, KeyInjector, KeyStep, PasteKey};

fn enigo_key(key: PasteKey) -> Key {
    match key {
        PasteKey::Control => Key::Control,
        PasteKey::Shift => Key::Shift,
        PasteKey::V => Key::Unicode('v'),
    }
}

/// 基于 enigo 的按键注入
///
/// 单键调用时不在 drop 时释放按键，否则修饰键会在下一次调用前被松开。
#[derive(Debug, Default, Clone, Copy)]
pub struct EnigoInjector;

impl EnigoInjector {
    pub fn new() -> Self {
        Self
    }

    fn connect(release_on_drop: bool) -> Result<Enigo, AppError> {
        let settings = Settings {
            release_keys_when_dropped: release_on_drop,
            ..Settings::default()
        };
        Enigo::new(&settings).map_err(|e| AppError::Input(format!("初始化输入模拟失败: {}", e)))
    }

    fn send(enigo: &mut Enigo, key: PasteKey, action: KeyAction) -> Result<(), AppError> {
        let direction = match action {
            KeyAction::Press => Press,
            KeyAction::Release => Release,
        };
        enigo
            .key(enigo_key(key), direction)
            .map_err(|e| AppError::Input(format!("模拟粘贴按键失败: {}", e)))
    }
}

impl KeyInjector for EnigoInjector {
    fn press(&self, key: PasteKey) -> Result<(), AppError> {
        let mut enigo = Self::connect(false)?;
        Self::send(&mut enigo, key, KeyAction::Press)
    }

    fn release(&self, key: PasteKey) -> Result<(), AppError> {
        let mut enigo = Self::connect(false)?;
        Self::send(&mut enigo, key, KeyAction::Release)
    }

    /// 整段脚本复用同一个连接；出错时 drop 会释放仍按下的键
    fn play(&self, steps: &[KeyStep]) -> Result<(), AppError> {
        let mut enigo = Self::connect(true)?;
        for step in steps {
            Self::send(&mut enigo, step.key, step.action)?;
        }
        log::debug!("⌨️ 已模拟 {} 个按键事件", steps.len());
        Ok(())
    }
}

#[cfg(target_os = "linux")]
pub use x11_focus::X11Focus;

#[cfg(target_os = "linux")]
mod x11_focus {
    use std::ffi::CStr;
    use std::ptr;

    use x11::xlib;

    use crate::input::focus::FocusQuery;

    /// 向上查找 WM class 的最大层数
    const MAX_ANCESTORS: usize = 8;

    /// 通过 Xlib 查询焦点窗口的 WM class
    ///
    /// 每次查询独立打开、关闭 display 连接。
    #[derive(Debug, Default, Clone, Copy)]
    pub struct X11Focus;

    impl FocusQuery for X11Focus {
        fn focused_wm_class(&self) -> Option<String> {
            unsafe {
                let display = xlib::XOpenDisplay(ptr::null());
                if display.is_null() {
                    log::debug!("无法打开 X11 display，跳过焦点查询");
                    return None;
                }
                let class = focused_class(display);
                xlib::XCloseDisplay(display);
                class
            }
        }
    }

    unsafe fn focused_class(display: *mut xlib::Display) -> Option<String> {
        unsafe {
            let mut window: xlib::Window = 0;
            let mut revert = 0;
            xlib::XGetInputFocus(display, &mut window, &mut revert);

            // 焦点可能落在没有 class hint 的子窗口上，沿父链向上找
            for _ in 0..MAX_ANCESTORS {
                if window == 0 || window == xlib::PointerRoot as xlib::Window {
                    return None;
                }
                if let Some(class) = class_hint(display, window) {
                    return Some(class);
                }
                window = parent_of(display, window)?;
            }
            None
        }
    }

    unsafe fn class_hint(display: *mut xlib::Display, window: xlib::Window) -> Option<String> {
        unsafe {
            let mut hint = xlib::XClassHint {
                res_name: ptr::null_mut(),
                res_class: ptr::null_mut(),
            };
            if xlib::XGetClassHint(display, window, &mut hint) == 0 {
                return None;
            }
            let class = (!hint.res_class.is_null())
                .then(|| CStr::from_ptr(hint.res_class).to_string_lossy().into_owned());
            if !hint.res_name.is_null() {
                xlib::XFree(hint.res_name.cast());
            }
            if !hint.res_class.is_null() {
                xlib::XFree(hint.res_class.cast());
            }
            class
        }
    }

    unsafe fn parent_of(display: *mut xlib::Display, window: xlib::Window) -> Option<xlib::Window> {
        unsafe {
            let mut root = 0;
            let mut parent = 0;
            let mut children: *mut xlib::Window = ptr::null_mut();
            let mut count = 0;
            let status = xlib::XQueryTree(display, window, &mut root, &mut parent, &mut children, &mut count);
            if !children.is_null() {
                xlib::XFree(children.cast());
            }
            (status != 0 && parent != 0 && parent != root).then_some(parent)
        }
    }
}
