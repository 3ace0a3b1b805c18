/// 焦点输入上下文的用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPurpose {
    #[default]
    Normal,
    Terminal,
}

/// 常见终端模拟器的 WM class
const TERMINAL_CLASSES: &[&str] = &[
    "Alacritty",
    "kitty",
    "foot",
    "footclient",
    "WezTerm",
    "org.wezfurlong.wezterm",
    "org.gnome.Console",
    "org.gnome.Ptyxis",
    "gnome-terminal-server",
    "Gnome-terminal",
    "konsole",
    "yakuake",
    "terminator",
    "tilix",
    "xfce4-terminal",
    "rio",
    "xterm",
    "URxvt",
    "Ghostty",
    "com.mitchellh.ghostty",
];

/// WM class 按 `.` `-` `_` 拆分后命中任一分量即视为终端
const TERMINAL_CLASS_COMPONENTS: &[&str] = &[
    "terminal", "console", "ghostty", "wezterm", "kitty", "alacritty", "konsole", "xterm",
    "urxvt", "ptyxis",
];

pub fn is_terminal_class(class: &str) -> bool {
    if TERMINAL_CLASSES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(class))
    {
        return true;
    }
    let lower = class.to_ascii_lowercase();
    lower
        .split(['.', '-', '_'])
        .any(|component| TERMINAL_CLASS_COMPONENTS.contains(&component))
}

/// 焦点查询
///
/// 作为协作者传入引擎，测试中无需真实显示服务器。
pub trait FocusQuery: Send + Sync {
    /// 当前焦点窗口的 WM class
    fn focused_wm_class(&self) -> Option<String>;

    /// 当前焦点输入的用途；默认根据 WM class 推断
    fn input_purpose(&self) -> InputPurpose {
        match self.focused_wm_class() {
            Some(class) if is_terminal_class(&class) => InputPurpose::Terminal,
            _ => InputPurpose::Normal,
        }
    }
}

/// 无法查询焦点的平台使用
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFocus;

impl FocusQuery for NoFocus {
    fn focused_wm_class(&self) -> Option<String> {
        None
    }
}
