//! 颜色语法识别
//!
//! 只回答“这段文本能否解析为 CSS 颜色”：十六进制、`rgb[a]()`、`hsl[a]()`、
//! `hwb()`、命名颜色与 `transparent`。不做数值换算。

use once_cell::sync::Lazy;
use regex::RegexSet;

const NUM: &str = r"[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:e[+-]?\d+)?";

static COLOR_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    let pct = format!(r"{NUM}%");
    let num_or_pct = format!(r"{NUM}%?");
    let hue = format!(r"{NUM}(?:deg|rad|grad|turn)?");
    let alpha = num_or_pct.clone();

    let patterns = [
        r"^#(?:[0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})$".to_string(),
        // rgb(1, 2, 3) / rgba(1, 2, 3, .5)
        format!(r"^rgba?\(\s*{n}\s*,\s*{n}\s*,\s*{n}\s*(?:,\s*{a}\s*)?\)$", n = num_or_pct, a = alpha),
        // rgb(1 2 3 / 50%)
        format!(r"^rgba?\(\s*{n}\s+{n}\s+{n}\s*(?:/\s*{a}\s*)?\)$", n = num_or_pct, a = alpha),
        format!(r"^hsla?\(\s*{h}\s*,\s*{p}\s*,\s*{p}\s*(?:,\s*{a}\s*)?\)$", h = hue, p = pct, a = alpha),
        format!(r"^(?:hsla?|hwb)\(\s*{h}\s+{p}\s+{p}\s*(?:/\s*{a}\s*)?\)$", h = hue, p = pct, a = alpha),
    ];
    match RegexSet::new(patterns.iter().map(|p| format!("(?i){p}"))) {
        Ok(set) => set,
        Err(e) => {
            log::error!("颜色正则编译失败: {}", e);
            RegexSet::empty()
        }
    }
});

static NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue",
    "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "transparent", "turquoise", "violet", "wheat", "white",
    "whitesmoke", "yellow", "yellowgreen",
];

/// 文本（已去除首尾空白）是否为颜色
pub fn is_color(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    if NAMED_COLORS.iter().any(|name| name.eq_ignore_ascii_case(text)) {
        return true;
    }
    COLOR_PATTERNS.is_match(text)
}
