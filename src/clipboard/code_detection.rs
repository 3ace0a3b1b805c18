//! 代码语言检测模块
//!
//! # 设计思路
//!
//! 分类器只依赖 [`LanguageDetector`] trait：给定一段样本，返回最可能的语言
//! 以及“原始相关度”。相关度随文本长度增长，由分类器负责按长度归一化。
//! 检测器是可选的——未加载时分类器直接跳过代码判定。
//!
//! # 实现思路
//!
//! - 内置 [`PatternDetector`]：每种语言一组带权重的正则特征，
//!   相关度 = Σ(权重 × 命中次数)，取最高者。
//! - 正则通过 `once_cell::sync::Lazy` 在首次调用时编译，后续零成本复用；
//!   编译失败的规则记录日志后跳过，不影响其余规则。

use once_cell::sync::Lazy;
use regex::Regex;

/// 一次检测的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// 语言 id，如 `rust`、`cpp`
    pub language: String,
    /// 检测器给出的展示名，如 `Rust`、`C++`
    pub name: String,
    /// 未归一化的相关度
    pub relevance: f64,
}

/// 代码语言检测器
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, sample: &str) -> Option<Detection>;
}

struct Rule {
    pattern: Regex,
    weight: f64,
}

struct Language {
    id: &'static str,
    name: &'static str,
    rules: Vec<Rule>,
}

fn language(id: &'static str, name: &'static str, rules: &[(&str, f64)]) -> Language {
    let rules = rules
        .iter()
        .filter_map(|(pattern, weight)| match Regex::new(pattern) {
            Ok(pattern) => Some(Rule {
                pattern,
                weight: *weight,
            }),
            Err(e) => {
                log::error!("语言 {} 的检测规则编译失败: {}", id, e);
                None
            }
        })
        .collect();
    Language { id, name, rules }
}

/// 预编译的语言特征表
static LANGUAGES: Lazy<Vec<Language>> = Lazy::new(|| {
    vec![
        language("rust", "Rust", &[
            (r"\bfn\s+\w+\s*[<(]", 3.0),
            (r"\bimpl\b(\s*<[^>]*>)?\s+[\w:<>]+", 3.0),
            (r"\bpub(\([\w:]+\))?\s+(fn|struct|enum|mod|use|trait|const)\b", 3.0),
            (r"#!?\[[\w\s:(),=]+\]", 2.0),
            (r"\b(println|format|eprintln|vec|assert|assert_eq|write|writeln)!\(", 2.0),
            (r"&mut\s+\w+", 2.0),
            (r"\blet\s+mut\s+\w+", 2.0),
            (r"\.unwrap\(\)|\.expect\(|\.map_err\(", 2.0),
            (r"(?m)^\s*use\s+[\w:]+(::\{[^}]*\})?;", 2.0),
            (r"\b(Ok|Err|Some)\(", 1.0),
            (r"\bmatch\s+[\w.&*]+\s*\{", 1.0),
            (r"\blet\s+\w+", 1.0),
            (r"::", 0.5),
            (r"->", 0.5),
        ]),
        language("python", "Python", &[
            (r"(?m)^\s*def\s+\w+\s*\(.*\)\s*(->\s*[\w\[\], .]+)?:\s*$", 3.0),
            (r"(?m)^\s*class\s+\w+(\(.*\))?:\s*$", 3.0),
            (r"(?m)^\s*(from\s+[\w.]+\s+)?import\s+[\w.]+(\s+as\s+\w+)?\s*$", 2.0),
            (r"(?m)^\s*(if|elif|for|while|with|try|except|else)\b.*:\s*$", 1.0),
            (r"\bself\.\w+", 1.0),
            (r"\b(elif|None|True|False)\b", 1.0),
            (r"__\w+__", 1.0),
            (r"\bprint\(", 0.5),
        ]),
        language("javascript", "JavaScript", &[
            (r"\bfunction\s*\w*\s*\(", 2.0),
            (r"\bconsole\.\w+\(", 3.0),
            (r"\b(document|window)\.\w+", 2.0),
            (r#"\brequire\(['"]"#, 2.0),
            (r#"\bimport\s+.*\s+from\s+['"]"#, 2.0),
            (r"\bexport\s+(default|const|function|class)\b", 2.0),
            (r"===|!==", 2.0),
            (r"\b(const|let|var)\s+\w+\s*=", 1.0),
            (r"=>", 1.0),
            (r"\bundefined\b", 1.0),
        ]),
        language("typescript", "TypeScript", &[
            (r":\s*(string|number|boolean|any|void|unknown|never)\b", 3.0),
            (r"\binterface\s+\w+\s*\{", 2.0),
            (r"\btype\s+\w+\s*=", 2.0),
            (r"\b(const|let)\s+\w+\s*:\s*\w+", 2.0),
            (r"\b(public|private|protected|readonly)\s+\w+", 1.0),
            (r#"\bimport\s+.*\s+from\s+['"]"#, 1.0),
            (r"\bexport\s+", 1.0),
            (r"=>", 0.5),
        ]),
        language("c", "C", &[
            (r#"(?m)^\s*#\s*include\s*[<"]\w+\.h[>"]"#, 3.0),
            (r"(?m)^\s*#\s*(define|ifdef|ifndef|endif)\b", 2.0),
            (r"\b(int|void|char|unsigned|long|float|double)\s+\*?\w+\s*\(", 2.0),
            (r"\b(printf|fprintf|sprintf|malloc|calloc|free)\s*\(", 2.0),
            (r"\bstruct\s+\w+\s*\{", 1.0),
            (r"->", 0.5),
        ]),
        language("cpp", "C++", &[
            (r"(?m)^\s*#\s*include\s*<(iostream|vector|string|memory|map|algorithm)>", 4.0),
            (r"\bstd::", 3.0),
            (r"\bcout\s*<<|<<\s*endl\b", 3.0),
            (r"\btemplate\s*<", 3.0),
            (r"\bnamespace\s+\w+", 2.0),
            (r"(?m)^\s*(public|private|protected):", 2.0),
            (r"\bclass\s+\w+\s*(:\s*(public|private)\s+\w+)?\s*\{", 2.0),
            (r"::", 0.5),
        ]),
        language("go", "Go", &[
            (r"(?m)^\s*package\s+\w+\s*$", 3.0),
            (r"\bfunc\s+(\(\w+\s+\*?\w+\)\s*)?\w+\s*\(", 3.0),
            (r"\bfmt\.\w+\(", 3.0),
            (r"\berr\s*!=\s*nil\b", 3.0),
            (r"(?m)^\s*import\s+\(", 2.0),
            (r"\bgo\s+func\b|\bchan\s+\w+|\bdefer\s+", 2.0),
            (r":=", 2.0),
        ]),
        language("java", "Java", &[
            (r"\bSystem\.out\.print(ln)?\(", 4.0),
            (r"(?m)^\s*import\s+java\.", 4.0),
            (r"\bpublic\s+(static\s+)?(final\s+)?(class|interface|void|int|String)\b", 3.0),
            (r"@Override\b", 3.0),
            (r"\bString\[\]\s+args\b", 3.0),
            (r"\b(private|protected|public)\s+\w+(<[\w<>, ]+>)?\s+\w+\s*[;=(]", 1.0),
            (r"\bnew\s+\w+(<.*>)?\(", 1.0),
        ]),
        language("bash", "Bash", &[
            (r"(?m)^#!/(usr/)?bin/(env\s+)?(ba|z)?sh", 5.0),
            (r"\|\s*(grep|awk|sed|xargs|sort|uniq|head|tail|wc)\b", 2.0),
            (r"(?m)^\s*(if|then|fi|elif|for|do|done|case|esac)\b", 1.5),
            (r"(?m)^\s*(sudo|apt|apt-get|dnf|pacman|export|cd|chmod|mkdir)\s+", 1.5),
            (r"\[\[?\s+.*\s+\]\]?", 1.0),
            (r"\becho\s+", 1.0),
            (r"\$\{?\w+\}?", 0.5),
        ]),
        language("sql", "SQL", &[
            (r"(?i)\bselect\b.+\bfrom\b", 3.0),
            (r"(?i)\binsert\s+into\b", 3.0),
            (r"(?i)\bupdate\s+\w+\s+set\b", 3.0),
            (r"(?i)\bdelete\s+from\b", 3.0),
            (r"(?i)\bcreate\s+(table|index|view|database)\b", 3.0),
            (r"(?i)\b(where|inner\s+join|left\s+join|group\s+by|order\s+by|values)\b", 1.0),
        ]),
        language("css", "CSS", &[
            (r"@(media|import|keyframes|font-face)\b", 3.0),
            (r"(?m)^\s*[\w-]+\s*:\s*[^;{}]+;\s*$", 1.5),
            (r"(?m)^\s*[.#]?[\w-]+(\s*[,>+~]?\s*[.#:]?[\w-]+)*\s*\{", 1.0),
            (r"!important\b", 2.0),
            (r"\b\d+(px|em|rem|vh|vw)\b", 1.0),
        ]),
        language("json", "JSON", &[
            (r#""[^"\n]+"\s*:\s*"#, 2.0),
            (r"^\s*[\[{][\s\S]*[}\]]\s*$", 2.0),
            (r"\b(true|false|null)\b", 0.5),
        ]),
        language("xml", "HTML, XML", &[
            (r"(?i)<!DOCTYPE\s+html", 5.0),
            (r"<\?xml\s", 5.0),
            (r"</[a-zA-Z][\w:-]*>", 1.0),
            (r#"<[a-zA-Z][\w:-]*(\s+[\w:-]+(="[^"]*"|='[^']*')?)*\s*/?>"#, 1.0),
        ]),
    ]
});

/// 基于加权正则特征的语言检测器
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternDetector;

impl PatternDetector {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageDetector for PatternDetector {
    fn detect(&self, sample: &str) -> Option<Detection> {
        let mut best: Option<(&Language, f64)> = None;

        for lang in LANGUAGES.iter() {
            let relevance: f64 = lang
                .rules
                .iter()
                .map(|rule| rule.weight * rule.pattern.find_iter(sample).count() as f64)
                .sum();
            if relevance <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, top)| relevance > top) {
                best = Some((lang, relevance));
            }
        }

        best.map(|(lang, relevance)| Detection {
            language: lang.id.to_string(),
            name: lang.name.to_string(),
            relevance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(sample: &str) -> Option<String> {
        PatternDetector::new().detect(sample).map(|d| d.language)
    }

    #[test]
    fn test_rust_function_detected() {
        let code = "fn save_clipboard_image() -> Result<String, String> {\n    let mut file_path = get_images_dir();\n    println!(\"{}\", file_path);\n}";
        assert_eq!(detect(code).as_deref(), Some("rust"));
    }

    #[test]
    fn test_python_detected() {
        let code = "import os\n\ndef main(path):\n    if os.path.exists(path):\n        print(path)\n";
        assert_eq!(detect(code).as_deref(), Some("python"));
    }

    #[test]
    fn test_go_detected() {
        let code = "package main\n\nimport \"fmt\"\n\nfunc main() {\n    x := 1\n    fmt.Println(x)\n}";
        assert_eq!(detect(code).as_deref(), Some("go"));
    }

    #[test]
    fn test_sql_detected() {
        let code = "SELECT id, name FROM users WHERE id = 1 ORDER BY name";
        assert_eq!(detect(code).as_deref(), Some("sql"));
    }

    #[test]
    fn test_bash_shebang_detected() {
        let code = "#!/usr/bin/env bash\nset -e\necho \"$HOME\" | grep root\n";
        assert_eq!(detect(code).as_deref(), Some("bash"));
    }

    #[test]
    fn test_plain_text_not_detected() {
        assert_eq!(detect("Hello, this is a simple text message."), None);
    }

    #[test]
    fn relevance_grows_with_repetition() {
        let detector = PatternDetector::new();
        let once = detector.detect("fn a() {}").expect("detect once");
        let twice = detector.detect("fn a() {}\nfn b() {}").expect("detect twice");
        assert!(twice.relevance > once.relevance);
        assert_eq!(twice.name, "Rust");
    }
}
