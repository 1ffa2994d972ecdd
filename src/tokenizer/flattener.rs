//! 默认分词器：产品（Name/Version）+ 括号注释块
//!
//! 事件路径：
//! - `agent`：完整输入
//! - `agent.product` / `.name` / `.version`
//! - `agent.product.comments.entry` 及其 `.name` / `.version` / `.key` / `.value`
//!
//! 语法错误（不影响已解析部分的事件输出）：
//! - 输入为空白
//! - 括号不配对
//! - 注释之外出现 `' " < > { } ; \` 反引号或控制字符
use super::{EventSink, TokenizeOutcome, Tokenizer};

pub const AGENT: &str = "agent";
pub const PRODUCT: &str = "agent.product";
pub const PRODUCT_NAME: &str = "agent.product.name";
pub const PRODUCT_VERSION: &str = "agent.product.version";
pub const COMMENT_ENTRY: &str = "agent.product.comments.entry";
pub const COMMENT_ENTRY_NAME: &str = "agent.product.comments.entry.name";
pub const COMMENT_ENTRY_VERSION: &str = "agent.product.comments.entry.version";
pub const COMMENT_ENTRY_KEY: &str = "agent.product.comments.entry.key";
pub const COMMENT_ENTRY_VALUE: &str = "agent.product.comments.entry.value";

/// 所有可能出现的事件路径
pub const ALL_PATHS: &[&str] = &[
    AGENT,
    PRODUCT,
    PRODUCT_NAME,
    PRODUCT_VERSION,
    COMMENT_ENTRY,
    COMMENT_ENTRY_NAME,
    COMMENT_ENTRY_VERSION,
    COMMENT_ENTRY_KEY,
    COMMENT_ENTRY_VALUE,
];

#[inline(always)]
fn is_forbidden(c: char) -> bool {
    matches!(c, '\'' | '"' | '<' | '>' | '{' | '}' | ';' | '\\' | '`') || c.is_control()
}

#[inline(always)]
fn is_product_boundary(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || is_forbidden(c)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UserAgentFlattener;

impl UserAgentFlattener {
    pub fn new() -> Self {
        Self
    }

    fn emit_product(token: &str, sink: &mut dyn EventSink) {
        sink.event(PRODUCT, token);
        match token.split_once('/') {
            Some((name, version)) => {
                if !name.is_empty() {
                    sink.event(PRODUCT_NAME, name);
                }
                if !version.is_empty() {
                    sink.event(PRODUCT_VERSION, version);
                }
            }
            None => sink.event(PRODUCT_NAME, token),
        }
    }

    fn emit_comments(content: &str, sink: &mut dyn EventSink) {
        for entry in content.split([';', ',']) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            sink.event(COMMENT_ENTRY, entry);

            if let Some((key, value)) = split_key_value(entry) {
                sink.event(COMMENT_ENTRY_KEY, key);
                sink.event(COMMENT_ENTRY_VALUE, value);
                continue;
            }

            // 单个 Name/Version 形式（如 Googlebot/2.1）
            if !entry.contains(char::is_whitespace) {
                if let Some((name, version)) = entry.split_once('/') {
                    if !name.is_empty() {
                        sink.event(COMMENT_ENTRY_NAME, name);
                    }
                    if !version.is_empty() {
                        sink.event(COMMENT_ENTRY_VERSION, version);
                    }
                    continue;
                }
            }

            // 前导单词为名称，第一个数字开头的单词为版本
            let mut name_words = Vec::new();
            let mut version = None;
            for word in entry.split_whitespace() {
                if word.starts_with(|c: char| c.is_ascii_digit()) {
                    version = Some(word);
                    break;
                }
                name_words.push(word);
            }
            if !name_words.is_empty() {
                sink.event(COMMENT_ENTRY_NAME, &name_words.join(" "));
            }
            if let Some(version) = version {
                sink.event(COMMENT_ENTRY_VERSION, version);
            }
        }
    }
}

/// `rv:89.0` → ("rv", "89.0")；URL（`://`）与带空格的键不拆分
fn split_key_value(entry: &str) -> Option<(&str, &str)> {
    let (key, value) = entry.split_once(':')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() || value.starts_with("//") || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value))
}

impl Tokenizer for UserAgentFlattener {
    fn tokenize(&self, input: &str, sink: &mut dyn EventSink) -> TokenizeOutcome {
        let mut outcome = TokenizeOutcome::default();
        let input = input.trim();
        sink.event(AGENT, input);
        if input.is_empty() {
            outcome.syntax_error = true;
            return outcome;
        }

        let mut chars = input.char_indices().peekable();
        while let Some(&(start, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                continue;
            }

            if c == '(' {
                chars.next();
                let mut depth = 1usize;
                let mut end = None;
                for (i, c) in chars.by_ref() {
                    match c {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let content = match end {
                    Some(end) => &input[start + 1..end],
                    None => {
                        log::trace!("Unclosed comment block at offset {}", start);
                        outcome.syntax_error = true;
                        &input[start + 1..]
                    }
                };
                Self::emit_comments(content, sink);
                continue;
            }

            if c == ')' || is_forbidden(c) {
                log::trace!("Unexpected character {:?} at offset {}", c, start);
                outcome.syntax_error = true;
                chars.next();
                continue;
            }

            let mut end = input.len();
            while let Some(&(i, c)) = chars.peek() {
                if is_product_boundary(c) {
                    end = i;
                    break;
                }
                chars.next();
            }
            Self::emit_product(&input[start..end], sink);
        }

        outcome
    }
}
