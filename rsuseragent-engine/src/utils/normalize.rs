//! 字段值规范化
//! - brand：品牌名大小写规范
//! - email：邮箱地址反混淆（[at] / (dot) 等写法）
//! - strip_brand_prefix：设备名去掉冗余的品牌前缀
use once_cell::sync::Lazy;
use regex::Regex;

/// 不超过该长度的品牌名整体大写（LG / HTC / ZTE）
const SHORT_BRAND_LEN: usize = 3;

/// 品牌名规范化
/// - 短品牌整体大写
/// - 含数字的单词整体大写
/// - 全大写短单词保持原样
/// - 其余单词首字母大写、其余小写
/// - 分隔符原样保留
pub fn brand(value: &str) -> String {
    let value = value.trim();
    if value.chars().count() <= SHORT_BRAND_LEN {
        return value.to_uppercase();
    }

    let mut result = String::with_capacity(value.len());
    let mut word = String::new();
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            word.push(ch);
        } else {
            flush_brand_word(&mut word, &mut result);
            result.push(ch);
        }
    }
    flush_brand_word(&mut word, &mut result);
    result
}

fn flush_brand_word(word: &mut String, out: &mut String) {
    if word.is_empty() {
        return;
    }

    let has_digit = word.chars().any(|c| c.is_ascii_digit());
    let all_upper = word.chars().all(|c| !c.is_lowercase());
    if has_digit {
        out.push_str(&word.to_uppercase());
    } else if all_upper && word.chars().count() <= SHORT_BRAND_LEN {
        out.push_str(word);
    } else {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    word.clear();
}

static EMAIL_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[\[\(\{<]\s*at\s*[\]\)\}>]\s*|\s+at\s+").expect("static regex")
});

static EMAIL_DOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[\[\(\{<]\s*dot\s*[\]\)\}>]\s*|\s+dot\s+").expect("static regex")
});

/// 邮箱反混淆："bot [at] example (dot) com" → "bot@example.com"
pub fn email(value: &str) -> String {
    let replaced = EMAIL_AT.replace_all(value.trim(), "@");
    let replaced = EMAIL_DOT.replace_all(&replaced, ".");
    replaced.chars().filter(|c| !c.is_whitespace()).collect()
}

/// 设备名以品牌开头时去掉品牌前缀（忽略 ASCII 大小写，前缀后的分隔符一并去掉）
/// 去掉后为空则保留原设备名
pub fn strip_brand_prefix(brand: &str, name: &str) -> String {
    let brand = brand.trim();
    let name = name.trim();
    if brand.is_empty() {
        return name.to_string();
    }

    let prefix_matches = name
        .get(..brand.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(brand));
    if !prefix_matches {
        return name.to_string();
    }

    let rest = name[brand.len()..]
        .trim_start_matches(|c: char| c == ' ' || c == '-' || c == '_')
        .trim();
    if rest.is_empty() {
        name.to_string()
    } else {
        rest.to_string()
    }
}
