use std::fmt::{self, Write};

// ======================== 日志预览 ========================
/// 超长 User-Agent 的日志预览：连续空白折叠为单个空格，超过 max_len 字符截断并追加 `...`
/// 返回惰性 Display，格式化时才遍历，无堆分配
#[inline(always)]
pub fn preview_compact(s: &str, max_len: usize) -> impl fmt::Display + '_ {
    CompactPreview { source: s, max_len }
}

struct CompactPreview<'a> {
    source: &'a str,
    max_len: usize,
}

impl fmt::Display for CompactPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut written = 0;
        let mut in_whitespace = false;

        for ch in self.source.trim().chars() {
            if ch.is_whitespace() {
                if in_whitespace {
                    continue;
                }
                in_whitespace = true;
            } else {
                in_whitespace = false;
            }

            if written == self.max_len {
                return f.write_str("...");
            }
            f.write_char(if in_whitespace { ' ' } else { ch })?;
            written += 1;
        }
        Ok(())
    }
}
