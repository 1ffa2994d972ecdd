//! 分词器协议
//! 把原始 User-Agent 展开为按文档顺序排列的 (路径, 值) 事件流
pub mod flattener;

pub use flattener::UserAgentFlattener;

/// 事件接收方
pub trait EventSink {
    fn event(&mut self, path: &str, value: &str);
}

impl<F> EventSink for F
where
    F: FnMut(&str, &str),
{
    #[inline(always)]
    fn event(&mut self, path: &str, value: &str) {
        self(path, value)
    }
}

/// 一次分词的结果（事件本身已经交给 sink）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizeOutcome {
    pub syntax_error: bool,
}

/// 分词器：每次分析调用一次，事件同步推送给 sink
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, input: &str, sink: &mut dyn EventSink) -> TokenizeOutcome;
}
