//! rsuseragent-engine 内核错误定义
//! 封装内核层所有核心错误，与业务层错误解耦，基于thiserror实现类型安全处理
use thiserror::Error;

/// 内核核心错误枚举
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================== 规则相关错误 =====================
    /// 规则永远不可能命中（构建期检测，规则会被丢弃并计数，不影响整体构建）
    #[error("Useless rule: {0}")]
    UselessRule(String),

    /// 规则表达式解析失败（require/extract 语法错误）
    #[error("Rule expression parse failed: {0}")]
    ExpressionParseError(String),

    /// 规则引用了不存在的查找表
    #[error("Unknown lookup table: {0}")]
    UnknownLookup(String),

    // ===================== 索引相关错误 =====================
    /// 规则句柄超出 u32 可表示范围
    #[error("Rule handle overflow: {0} rules registered")]
    HandleOverflow(usize),
}

/// 内核层全局Result类型别名
pub type CoreResult<T> = Result<T, CoreError>;
