//! 规则协议
//! - RuleTemplate：规则集中共享的只读模板（编译产物），构建期注册兴趣键
//! - Rule：每个 Worker 私有的可变实例，分析期接收事件并写入字段
use std::fmt::{self, Display, Formatter};

use crate::core::FieldRecord;
use crate::error::{CoreError, CoreResult};
use crate::indexer::InterestIndexBuilder;

/// 规则句柄：Worker 规则实例数组的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleHandle(pub u32);

impl RuleHandle {
    /// 从数组下标构造句柄，超出 u32 范围时报错
    pub fn from_index(index: usize) -> CoreResult<Self> {
        u32::try_from(index)
            .map(RuleHandle)
            .map_err(|_| CoreError::HandleOverflow(index))
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for RuleHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Worker 私有的规则实例
pub trait Rule: Send {
    /// 每次分析开始前清空内部状态
    fn reset(&mut self);

    /// 订阅的事件到达（path 为完整事件路径，value 为事件值）
    fn inform(&mut self, path: &str, value: &str, record: &mut FieldRecord);

    /// 所有事件分发完毕后调用一次
    fn finalize(&mut self, record: &mut FieldRecord);
}

/// 规则集中共享的规则模板
pub trait RuleTemplate: Send + Sync {
    /// 规则名（日志/诊断用）
    fn name(&self) -> &str;

    /// 为 Worker 创建一个全新的规则实例
    fn instantiate(&self) -> Box<dyn Rule>;

    /// 用给定句柄向索引注册兴趣键，返回注册的键数量（0 表示规则永远不会被通知）
    fn register_interests(&self, handle: RuleHandle, builder: &mut InterestIndexBuilder) -> usize;

    /// 规则可能写入的字段名
    fn possible_field_names(&self) -> Vec<String>;
}
