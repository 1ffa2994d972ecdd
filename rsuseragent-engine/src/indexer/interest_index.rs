//! 兴趣索引：事件键 → 规则句柄列表
//! 路径键（`agent.product.name`）与 路径=字面量键（`agent.product.name="chrome"`）共用一张表
//! 分发代价只与命中的订阅者数量相关，与规则总数无关
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::RuleHandle;

/// 构造 `path="value"` 形式的键（统一小写）
#[inline(always)]
pub fn literal_key(path: &str, value: &str) -> String {
    let mut key = String::with_capacity(path.len() + value.len() + 3);
    key.push_str(path);
    key.push_str("=\"");
    key.push_str(value);
    key.push('"');
    key.to_lowercase()
}

/// 构建期可变索引
#[derive(Debug, Default)]
pub struct InterestIndexBuilder {
    entries: FxHashMap<String, FxHashSet<RuleHandle>>,
}

impl InterestIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册路径键；若给出字面量则同时注册 `path="literal"` 键
    /// 返回新注册的键数量
    pub fn register(&mut self, event_key: &str, literal: Option<&str>, handle: RuleHandle) -> usize {
        let mut registered = self.register_key(event_key, handle);
        if let Some(literal) = literal {
            registered += self.insert(literal_key(event_key, literal), handle);
        }
        registered
    }

    /// 底层单键注册（同一 (键, 句柄) 重复注册幂等）
    pub fn register_key(&mut self, key: &str, handle: RuleHandle) -> usize {
        self.insert(key.to_lowercase(), handle)
    }

    #[inline(always)]
    fn insert(&mut self, key: String, handle: RuleHandle) -> usize {
        usize::from(self.entries.entry(key).or_default().insert(handle))
    }

    /// 冻结为只读索引：每个键的句柄列表排序去重
    pub fn build(self) -> InterestIndex {
        let mut entries = FxHashMap::with_capacity_and_hasher(self.entries.len(), Default::default());
        let mut handles = FxHashSet::default();

        for (key, set) in self.entries {
            let mut list: Vec<RuleHandle> = set.into_iter().collect();
            list.sort_unstable();
            handles.extend(list.iter().copied());
            entries.insert(key, list.into_boxed_slice());
        }

        InterestIndex {
            entries,
            handle_count: handles.len(),
        }
    }
}

/// 只读兴趣索引（构建后不可变，跨线程共享）
#[derive(Debug, Default)]
pub struct InterestIndex {
    entries: FxHashMap<String, Box<[RuleHandle]>>,
    handle_count: usize,
}

impl InterestIndex {
    /// 分发一个事件：查 `path` 与 `path="value"` 两个键
    /// 同一句柄只通知一次
    pub fn dispatch<F>(&self, path: &str, value: &str, mut notify: F)
    where
        F: FnMut(RuleHandle),
    {
        let path_key = path.to_lowercase();
        let by_path = self.subscribers(&path_key);
        let by_literal = self.subscribers(&literal_key(path, value));

        for &handle in by_path {
            notify(handle);
        }
        for &handle in by_literal {
            if by_path.binary_search(&handle).is_err() {
                notify(handle);
            }
        }
    }

    /// 某个键的订阅者（键需已是小写形式）
    #[inline(always)]
    pub fn subscribers(&self, key: &str) -> &[RuleHandle] {
        self.entries.get(key).map_or(&[][..], |list| &list[..])
    }

    /// 键数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 至少订阅了一个键的不同句柄数量
    pub fn handle_count(&self) -> usize {
        self.handle_count
    }
}
