//! 分析器配置管理

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{UaResult, UserAgentError};

/// 默认缓存容量
pub const DEFAULT_CACHE_CAPACITY: usize = 500_000;
/// 默认缓存空闲过期时间
pub const DEFAULT_CACHE_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// 规则来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOrigin {
    Embedded,           // 内置规则（编译期 include）
    LocalFile(PathBuf), // 单个本地规则文件
    LocalDir(PathBuf),  // 本地规则目录（按文件名顺序加载全部 .json）
    Inline(String),     // 内存中的规则文本
}

/// 结果缓存选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// 最大条目数，0 表示禁用缓存
    pub capacity: usize,
    /// 条目空闲超过该时长即过期
    pub idle_timeout: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            idle_timeout: DEFAULT_CACHE_IDLE_TIMEOUT,
        }
    }
}

impl CacheOptions {
    pub fn disabled() -> Self {
        Self {
            capacity: 0,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }
}

/// 完整分析器配置
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub origin: RuleOrigin,
    pub cache: CacheOptions,
    /// 并发 Worker 数量
    pub worker_count: usize,
    /// 输出规则匹配过程日志
    pub verbose: bool,
    /// 只保留能产出这些字段的规则（None 表示全部保留）
    pub wanted_fields: Option<Vec<String>>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            origin: RuleOrigin::Embedded,
            cache: CacheOptions::default(),
            worker_count: default_worker_count(),
            verbose: false,
            wanted_fields: None,
        }
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl AnalyzerConfig {
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::new()
    }

    /// 内置规则
    pub fn embedded() -> Self {
        Self::default()
    }

    /// 本地规则文件
    pub fn local_file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: RuleOrigin::LocalFile(path.into()),
            ..Self::default()
        }
    }

    /// 本地规则目录
    pub fn local_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: RuleOrigin::LocalDir(path.into()),
            ..Self::default()
        }
    }

    /// 内存规则文本
    pub fn inline(rules: impl Into<String>) -> Self {
        Self {
            origin: RuleOrigin::Inline(rules.into()),
            ..Self::default()
        }
    }

    /// 配置合法性检查（分析器创建前调用）
    pub fn validate(&self) -> UaResult<()> {
        if self.worker_count == 0 {
            return Err(UserAgentError::InvalidInput(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if let Some(fields) = &self.wanted_fields {
            if fields.iter().any(|f| f.trim().is_empty()) {
                return Err(UserAgentError::InvalidInput(
                    "wanted_fields contains an empty field name".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// 自定义构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: RuleOrigin) -> Self {
        self.config.origin = origin;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache.capacity = capacity;
        self
    }

    pub fn cache_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.config.cache.idle_timeout = idle_timeout;
        self
    }

    pub fn disable_cache(mut self) -> Self {
        self.config.cache = CacheOptions::disabled();
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn wanted_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.wanted_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}
