//! User-Agent 分析器：规则集 + Worker 池 + 结果缓存
use std::collections::BTreeSet;
use std::sync::Arc;

use rsuseragent_engine::FieldRecord;

use crate::analyzer::WorkerPool;
use crate::cache::{CacheStats, ResultCache};
use crate::config::AnalyzerConfig;
use crate::detector::testcase::{TestCaseRunner, TestReport};
use crate::error::UaResult;
use crate::rule::RuleSet;
use crate::tokenizer::{Tokenizer, UserAgentFlattener};

pub struct UserAgentAnalyzer {
    rule_set: Arc<RuleSet>,
    pool: WorkerPool,
    cache: ResultCache,
    config: AnalyzerConfig,
}

impl std::fmt::Debug for UserAgentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAgentAnalyzer")
            .field("rule_set", &self.rule_set)
            .field("workers", &self.pool.len())
            .field("cache", &self.cache.is_enabled())
            .finish()
    }
}

impl UserAgentAnalyzer {
    /// 按配置加载规则并创建分析器
    pub fn new(config: AnalyzerConfig) -> UaResult<Self> {
        config.validate()?;
        let rule_set = RuleSet::load(&config)?;
        Self::with_rule_set(Arc::new(rule_set), config)
    }

    /// 异步读取规则文件并创建分析器
    #[cfg(feature = "async-io")]
    pub async fn new_async(config: AnalyzerConfig) -> UaResult<Self> {
        config.validate()?;
        let rule_set = RuleSet::load_async(&config).await?;
        Self::with_rule_set(Arc::new(rule_set), config)
    }

    /// 复用已构建的规则集（config.origin 被忽略）
    pub fn with_rule_set(rule_set: Arc<RuleSet>, config: AnalyzerConfig) -> UaResult<Self> {
        Self::with_tokenizer(rule_set, Arc::new(UserAgentFlattener::new()), config)
    }

    /// 使用自定义分词器
    pub fn with_tokenizer(
        rule_set: Arc<RuleSet>,
        tokenizer: Arc<dyn Tokenizer>,
        config: AnalyzerConfig,
    ) -> UaResult<Self> {
        config.validate()?;
        let pool = WorkerPool::new(Arc::clone(&rule_set), tokenizer, config.worker_count, config.verbose);
        let cache = ResultCache::new(&config.cache);
        log::info!(
            "Analyzer ready: {} rules, {} workers, cache capacity {}",
            rule_set.rule_count(),
            pool.len(),
            config.cache.capacity
        );
        Ok(Self {
            rule_set,
            pool,
            cache,
            config,
        })
    }

    /// 解析 User-Agent；相同输入返回相同结果，返回值归调用方所有
    pub fn parse(&self, input: &str) -> FieldRecord {
        if let Some(record) = self.cache.lookup(input) {
            log::trace!("Cache hit");
            return record;
        }
        let record = self.pool.analyze(input);
        self.cache.insert(input, &record);
        record
    }

    /// 跳过缓存直接分析
    pub fn parse_uncached(&self, input: &str) -> FieldRecord {
        self.pool.analyze(input)
    }

    pub fn all_possible_field_names(&self) -> &BTreeSet<String> {
        self.rule_set.all_possible_field_names()
    }

    pub fn all_possible_field_names_sorted(&self) -> Vec<String> {
        self.rule_set.all_possible_field_names_sorted()
    }

    /// 执行规则文件内嵌的全部测试用例
    pub fn run_test_cases(&self) -> TestReport {
        TestCaseRunner::run(self.rule_set.test_cases(), |input| self.parse_uncached(input))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn rule_set(&self) -> &Arc<RuleSet> {
        &self.rule_set
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}
