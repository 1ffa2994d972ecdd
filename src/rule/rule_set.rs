//! 规则集：编译后的规则模板 + 冻结的兴趣索引 + 字段全集
//! 构建一次，之后只读，通过 Arc 在所有 Worker 间共享
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use rsuseragent_engine::fields::{self, HARD_CODED_GENERATED_FIELDS, STANDARD_FIELDS};
use rsuseragent_engine::{
    CoreError, FieldRecord, InterestIndex, InterestIndexBuilder, Rule, RuleHandle, RuleTemplate,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::AnalyzerConfig;
use crate::error::{UaResult, UserAgentError};
use crate::rule::loader::RuleLoader;
use crate::rule::matcher::{MatcherOptions, PatternMatcher};
use crate::rule::model::{RuleDefinitions, TestDef};

/// 构建选项
#[derive(Debug, Clone, Default)]
pub struct RuleSetOptions {
    pub wanted_fields: Option<Vec<String>>,
    pub verbose: bool,
}

impl From<&AnalyzerConfig> for RuleSetOptions {
    fn from(config: &AnalyzerConfig) -> Self {
        Self {
            wanted_fields: config.wanted_fields.clone(),
            verbose: config.verbose,
        }
    }
}

/// 构建统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files: usize,
    pub lookups: usize,
    pub matchers: usize,
    pub dropped: usize,
    pub index_keys: usize,
    pub test_cases: usize,
    pub elapsed_ms: u128,
}

pub struct RuleSet {
    templates: Vec<Box<dyn RuleTemplate>>,
    index: InterestIndex,
    field_universe: BTreeSet<String>,
    test_cases: Vec<TestDef>,
    stats: BuildStats,
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.templates.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl RuleSet {
    /// 按配置加载规则文件并构建
    pub fn load(config: &AnalyzerConfig) -> UaResult<Self> {
        let defs = RuleLoader::new().load(&config.origin)?;
        Self::build(defs, &RuleSetOptions::from(config))
    }

    /// 异步加载规则文件并构建
    #[cfg(feature = "async-io")]
    pub async fn load_async(config: &AnalyzerConfig) -> UaResult<Self> {
        let defs = RuleLoader::new().load_async(&config.origin).await?;
        Self::build(defs, &RuleSetOptions::from(config))
    }

    /// 从规则定义构建：编译匹配器 → 丢弃无用规则 → 注册兴趣 → 冻结索引
    pub fn build(defs: RuleDefinitions, options: &RuleSetOptions) -> UaResult<Self> {
        let start = Instant::now();

        let lookups: FxHashMap<String, Arc<FxHashMap<String, String>>> = defs
            .lookups
            .into_iter()
            .map(|(name, map)| (name, Arc::new(map)))
            .collect();
        let wanted: Option<FxHashSet<String>> = options
            .wanted_fields
            .as_ref()
            .map(|fields| fields.iter().cloned().collect());
        let matcher_options = MatcherOptions {
            wanted_fields: wanted.as_ref(),
            verbose: options.verbose,
        };

        let mut templates: Vec<Box<dyn RuleTemplate>> = Vec::with_capacity(defs.matchers.len());
        let mut dropped = 0usize;
        for sourced in &defs.matchers {
            let name = format!("{}[{}]", sourced.file, sourced.entry);
            match PatternMatcher::compile(name.as_str(), &sourced.def, &lookups, matcher_options) {
                Ok(matcher) => templates.push(Box::new(matcher)),
                Err(CoreError::UselessRule(reason)) => {
                    log::warn!("Dropping useless matcher {}", reason);
                    dropped += 1;
                }
                Err(e) => {
                    return Err(UserAgentError::RuleParse(format!("Matcher {}: {}", name, e)));
                }
            }
        }

        let mut rule_set = Self::assemble(templates, defs.tests)?;
        rule_set.stats.files = defs.files.len();
        rule_set.stats.lookups = lookups.len();
        rule_set.stats.dropped = dropped;
        rule_set.stats.elapsed_ms = start.elapsed().as_millis();
        rule_set.log_stats();
        Ok(rule_set)
    }

    /// 直接使用自定义规则模板构建（不经过规则文件）
    pub fn from_templates(templates: Vec<Box<dyn RuleTemplate>>) -> UaResult<Self> {
        let start = Instant::now();
        let mut rule_set = Self::assemble(templates, Vec::new())?;
        rule_set.stats.elapsed_ms = start.elapsed().as_millis();
        rule_set.log_stats();
        Ok(rule_set)
    }

    fn assemble(templates: Vec<Box<dyn RuleTemplate>>, test_cases: Vec<TestDef>) -> UaResult<Self> {
        let mut builder = InterestIndexBuilder::new();
        let mut field_universe: BTreeSet<String> = STANDARD_FIELDS
            .iter()
            .chain(HARD_CODED_GENERATED_FIELDS)
            .map(|f| f.to_string())
            .collect();

        for (position, template) in templates.iter().enumerate() {
            let handle = RuleHandle::from_index(position)?;
            let registered = template.register_interests(handle, &mut builder);
            log::trace!("Rule {} {} registered {} keys", handle, template.name(), registered);
            field_universe.extend(template.possible_field_names());
        }

        let index = builder.build();
        let stats = BuildStats {
            matchers: templates.len(),
            index_keys: index.len(),
            test_cases: test_cases.len(),
            ..BuildStats::default()
        };

        Ok(Self {
            templates,
            index,
            field_universe,
            test_cases,
            stats,
        })
    }

    fn log_stats(&self) {
        let stats = &self.stats;
        log::info!(
            "Building {} (dropped {}) matchers from {} files took {} msec resulted in {} hashmap entries",
            stats.matchers,
            stats.dropped,
            stats.files,
            stats.elapsed_ms,
            stats.index_keys
        );
        log::info!("Analyzer stats");
        log::info!("Lookups      : {}", stats.lookups);
        log::info!(
            "Matchers     : {} (total:{} ; dropped: {})",
            stats.matchers,
            stats.matchers + stats.dropped,
            stats.dropped
        );
        log::info!("Hashmap size : {}", stats.index_keys);
        log::info!("Testcases    : {}", stats.test_cases);
    }

    /// 为一个 Worker 创建全新的规则实例数组（下标即 RuleHandle）
    pub fn instantiate_rules(&self) -> Vec<Box<dyn Rule>> {
        self.templates.iter().map(|t| t.instantiate()).collect()
    }

    /// 创建预置字段全集的空记录
    pub fn new_record(&self, user_agent_string: &str) -> FieldRecord {
        FieldRecord::with_field_universe(user_agent_string, &self.field_universe)
    }

    pub fn index(&self) -> &InterestIndex {
        &self.index
    }

    pub fn rule_count(&self) -> usize {
        self.templates.len()
    }

    pub fn test_cases(&self) -> &[TestDef] {
        &self.test_cases
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// 规则集可能产出的全部字段名
    pub fn all_possible_field_names(&self) -> &BTreeSet<String> {
        &self.field_universe
    }

    /// 全部字段名：固定前缀 + 字母序
    pub fn all_possible_field_names_sorted(&self) -> Vec<String> {
        fields::sort_field_names(&self.field_universe)
    }
}
