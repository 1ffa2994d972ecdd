//! 模式匹配规则
//!
//! require 语法：
//! - `PATH`：出现过该路径的事件
//! - `PATH="literal"`：出现过该路径且值（忽略大小写）等于字面量的事件
//!
//! extract 语法：`Field : confidence : SOURCE`
//! - `"literal"`：固定值
//! - `PATH`：该路径的第一个事件值
//! - `PATH@ANCHOR="literal"`：锚点事件命中之后出现的第一个 PATH 值（锚点路径再次出现其他值时失效）
//! - `LookUp[name;SOURCE]`：对 SOURCE 的结果查表（忽略大小写）
//!
//! 所有 require 满足且所有 extract 可解析时，在 finalize 阶段一次性写入
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use rsuseragent_engine::indexer::literal_key;
use rsuseragent_engine::utils::preview_compact;
use rsuseragent_engine::{
    CoreError, CoreResult, FieldRecord, InterestIndexBuilder, Rule, RuleHandle, RuleTemplate,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::rule::model::MatcherDef;

const LOOKUP_PREFIX: &str = "lookup[";

/// 事件路径：点分隔的标识符段
static PATH_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)*$").expect("static regex"));

/// 事件观察槽
#[derive(Debug, Clone, PartialEq, Eq)]
enum Watch {
    /// 路径匹配（可选值匹配）
    Exact { path: String, literal: Option<String> },
    /// 锚点之后的路径值
    Anchored { path: String, anchor: String, literal: String },
}

impl Watch {
    fn interest_keys(&self) -> Vec<String> {
        match self {
            Watch::Exact { path, literal: Some(literal) } => vec![literal_key(path, literal)],
            Watch::Exact { path, literal: None } => vec![path.clone()],
            Watch::Anchored { path, anchor, .. } => vec![anchor.clone(), path.clone()],
        }
    }
}

/// extract 值来源
#[derive(Debug, Clone)]
enum ValueSource {
    Literal(String),
    Slot(usize),
    Lookup {
        name: String,
        table: Arc<FxHashMap<String, String>>,
        inner: Box<ValueSource>,
    },
}

#[derive(Debug, Clone)]
struct Extract {
    field: String,
    confidence: i64,
    source: ValueSource,
}

/// 编译后的匹配器（只读，所有 Worker 共享）
#[derive(Debug)]
struct CompiledMatcher {
    name: String,
    watches: Vec<Watch>,
    /// require 对应的观察槽
    requires: Vec<usize>,
    extracts: Vec<Extract>,
    keys: Vec<String>,
    verbose: bool,
}

/// 匹配器模板
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    compiled: Arc<CompiledMatcher>,
}

/// 编译选项
#[derive(Debug, Default, Clone, Copy)]
pub struct MatcherOptions<'a> {
    /// 只保留产出这些字段的 extract
    pub wanted_fields: Option<&'a FxHashSet<String>>,
    /// 强制开启匹配日志
    pub verbose: bool,
}

impl PatternMatcher {
    /// 编译匹配器定义
    /// - 表达式语法错误 / 引用不存在的查找表：ExpressionParseError / UnknownLookup
    /// - 无任何 extract（或全部被字段过滤）/ 不订阅任何事件：UselessRule
    pub fn compile(
        name: impl Into<String>,
        def: &MatcherDef,
        lookups: &FxHashMap<String, Arc<FxHashMap<String, String>>>,
        options: MatcherOptions<'_>,
    ) -> CoreResult<Self> {
        let name = name.into();
        let mut watches = Vec::new();

        let mut requires = Vec::with_capacity(def.require.len());
        for expression in &def.require {
            let watch = parse_require(expression)?;
            requires.push(add_watch(&mut watches, watch));
        }

        let mut extracts = Vec::with_capacity(def.extract.len());
        for expression in &def.extract {
            let extract = parse_extract(expression, lookups, &mut watches)?;
            let wanted = options
                .wanted_fields
                .map_or(true, |fields| fields.contains(&extract.field));
            if wanted {
                extracts.push(extract);
            }
        }
        if extracts.is_empty() {
            return Err(CoreError::UselessRule(format!("{}: nothing to extract", name)));
        }

        let mut keys: Vec<String> = watches.iter().flat_map(Watch::interest_keys).collect();
        keys.sort_unstable();
        keys.dedup();
        if keys.is_empty() {
            return Err(CoreError::UselessRule(format!("{}: no interest in any event", name)));
        }

        Ok(Self {
            compiled: Arc::new(CompiledMatcher {
                name,
                watches,
                requires,
                extracts,
                keys,
                verbose: options.verbose || def.has_option("verbose"),
            }),
        })
    }

    /// 订阅的事件键（小写）
    pub fn interest_keys(&self) -> &[String] {
        &self.compiled.keys
    }
}

/// 相同观察槽复用（同一路径被多个表达式引用时只观察一次）
fn add_watch(watches: &mut Vec<Watch>, watch: Watch) -> usize {
    if let Some(pos) = watches.iter().position(|w| *w == watch) {
        return pos;
    }
    watches.push(watch);
    watches.len() - 1
}

fn parse_error(expression: &str, reason: &str) -> CoreError {
    CoreError::ExpressionParseError(format!("{} ({})", expression, reason))
}

fn validate_path<'a>(path: &'a str, expression: &str) -> CoreResult<&'a str> {
    let path = path.trim();
    if PATH_SYNTAX.is_match(path) {
        Ok(path)
    } else {
        Err(parse_error(expression, "invalid path"))
    }
}

/// `"literal"` → literal
fn parse_quoted<'a>(text: &'a str, expression: &str) -> CoreResult<&'a str> {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        Ok(&text[1..text.len() - 1])
    } else {
        Err(parse_error(expression, "expected a quoted literal"))
    }
}

/// `PATH` 或 `PATH="literal"`
fn parse_path_condition(text: &str, expression: &str) -> CoreResult<(String, Option<String>)> {
    match text.split_once('=') {
        Some((path, literal)) => {
            let path = validate_path(path, expression)?;
            let literal = parse_quoted(literal, expression)?;
            Ok((path.to_lowercase(), Some(literal.to_lowercase())))
        }
        None => Ok((validate_path(text, expression)?.to_lowercase(), None)),
    }
}

fn parse_require(expression: &str) -> CoreResult<Watch> {
    let (path, literal) = parse_path_condition(expression, expression)?;
    Ok(Watch::Exact { path, literal })
}

fn parse_extract(
    expression: &str,
    lookups: &FxHashMap<String, Arc<FxHashMap<String, String>>>,
    watches: &mut Vec<Watch>,
) -> CoreResult<Extract> {
    let mut parts = expression.splitn(3, ':');
    let (Some(field), Some(confidence), Some(source)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(parse_error(expression, "expected Field:confidence:source"));
    };

    let field = field.trim();
    if field.is_empty() {
        return Err(parse_error(expression, "empty field name"));
    }
    let confidence: i64 = confidence
        .trim()
        .parse()
        .map_err(|_| parse_error(expression, "confidence is not a number"))?;
    if confidence < 0 {
        return Err(parse_error(expression, "confidence must not be negative"));
    }

    Ok(Extract {
        field: field.to_string(),
        confidence,
        source: parse_source(source.trim(), expression, lookups, watches)?,
    })
}

fn parse_source(
    text: &str,
    expression: &str,
    lookups: &FxHashMap<String, Arc<FxHashMap<String, String>>>,
    watches: &mut Vec<Watch>,
) -> CoreResult<ValueSource> {
    if text.starts_with('"') {
        return Ok(ValueSource::Literal(parse_quoted(text, expression)?.to_string()));
    }

    let is_lookup = text
        .get(..LOOKUP_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(LOOKUP_PREFIX));
    if is_lookup {
        let body = text[LOOKUP_PREFIX.len()..]
            .strip_suffix(']')
            .ok_or_else(|| parse_error(expression, "unterminated LookUp["))?;
        let (name, inner) = body
            .split_once(';')
            .ok_or_else(|| parse_error(expression, "expected LookUp[name;source]"))?;
        let name = name.trim();
        let table = lookups
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownLookup(name.to_string()))?;
        let inner = parse_source(inner.trim(), expression, lookups, watches)?;
        return Ok(ValueSource::Lookup {
            name: name.to_string(),
            table,
            inner: Box::new(inner),
        });
    }

    let watch = match text.split_once('@') {
        Some((path, anchor)) => {
            let path = validate_path(path, expression)?.to_lowercase();
            let (anchor, literal) = parse_path_condition(anchor, expression)?;
            let literal =
                literal.ok_or_else(|| parse_error(expression, "anchor needs a literal value"))?;
            Watch::Anchored { path, anchor, literal }
        }
        None => Watch::Exact {
            path: validate_path(text, expression)?.to_lowercase(),
            literal: None,
        },
    };
    Ok(ValueSource::Slot(add_watch(watches, watch)))
}

impl RuleTemplate for PatternMatcher {
    fn name(&self) -> &str {
        &self.compiled.name
    }

    fn instantiate(&self) -> Box<dyn Rule> {
        let slots = self.compiled.watches.len();
        Box::new(MatcherState {
            compiled: Arc::clone(&self.compiled),
            captured: vec![None; slots],
            anchor_active: vec![false; slots],
        })
    }

    fn register_interests(&self, handle: RuleHandle, builder: &mut InterestIndexBuilder) -> usize {
        self.compiled
            .keys
            .iter()
            .map(|key| builder.register_key(key, handle))
            .sum()
    }

    fn possible_field_names(&self) -> Vec<String> {
        self.compiled.extracts.iter().map(|e| e.field.clone()).collect()
    }
}

/// Worker 私有的匹配进度
struct MatcherState {
    compiled: Arc<CompiledMatcher>,
    captured: Vec<Option<String>>,
    anchor_active: Vec<bool>,
}

impl MatcherState {
    fn resolve(&self, source: &ValueSource) -> Option<String> {
        match source {
            ValueSource::Literal(value) => Some(value.clone()),
            ValueSource::Slot(slot) => self.captured.get(*slot).cloned().flatten(),
            ValueSource::Lookup { name, table, inner } => {
                let key = self.resolve(inner)?;
                let found = table.get(&key.to_lowercase()).cloned();
                if found.is_none() && self.compiled.verbose {
                    log::info!("[{}] LookUp[{}] has no entry for {:?}", self.compiled.name, name, key);
                }
                found
            }
        }
    }
}

impl Rule for MatcherState {
    fn reset(&mut self) {
        self.captured.iter_mut().for_each(|c| *c = None);
        self.anchor_active.iter_mut().for_each(|a| *a = false);
    }

    fn inform(&mut self, path: &str, value: &str, _record: &mut FieldRecord) {
        let mut lowered: Option<String> = None;
        let mut lowered_value = || lowered.get_or_insert_with(|| value.to_lowercase()).clone();

        for (slot, watch) in self.compiled.watches.iter().enumerate() {
            match watch {
                Watch::Exact { path: watched, literal } => {
                    if self.captured[slot].is_some() || !path.eq_ignore_ascii_case(watched) {
                        continue;
                    }
                    if literal.as_ref().map_or(true, |lit| *lit == lowered_value()) {
                        self.captured[slot] = Some(value.to_string());
                    }
                }
                Watch::Anchored { path: watched, anchor, literal } => {
                    if path.eq_ignore_ascii_case(anchor) {
                        self.anchor_active[slot] = *literal == lowered_value();
                    } else if self.anchor_active[slot]
                        && self.captured[slot].is_none()
                        && path.eq_ignore_ascii_case(watched)
                    {
                        self.captured[slot] = Some(value.to_string());
                    }
                }
            }
        }
    }

    fn finalize(&mut self, record: &mut FieldRecord) {
        let compiled = Arc::clone(&self.compiled);

        if let Some(missing) = compiled.requires.iter().find(|slot| self.captured[**slot].is_none()) {
            if compiled.verbose {
                log::info!("[{}] require not met: {:?}", compiled.name, compiled.watches[*missing]);
            }
            return;
        }

        let mut resolved = Vec::with_capacity(compiled.extracts.len());
        for extract in &compiled.extracts {
            match self.resolve(&extract.source) {
                Some(value) => resolved.push((extract, value)),
                None => {
                    if compiled.verbose {
                        log::info!("[{}] extract unresolved: {}", compiled.name, extract.field);
                    }
                    return;
                }
            }
        }

        for (extract, value) in resolved {
            let applied = record.set(&extract.field, &value, extract.confidence);
            if compiled.verbose {
                log::info!(
                    "[{}] {} {} = {} ({})",
                    compiled.name,
                    if applied { "USE " } else { "SKIP" },
                    extract.field,
                    preview_compact(&value, 80),
                    extract.confidence
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Tokenizer, UserAgentFlattener};

    fn def(require: &[&str], extract: &[&str]) -> MatcherDef {
        MatcherDef {
            options: Vec::new(),
            require: require.iter().map(|s| s.to_string()).collect(),
            extract: extract.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn compile(def: &MatcherDef) -> CoreResult<PatternMatcher> {
        let mut table = FxHashMap::default();
        table.insert("10.0".to_string(), "10".to_string());
        let mut lookups = FxHashMap::default();
        lookups.insert("WindowsVersions".to_string(), Arc::new(table));
        PatternMatcher::compile("test", def, &lookups, MatcherOptions::default())
    }

    /// 不经过索引，直接把全部事件喂给规则实例
    fn run(matcher: &PatternMatcher, ua: &str) -> FieldRecord {
        let mut rule = matcher.instantiate();
        let mut record = FieldRecord::new(ua);
        rule.reset();
        let mut sink = |path: &str, value: &str| rule.inform(path, value, &mut record);
        UserAgentFlattener::new().tokenize(ua, &mut sink);
        rule.finalize(&mut record);
        record
    }

    const CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

    #[test]
    fn test_require_and_anchored_extract() {
        let matcher = compile(&def(
            &["agent.product.name=\"Chrome\""],
            &[
                "AgentName:200:\"Chrome\"",
                "AgentVersion:200:agent.product.version@agent.product.name=\"Chrome\"",
            ],
        ))
        .unwrap();

        let record = run(&matcher, CHROME);
        assert_eq!(record.value("AgentName"), Some("Chrome"));
        assert_eq!(record.value("AgentVersion"), Some("91.0.4472.124"));
        assert_eq!(record.confidence("AgentVersion"), Some(200));
    }

    #[test]
    fn test_require_not_met_writes_nothing() {
        let matcher = compile(&def(
            &["agent.product.name=\"Firefox\""],
            &["AgentName:300:\"Firefox\""],
        ))
        .unwrap();
        let record = run(&matcher, CHROME);
        assert_eq!(record.confidence("AgentName"), Some(-1));
    }

    #[test]
    fn test_lookup_source() {
        let matcher = compile(&def(
            &[],
            &["OperatingSystemVersion:100:LookUp[WindowsVersions;agent.product.comments.entry.version@agent.product.comments.entry.name=\"Windows NT\"]"],
        ))
        .unwrap();
        let record = run(&matcher, CHROME);
        assert_eq!(record.value("OperatingSystemVersion"), Some("10"));
    }

    #[test]
    fn test_plain_path_takes_first_value() {
        let matcher = compile(&def(&[], &["FirstProduct:1:agent.product.name"])).unwrap();
        let record = run(&matcher, CHROME);
        assert_eq!(record.value("FirstProduct"), Some("Mozilla"));
    }

    #[test]
    fn test_reset_clears_progress() {
        let matcher = compile(&def(
            &["agent.product.name=\"Chrome\""],
            &["AgentName:200:\"Chrome\""],
        ))
        .unwrap();
        let mut rule = matcher.instantiate();
        let mut record = FieldRecord::new("x");
        rule.inform("agent.product.name", "Chrome", &mut record);
        rule.reset();
        rule.finalize(&mut record);
        assert_eq!(record.confidence("AgentName"), Some(-1));
    }

    #[test]
    fn test_useless_matchers() {
        assert!(matches!(
            compile(&def(&[], &["AgentName:1:\"Fixed\""])),
            Err(CoreError::UselessRule(_))
        ));
        assert!(matches!(
            compile(&def(&["agent"], &[])),
            Err(CoreError::UselessRule(_))
        ));

        let wanted: FxHashSet<String> = ["DeviceClass".to_string()].into_iter().collect();
        let options = MatcherOptions {
            wanted_fields: Some(&wanted),
            verbose: false,
        };
        let result = PatternMatcher::compile(
            "filtered",
            &def(&["agent"], &["AgentName:1:agent.product.name"]),
            &FxHashMap::default(),
            options,
        );
        assert!(matches!(result, Err(CoreError::UselessRule(_))));
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "AgentName:abc:\"x\"",
            "AgentName:1",
            ":1:\"x\"",
            "AgentName:1:agent product",
            "AgentName:1:agent..product",
            "AgentName:1:.agent",
            "AgentName:1:agent@agent.product.name",
            "AgentName:-1:agent",
        ] {
            let result = compile(&def(&[], &[bad]));
            assert!(
                matches!(result, Err(CoreError::ExpressionParseError(_))),
                "expected parse error for {}",
                bad
            );
        }
        assert!(matches!(
            compile(&def(&[], &["F:1:LookUp[Missing;agent]"])),
            Err(CoreError::UnknownLookup(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_interest_keys() {
        let matcher = compile(&def(
            &["agent.product.name=\"Chrome\""],
            &["AgentVersion:1:agent.product.version@agent.product.name=\"Chrome\""],
        ))
        .unwrap();
        assert_eq!(
            matcher.interest_keys(),
            &[
                "agent.product.name".to_string(),
                "agent.product.name=\"chrome\"".to_string(),
                "agent.product.version".to_string(),
            ]
        );
        assert_eq!(matcher.possible_field_names(), vec!["AgentVersion".to_string()]);
    }
}
