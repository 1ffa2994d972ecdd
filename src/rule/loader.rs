//! 规则文件加载
//! - 多文件按文件名排序后依次加载（结果确定）
//! - 结构错误一律视为配置错误，构建失败
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::config::RuleOrigin;
use crate::error::{UaResult, UserAgentError};
use crate::rule::model::{LookupDef, MatcherDef, RuleDefinitions, SourcedMatcher, TestDef};

/// 规则文件扩展名
const RULE_FILE_EXTENSION: &str = "json";

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleLoader;

impl RuleLoader {
    pub fn new() -> Self {
        Self
    }

    /// 按规则来源加载全部定义
    pub fn load(&self, origin: &RuleOrigin) -> UaResult<RuleDefinitions> {
        log::info!("Loading rules from: {:?}", origin);
        let sources = match origin {
            RuleOrigin::Embedded => vec![embedded_source()?],
            RuleOrigin::Inline(content) => vec![("inline".to_string(), content.clone())],
            RuleOrigin::LocalFile(path) => {
                vec![(file_name_of(path), std::fs::read_to_string(path)?)]
            }
            RuleOrigin::LocalDir(dir) => {
                let mut sources = Vec::new();
                for path in list_rule_files(dir)? {
                    sources.push((file_name_of(&path), std::fs::read_to_string(&path)?));
                }
                sources
            }
        };
        self.load_sources(sources)
    }

    /// 异步加载（tokio::fs 读取文件，解析仍为同步）
    #[cfg(feature = "async-io")]
    pub async fn load_async(&self, origin: &RuleOrigin) -> UaResult<RuleDefinitions> {
        log::info!("Loading rules (async) from: {:?}", origin);
        let sources = match origin {
            RuleOrigin::Embedded => vec![embedded_source()?],
            RuleOrigin::Inline(content) => vec![("inline".to_string(), content.clone())],
            RuleOrigin::LocalFile(path) => {
                vec![(file_name_of(path), tokio::fs::read_to_string(path).await?)]
            }
            RuleOrigin::LocalDir(dir) => {
                let mut entries = tokio::fs::read_dir(dir).await?;
                let mut paths = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if is_rule_file(&path) {
                        paths.push(path);
                    }
                }
                sort_by_file_name(&mut paths);

                let mut sources = Vec::with_capacity(paths.len());
                for path in paths {
                    let content = tokio::fs::read_to_string(&path).await?;
                    sources.push((file_name_of(&path), content));
                }
                sources
            }
        };
        self.load_sources(sources)
    }

    /// 加载一组 (文件名, 内容)
    pub fn load_sources(&self, sources: Vec<(String, String)>) -> UaResult<RuleDefinitions> {
        if sources.is_empty() {
            return Err(UserAgentError::RuleLoadError(
                "Unable to find ANY rule files".to_string(),
            ));
        }

        let mut defs = RuleDefinitions::new();
        for (file_name, content) in &sources {
            self.load_str(&mut defs, file_name, content)?;
        }
        log::info!("Loaded {} rule files", defs.files.len());
        Ok(defs)
    }

    /// 解析单个规则文件并合并进 defs
    pub fn load_str(&self, defs: &mut RuleDefinitions, file_name: &str, content: &str) -> UaResult<()> {
        let root: Value = serde_json::from_str(content).map_err(|e| {
            UserAgentError::RuleConfig(format!("Rule config ({}): invalid JSON: {}", file_name, e))
        })?;

        let Value::Object(mut root) = root else {
            return Err(config_error(file_name, None, "File must be a Map"));
        };
        let entries = match root.remove("config") {
            None => return Err(config_error(file_name, None, "Missing 'config' top level entry")),
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(config_error(file_name, None, "Top level 'config' must be a List")),
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let entry_no = index + 1;
            let Value::Object(entry) = entry else {
                return Err(config_error(file_name, Some(entry_no), "Entry must be a Map"));
            };
            if entry.len() != 1 {
                let keys: Vec<String> = entry.keys().map(|k| format!("\"{}\"", k)).collect();
                return Err(config_error(
                    file_name,
                    Some(entry_no),
                    &format!("Entry has more than one child: {}", keys.join(" ")),
                ));
            }
            let Some((kind, value)) = entry.into_iter().next() else {
                return Err(config_error(file_name, Some(entry_no), "Entry is empty"));
            };

            match kind.as_str() {
                "lookup" => {
                    let lookup: LookupDef = parse_entry(file_name, entry_no, "lookup", value)?;
                    add_lookup(defs, file_name, entry_no, lookup)?;
                }
                "matcher" => {
                    let def: MatcherDef = parse_entry(file_name, entry_no, "matcher", value)?;
                    defs.matchers.push(SourcedMatcher {
                        file: file_name.to_string(),
                        entry: entry_no,
                        def,
                    });
                }
                "test" => {
                    if defs.single_test_mode {
                        continue;
                    }
                    let mut test: TestDef = parse_entry(file_name, entry_no, "test", value)?;
                    test.metadata.insert("filename".to_string(), file_name.to_string());
                    test.metadata.insert("fileentry".to_string(), entry_no.to_string());
                    if test.is_exclusive() {
                        log::info!(
                            "Test ({} [{}]) is exclusive, dropping all other tests",
                            file_name,
                            entry_no
                        );
                        defs.single_test_mode = true;
                        defs.tests.clear();
                    }
                    defs.tests.push(test);
                }
                other => {
                    return Err(config_error(
                        file_name,
                        Some(entry_no),
                        &format!(
                            "Found unexpected config entry: {}, allowed are 'lookup', 'matcher' and 'test'",
                            other
                        ),
                    ));
                }
            }
        }

        log::debug!(
            "Rule file {} loaded: {} matchers",
            file_name,
            defs.matcher_count_in(file_name)
        );
        defs.files.push(file_name.to_string());
        Ok(())
    }
}

fn config_error(file_name: &str, entry_no: Option<usize>, message: &str) -> UserAgentError {
    match entry_no {
        Some(no) => UserAgentError::RuleConfig(format!("Rule config ({} [{}]): {}", file_name, no, message)),
        None => UserAgentError::RuleConfig(format!("Rule config ({}): {}", file_name, message)),
    }
}

fn parse_entry<T: serde::de::DeserializeOwned>(
    file_name: &str,
    entry_no: usize,
    kind: &str,
    value: Value,
) -> UaResult<T> {
    if !value.is_object() {
        return Err(config_error(
            file_name,
            Some(entry_no),
            &format!("Entry '{}' must be a Map", kind),
        ));
    }
    serde_json::from_value(value).map_err(|e| {
        config_error(file_name, Some(entry_no), &format!("Invalid '{}' entry: {}", kind, e))
    })
}

/// 查找表键统一小写（所有比较大小写不敏感）
fn add_lookup(defs: &mut RuleDefinitions, file_name: &str, entry_no: usize, lookup: LookupDef) -> UaResult<()> {
    if defs.lookups.contains_key(&lookup.name) {
        return Err(config_error(
            file_name,
            Some(entry_no),
            &format!("Duplicate lookup name: {}", lookup.name),
        ));
    }
    let mut map = FxHashMap::with_capacity_and_hasher(lookup.map.len(), Default::default());
    for (key, value) in lookup.map {
        map.insert(key.to_lowercase(), value);
    }
    defs.lookups.insert(lookup.name, map);
    Ok(())
}

#[cfg(feature = "embedded-rules")]
fn embedded_source() -> UaResult<(String, String)> {
    Ok((
        crate::embedded_rules::DEFAULT_RULES_NAME.to_string(),
        crate::embedded_rules::DEFAULT_RULES_JSON.to_string(),
    ))
}

#[cfg(not(feature = "embedded-rules"))]
fn embedded_source() -> UaResult<(String, String)> {
    Err(UserAgentError::RuleLoadError(
        "embedded-rules feature 未启用".to_string(),
    ))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_rule_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(RULE_FILE_EXTENSION))
}

fn sort_by_file_name(paths: &mut [PathBuf]) {
    paths.sort_by_key(|p| file_name_of(p));
}

/// 目录下所有规则文件（按文件名排序）
fn list_rule_files(dir: &Path) -> UaResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_rule_file(&path) {
            paths.push(path);
        }
    }
    sort_by_file_name(&mut paths);
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(content: &str) -> UaResult<RuleDefinitions> {
        RuleLoader::new().load_sources(vec![("test.json".to_string(), content.to_string())])
    }

    #[test]
    fn test_load_all_entry_kinds() {
        let defs = load(
            r#"{ "config": [
                { "lookup": { "name": "Names", "map": { "ABC": "Abc" } } },
                { "matcher": { "require": ["agent.product.name=\"X\""], "extract": ["AgentName:1:\"X\""] } },
                { "test": { "input": { "user_agent_string": "X/1" }, "expected": { "AgentName": "X" } } }
            ] }"#,
        )
        .unwrap();

        assert_eq!(defs.lookups["Names"].get("abc").map(String::as_str), Some("Abc"));
        assert_eq!(defs.matchers.len(), 1);
        assert_eq!(defs.matchers[0].entry, 2);
        assert_eq!(defs.tests.len(), 1);
        assert_eq!(defs.tests[0].metadata["filename"], "test.json");
        assert_eq!(defs.tests[0].metadata["fileentry"], "3");
    }

    #[test]
    fn test_structure_errors() {
        let cases = [
            (r#"[]"#, "File must be a Map"),
            (r#"{ "other": [] }"#, "Missing 'config'"),
            (r#"{ "config": {} }"#, "must be a List"),
            (r#"{ "config": [ 1 ] }"#, "Entry must be a Map"),
            (r#"{ "config": [ { "lookup": {}, "test": {} } ] }"#, "more than one child"),
            (r#"{ "config": [ { "bogus": {} } ] }"#, "unexpected config entry: bogus"),
            (r#"{ "config": [ { "lookup": { "name": "A" } } ] }"#, "Invalid 'lookup'"),
            (r#"{ "config": [ { "matcher": { "extract": [], "other": [] } } ] }"#, "Invalid 'matcher'"),
        ];
        for (content, expected) in cases {
            match load(content) {
                Err(UserAgentError::RuleConfig(msg)) => {
                    assert!(msg.contains(expected), "{} => {}", content, msg)
                }
                other => panic!("{} => unexpected {:?}", content, other.map(|d| d.files)),
            }
        }
    }

    #[test]
    fn test_duplicate_lookup_rejected() {
        let result = load(
            r#"{ "config": [
                { "lookup": { "name": "A", "map": {} } },
                { "lookup": { "name": "A", "map": {} } }
            ] }"#,
        );
        assert!(matches!(result, Err(UserAgentError::RuleConfig(msg)) if msg.contains("Duplicate lookup")));
    }

    #[test]
    fn test_only_option_restricts_tests() {
        let defs = load(
            r#"{ "config": [
                { "test": { "input": { "user_agent_string": "a" }, "expected": { "F": "1" } } },
                { "test": { "options": ["only"], "input": { "user_agent_string": "b" }, "expected": { "F": "2" } } },
                { "test": { "input": { "user_agent_string": "c" }, "expected": { "F": "3" } } }
            ] }"#,
        )
        .unwrap();
        assert_eq!(defs.tests.len(), 1);
        assert_eq!(defs.tests[0].input.user_agent_string, "b");
    }

    #[test]
    fn test_no_sources_is_error() {
        let result = RuleLoader::new().load_sources(Vec::new());
        assert!(matches!(result, Err(UserAgentError::RuleLoadError(_))));
    }

    #[test]
    fn test_local_dir_sorted_by_file_name() {
        let dir = std::env::temp_dir().join(format!("rsuseragent-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("b.json"),
            r#"{ "config": [ { "matcher": { "extract": ["F:1:\"b\""] } } ] }"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("a.json"),
            r#"{ "config": [ { "matcher": { "extract": ["F:1:\"a\""] } } ] }"#,
        )
        .unwrap();
        std::fs::write(dir.join("ignored.txt"), "not a rule file").unwrap();

        let defs = RuleLoader::new()
            .load(&RuleOrigin::LocalDir(dir.clone()))
            .unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(defs.files, vec!["a.json", "b.json"]);
        assert_eq!(defs.matchers[0].file, "a.json");
    }

    #[cfg(feature = "embedded-rules")]
    #[test]
    fn test_embedded_rules_load() {
        let defs = RuleLoader::new().load(&RuleOrigin::Embedded).unwrap();
        assert!(!defs.matchers.is_empty());
        assert!(!defs.tests.is_empty());
    }
}
