//! 内嵌测试用例执行与报告
use std::fmt;

use rsuseragent_engine::FieldRecord;
use serde::Serialize;

use crate::rule::TestDef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestFailure {
    pub input: String,
    pub field: String,
    pub expected: String,
    /// None 表示结果中不存在该字段
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestReport {
    pub total: usize,
    pub passed: usize,
    pub failures: Vec<TestFailure>,
}

impl TestReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tests: {} passed / {} total", self.passed, self.total)?;
        for failure in &self.failures {
            writeln!(
                f,
                "  FAIL '{}' {}: expected '{}' got '{}'",
                failure.input,
                failure.field,
                failure.expected,
                failure.actual.as_deref().unwrap_or("<missing>")
            )?;
        }
        Ok(())
    }
}

pub(crate) struct TestCaseRunner;

impl TestCaseRunner {
    pub(crate) fn run<F>(tests: &[TestDef], mut analyze: F) -> TestReport
    where
        F: FnMut(&str) -> FieldRecord,
    {
        let mut report = TestReport {
            total: tests.len(),
            ..TestReport::default()
        };

        for test in tests {
            let input = test.input.user_agent_string.as_str();
            let record = analyze(input);

            // 无期望值的用例只输出结果，方便补写期望
            if test.expected.is_empty() {
                log::info!("Result for '{}':\n{}", input, record);
                log::info!("{}", record.to_test_case());
                report.passed += 1;
                continue;
            }

            let before = report.failures.len();
            for (field, expected) in &test.expected {
                let actual = record.value(field);
                if actual != Some(expected.as_str()) {
                    report.failures.push(TestFailure {
                        input: input.to_string(),
                        field: field.clone(),
                        expected: expected.clone(),
                        actual: actual.map(str::to_string),
                    });
                }
            }
            if report.failures.len() == before {
                report.passed += 1;
            } else {
                log::warn!(
                    "Test failed ({}): '{}'",
                    test.metadata
                        .get("filename")
                        .map(String::as_str)
                        .unwrap_or("<inline>"),
                    input
                );
            }
        }

        log::info!("Ran {} tests, {} passed", report.total, report.passed);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::TestInput;
    use std::collections::BTreeMap;

    fn test_def(ua: &str, expected: &[(&str, &str)]) -> TestDef {
        TestDef {
            options: Vec::new(),
            input: TestInput {
                user_agent_string: ua.to_string(),
                name: None,
            },
            expected: expected
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            metadata: BTreeMap::new(),
        }
    }

    fn analyze(ua: &str) -> FieldRecord {
        let mut record = FieldRecord::new(ua);
        record.set("AgentName", ua, 1);
        record
    }

    #[test]
    fn test_report_failures() {
        let tests = vec![
            test_def("A", &[("AgentName", "A")]),
            test_def("B", &[("AgentName", "X"), ("Missing", "Y")]),
            test_def("C", &[]),
        ];
        let report = TestCaseRunner::run(&tests, analyze);

        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].actual.as_deref(), Some("B"));
        assert_eq!(report.failures[1].field, "Missing");
        assert_eq!(report.failures[1].actual, None);
        assert!(!report.is_success());
        assert!(report.to_string().contains("FAIL 'B' AgentName"));
    }
}
