//! 单次分析流水线：Resetting → Extracting → Finalizing → Done
use rsuseragent_engine::utils::preview_compact;
use rsuseragent_engine::{FieldRecord, PostProcessor, Rule};

use crate::rule::RuleSet;
use crate::tokenizer::Tokenizer;

/// 分析阶段（仅用于跟踪日志与诊断）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisPhase {
    #[default]
    Idle,
    Resetting,
    Extracting,
    Finalizing,
    Done,
}

/// 流水线执行上下文：借用 Worker 独占的规则实例与记录
pub struct AnalysisPipeline<'a> {
    pub rule_set: &'a RuleSet,
    pub tokenizer: &'a dyn Tokenizer,
    pub verbose: bool,
}

impl AnalysisPipeline<'_> {
    /// 完整执行一次分析，结果写入 record（record 被重置并绑定到 input）
    pub fn run(
        &self,
        input: &str,
        rules: &mut [Box<dyn Rule>],
        record: &mut FieldRecord,
        phase: &mut AnalysisPhase,
    ) {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("analyze", input_len = input.len()).entered();

        Self::enter(phase, AnalysisPhase::Resetting);
        for rule in rules.iter_mut() {
            rule.reset();
        }
        record.reset_for(input);

        Self::enter(phase, AnalysisPhase::Extracting);
        let index = self.rule_set.index();
        let verbose = self.verbose;
        let outcome = {
            let mut sink = |path: &str, value: &str| {
                if verbose {
                    log::trace!("[Extract] {} = {}", path, preview_compact(value, 120));
                }
                index.dispatch(path, value, |handle| {
                    if let Some(rule) = rules.get_mut(handle.index()) {
                        rule.inform(path, value, record);
                    }
                });
            };
            self.tokenizer.tokenize(input, &mut sink)
        };
        if outcome.syntax_error {
            log::debug!("Syntax error in: {}", preview_compact(input, 120));
            record.set_syntax_error();
        }

        Self::enter(phase, AnalysisPhase::Finalizing);
        for rule in rules.iter_mut() {
            rule.finalize(record);
        }

        PostProcessor::run(record);
        Self::enter(phase, AnalysisPhase::Done);
    }

    #[inline(always)]
    fn enter(phase: &mut AnalysisPhase, next: AnalysisPhase) {
        log::trace!("[Pipeline] {:?} -> {:?}", phase, next);
        *phase = next;
    }
}
