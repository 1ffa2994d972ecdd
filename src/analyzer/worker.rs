//! Worker：独占一组规则实例 + 一条复用的记录
//! 同一 Worker 上的请求通过互斥锁串行执行，规则集本身只读共享
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rsuseragent_engine::{FieldRecord, Rule};

use crate::analyzer::pipeline::{AnalysisPhase, AnalysisPipeline};
use crate::rule::RuleSet;
use crate::tokenizer::Tokenizer;

struct WorkerState {
    rules: Vec<Box<dyn Rule>>,
    record: FieldRecord,
    phase: AnalysisPhase,
}

pub struct Worker {
    id: usize,
    rule_set: Arc<RuleSet>,
    tokenizer: Arc<dyn Tokenizer>,
    verbose: bool,
    state: Mutex<WorkerState>,
}

impl Worker {
    pub fn new(id: usize, rule_set: Arc<RuleSet>, tokenizer: Arc<dyn Tokenizer>, verbose: bool) -> Self {
        let state = WorkerState {
            rules: rule_set.instantiate_rules(),
            record: rule_set.new_record(""),
            phase: AnalysisPhase::Idle,
        };
        Self {
            id,
            rule_set,
            tokenizer,
            verbose,
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// 阻塞直到 Worker 空闲，然后执行分析；返回结果的值拷贝
    pub fn analyze(&self, input: &str) -> FieldRecord {
        let mut state = self.state.lock();
        self.run(&mut state, input)
    }

    /// Worker 空闲时立即执行，否则返回 None
    pub fn try_analyze(&self, input: &str) -> Option<FieldRecord> {
        let mut state = self.state.try_lock()?;
        Some(self.run(&mut state, input))
    }

    fn run(&self, state: &mut MutexGuard<'_, WorkerState>, input: &str) -> FieldRecord {
        log::trace!("Worker {} analyzing", self.id);
        let pipeline = AnalysisPipeline {
            rule_set: &self.rule_set,
            tokenizer: self.tokenizer.as_ref(),
            verbose: self.verbose,
        };
        let WorkerState { rules, record, phase } = &mut **state;
        pipeline.run(input, rules, record, phase);

        let result = record.clone();
        *phase = AnalysisPhase::Idle;
        result
    }
}

/// N 个独立 Worker，共享同一规则集
/// 轮询分配，优先选择空闲 Worker，全部忙碌时在轮询到的 Worker 上等待
pub struct WorkerPool {
    workers: Vec<Worker>,
    next: AtomicUsize,
}

impl WorkerPool {
    pub fn new(rule_set: Arc<RuleSet>, tokenizer: Arc<dyn Tokenizer>, count: usize, verbose: bool) -> Self {
        let count = count.max(1);
        let workers = (0..count)
            .map(|id| Worker::new(id, Arc::clone(&rule_set), Arc::clone(&tokenizer), verbose))
            .collect();
        log::debug!("Worker pool created with {} workers", count);
        Self {
            workers,
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn analyze(&self, input: &str) -> FieldRecord {
        let count = self.workers.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % count;
        for offset in 0..count {
            if let Some(result) = self.workers[(start + offset) % count].try_analyze(input) {
                return result;
            }
        }
        self.workers[start].analyze(input)
    }
}
