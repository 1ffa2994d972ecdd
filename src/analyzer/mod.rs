//! 分析执行：单次流水线 + Worker 池
pub mod pipeline;
pub mod worker;

pub use pipeline::{AnalysisPhase, AnalysisPipeline};
pub use worker::{Worker, WorkerPool};
