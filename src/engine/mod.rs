//! Reconciliation engine orchestration and batch reporting

pub mod orchestrator;
pub mod statistics;

pub use orchestrator::{
    BatchReport, OverdueAssessment, ReconciliationEngine, ReconciliationResult, RecommendedAction,
};
pub use statistics::{BatchStatistics, HistogramBucket, StatisticsAggregator};
