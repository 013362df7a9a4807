//! Model validation
//!
//! Chronological splits, walk-forward backtests and evaluation metrics.

pub mod backtest;
pub mod classifier;
pub mod metrics;
pub mod split;

pub use backtest::{BacktestDates, BacktestHarness, Predictions};
pub use classifier::{evaluate_classifier, EloBaseline, WinClassifier};
pub use metrics::{EvaluationMetrics, ModelComparison};
pub use split::ChronologicalSplit;
