//! Prediction and reporting
//!
//! Turn ratings and statistics into matchup probabilities and
//! player-facing reports.

pub mod report;
pub mod win_prob;

pub use report::{format_matchup, MatchupReport, PlayerSummary, RankingEntry, Reporter};
pub use win_prob::{HybridProbability, Method, ProbabilityEstimator, ProbabilityPair};
