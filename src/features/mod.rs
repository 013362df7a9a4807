//! Feature extraction
//!
//! Ratings, player statistics, metric comparison and rolling classifier
//! features derived from match history.

pub mod comparator;
pub mod elo;
pub mod player_stats;
pub mod rolling;

pub use comparator::{ComparisonResult, MetricsComparator};
pub use elo::RatingEngine;
pub use player_stats::{calculate_win_percentage, DetailedMetrics, HeadToHead, StatisticsEngine};
pub use rolling::{build_match_matrix, MatchupFeatures, PlayerHistory, RollingFeatureBuilder};
