//! Data ingestion and match history
//!
//! Score parsing, the date-ordered match table and JSON row loading.

pub mod loader;
pub mod score;
pub mod table;

pub use loader::load_matches;
pub use score::{ParsedScore, ScoreParser, SetScore};
pub use table::MatchTable;
