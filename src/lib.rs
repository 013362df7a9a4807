//! Tennis match prediction from rating and statistics history
//!
//! Surface-aware Elo ratings, point-in-time player statistics, pairwise win
//! probabilities and a chronological backtesting harness for comparing models.

pub mod data;
pub mod features;
pub mod predict;
pub mod validation;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::data::score::{ParsedScore, ScoreParser};

/// Unique identifier for a player
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

/// Court surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Surface {
    Hard,
    Clay,
    Grass,
    Carpet,
}

impl Surface {
    pub const ALL: [Surface; 4] = [Surface::Hard, Surface::Clay, Surface::Grass, Surface::Carpet];

    pub fn name(&self) -> &'static str {
        match self {
            Surface::Hard => "Hard",
            Surface::Clay => "Clay",
            Surface::Grass => "Grass",
            Surface::Carpet => "Carpet",
        }
    }

    /// Parse a surface name, case-insensitive. Unknown names yield None.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "hard" => Some(Surface::Hard),
            "clay" => Some(Surface::Clay),
            "grass" => Some(Surface::Grass),
            "carpet" => Some(Surface::Carpet),
            _ => None,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Surface::parse(s).ok_or_else(|| format!("Unknown surface: {}. Use hard, clay, grass or carpet.", s))
    }
}

/// Tournament tier, drives the size of rating updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TourneyLevel {
    GrandSlam,
    Masters,
    Atp500,
    Atp250,
    Tour,
    Other,
}

impl TourneyLevel {
    /// Levels reported by tournament performance breakdowns, in display order
    pub const REPORTED: [TourneyLevel; 5] = [
        TourneyLevel::GrandSlam,
        TourneyLevel::Masters,
        TourneyLevel::Atp500,
        TourneyLevel::Atp250,
        TourneyLevel::Tour,
    ];

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "G" => TourneyLevel::GrandSlam,
            "M" => TourneyLevel::Masters,
            "500" => TourneyLevel::Atp500,
            "250" => TourneyLevel::Atp250,
            "A" => TourneyLevel::Tour,
            _ => TourneyLevel::Other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TourneyLevel::GrandSlam => "G",
            TourneyLevel::Masters => "M",
            TourneyLevel::Atp500 => "500",
            TourneyLevel::Atp250 => "250",
            TourneyLevel::Tour => "A",
            TourneyLevel::Other => "O",
        }
    }
}

impl Default for TourneyLevel {
    fn default() -> Self {
        TourneyLevel::Masters
    }
}

impl fmt::Display for TourneyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Serve and return counts for one side of a match
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ServeStats {
    pub aces: Option<f64>,
    pub service_points: Option<f64>,
    pub bp_saved: Option<f64>,
    pub bp_faced: Option<f64>,
}

impl ServeStats {
    /// Share of break points saved, None when no break points were faced
    pub fn bp_save_pct(&self) -> Option<f64> {
        match (self.bp_saved, self.bp_faced) {
            (Some(saved), Some(faced)) if faced > 0.0 => Some(saved / faced),
            _ => None,
        }
    }
}

/// A single completed match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub winner_id: PlayerId,
    pub loser_id: PlayerId,
    pub winner_name: Option<String>,
    pub loser_name: Option<String>,
    pub surface: Option<Surface>,
    pub level: TourneyLevel,
    pub score: Option<String>,
    pub minutes: Option<f64>,
    pub winner_age: Option<f64>,
    pub loser_age: Option<f64>,
    pub winner_rank: Option<f64>,
    pub loser_rank: Option<f64>,
    pub winner_serve: ServeStats,
    pub loser_serve: ServeStats,
}

impl MatchRecord {
    /// Bare record with only the identity fields set
    pub fn new(date: NaiveDate, winner_id: PlayerId, loser_id: PlayerId) -> Self {
        MatchRecord {
            date,
            winner_id,
            loser_id,
            winner_name: None,
            loser_name: None,
            surface: None,
            level: TourneyLevel::default(),
            score: None,
            minutes: None,
            winner_age: None,
            loser_age: None,
            winner_rank: None,
            loser_rank: None,
            winner_serve: ServeStats::default(),
            loser_serve: ServeStats::default(),
        }
    }

    /// Check if the given player took part in this match
    pub fn involves(&self, player: &PlayerId) -> bool {
        &self.winner_id == player || &self.loser_id == player
    }

    /// Check if the given player won this match
    pub fn did_win(&self, player: &PlayerId) -> Option<bool> {
        if &self.winner_id == player {
            Some(true)
        } else if &self.loser_id == player {
            Some(false)
        } else {
            None
        }
    }

    /// Get the opponent for a given player
    pub fn opponent(&self, player: &PlayerId) -> Option<&PlayerId> {
        match self.did_win(player)? {
            true => Some(&self.loser_id),
            false => Some(&self.winner_id),
        }
    }

    /// Serve counts for the given player's side
    pub fn serve_for(&self, player: &PlayerId) -> Option<&ServeStats> {
        match self.did_win(player)? {
            true => Some(&self.winner_serve),
            false => Some(&self.loser_serve),
        }
    }

    /// Ranking of the given player's side at the time of the match
    pub fn rank_for(&self, player: &PlayerId) -> Option<f64> {
        match self.did_win(player)? {
            true => self.winner_rank,
            false => self.loser_rank,
        }
    }

    /// Parse the score string (not cached)
    pub fn parsed_score(&self) -> Option<ParsedScore> {
        ScoreParser::parse_opt(self.score.as_deref())
    }
}

/// Confidence label derived from the rating gap between two players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_rating_gap(gap: f64, high_above: f64, medium_above: f64) -> Self {
        let gap = gap.abs();
        if gap > high_above {
            ConfidenceLevel::High
        } else if gap > medium_above {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "high"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::Low => write!(f, "low"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum TennisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("No valid dates found in match data")]
    NoValidDates,

    #[error("Training end date must be before test start date (train_end={train_end}, test_start={test_start})")]
    InvalidDateRange {
        train_end: NaiveDate,
        test_start: NaiveDate,
    },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Insufficient {window} data: has {matches} matches, need {required}")]
    InsufficientData {
        window: String,
        matches: usize,
        required: usize,
    },

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("Statistics engine required for metric-based probability")]
    StatsUnavailable,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TennisError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub elo: EloConfig,
    pub stats: StatsConfig,
    pub weights: MetricWeights,
    pub probability: ProbabilityConfig,
    pub backtest: BacktestConfig,
    pub rolling: RollingConfig,
    pub data: DataConfig,
}

/// Additive rating adjustments per surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceAdjustments {
    pub hard: f64,
    pub clay: f64,
    pub grass: f64,
    pub carpet: f64,
}

impl Default for SurfaceAdjustments {
    fn default() -> Self {
        SurfaceAdjustments {
            hard: 0.0,
            clay: -50.0,
            grass: 30.0,
            carpet: 0.0,
        }
    }
}

impl SurfaceAdjustments {
    pub fn get(&self, surface: Surface) -> f64 {
        match surface {
            Surface::Hard => self.hard,
            Surface::Clay => self.clay,
            Surface::Grass => self.grass,
            Surface::Carpet => self.carpet,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    /// Starting rating for unseen players
    pub starting_rating: f64,
    pub k_factor_regular: f64,
    pub k_factor_grand_slam: f64,
    /// K-factor for 250 and 500 level events
    pub k_factor_small: f64,
    /// Decay time constant in days
    pub decay_days: f64,
    /// Weight historical updates by their age relative to an as-of date
    pub apply_decay: bool,
    pub surface_adjustments: SurfaceAdjustments,
}

impl Default for EloConfig {
    fn default() -> Self {
        EloConfig {
            starting_rating: 1500.0,
            k_factor_regular: 32.0,
            k_factor_grand_slam: 48.0,
            k_factor_small: 24.0,
            decay_days: 365.0,
            apply_decay: false,
            surface_adjustments: SurfaceAdjustments::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub min_matches_for_stats: usize,
    pub min_matches_for_surface_stats: usize,
    pub recent_form_matches: usize,
    pub h2h_recent_meetings: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            min_matches_for_stats: 5,
            min_matches_for_surface_stats: 3,
            recent_form_matches: 10,
            h2h_recent_meetings: 5,
        }
    }
}

/// Weights of the detailed metrics used by the comparator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricWeights {
    pub avg_winning_margin: f64,
    pub first_set_win_pct: f64,
    pub second_set_win_pct: f64,
    pub ace_pct: f64,
    pub avg_minutes_for_wins: f64,
    pub avg_losing_game_time: f64,
    pub avg_opponent_age_when_won: f64,
    pub avg_opponent_age_when_lost: f64,
    pub form_last_10_wins: f64,
    pub form_last_5_wins: f64,
    pub surface_match: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        MetricWeights {
            avg_winning_margin: 0.15,
            first_set_win_pct: 0.12,
            second_set_win_pct: 0.08,
            ace_pct: 0.10,
            avg_minutes_for_wins: 0.05,
            avg_losing_game_time: 0.05,
            avg_opponent_age_when_won: 0.05,
            avg_opponent_age_when_lost: 0.05,
            form_last_10_wins: 0.15,
            form_last_5_wins: 0.10,
            surface_match: 0.10,
        }
    }
}

impl MetricWeights {
    pub fn total(&self) -> f64 {
        self.avg_winning_margin
            + self.first_set_win_pct
            + self.second_set_win_pct
            + self.ace_pct
            + self.avg_minutes_for_wins
            + self.avg_losing_game_time
            + self.avg_opponent_age_when_won
            + self.avg_opponent_age_when_lost
            + self.form_last_10_wins
            + self.form_last_5_wins
            + self.surface_match
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityConfig {
    pub elo_weight: f64,
    pub metrics_weight: f64,
    pub use_metrics_fallback: bool,
    pub min_metrics_required: usize,
    /// Minimum meetings before head-to-head shifts the probability
    pub h2h_min_matches: usize,
    pub h2h_factor: f64,
    pub hybrid_h2h_factor: f64,
    pub use_recent_win_bonus: bool,
    pub recent_win_days: i64,
    pub recent_win_boost: f64,
    pub min_probability: f64,
    pub max_probability: f64,
    pub high_confidence_gap: f64,
    pub medium_confidence_gap: f64,
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        ProbabilityConfig {
            elo_weight: 0.65,
            metrics_weight: 0.35,
            use_metrics_fallback: true,
            min_metrics_required: 3,
            h2h_min_matches: 3,
            h2h_factor: 0.05,
            hybrid_h2h_factor: 0.03,
            use_recent_win_bonus: true,
            recent_win_days: 7,
            recent_win_boost: 0.02,
            min_probability: 0.05,
            max_probability: 0.95,
            high_confidence_gap: 200.0,
            medium_confidence_gap: 100.0,
        }
    }
}

impl ProbabilityConfig {
    pub fn clamp(&self, p: f64) -> f64 {
        p.max(self.min_probability).min(self.max_probability)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub min_train_matches: usize,
    pub min_test_matches: usize,
    pub min_validation_matches: usize,
    /// Share of the covered day span used for training when no train end is given
    pub default_train_span: f64,
    pub train_frac: f64,
    pub val_frac: f64,
    pub use_surface_adjustment: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            min_train_matches: 100,
            min_test_matches: 50,
            min_validation_matches: 50,
            default_train_span: 0.8,
            train_frac: 0.6,
            val_frac: 0.2,
            use_surface_adjustment: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingConfig {
    pub window: usize,
    pub short_window: usize,
    pub k_factor: f64,
}

impl Default for RollingConfig {
    fn default() -> Self {
        RollingConfig {
            window: 10,
            short_window: 3,
            k_factor: 32.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub matches_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            matches_path: "data/matches.json".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TennisError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| TennisError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TennisError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
