//! Pairwise win probability
//!
//! Starts from the Elo expectation and optionally blends in the detailed
//! metric comparison, head-to-head record and a small bonus for a recent
//! win. Player B's probability is always derived as `1 - p(A)`.

use serde::Serialize;

use crate::features::comparator::ComparisonResult;
use crate::features::elo::RatingEngine;
use crate::features::player_stats::{HeadToHead, StatisticsEngine};
use crate::{ConfidenceLevel, PlayerId, ProbabilityConfig, Result, Surface, TennisError};

/// How a probability was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    EloGlobal,
    EloSurfaceAdjusted,
    MetricsOnly,
    HybridEloMetrics,
    EloGlobalFallback,
    EloSurfaceAdjustedFallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::EloGlobal => "elo_global",
            Method::EloSurfaceAdjusted => "elo_surface_adjusted",
            Method::MetricsOnly => "metrics_only",
            Method::HybridEloMetrics => "hybrid_elo_metrics",
            Method::EloGlobalFallback => "elo_global_fallback",
            Method::EloSurfaceAdjustedFallback => "elo_surface_adjusted_fallback",
        }
    }

    /// Mark an Elo method as a degraded hybrid result
    fn fallback(self) -> Self {
        match self {
            Method::EloGlobal => Method::EloGlobalFallback,
            Method::EloSurfaceAdjusted => Method::EloSurfaceAdjustedFallback,
            other => other,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Method::EloGlobalFallback | Method::EloSurfaceAdjustedFallback)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Complementary probabilities for players A and B
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityPair {
    pub player_a: f64,
    pub player_b: f64,
}

impl ProbabilityPair {
    pub fn from_a(player_a: f64) -> Self {
        ProbabilityPair {
            player_a,
            player_b: 1.0 - player_a,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EloProbability {
    pub probability: ProbabilityPair,
    pub elo_a: f64,
    pub elo_b: f64,
    pub confidence: ConfidenceLevel,
    pub method: Method,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricProbability {
    pub probability: ProbabilityPair,
    pub comparison: ComparisonResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridProbability {
    pub probability: ProbabilityPair,
    pub elo_a: f64,
    pub elo_b: f64,
    pub confidence: ConfidenceLevel,
    pub method: Method,
    pub elo_probability: ProbabilityPair,
    pub metric_probability: Option<ProbabilityPair>,
    pub comparison: Option<ComparisonResult>,
    /// Set whenever the metric blend was skipped
    pub fallback_reason: Option<String>,
}

impl HybridProbability {
    pub fn key_advantages(&self) -> &[String] {
        self.comparison
            .as_ref()
            .map(|c| c.key_advantages.as_slice())
            .unwrap_or(&[])
    }
}

/// Combines ratings and statistics into matchup probabilities
pub struct ProbabilityEstimator<'a> {
    ratings: &'a RatingEngine,
    stats: Option<&'a StatisticsEngine>,
    config: ProbabilityConfig,
}

impl<'a> ProbabilityEstimator<'a> {
    pub fn new(ratings: &'a RatingEngine, stats: Option<&'a StatisticsEngine>, config: ProbabilityConfig) -> Self {
        ProbabilityEstimator { ratings, stats, config }
    }

    pub fn config(&self) -> &ProbabilityConfig {
        &self.config
    }

    /// Elo expectation, surface adjusted when a surface is given
    pub fn elo_probability(&self, a: &PlayerId, b: &PlayerId, surface: Option<Surface>) -> EloProbability {
        let elo_a = self.ratings.match_rating(a, surface);
        let elo_b = self.ratings.match_rating(b, surface);
        let method = if surface.is_some() {
            Method::EloSurfaceAdjusted
        } else {
            Method::EloGlobal
        };

        EloProbability {
            probability: ProbabilityPair::from_a(RatingEngine::expected_score(elo_a, elo_b)),
            elo_a,
            elo_b,
            confidence: ConfidenceLevel::from_rating_gap(
                elo_a - elo_b,
                self.config.high_confidence_gap,
                self.config.medium_confidence_gap,
            ),
            method,
        }
    }

    /// Elo probability with the plain head-to-head and recency adjustments
    pub fn with_features(
        &self,
        a: &PlayerId,
        b: &PlayerId,
        surface: Option<Surface>,
        h2h: Option<&HeadToHead>,
    ) -> EloProbability {
        let mut result = self.elo_probability(a, b, surface);
        let mut p = result.probability.player_a;

        if let Some(h2h) = h2h {
            p = self.apply_head_to_head(p, h2h, self.config.h2h_factor);
        }
        p = self.apply_recent_win_bonus(p, a, b);

        result.probability = ProbabilityPair::from_a(p);
        result
    }

    /// Probability from the detailed metric comparison alone
    pub fn metric_probability(&self, a: &PlayerId, b: &PlayerId, surface: Option<Surface>) -> Result<MetricProbability> {
        let stats = self.stats.ok_or(TennisError::StatsUnavailable)?;
        let comparison = stats.compare_detailed_metrics(a, b, surface);
        Ok(MetricProbability {
            probability: ProbabilityPair::from_a(comparison.probability_a),
            comparison,
        })
    }

    /// Weighted Elo and metric blend with fallback to Elo alone
    pub fn hybrid_probability(
        &self,
        a: &PlayerId,
        b: &PlayerId,
        surface: Option<Surface>,
        h2h: Option<&HeadToHead>,
    ) -> HybridProbability {
        let elo = self.elo_probability(a, b, surface);
        let elo_p = elo.probability.player_a;

        let metrics = match self.metric_probability(a, b, surface) {
            Ok(m) if m.comparison.metrics_available >= self.config.min_metrics_required
                || !self.config.use_metrics_fallback =>
            {
                Some(m)
            }
            Ok(m) => {
                log::debug!(
                    "Only {} metrics available for {} vs {}, using Elo",
                    m.comparison.metrics_available,
                    a,
                    b
                );
                None
            }
            Err(e) => {
                log::debug!("Metric probability unavailable for {} vs {}: {}", a, b, e);
                None
            }
        };

        let (mut p, method, fallback_reason) = match &metrics {
            Some(m) => (
                self.config.elo_weight * elo_p + self.config.metrics_weight * m.probability.player_a,
                Method::HybridEloMetrics,
                None,
            ),
            None => {
                let reason = if self.stats.is_some() {
                    "Insufficient metrics available"
                } else {
                    "Statistics engine not provided"
                };
                (elo_p, elo.method.fallback(), Some(reason.to_string()))
            }
        };
        p = self.config.clamp(p);

        if let Some(h2h) = h2h {
            p = self.apply_head_to_head(p, h2h, self.config.hybrid_h2h_factor);
        }
        p = self.apply_recent_win_bonus(p, a, b);

        let (metric_probability, comparison) = match metrics {
            Some(m) => (Some(m.probability), Some(m.comparison)),
            None => (None, None),
        };

        HybridProbability {
            probability: ProbabilityPair::from_a(p),
            elo_a: elo.elo_a,
            elo_b: elo.elo_b,
            confidence: elo.confidence,
            method,
            elo_probability: elo.probability,
            metric_probability,
            comparison,
            fallback_reason,
        }
    }

    /// Shift toward the side with the better head-to-head record
    fn apply_head_to_head(&self, p: f64, h2h: &HeadToHead, factor: f64) -> f64 {
        if h2h.total_matches < self.config.h2h_min_matches {
            return p;
        }
        match h2h.player_a_win_rate() {
            Some(rate) => self.config.clamp(p + (rate - 0.5) * factor),
            None => p,
        }
    }

    /// +boost if A's latest match was a recent win, -boost if B's was
    fn apply_recent_win_bonus(&self, p: f64, a: &PlayerId, b: &PlayerId) -> f64 {
        if !self.config.use_recent_win_bonus {
            return p;
        }
        let Some(stats) = self.stats else {
            return p;
        };

        let recent_win = |player: &PlayerId| {
            stats
                .latest_match_info(player, None)
                .map_or(false, |info| info.won && info.days_ago <= self.config.recent_win_days)
        };

        let mut p = p;
        if recent_win(a) {
            p += self.config.recent_win_boost;
        }
        if recent_win(b) {
            p -= self.config.recent_win_boost;
        }
        self.config.clamp(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MatchTable;
    use crate::{MatchRecord, MetricWeights, StatsConfig};
    use chrono::NaiveDate;

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    fn make_match(day: u32, winner: &str, loser: &str, score: &str) -> MatchRecord {
        let mut m = MatchRecord::new(
            NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            pid(winner),
            pid(loser),
        );
        m.surface = Some(Surface::Hard);
        m.score = Some(score.to_string());
        m.minutes = Some(100.0);
        m
    }

    fn history() -> MatchTable {
        MatchTable::new(vec![
            make_match(1, "a", "b", "6-1 6-1"),
            make_match(2, "a", "c", "6-2 6-2"),
            make_match(3, "c", "b", "6-4 6-4"),
            make_match(4, "a", "b", "6-3 6-3"),
            make_match(10, "b", "c", "7-5 7-5"),
        ])
    }

    fn no_bonus() -> ProbabilityConfig {
        ProbabilityConfig {
            use_recent_win_bonus: false,
            ..ProbabilityConfig::default()
        }
    }

    #[test]
    fn test_elo_probability_even() {
        let ratings = RatingEngine::default();
        let est = ProbabilityEstimator::new(&ratings, None, ProbabilityConfig::default());
        let r = est.elo_probability(&pid("a"), &pid("b"), None);
        assert_eq!(r.probability.player_a, 0.5);
        assert_eq!(r.confidence, ConfidenceLevel::Low);
        assert_eq!(r.method, Method::EloGlobal);

        let r = est.elo_probability(&pid("a"), &pid("b"), Some(Surface::Clay));
        assert_eq!(r.method, Method::EloSurfaceAdjusted);
        assert_eq!(r.elo_a, 1450.0);
    }

    #[test]
    fn test_hybrid_without_stats_falls_back() {
        let table = history();
        let mut ratings = RatingEngine::default();
        ratings.calculate_ratings_from_matches(&table);
        let est = ProbabilityEstimator::new(&ratings, None, ProbabilityConfig::default());

        let r = est.hybrid_probability(&pid("a"), &pid("b"), None, None);
        assert_eq!(r.method, Method::EloGlobalFallback);
        assert!(r.method.is_fallback());
        assert_eq!(r.fallback_reason.as_deref(), Some("Statistics engine not provided"));
        assert!(r.metric_probability.is_none());
        assert_eq!(r.probability.player_a, r.elo_probability.player_a);
        assert!(matches!(
            est.metric_probability(&pid("a"), &pid("b"), None),
            Err(TennisError::StatsUnavailable)
        ));
    }

    #[test]
    fn test_hybrid_blends_when_metrics_available() {
        let table = history();
        let mut ratings = RatingEngine::default();
        ratings.calculate_ratings_from_matches(&table);
        let stats = StatisticsEngine::new(table, StatsConfig::default(), MetricWeights::default());
        let est = ProbabilityEstimator::new(&ratings, Some(&stats), no_bonus());

        let r = est.hybrid_probability(&pid("a"), &pid("b"), Some(Surface::Hard), None);
        assert_eq!(r.method, Method::HybridEloMetrics);
        assert!(r.fallback_reason.is_none());
        let metric = r.metric_probability.unwrap();
        let expected = 0.65 * r.elo_probability.player_a + 0.35 * metric.player_a;
        assert!((r.probability.player_a - expected.clamp(0.05, 0.95)).abs() < 1e-12);
        assert!(r.probability.player_a > 0.5);
        assert!(!r.key_advantages().is_empty());
    }

    #[test]
    fn test_hybrid_insufficient_metrics() {
        let table = history();
        let ratings = RatingEngine::default();
        let stats = StatisticsEngine::new(table, StatsConfig::default(), MetricWeights::default());
        let est = ProbabilityEstimator::new(&ratings, Some(&stats), no_bonus());

        // Unknown players have no metrics at all
        let r = est.hybrid_probability(&pid("x"), &pid("y"), None, None);
        assert_eq!(r.method, Method::EloGlobalFallback);
        assert_eq!(r.fallback_reason.as_deref(), Some("Insufficient metrics available"));

        // Without fallback the blend is used regardless
        let config = ProbabilityConfig {
            use_metrics_fallback: false,
            ..no_bonus()
        };
        let est = ProbabilityEstimator::new(&ratings, Some(&stats), config);
        let r = est.hybrid_probability(&pid("x"), &pid("y"), None, None);
        assert_eq!(r.method, Method::HybridEloMetrics);
        assert_eq!(r.probability.player_a, 0.5);
    }

    #[test]
    fn test_head_to_head_adjustment() {
        let ratings = RatingEngine::default();
        let est = ProbabilityEstimator::new(&ratings, None, no_bonus());
        let mut h2h = HeadToHead {
            total_matches: 4,
            player_a_wins: 4,
            player_b_wins: 0,
            recent: Vec::new(),
        };

        let r = est.with_features(&pid("a"), &pid("b"), None, Some(&h2h));
        assert!((r.probability.player_a - 0.525).abs() < 1e-12);

        let r = est.hybrid_probability(&pid("a"), &pid("b"), None, Some(&h2h));
        assert!((r.probability.player_a - 0.515).abs() < 1e-12);

        // Fewer than 3 meetings is ignored
        h2h.total_matches = 2;
        h2h.player_a_wins = 2;
        let r = est.with_features(&pid("a"), &pid("b"), None, Some(&h2h));
        assert_eq!(r.probability.player_a, 0.5);
    }

    #[test]
    fn test_recent_win_bonus() {
        let table = history();
        let ratings = RatingEngine::default();
        let stats = StatisticsEngine::new(table, StatsConfig::default(), MetricWeights::default());
        let est = ProbabilityEstimator::new(&ratings, Some(&stats), ProbabilityConfig::default());

        // b won on the last day, a's last match was 6 days earlier (a win)
        let r = est.with_features(&pid("a"), &pid("b"), None, None);
        assert!((r.probability.player_a - 0.5).abs() < 1e-12);

        // c lost its last match, b gets the boost
        let r = est.with_features(&pid("c"), &pid("b"), None, None);
        assert!((r.probability.player_a - 0.48).abs() < 1e-12);
    }

    #[test]
    fn test_probabilities_complementary_and_clamped() {
        let mut ratings = RatingEngine::default();
        for day in 1..=28 {
            ratings.update(&make_match(day, "a", "b", "6-0 6-0"));
        }
        let est = ProbabilityEstimator::new(&ratings, None, ProbabilityConfig::default());
        let r = est.hybrid_probability(&pid("a"), &pid("b"), None, None);
        assert!(r.probability.player_a <= 0.95);
        assert!((r.probability.player_a + r.probability.player_b - 1.0).abs() < 1e-12);
        assert_eq!(r.confidence, ConfidenceLevel::High);
    }
}
