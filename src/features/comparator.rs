//! Weighted comparison of two players' detailed metrics
//!
//! Each metric awards its weight to the better side. The summed score is
//! mapped to a probability with a logistic curve. Missing metrics are read
//! as 0.0 here, unlike the statistics layer where they stay None.

use serde::Serialize;

use crate::features::player_stats::DetailedMetrics;
use crate::{MetricWeights, Surface};

pub const TOTAL_METRICS: usize = 11;
const MAX_ADVANTAGES: usize = 5;

/// Which side a metric favours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advantage {
    PlayerA,
    PlayerB,
    Neutral,
}

impl Advantage {
    fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Advantage::PlayerA
        } else if score < 0.0 {
            Advantage::PlayerB
        } else {
            Advantage::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Formats an advantage message from the favoured player's label and the
/// favoured and other values
type MessageFn = fn(&str, f64, f64) -> String;

struct MetricRule {
    name: &'static str,
    polarity: Polarity,
    weight: f64,
    /// Only compared when both sides are strictly positive
    both_positive: bool,
    message: Option<MessageFn>,
}

fn margin_message(player: &str, ours: f64, theirs: f64) -> String {
    format!("Player {} has larger winning margin ({:.1} vs {:.1} games)", player, ours, theirs)
}

fn first_set_message(player: &str, ours: f64, theirs: f64) -> String {
    format!(
        "Player {} wins first set more often ({:.1}% vs {:.1}%)",
        player,
        ours * 100.0,
        theirs * 100.0
    )
}

fn ace_message(player: &str, ours: f64, theirs: f64) -> String {
    format!("Player {} has stronger serve ({:.1}% vs {:.1}% ace rate)", player, ours, theirs)
}

fn form_10_message(player: &str, ours: f64, theirs: f64) -> String {
    format!("Player {} in better form (last 10 wins: {:.1} vs {:.1} avg margin)", player, ours, theirs)
}

fn form_5_message(player: &str, ours: f64, theirs: f64) -> String {
    format!("Player {} in hot form (last 5 wins: {:.1} vs {:.1} avg margin)", player, ours, theirs)
}

/// One row of the comparison table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: &'static str,
    pub player_a: f64,
    pub player_b: f64,
    pub advantage: Advantage,
    pub score: f64,
}

/// Weak-surface penalty applied to either side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceMatch {
    pub surface: Option<Surface>,
    pub player_a_weak_surface: Option<Surface>,
    pub player_b_weak_surface: Option<Surface>,
    pub advantage: Advantage,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub metrics: Vec<MetricComparison>,
    pub surface_match: SurfaceMatch,
    /// Positive favours player A
    pub total_score: f64,
    pub probability_a: f64,
    pub probability_b: f64,
    pub key_advantages: Vec<String>,
    /// Metrics with a non-zero score
    pub metrics_available: usize,
    pub total_metrics: usize,
}

impl ComparisonResult {
    pub fn score_a(&self) -> f64 {
        self.total_score
    }

    pub fn score_b(&self) -> f64 {
        -self.total_score
    }
}

pub struct MetricsComparator {
    weights: MetricWeights,
}

impl Default for MetricsComparator {
    fn default() -> Self {
        Self::new(MetricWeights::default())
    }
}

impl MetricsComparator {
    pub fn new(weights: MetricWeights) -> Self {
        MetricsComparator { weights }
    }

    pub fn weights(&self) -> &MetricWeights {
        &self.weights
    }

    fn rules(&self) -> [MetricRule; 10] {
        let w = &self.weights;
        [
            MetricRule {
                name: "avg_winning_margin",
                polarity: Polarity::HigherIsBetter,
                weight: w.avg_winning_margin,
                both_positive: false,
                message: Some(margin_message),
            },
            MetricRule {
                name: "first_set_win_pct",
                polarity: Polarity::HigherIsBetter,
                weight: w.first_set_win_pct,
                both_positive: false,
                message: Some(first_set_message),
            },
            MetricRule {
                name: "second_set_win_pct",
                polarity: Polarity::HigherIsBetter,
                weight: w.second_set_win_pct,
                both_positive: false,
                message: None,
            },
            MetricRule {
                name: "ace_pct",
                polarity: Polarity::HigherIsBetter,
                weight: w.ace_pct,
                both_positive: false,
                message: Some(ace_message),
            },
            MetricRule {
                name: "avg_minutes_for_wins",
                polarity: Polarity::LowerIsBetter,
                weight: w.avg_minutes_for_wins,
                both_positive: true,
                message: None,
            },
            MetricRule {
                name: "avg_losing_game_time",
                polarity: Polarity::LowerIsBetter,
                weight: w.avg_losing_game_time,
                both_positive: true,
                message: None,
            },
            // Contextual: beating older opponents
            MetricRule {
                name: "avg_opponent_age_when_won",
                polarity: Polarity::HigherIsBetter,
                weight: w.avg_opponent_age_when_won * 0.5,
                both_positive: true,
                message: None,
            },
            // Contextual: losing to younger opponents
            MetricRule {
                name: "avg_opponent_age_when_lost",
                polarity: Polarity::LowerIsBetter,
                weight: w.avg_opponent_age_when_lost * 0.5,
                both_positive: true,
                message: None,
            },
            MetricRule {
                name: "form_last_10_wins",
                polarity: Polarity::HigherIsBetter,
                weight: w.form_last_10_wins,
                both_positive: false,
                message: Some(form_10_message),
            },
            MetricRule {
                name: "form_last_5_wins",
                polarity: Polarity::HigherIsBetter,
                weight: w.form_last_5_wins,
                both_positive: false,
                message: Some(form_5_message),
            },
        ]
    }

    fn values(metrics: &DetailedMetrics) -> [f64; 10] {
        [
            metrics.avg_winning_margin,
            metrics.first_set_win_pct,
            metrics.second_set_win_pct,
            metrics.ace_pct,
            metrics.avg_minutes_for_wins,
            metrics.avg_losing_game_time,
            metrics.avg_opponent_age_when_won,
            metrics.avg_opponent_age_when_lost,
            metrics.form_last_10_wins,
            metrics.form_last_5_wins,
        ]
        .map(|v| v.unwrap_or(0.0))
    }

    fn score_rule(rule: &MetricRule, a: f64, b: f64) -> f64 {
        if rule.both_positive && !(a > 0.0 && b > 0.0) {
            return 0.0;
        }
        let a_better = match rule.polarity {
            Polarity::HigherIsBetter => a > b,
            Polarity::LowerIsBetter => a < b,
        };
        let b_better = match rule.polarity {
            Polarity::HigherIsBetter => b > a,
            Polarity::LowerIsBetter => b < a,
        };
        if a_better {
            rule.weight
        } else if b_better {
            -rule.weight
        } else {
            0.0
        }
    }

    /// Compare two players' metrics, optionally for a given surface
    pub fn compare_all(
        &self,
        metrics_a: &DetailedMetrics,
        metrics_b: &DetailedMetrics,
        surface: Option<Surface>,
    ) -> ComparisonResult {
        let values_a = Self::values(metrics_a);
        let values_b = Self::values(metrics_b);

        let mut rows = Vec::with_capacity(TOTAL_METRICS - 1);
        let mut key_advantages = Vec::new();

        for (i, rule) in self.rules().iter().enumerate() {
            let (a, b) = (values_a[i], values_b[i]);
            let score = Self::score_rule(rule, a, b);

            if let Some(message) = rule.message {
                if score > 0.0 {
                    key_advantages.push(message("A", a, b));
                } else if score < 0.0 {
                    key_advantages.push(message("B", b, a));
                }
            }

            rows.push(MetricComparison {
                metric: rule.name,
                player_a: a,
                player_b: b,
                advantage: Advantage::from_score(score),
                score,
            });
        }

        let mut surface_score = 0.0;
        if let Some(s) = surface {
            if metrics_a.most_lost_surface == Some(s) {
                surface_score -= self.weights.surface_match * 0.5;
            }
            if metrics_b.most_lost_surface == Some(s) {
                surface_score += self.weights.surface_match * 0.5;
            }
        }
        let surface_match = SurfaceMatch {
            surface,
            player_a_weak_surface: metrics_a.most_lost_surface,
            player_b_weak_surface: metrics_b.most_lost_surface,
            advantage: Advantage::from_score(surface_score),
            score: surface_score,
        };

        let scores = rows.iter().map(|r| r.score).chain(std::iter::once(surface_score));
        let total_score: f64 = scores.clone().sum();
        let metrics_available = scores.filter(|s| *s != 0.0).count();

        let probability_a = 1.0 / (1.0 + (-2.0 * total_score).exp());
        key_advantages.truncate(MAX_ADVANTAGES);

        ComparisonResult {
            metrics: rows,
            surface_match,
            total_score,
            probability_a,
            probability_b: 1.0 - probability_a,
            key_advantages,
            metrics_available,
            total_metrics: TOTAL_METRICS,
        }
    }
}
