//! Walk-forward backtesting
//!
//! Ratings are built from the training window, then the test window is
//! replayed in date order: each match is predicted with the state as it
//! stood before the match, and only then is the result applied.

use chrono::{Duration, NaiveDate};

use crate::data::MatchTable;
use crate::features::elo::RatingEngine;
use crate::features::player_stats::StatisticsEngine;
use crate::predict::win_prob::ProbabilityEstimator;
use crate::validation::metrics::{EvaluationMetrics, ModelComparison};
use crate::{Config, MatchRecord, Result, TennisError};

/// Optional window boundaries. Unset fields take the defaults derived from the data.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktestDates {
    pub train_start: Option<NaiveDate>,
    pub train_end: Option<NaiveDate>,
    pub test_start: Option<NaiveDate>,
    pub test_end: Option<NaiveDate>,
}

/// Predictions collected over a test replay
#[derive(Debug, Clone, Default)]
pub struct Predictions {
    pub actuals: Vec<u8>,
    pub predictions: Vec<u8>,
    pub probabilities: Vec<f64>,
}

impl Predictions {
    /// Record the probability assigned to the historical winner
    fn push_winner(&mut self, winner_prob: f64) {
        self.actuals.push(1);
        self.predictions.push(u8::from(winner_prob > 0.5));
        self.probabilities.push(winner_prob);
    }

    pub fn metrics(&self, model_name: &str) -> EvaluationMetrics {
        EvaluationMetrics::compute(model_name, &self.actuals, &self.predictions, &self.probabilities)
    }
}

/// Validated train/test windows over one match history
#[derive(Debug, Clone)]
pub struct BacktestHarness {
    config: Config,
    train: MatchTable,
    test: MatchTable,
    train_start: NaiveDate,
    train_end: NaiveDate,
    test_start: NaiveDate,
    test_end: NaiveDate,
}

impl BacktestHarness {
    pub fn new(table: &MatchTable, config: &Config, dates: BacktestDates) -> Result<Self> {
        let (earliest, latest) = match (table.first_date(), table.last_date()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(TennisError::NoValidDates),
        };
        let total_days = (latest - earliest).num_days();

        let train_start = dates.train_start.unwrap_or(earliest);
        let train_end = dates.train_end.unwrap_or_else(|| {
            let span = (total_days as f64 * config.backtest.default_train_span) as i64;
            earliest + Duration::days(span)
        });
        let test_start = dates.test_start.unwrap_or(train_end + Duration::days(1));
        let test_end = dates.test_end.unwrap_or(latest);

        if train_end >= test_start {
            return Err(TennisError::InvalidDateRange { train_end, test_start });
        }

        let train = table.window(train_start, train_end);
        let test = table.window(test_start, test_end);

        let required = config.backtest.min_train_matches;
        if train.len() < required {
            return Err(TennisError::InsufficientData {
                window: "training".to_string(),
                matches: train.len(),
                required,
            });
        }
        let required = config.backtest.min_test_matches;
        if test.len() < required {
            return Err(TennisError::InsufficientData {
                window: "test".to_string(),
                matches: test.len(),
                required,
            });
        }

        log::info!(
            "Data split complete: training {} matches ({} to {}), test {} matches ({} to {})",
            train.len(),
            train_start,
            train_end,
            test.len(),
            test_start,
            test_end
        );

        Ok(BacktestHarness {
            config: config.clone(),
            train,
            test,
            train_start,
            train_end,
            test_start,
            test_end,
        })
    }

    pub fn train(&self) -> &MatchTable {
        &self.train
    }

    pub fn test(&self) -> &MatchTable {
        &self.test
    }

    pub fn train_range(&self) -> (NaiveDate, NaiveDate) {
        (self.train_start, self.train_end)
    }

    pub fn test_range(&self) -> (NaiveDate, NaiveDate) {
        (self.test_start, self.test_end)
    }

    /// Fresh rating engine holding only the training window
    fn trained_ratings(&self) -> RatingEngine {
        let mut ratings = RatingEngine::new(self.config.elo.clone());
        if self.config.elo.apply_decay {
            ratings.set_as_of(Some(self.test_end));
        }
        ratings.calculate_ratings_from_matches(&self.train);
        ratings
    }

    /// Replay the test window, predicting each match before applying it
    fn replay<F>(&self, ratings: &mut RatingEngine, mut predict: F) -> Predictions
    where
        F: FnMut(&RatingEngine, &MatchRecord) -> f64,
    {
        let mut out = Predictions::default();
        for record in &self.test {
            let winner_prob = predict(&*ratings, record);
            out.push_winner(winner_prob);
            ratings.update(record);
        }
        out
    }

    /// Probability given to each test winner by Elo alone
    pub fn predict_elo_only(&self, use_surface_adjustment: bool) -> Predictions {
        let mut ratings = self.trained_ratings();
        self.replay(&mut ratings, |ratings, m| {
            let surface = if use_surface_adjustment { m.surface } else { None };
            let winner_elo = ratings.match_rating(&m.winner_id, surface);
            let loser_elo = ratings.match_rating(&m.loser_id, surface);
            RatingEngine::expected_score(winner_elo, loser_elo)
        })
    }

    /// Probability given to each test winner by the hybrid estimator.
    /// Statistics and head-to-head come from the training window only and
    /// are not refreshed during the replay.
    pub fn predict_hybrid(&self, use_surface_adjustment: bool) -> Predictions {
        let mut ratings = self.trained_ratings();
        let stats = StatisticsEngine::from_config(self.train.clone(), &self.config);
        let probability = self.config.probability.clone();

        self.replay(&mut ratings, |ratings, m| {
            let surface = if use_surface_adjustment { m.surface } else { None };
            let h2h = stats.head_to_head(&m.winner_id, &m.loser_id);
            let estimator = ProbabilityEstimator::new(ratings, Some(&stats), probability.clone());
            estimator
                .hybrid_probability(&m.winner_id, &m.loser_id, surface, Some(&h2h))
                .probability
                .player_a
        })
    }

    pub fn evaluate_elo_only(&self, use_surface_adjustment: bool) -> EvaluationMetrics {
        log::info!("Evaluating Elo-only model on {} test matches", self.test.len());
        let metrics = self.predict_elo_only(use_surface_adjustment).metrics("Elo-Only");
        log::info!("Elo-only accuracy {:.2}%", metrics.accuracy * 100.0);
        metrics
    }

    pub fn evaluate_hybrid_model(&self, use_surface_adjustment: bool) -> EvaluationMetrics {
        log::info!("Evaluating hybrid model on {} test matches", self.test.len());
        let metrics = self.predict_hybrid(use_surface_adjustment).metrics("Hybrid");
        log::info!("Hybrid accuracy {:.2}%", metrics.accuracy * 100.0);
        metrics
    }

    pub fn compare_models(&self) -> ModelComparison {
        let use_surface = self.config.backtest.use_surface_adjustment;
        let elo_only = self.evaluate_elo_only(use_surface);
        let hybrid = self.evaluate_hybrid_model(use_surface);
        ModelComparison::new(elo_only, hybrid)
    }
}
