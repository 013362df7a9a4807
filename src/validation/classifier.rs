//! Pluggable win classifier over the match feature matrix
//!
//! The learner is opaque: anything that can be fitted on feature rows and
//! return a probability for one side can be evaluated on the same
//! chronological split as the rating models.

use crate::features::rolling::{FeatureRow, MatchupFeatures};
use crate::validation::metrics::EvaluationMetrics;
use crate::validation::split::{ChronologicalSplit, Window};
use crate::{Result, TennisError};

/// Binary classifier predicting whether the described side wins
pub trait WinClassifier {
    fn name(&self) -> &str;

    /// Fit on the training rows. Validation rows may be used for model selection.
    fn fit(&mut self, train: &[FeatureRow], validation: &[FeatureRow]) -> Result<()>;

    /// Probability that the side described by `features` wins
    fn predict_proba(&self, features: &MatchupFeatures) -> f64;
}

/// Rows of the matrix grouped by split window
#[derive(Debug, Clone, Default)]
pub struct MatrixSplit {
    pub train: Vec<FeatureRow>,
    pub validation: Vec<FeatureRow>,
    pub test: Vec<FeatureRow>,
}

impl MatrixSplit {
    pub fn new(rows: &[FeatureRow], split: &ChronologicalSplit) -> Self {
        let mut out = MatrixSplit::default();
        for row in rows {
            match split.window_of(row.date) {
                Window::Train => out.train.push(row.clone()),
                Window::Validation => out.validation.push(row.clone()),
                Window::Test => out.test.push(row.clone()),
            }
        }
        out
    }
}

/// Fit on the train window and report metrics on the test window
pub fn evaluate_classifier<C: WinClassifier + ?Sized>(
    model: &mut C,
    rows: &[FeatureRow],
    split: &ChronologicalSplit,
) -> Result<EvaluationMetrics> {
    let parts = MatrixSplit::new(rows, split);
    if parts.train.is_empty() || parts.test.is_empty() {
        return Err(TennisError::InvalidSplit(format!(
            "feature matrix has {} training and {} test rows",
            parts.train.len(),
            parts.test.len()
        )));
    }

    log::info!(
        "Fitting {} on {} rows ({} validation)",
        model.name(),
        parts.train.len(),
        parts.validation.len()
    );
    model.fit(&parts.train, &parts.validation)?;

    let actuals: Vec<u8> = parts.test.iter().map(|r| r.target).collect();
    let probabilities: Vec<f64> = parts.test.iter().map(|r| model.predict_proba(&r.features)).collect();
    Ok(EvaluationMetrics::from_probabilities(model.name(), &actuals, &probabilities))
}

/// Logistic curve over the Elo difference with a fitted scale
#[derive(Debug, Clone)]
pub struct EloBaseline {
    scale: f64,
    candidates: Vec<f64>,
}

impl Default for EloBaseline {
    fn default() -> Self {
        EloBaseline {
            scale: 400.0,
            candidates: vec![200.0, 300.0, 400.0, 500.0, 600.0, 800.0],
        }
    }
}

impl EloBaseline {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn probability(scale: f64, elo_diff: f64) -> f64 {
        1.0 / (1.0 + 10f64.powf(-elo_diff / scale))
    }

    fn log_loss(scale: f64, rows: &[FeatureRow]) -> f64 {
        let total: f64 = rows
            .iter()
            .map(|r| {
                let p = Self::probability(scale, r.features.elo_diff).clamp(1e-15, 1.0 - 1e-15);
                if r.target == 1 {
                    -p.ln()
                } else {
                    -(1.0 - p).ln()
                }
            })
            .sum();
        total / rows.len() as f64
    }
}

impl WinClassifier for EloBaseline {
    fn name(&self) -> &str {
        "Elo baseline"
    }

    fn fit(&mut self, train: &[FeatureRow], validation: &[FeatureRow]) -> Result<()> {
        let rows = if validation.is_empty() { train } else { validation };
        if rows.is_empty() {
            return Err(TennisError::InvalidSplit("no rows to fit on".to_string()));
        }

        let mut best = (f64::INFINITY, self.scale);
        for &scale in &self.candidates {
            let loss = Self::log_loss(scale, rows);
            log::debug!("Elo baseline scale {}: log loss {:.4}", scale, loss);
            if loss < best.0 {
                best = (loss, scale);
            }
        }
        self.scale = best.1;
        log::info!("Elo baseline scale {} (log loss {:.4})", self.scale, best.0);
        Ok(())
    }

    fn predict_proba(&self, features: &MatchupFeatures) -> f64 {
        Self::probability(self.scale, features.elo_diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MatchTable;
    use crate::features::rolling::{build_match_matrix, RollingFeatureBuilder};
    use crate::{EloConfig, MatchRecord, PlayerId, RollingConfig};
    use chrono::{Duration, NaiveDate};

    fn make_match(day: i64, winner: &str, loser: &str) -> MatchRecord {
        let base = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        MatchRecord::new(base + Duration::days(day), PlayerId::from(winner), PlayerId::from(loser))
    }

    /// "a" beats everyone, "b" beats "c" and "d", and so on
    fn ladder(n: i64) -> MatchTable {
        let players = ["a", "b", "c", "d"];
        (0..n)
            .map(|day| {
                let i = (day % 3) as usize;
                let j = i + 1 + (day % 2) as usize;
                make_match(day, players[i], players[j.min(3)])
            })
            .collect()
    }

    fn matrix(table: &MatchTable) -> Vec<FeatureRow> {
        let builder = RollingFeatureBuilder::new(RollingConfig::default(), &EloConfig::default());
        let history = builder.build(table);
        build_match_matrix(table, &history)
    }

    #[test]
    fn test_matrix_split_follows_dates() {
        let table = ladder(50);
        let rows = matrix(&table);
        let split = ChronologicalSplit::from_fractions(&table, 0.6, 0.2, (1, 1, 1)).unwrap();
        let parts = MatrixSplit::new(&rows, &split);
        assert_eq!(parts.train.len(), split.train.len() * 2);
        assert_eq!(parts.validation.len(), split.validation.len() * 2);
        assert_eq!(parts.test.len(), split.test.len() * 2);
        assert!(parts.train.iter().all(|r| r.date <= split.train_end));
        assert!(parts.test.iter().all(|r| r.date >= split.test_start));
    }

    #[test]
    fn test_evaluate_baseline() {
        let table = ladder(120);
        let rows = matrix(&table);
        let split = ChronologicalSplit::from_fractions(&table, 0.6, 0.2, (1, 1, 1)).unwrap();

        let mut model = EloBaseline::default();
        let metrics = evaluate_classifier(&mut model, &rows, &split).unwrap();
        assert_eq!(metrics.n_matches, split.test.len() * 2);
        // Both labels are present, so AUC is defined
        assert!(metrics.roc_auc.is_some());
        // The stronger player always wins
        assert!(metrics.accuracy > 0.9);
        assert!(model.candidates.contains(&model.scale()));
    }

    #[test]
    fn test_mirrored_rows_are_complementary() {
        let model = EloBaseline::default();
        let mut f = MatchupFeatures::default();
        f.elo_diff = 120.0;
        let p = model.predict_proba(&f);
        f.elo_diff = -120.0;
        assert!((p + model.predict_proba(&f) - 1.0).abs() < 1e-12);
    }

    struct Constant(f64);

    impl WinClassifier for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn fit(&mut self, _train: &[FeatureRow], _validation: &[FeatureRow]) -> Result<()> {
            Ok(())
        }

        fn predict_proba(&self, _features: &MatchupFeatures) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_trait_object_and_empty_rows() {
        let table = ladder(50);
        let split = ChronologicalSplit::from_fractions(&table, 0.6, 0.2, (1, 1, 1)).unwrap();
        let rows = matrix(&table);

        let mut model: Box<dyn WinClassifier> = Box::new(Constant(0.5));
        let metrics = evaluate_classifier(model.as_mut(), &rows, &split).unwrap();
        assert_eq!(metrics.accuracy, 0.5);
        assert_eq!(metrics.roc_auc, Some(0.5));

        assert!(matches!(
            evaluate_classifier(&mut Constant(0.5), &[], &split),
            Err(TennisError::InvalidSplit(_))
        ));
    }
}
