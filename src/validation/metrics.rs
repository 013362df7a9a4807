//! Evaluation metrics for win probability models

use serde::Serialize;
use std::fmt;

const CALIBRATION_BINS: usize = 10;
const LOG_LOSS_EPS: f64 = 1e-15;

/// Observed win rate against mean predicted probability per non-empty bin
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationCurve {
    pub fraction_of_positives: Vec<f64>,
    pub mean_predicted_value: Vec<f64>,
}

impl CalibrationCurve {
    /// Uniform bins over [0, 1]; a value on a bin edge falls in the lower bin
    pub fn uniform(actuals: &[u8], probabilities: &[f64], n_bins: usize) -> Self {
        let mut sums = vec![0.0; n_bins];
        let mut positives = vec![0.0; n_bins];
        let mut totals = vec![0usize; n_bins];

        // Interior edges as i * step, matching a linspace over [0, 1]
        let step = 1.0 / n_bins as f64;
        let edges: Vec<f64> = (1..n_bins).map(|i| i as f64 * step).collect();

        for (&y, &p) in actuals.iter().zip(probabilities) {
            let bin = edges.iter().filter(|&&edge| edge < p).count();
            sums[bin] += p;
            positives[bin] += y as f64;
            totals[bin] += 1;
        }

        let mut curve = CalibrationCurve::default();
        for bin in (0..n_bins).filter(|&b| totals[b] > 0) {
            let n = totals[bin] as f64;
            curve.fraction_of_positives.push(positives[bin] / n);
            curve.mean_predicted_value.push(sums[bin] / n);
        }
        curve
    }

    pub fn is_empty(&self) -> bool {
        self.fraction_of_positives.is_empty()
    }

    /// Mean absolute gap between observed and predicted per bin
    pub fn mean_absolute_error(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let total: f64 = self
            .fraction_of_positives
            .iter()
            .zip(&self.mean_predicted_value)
            .map(|(o, p)| (o - p).abs())
            .sum();
        Some(total / self.fraction_of_positives.len() as f64)
    }
}

/// Metrics for one evaluated model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    pub model_name: String,
    pub n_matches: usize,
    pub accuracy: f64,
    pub brier_score: f64,
    pub log_loss: f64,
    /// None when only one class is present
    pub roc_auc: Option<f64>,
    pub calibration_error: Option<f64>,
    pub mean_probability: f64,
    pub std_probability: f64,
    /// Probabilities above 0.7 or below 0.3
    pub high_confidence_predictions: usize,
    pub medium_confidence_predictions: usize,
    pub calibration_curve: CalibrationCurve,
}

impl EvaluationMetrics {
    /// Compute all metrics from labels, hard predictions and probabilities
    pub fn compute(model_name: &str, actuals: &[u8], predictions: &[u8], probabilities: &[f64]) -> Self {
        let n = actuals.len();
        let correct = actuals.iter().zip(predictions).filter(|(a, p)| a == p).count();

        let brier: Vec<f64> = actuals
            .iter()
            .zip(probabilities)
            .map(|(&y, &p)| (p - y as f64).powi(2))
            .collect();
        let log_losses: Vec<f64> = actuals
            .iter()
            .zip(probabilities)
            .map(|(&y, &p)| {
                let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
                if y == 1 {
                    -p.ln()
                } else {
                    -(1.0 - p).ln()
                }
            })
            .collect();

        let calibration_curve = CalibrationCurve::uniform(actuals, probabilities, CALIBRATION_BINS);
        let mean_probability = mean(probabilities);
        let variance = if probabilities.is_empty() {
            0.0
        } else {
            probabilities.iter().map(|p| (p - mean_probability).powi(2)).sum::<f64>() / probabilities.len() as f64
        };
        let high = probabilities.iter().filter(|&&p| p > 0.7 || p < 0.3).count();

        EvaluationMetrics {
            model_name: model_name.to_string(),
            n_matches: n,
            accuracy: if n == 0 { 0.0 } else { correct as f64 / n as f64 },
            brier_score: mean(&brier),
            log_loss: mean(&log_losses),
            roc_auc: roc_auc(actuals, probabilities),
            calibration_error: calibration_curve.mean_absolute_error(),
            mean_probability,
            std_probability: variance.sqrt(),
            high_confidence_predictions: high,
            medium_confidence_predictions: probabilities.len() - high,
            calibration_curve,
        }
    }

    /// Compute with hard predictions at the 0.5 threshold
    pub fn from_probabilities(model_name: &str, actuals: &[u8], probabilities: &[f64]) -> Self {
        let predictions: Vec<u8> = probabilities.iter().map(|&p| u8::from(p > 0.5)).collect();
        Self::compute(model_name, actuals, &predictions, probabilities)
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluation Results: {}", self.model_name)?;
        writeln!(f, "───────────────────────────────")?;
        writeln!(f, "  Matches evaluated:  {}", self.n_matches)?;
        writeln!(f, "  Accuracy:           {:.2}%", self.accuracy * 100.0)?;
        writeln!(f, "  Brier score:        {:.4} (lower is better)", self.brier_score)?;
        writeln!(f, "  Log loss:           {:.4} (lower is better)", self.log_loss)?;
        if let Some(auc) = self.roc_auc {
            writeln!(f, "  ROC AUC:            {:.4} (higher is better)", auc)?;
        }
        if let Some(err) = self.calibration_error {
            writeln!(f, "  Calibration error:  {:.4} (lower is better)", err)?;
        }
        writeln!(f, "  Mean probability:   {:.2}%", self.mean_probability * 100.0)?;
        writeln!(f, "  Std probability:    {:.4}", self.std_probability)?;
        writeln!(f, "  High confidence:    {} matches", self.high_confidence_predictions)?;
        write!(f, "  Medium confidence:  {} matches", self.medium_confidence_predictions)
    }
}

/// Percentage change of the candidate over the baseline, positive is better
pub fn percent_improvement(baseline: f64, candidate: f64, lower_is_better: bool) -> Option<f64> {
    if baseline == 0.0 {
        return None;
    }
    let change = if lower_is_better {
        (baseline - candidate) / baseline
    } else {
        (candidate - baseline) / baseline
    };
    Some(change * 100.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Improvement {
    pub accuracy: Option<f64>,
    pub brier_score: Option<f64>,
    pub log_loss: Option<f64>,
    pub roc_auc: Option<f64>,
}

/// Elo-only against hybrid evaluation over the same test window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelComparison {
    pub elo_only: EvaluationMetrics,
    pub hybrid: EvaluationMetrics,
    pub improvement: Improvement,
}

impl ModelComparison {
    pub fn new(elo_only: EvaluationMetrics, hybrid: EvaluationMetrics) -> Self {
        let roc_auc = match (elo_only.roc_auc, hybrid.roc_auc) {
            (Some(base), Some(cand)) => percent_improvement(base, cand, false),
            _ => None,
        };
        let improvement = Improvement {
            accuracy: percent_improvement(elo_only.accuracy, hybrid.accuracy, false),
            brier_score: percent_improvement(elo_only.brier_score, hybrid.brier_score, true),
            log_loss: percent_improvement(elo_only.log_loss, hybrid.log_loss, true),
            roc_auc,
        };
        ModelComparison {
            elo_only,
            hybrid,
            improvement,
        }
    }
}

impl fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", self.elo_only)?;
        writeln!(f, "{}\n", self.hybrid)?;
        writeln!(f, "Improvement (hybrid vs Elo-only)")?;
        writeln!(f, "───────────────────────────────")?;
        let rows = [
            ("Accuracy", self.improvement.accuracy),
            ("Brier score", self.improvement.brier_score),
            ("Log loss", self.improvement.log_loss),
            ("ROC AUC", self.improvement.roc_auc),
        ];
        for (name, value) in rows {
            match value {
                Some(v) => writeln!(f, "  {:<18}{:+.2}%", name, v)?,
                None => writeln!(f, "  {:<18}n/a", name)?,
            }
        }
        Ok(())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged
pub fn roc_auc(actuals: &[u8], probabilities: &[f64]) -> Option<f64> {
    let positives = actuals.iter().filter(|&&y| y == 1).count();
    let negatives = actuals.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[a].total_cmp(&probabilities[b]));

    let mut ranks = vec![0.0; order.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probabilities[order[j + 1]] == probabilities[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = actuals
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y == 1)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}
