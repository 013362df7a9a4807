//! Chronological train / validation / test split
//!
//! Windows are cut at date quantiles so that every match in a later window
//! is strictly newer than every match in an earlier one.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::data::MatchTable;
use crate::{BacktestConfig, Result, TennisError};

/// Which window a date falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Train,
    Validation,
    Test,
}

#[derive(Debug, Clone)]
pub struct ChronologicalSplit {
    pub train: MatchTable,
    pub validation: MatchTable,
    pub test: MatchTable,
    pub train_end: NaiveDate,
    pub val_end: NaiveDate,
    pub test_start: NaiveDate,
}

/// Linear-interpolated quantile of sorted dates, in days from CE
fn date_quantile(sorted_days: &[i32], q: f64) -> f64 {
    let pos = q * (sorted_days.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted_days[lo] as f64 + frac * (sorted_days[hi] - sorted_days[lo]) as f64
}

impl ChronologicalSplit {
    /// Split at the `train_frac` and `train_frac + val_frac` date quantiles
    pub fn from_fractions(
        table: &MatchTable,
        train_frac: f64,
        val_frac: f64,
        minimums: (usize, usize, usize),
    ) -> Result<Self> {
        if !(train_frac > 0.0 && val_frac >= 0.0 && train_frac + val_frac < 1.0) {
            return Err(TennisError::InvalidSplit(format!(
                "fractions must satisfy 0 < train ({}) and train + validation ({}) < 1",
                train_frac,
                train_frac + val_frac
            )));
        }
        if table.is_empty() {
            return Err(TennisError::NoValidDates);
        }

        let days: Vec<i32> = table.iter().map(|m| m.date.num_days_from_ce()).collect();
        let train_cut = date_quantile(&days, train_frac);
        let val_cut = date_quantile(&days, train_frac + val_frac);

        let train = table.filter(|m| m.date.num_days_from_ce() as f64 <= train_cut);
        let validation = table.filter(|m| {
            let d = m.date.num_days_from_ce() as f64;
            d > train_cut && d <= val_cut
        });
        let test = table.filter(|m| m.date.num_days_from_ce() as f64 > val_cut);

        let (min_train, min_val, min_test) = minimums;
        for (window, part, required) in [
            ("training", &train, min_train),
            ("validation", &validation, min_val),
            ("test", &test, min_test),
        ] {
            if part.len() < required.max(1) {
                return Err(TennisError::InsufficientData {
                    window: window.to_string(),
                    matches: part.len(),
                    required: required.max(1),
                });
            }
        }

        let (train_end, val_end, test_start) = match (train.last_date(), validation.last_date(), test.first_date()) {
            (Some(t), Some(v), Some(s)) => (t, v, s),
            _ => return Err(TennisError::NoValidDates),
        };

        log::info!(
            "Chronological split: train {} (to {}), validation {} (to {}), test {} (from {})",
            train.len(),
            train_end,
            validation.len(),
            val_end,
            test.len(),
            test_start
        );

        Ok(ChronologicalSplit {
            train,
            validation,
            test,
            train_end,
            val_end,
            test_start,
        })
    }

    pub fn from_config(table: &MatchTable, config: &BacktestConfig) -> Result<Self> {
        Self::from_fractions(
            table,
            config.train_frac,
            config.val_frac,
            (
                config.min_train_matches,
                config.min_validation_matches,
                config.min_test_matches,
            ),
        )
    }

    /// Window of a date from the split table
    pub fn window_of(&self, date: NaiveDate) -> Window {
        if date <= self.train_end {
            Window::Train
        } else if date <= self.val_end {
            Window::Validation
        } else {
            Window::Test
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchRecord, PlayerId};

    fn make_match(offset: i64) -> MatchRecord {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        MatchRecord::new(
            base + chrono::Duration::days(offset),
            PlayerId::from("a"),
            PlayerId::from("b"),
        )
    }

    fn table(n: i64) -> MatchTable {
        (0..n).map(make_match).collect()
    }

    #[test]
    fn test_split_ordering() {
        let t = table(100);
        let split = ChronologicalSplit::from_fractions(&t, 0.6, 0.2, (10, 10, 10)).unwrap();
        assert_eq!(split.train.len() + split.validation.len() + split.test.len(), 100);
        assert!(split.train_end < split.val_end);
        assert!(split.val_end < split.test_start);
        assert!(split.train.iter().all(|m| m.date <= split.train_end));
        assert!(split.test.iter().all(|m| m.date >= split.test_start));
        // q(0.6) over 100 consecutive days lands on day 59.4
        assert_eq!(split.train.len(), 60);
        assert_eq!(split.validation.len(), 20);
        assert_eq!(split.window_of(split.test_start), Window::Test);
        assert_eq!(split.window_of(split.train_end), Window::Train);
    }

    #[test]
    fn test_same_day_matches_stay_together() {
        let mut matches: Vec<MatchRecord> = (0..100).map(make_match).collect();
        for _ in 0..20 {
            matches.push(make_match(59));
        }
        let t = MatchTable::new(matches);
        let split = ChronologicalSplit::from_fractions(&t, 0.6, 0.2, (1, 1, 1)).unwrap();
        // The 0.6 quantile falls inside the day-59 block, which goes to training whole
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.train_end, NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
        assert_eq!(split.validation.len(), 16);
        assert_eq!(split.test.len(), 24);
    }

    #[test]
    fn test_minimums_enforced() {
        let t = table(20);
        let err = ChronologicalSplit::from_fractions(&t, 0.6, 0.2, (100, 5, 5)).unwrap_err();
        assert!(matches!(err, TennisError::InsufficientData { ref window, .. } if window.as_str() == "training"));

        let err = ChronologicalSplit::from_fractions(&t, 0.6, 0.2, (5, 1, 50)).unwrap_err();
        assert!(matches!(err, TennisError::InsufficientData { ref window, .. } if window.as_str() == "test"));
    }

    #[test]
    fn test_invalid_fractions() {
        let t = table(20);
        assert!(matches!(
            ChronologicalSplit::from_fractions(&t, 0.8, 0.3, (1, 1, 1)),
            Err(TennisError::InvalidSplit(_))
        ));
        assert!(matches!(
            ChronologicalSplit::from_fractions(&MatchTable::default(), 0.6, 0.2, (1, 1, 1)),
            Err(TennisError::NoValidDates)
        ));
    }
}
