//! Point-in-time rolling features for an external classifier
//!
//! Builds one row per player per match with rolling aggregates that only
//! look at the player's earlier matches (shift, then rolling mean), and
//! turns those rows into a two-rows-per-match difference matrix.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::data::MatchTable;
use crate::features::elo::RatingEngine;
use crate::{EloConfig, PlayerId, RollingConfig, Surface};

/// A match from one player's side, with features known before it started
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerMatchRow {
    /// Position of the match in the source table
    pub match_index: usize,
    pub date: NaiveDate,
    pub player: PlayerId,
    pub opponent: PlayerId,
    pub surface: Option<Surface>,
    pub rank: Option<f64>,
    pub won: bool,
    pub aces: Option<f64>,
    pub minutes: Option<f64>,
    pub bp_save_pct: Option<f64>,

    /// Global rating before the player's first match that day
    pub elo_before: f64,
    pub rolling_win_pct: Option<f64>,
    pub last3_win_avg: Option<f64>,
    pub surface_win_pct: Option<f64>,
    pub rolling_ace_avg: Option<f64>,
    pub rolling_minutes_avg: Option<f64>,
    pub rolling_bp_save: Option<f64>,
}

/// Player history with rolling features
#[derive(Debug, Clone, Default)]
pub struct PlayerHistory {
    /// Sorted by player, then date
    rows: Vec<PlayerMatchRow>,
    index: HashMap<(usize, PlayerId), usize>,
    final_ratings: HashMap<PlayerId, f64>,
}

impl PlayerHistory {
    pub fn rows(&self) -> &[PlayerMatchRow] {
        &self.rows
    }

    /// Row for `player` in the match at `match_index`
    pub fn row_for(&self, match_index: usize, player: &PlayerId) -> Option<&PlayerMatchRow> {
        self.index
            .get(&(match_index, player.clone()))
            .map(|&i| &self.rows[i])
    }

    /// Most recent row for a player
    pub fn latest(&self, player: &PlayerId) -> Option<&PlayerMatchRow> {
        self.rows.iter().rev().find(|r| &r.player == player)
    }

    /// Rating after the whole history was replayed
    pub fn current_elo(&self, player: &PlayerId) -> Option<f64> {
        self.final_ratings.get(player).copied()
    }
}

/// Mean of the previous `window` values, skipping missing ones.
/// Position i never sees value i.
pub fn shifted_rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(window);
            let present: Vec<f64> = values[start..i].iter().flatten().copied().collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        })
        .collect()
}

pub struct RollingFeatureBuilder {
    config: RollingConfig,
    elo: EloConfig,
}

impl RollingFeatureBuilder {
    /// `elo` supplies the starting rating. Every match uses the rolling K-factor
    /// with no surface split or decay.
    pub fn new(config: RollingConfig, elo: &EloConfig) -> Self {
        let k = config.k_factor;
        RollingFeatureBuilder {
            config,
            elo: EloConfig {
                k_factor_regular: k,
                k_factor_grand_slam: k,
                k_factor_small: k,
                apply_decay: false,
                ..elo.clone()
            },
        }
    }

    pub fn build(&self, matches: &MatchTable) -> PlayerHistory {
        let mut rows = Self::player_rows(matches);
        let final_ratings = self.attach_elo(matches, &mut rows);

        rows.sort_by(|a, b| {
            a.player
                .cmp(&b.player)
                .then(a.date.cmp(&b.date))
                .then(a.match_index.cmp(&b.match_index))
        });
        self.attach_rolling(&mut rows);

        let index = rows
            .iter()
            .enumerate()
            .map(|(i, r)| ((r.match_index, r.player.clone()), i))
            .collect();

        PlayerHistory {
            rows,
            index,
            final_ratings,
        }
    }

    fn player_rows(matches: &MatchTable) -> Vec<PlayerMatchRow> {
        let mut rows = Vec::with_capacity(matches.len() * 2);
        for (match_index, m) in matches.iter().enumerate() {
            for (player, opponent, won, rank, serve) in [
                (&m.winner_id, &m.loser_id, true, m.winner_rank, &m.winner_serve),
                (&m.loser_id, &m.winner_id, false, m.loser_rank, &m.loser_serve),
            ] {
                rows.push(PlayerMatchRow {
                    match_index,
                    date: m.date,
                    player: player.clone(),
                    opponent: opponent.clone(),
                    surface: m.surface,
                    rank,
                    won,
                    aces: serve.aces,
                    minutes: m.minutes,
                    bp_save_pct: serve.bp_save_pct(),
                    elo_before: 0.0,
                    rolling_win_pct: None,
                    last3_win_avg: None,
                    surface_win_pct: None,
                    rolling_ace_avg: None,
                    rolling_minutes_avg: None,
                    rolling_bp_save: None,
                });
            }
        }
        rows
    }

    fn attach_elo(&self, matches: &MatchTable, rows: &mut [PlayerMatchRow]) -> HashMap<PlayerId, f64> {
        let mut engine = RatingEngine::new(self.elo.clone());
        let mut first_of_day: HashMap<(PlayerId, NaiveDate), f64> = HashMap::new();

        for m in matches {
            for p in [&m.winner_id, &m.loser_id] {
                let before = engine.global_rating(p);
                first_of_day.entry((p.clone(), m.date)).or_insert(before);
            }
            engine.update_rating(&m.winner_id, &m.loser_id, None, m.level, None);
        }

        for row in rows.iter_mut() {
            row.elo_before = first_of_day
                .get(&(row.player.clone(), row.date))
                .copied()
                .unwrap_or(self.elo.starting_rating);
        }

        engine.rankings().into_iter().collect()
    }

    /// Rows must be grouped by player and in date order
    fn attach_rolling(&self, rows: &mut [PlayerMatchRow]) {
        let window = self.config.window;
        let mut start = 0;
        while start < rows.len() {
            let end = start + rows[start..].partition_point(|r| r.player == rows[start].player);
            let group = &mut rows[start..end];

            let won: Vec<Option<f64>> = group.iter().map(|r| Some(if r.won { 1.0 } else { 0.0 })).collect();
            let aces: Vec<Option<f64>> = group.iter().map(|r| r.aces).collect();
            let minutes: Vec<Option<f64>> = group.iter().map(|r| r.minutes).collect();
            let bp: Vec<Option<f64>> = group.iter().map(|r| r.bp_save_pct).collect();

            let win_pct = shifted_rolling_mean(&won, window);
            let last3 = shifted_rolling_mean(&won, self.config.short_window);
            let ace_avg = shifted_rolling_mean(&aces, window);
            let minutes_avg = shifted_rolling_mean(&minutes, window);
            let bp_avg = shifted_rolling_mean(&bp, window);

            for (i, row) in group.iter_mut().enumerate() {
                row.rolling_win_pct = win_pct[i];
                row.last3_win_avg = last3[i];
                row.rolling_ace_avg = ace_avg[i];
                row.rolling_minutes_avg = minutes_avg[i];
                row.rolling_bp_save = bp_avg[i];
            }

            for surface in Surface::ALL {
                let positions: Vec<usize> = (0..group.len())
                    .filter(|&i| group[i].surface == Some(surface))
                    .collect();
                let outcomes: Vec<Option<f64>> = positions
                    .iter()
                    .map(|&i| Some(if group[i].won { 1.0 } else { 0.0 }))
                    .collect();
                let pct = shifted_rolling_mean(&outcomes, window);
                for (k, &i) in positions.iter().enumerate() {
                    group[i].surface_win_pct = pct[k];
                }
            }

            start = end;
        }
    }
}

/// Difference features for one match from one side
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MatchupFeatures {
    pub rank_diff: f64,
    pub elo_diff: f64,
    pub form_diff: f64,
    pub last3_win_diff: f64,
    pub surface_win_diff: f64,
    pub ace_diff: f64,
    pub minutes_diff: f64,
    pub bp_diff: f64,
    /// Surface one-hot, Carpet is the reference level
    pub surface_clay: f64,
    pub surface_grass: f64,
    pub surface_hard: f64,
}

impl MatchupFeatures {
    pub const DIM: usize = 11;

    pub const NAMES: [&'static str; 11] = [
        "rank_diff",
        "elo_diff",
        "form_diff",
        "last3_win_diff",
        "surface_win_diff",
        "ace_diff",
        "minutes_diff",
        "bp_diff",
        "surface_Clay",
        "surface_Grass",
        "surface_Hard",
    ];

    /// Features for `us` against `them`. Missing differences become 0.
    pub fn from_rows(us: &PlayerMatchRow, them: &PlayerMatchRow) -> Self {
        fn diff(a: Option<f64>, b: Option<f64>) -> f64 {
            match (a, b) {
                (Some(a), Some(b)) => a - b,
                _ => 0.0,
            }
        }
        let surface = us.surface;
        let flag = |s: Surface| if surface == Some(s) { 1.0 } else { 0.0 };

        MatchupFeatures {
            // Lower rank number is better, so positive means we are ranked higher
            rank_diff: diff(them.rank, us.rank),
            elo_diff: us.elo_before - them.elo_before,
            form_diff: diff(us.rolling_win_pct, them.rolling_win_pct),
            last3_win_diff: diff(us.last3_win_avg, them.last3_win_avg),
            surface_win_diff: diff(us.surface_win_pct, them.surface_win_pct),
            ace_diff: diff(us.rolling_ace_avg, them.rolling_ace_avg),
            minutes_diff: diff(us.rolling_minutes_avg, them.rolling_minutes_avg),
            bp_diff: diff(us.rolling_bp_save, them.rolling_bp_save),
            surface_clay: flag(Surface::Clay),
            surface_grass: flag(Surface::Grass),
            surface_hard: flag(Surface::Hard),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.rank_diff,
            self.elo_diff,
            self.form_diff,
            self.last3_win_diff,
            self.surface_win_diff,
            self.ace_diff,
            self.minutes_diff,
            self.bp_diff,
            self.surface_clay,
            self.surface_grass,
            self.surface_hard,
        ]
    }
}

/// One labelled row of the match matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub features: MatchupFeatures,
    /// 1 when `features` describe the winner's side
    pub target: u8,
}

/// Two rows per match: winner's view (target 1) then loser's view (target 0)
pub fn build_match_matrix(matches: &MatchTable, history: &PlayerHistory) -> Vec<FeatureRow> {
    let mut out = Vec::with_capacity(matches.len() * 2);
    for (idx, m) in matches.iter().enumerate() {
        let (Some(w), Some(l)) = (history.row_for(idx, &m.winner_id), history.row_for(idx, &m.loser_id)) else {
            continue;
        };
        out.push(FeatureRow {
            date: m.date,
            features: MatchupFeatures::from_rows(w, l),
            target: 1,
        });
        out.push(FeatureRow {
            date: m.date,
            features: MatchupFeatures::from_rows(l, w),
            target: 0,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchRecord;

    fn make_match(day: u32, winner: &str, loser: &str, surface: Surface) -> MatchRecord {
        let mut m = MatchRecord::new(
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            PlayerId::from(winner),
            PlayerId::from(loser),
        );
        m.surface = Some(surface);
        m
    }

    fn builder() -> RollingFeatureBuilder {
        RollingFeatureBuilder::new(RollingConfig::default(), &EloConfig::default())
    }

    #[test]
    fn test_shifted_rolling_mean() {
        let values = [Some(1.0), None, Some(0.0), Some(1.0), Some(1.0)];
        let out = shifted_rolling_mean(&values, 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(1.0));
        assert_eq!(out[2], Some(1.0)); // window [1.0, None]
        assert_eq!(out[3], Some(0.0)); // window [None, 0.0]
        assert_eq!(out[4], Some(0.5));
    }

    #[test]
    fn test_rows_exclude_current_match() {
        let table = MatchTable::new(vec![
            make_match(1, "a", "b", Surface::Hard),
            make_match(2, "a", "b", Surface::Clay),
            make_match(3, "b", "a", Surface::Hard),
        ]);
        let history = builder().build(&table);
        assert_eq!(history.rows().len(), 6);

        let a = PlayerId::from("a");
        let first = history.row_for(0, &a).unwrap();
        assert_eq!(first.rolling_win_pct, None);
        assert_eq!(first.elo_before, 1500.0);

        let third = history.row_for(2, &a).unwrap();
        assert_eq!(third.rolling_win_pct, Some(1.0));
        // Only the day 1 hard court match counts for the hard court split
        assert_eq!(third.surface_win_pct, Some(1.0));
        assert!(third.elo_before > 1500.0);
        assert!(!third.won);

        let b_third = history.row_for(2, &PlayerId::from("b")).unwrap();
        assert_eq!(b_third.rolling_win_pct, Some(0.0));
    }

    #[test]
    fn test_elo_before_uses_first_match_of_day() {
        let table = MatchTable::new(vec![
            make_match(1, "a", "b", Surface::Hard),
            make_match(1, "a", "c", Surface::Hard),
        ]);
        let history = builder().build(&table);
        let a = PlayerId::from("a");
        assert_eq!(history.row_for(0, &a).unwrap().elo_before, 1500.0);
        assert_eq!(history.row_for(1, &a).unwrap().elo_before, 1500.0);
        assert!(history.current_elo(&a).unwrap() > 1516.0);
    }

    #[test]
    fn test_match_matrix_mirrors_rows() {
        let mut m = make_match(5, "a", "b", Surface::Grass);
        m.winner_rank = Some(3.0);
        m.loser_rank = Some(10.0);
        let table = MatchTable::new(vec![make_match(1, "a", "b", Surface::Hard), m]);
        let history = builder().build(&table);
        let matrix = build_match_matrix(&table, &history);

        assert_eq!(matrix.len(), 4);
        let (win_view, loss_view) = (&matrix[2], &matrix[3]);
        assert_eq!(win_view.target, 1);
        assert_eq!(loss_view.target, 0);
        assert_eq!(win_view.features.rank_diff, 7.0);
        assert_eq!(loss_view.features.rank_diff, -7.0);
        assert_eq!(win_view.features.elo_diff, -loss_view.features.elo_diff);
        assert_eq!(win_view.features.form_diff, 1.0);
        assert_eq!(win_view.features.surface_grass, 1.0);
        assert_eq!(win_view.features.surface_hard, 0.0);
        // No earlier grass matches, so the surface difference is filled with 0
        assert_eq!(win_view.features.surface_win_diff, 0.0);
        assert_eq!(win_view.features.to_vec().len(), MatchupFeatures::DIM);
    }

    #[test]
    fn test_future_matches_do_not_change_rows() {
        let base = vec![
            make_match(1, "a", "b", Surface::Hard),
            make_match(2, "b", "c", Surface::Clay),
            make_match(3, "a", "c", Surface::Hard),
        ];
        let mut extended = base.clone();
        extended.push(make_match(9, "c", "a", Surface::Hard));

        let short = builder().build(&MatchTable::new(base));
        let long = builder().build(&MatchTable::new(extended));
        for row in short.rows() {
            assert_eq!(Some(row), long.row_for(row.match_index, &row.player));
        }
    }
}
