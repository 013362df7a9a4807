//! Elo rating system for player strength estimation
//!
//! Keeps a global rating and per-surface ratings for every player and
//! updates them match by match. Updates must be applied in date order;
//! [`RatingEngine::calculate_ratings_from_matches`] only accepts a
//! [`MatchTable`] for that reason.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::data::MatchTable;
use crate::{EloConfig, MatchRecord, PlayerId, Surface, TourneyLevel};

/// Elo rating state for one simulation
#[derive(Debug, Clone)]
pub struct RatingEngine {
    ratings: HashMap<PlayerId, f64>,
    surface_ratings: HashMap<(PlayerId, Surface), f64>,
    config: EloConfig,
    /// Reference date for time decay. No decay is applied while unset.
    as_of: Option<NaiveDate>,
}

impl Default for RatingEngine {
    fn default() -> Self {
        Self::new(EloConfig::default())
    }
}

impl RatingEngine {
    pub fn new(config: EloConfig) -> Self {
        RatingEngine {
            ratings: HashMap::new(),
            surface_ratings: HashMap::new(),
            config,
            as_of: None,
        }
    }

    /// Weight every later update by its age relative to `as_of`
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn set_as_of(&mut self, as_of: Option<NaiveDate>) {
        self.as_of = as_of;
    }

    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }

    pub fn config(&self) -> &EloConfig {
        &self.config
    }

    /// Surface rating if one exists for the pair, else the global rating
    pub fn get_rating(&self, player: &PlayerId, surface: Option<Surface>) -> f64 {
        if let Some(surface) = surface {
            if let Some(r) = self.surface_ratings.get(&(player.clone(), surface)) {
                return *r;
            }
        }
        self.global_rating(player)
    }

    /// Global rating (returns the starting rating if unknown)
    pub fn global_rating(&self, player: &PlayerId) -> f64 {
        *self
            .ratings
            .get(player)
            .unwrap_or(&self.config.starting_rating)
    }

    /// Recorded surface rating, else global rating plus the surface adjustment
    pub fn get_surface_adjusted_rating(&self, player: &PlayerId, surface: Surface) -> f64 {
        match self.surface_ratings.get(&(player.clone(), surface)) {
            Some(r) => *r,
            None => self.global_rating(player) + self.config.surface_adjustments.get(surface),
        }
    }

    /// Rating used for prediction: surface adjusted when a surface is known
    pub fn match_rating(&self, player: &PlayerId, surface: Option<Surface>) -> f64 {
        match surface {
            Some(s) => self.get_surface_adjusted_rating(player, s),
            None => self.global_rating(player),
        }
    }

    /// Logistic win probability of a player rated `rating_a` against `rating_b`
    pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
        1.0 / (1.0 + 10.0_f64.powf((rating_b - rating_a) / 400.0))
    }

    pub fn k_factor(&self, level: TourneyLevel) -> f64 {
        match level {
            TourneyLevel::GrandSlam => self.config.k_factor_grand_slam,
            TourneyLevel::Atp500 | TourneyLevel::Atp250 => self.config.k_factor_small,
            _ => self.config.k_factor_regular,
        }
    }

    /// exp(-days / decay_days) for matches older than the as-of date, else 1
    pub fn decay_weight(&self, date: Option<NaiveDate>) -> f64 {
        match (self.as_of, date) {
            (Some(as_of), Some(date)) => {
                let days = (as_of - date).num_days();
                if days > 0 {
                    (-(days as f64) / self.config.decay_days).exp()
                } else {
                    1.0
                }
            }
            _ => 1.0,
        }
    }

    /// Update ratings after a match. Returns the points gained by the winner,
    /// which the loser gives up in equal measure.
    pub fn update_rating(
        &mut self,
        winner: &PlayerId,
        loser: &PlayerId,
        surface: Option<Surface>,
        level: TourneyLevel,
        date: Option<NaiveDate>,
    ) -> f64 {
        let start = self.config.starting_rating;
        self.ratings.entry(winner.clone()).or_insert(start);
        self.ratings.entry(loser.clone()).or_insert(start);

        let winner_elo = self.match_rating(winner, surface);
        let loser_elo = self.match_rating(loser, surface);
        let winner_expected = Self::expected_score(winner_elo, loser_elo);

        let delta = self.k_factor(level) * self.decay_weight(date) * (1.0 - winner_expected);

        *self.ratings.entry(winner.clone()).or_insert(start) += delta;
        *self.ratings.entry(loser.clone()).or_insert(start) -= delta;

        if let Some(surface) = surface {
            *self
                .surface_ratings
                .entry((winner.clone(), surface))
                .or_insert(start) += delta;
            *self
                .surface_ratings
                .entry((loser.clone(), surface))
                .or_insert(start) -= delta;
        }

        delta
    }

    /// Update ratings from a match record
    pub fn update(&mut self, record: &MatchRecord) -> f64 {
        self.update_rating(
            &record.winner_id,
            &record.loser_id,
            record.surface,
            record.level,
            Some(record.date),
        )
    }

    /// Replay a whole history in date order
    pub fn calculate_ratings_from_matches(&mut self, matches: &MatchTable) {
        log::debug!("Replaying {} matches into rating engine", matches.len());
        for record in matches {
            self.update(record);
        }
    }

    /// Number of players with a global rating
    pub fn player_count(&self) -> usize {
        self.ratings.len()
    }

    /// All rated players, highest global rating first
    pub fn rankings(&self) -> Vec<(PlayerId, f64)> {
        let mut ranked: Vec<_> = self
            .ratings
            .iter()
            .map(|(p, r)| (p.clone(), *r))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Reset all ratings
    pub fn reset(&mut self) {
        self.ratings.clear();
        self.surface_ratings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_match(day: u32, winner: &str, loser: &str, surface: Option<Surface>) -> MatchRecord {
        let mut m = MatchRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            PlayerId::from(winner),
            PlayerId::from(loser),
        );
        m.surface = surface;
        m
    }

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    #[test]
    fn test_initial_ratings() {
        let elo = RatingEngine::default();
        assert_eq!(elo.get_rating(&pid("a"), None), 1500.0);
        assert_eq!(elo.get_rating(&pid("zzz"), Some(Surface::Clay)), 1500.0);
    }

    #[test]
    fn test_surface_adjusted_default() {
        let elo = RatingEngine::default();
        assert_eq!(elo.get_surface_adjusted_rating(&pid("a"), Surface::Clay), 1450.0);
        assert_eq!(elo.get_surface_adjusted_rating(&pid("a"), Surface::Grass), 1530.0);
        assert_eq!(elo.get_surface_adjusted_rating(&pid("a"), Surface::Hard), 1500.0);
    }

    #[test]
    fn test_expected_score_symmetric() {
        for (a, b) in [(1500.0, 1500.0), (1700.0, 1450.0), (1200.0, 2100.0), (1833.3, 1502.7)] {
            let sum = RatingEngine::expected_score(a, b) + RatingEngine::expected_score(b, a);
            assert!((sum - 1.0).abs() < 1e-12);
        }
        assert!((RatingEngine::expected_score(1500.0, 1500.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_update_moves_ratings_equally() {
        let mut elo = RatingEngine::default();
        elo.update_rating(&pid("b"), &pid("a"), None, TourneyLevel::Masters, None);

        // a is now the underdog, so an a win must raise a and lower b
        let (a0, b0) = (elo.global_rating(&pid("a")), elo.global_rating(&pid("b")));
        assert!(a0 <= b0);
        let delta = elo.update_rating(&pid("a"), &pid("b"), None, TourneyLevel::Masters, None);
        let (a1, b1) = (elo.global_rating(&pid("a")), elo.global_rating(&pid("b")));

        assert!(a1 > a0);
        assert!(b1 < b0);
        assert!(((a1 - a0) - (b0 - b1)).abs() < 1e-9);
        assert!((a1 - a0 - delta).abs() < 1e-9);
    }

    #[test]
    fn test_first_update_is_half_k() {
        let mut elo = RatingEngine::default();
        let delta = elo.update_rating(&pid("a"), &pid("b"), None, TourneyLevel::Masters, None);
        assert!((delta - 16.0).abs() < 1e-9);
        assert_eq!(elo.global_rating(&pid("a")), 1516.0);
        assert_eq!(elo.global_rating(&pid("b")), 1484.0);
    }

    #[test]
    fn test_k_factor_by_level() {
        let elo = RatingEngine::default();
        assert_eq!(elo.k_factor(TourneyLevel::GrandSlam), 48.0);
        assert_eq!(elo.k_factor(TourneyLevel::Atp250), 24.0);
        assert_eq!(elo.k_factor(TourneyLevel::Atp500), 24.0);
        assert_eq!(elo.k_factor(TourneyLevel::Masters), 32.0);
        assert_eq!(elo.k_factor(TourneyLevel::Other), 32.0);
    }

    #[test]
    fn test_surface_ratings_start_at_base() {
        let mut elo = RatingEngine::default();
        elo.update_rating(&pid("a"), &pid("b"), Some(Surface::Clay), TourneyLevel::Masters, None);

        // Both adjusted to 1450 so expectation is even, surface entries start at 1500
        assert!((elo.get_rating(&pid("a"), Some(Surface::Clay)) - 1516.0).abs() < 1e-9);
        assert!((elo.get_rating(&pid("b"), Some(Surface::Clay)) - 1484.0).abs() < 1e-9);
        // No grass entry yet, falls back to global
        assert_eq!(elo.get_rating(&pid("a"), Some(Surface::Grass)), elo.global_rating(&pid("a")));
    }

    #[test]
    fn test_decay_requires_as_of() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let elo = RatingEngine::default();
        assert_eq!(elo.decay_weight(Some(date)), 1.0);

        let elo = RatingEngine::default().with_as_of(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let w = elo.decay_weight(Some(date));
        assert!((w - (-1.0_f64).exp()).abs() < 1e-9);
        // Future-dated or same-day matches are not decayed
        assert_eq!(elo.decay_weight(NaiveDate::from_ymd_opt(2024, 6, 1)), 1.0);
    }

    #[test]
    fn test_replay_deterministic() {
        let table = MatchTable::new(vec![
            make_match(1, "a", "b", Some(Surface::Hard)),
            make_match(2, "c", "a", Some(Surface::Clay)),
            make_match(3, "b", "c", None),
            make_match(4, "a", "c", Some(Surface::Grass)),
        ]);

        let mut first = RatingEngine::default();
        first.calculate_ratings_from_matches(&table);
        let mut second = RatingEngine::default();
        second.calculate_ratings_from_matches(&table);

        assert_eq!(first.rankings(), second.rankings());
        for p in ["a", "b", "c"] {
            for s in Surface::ALL {
                assert_eq!(first.get_rating(&pid(p), Some(s)), second.get_rating(&pid(p), Some(s)));
            }
        }
    }

    #[test]
    fn test_surface_specialist_scenario() {
        let table = MatchTable::new(vec![
            make_match(1, "a", "b", Some(Surface::Hard)),
            make_match(2, "b", "a", Some(Surface::Clay)),
            make_match(3, "a", "b", Some(Surface::Hard)),
        ]);
        let mut elo = RatingEngine::default();
        elo.calculate_ratings_from_matches(&table);

        assert!(elo.get_rating(&pid("a"), Some(Surface::Hard)) > 1500.0);
        assert!(elo.get_rating(&pid("b"), Some(Surface::Hard)) < 1500.0);
        assert!(elo.get_rating(&pid("b"), Some(Surface::Clay)) > 1500.0);
    }

    #[test]
    fn test_rankings_sorted() {
        let mut elo = RatingEngine::default();
        for _ in 0..3 {
            elo.update(&make_match(1, "a", "b", None));
        }
        elo.update(&make_match(2, "c", "b", None));
        let ranked = elo.rankings();
        assert_eq!(ranked[0].0, pid("a"));
        assert_eq!(ranked.last().map(|r| r.0.clone()), Some(pid("b")));
        assert_eq!(elo.player_count(), 3);
    }
}
