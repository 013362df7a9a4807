//! Player summaries, rankings and matchup reports
//!
//! The serving boundary: unlike the rating engine, which quietly defaults
//! unknown players to the starting rating, every lookup here fails with
//! `PlayerNotFound` for a player with no recorded matches.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::features::elo::RatingEngine;
use crate::features::player_stats::{
    CareerStats, DetailedMetrics, HeadToHead, LatestMatchInfo, RecentForm, SplitRecord, StatisticsEngine,
};
use crate::predict::win_prob::{HybridProbability, ProbabilityEstimator};
use crate::{Config, PlayerId, ProbabilityConfig, Result, Surface, TennisError, TourneyLevel};

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub name: Option<String>,
    pub rating: f64,
    /// Rating on each surface including the surface adjustment
    pub surface_ratings: BTreeMap<Surface, f64>,
    pub career: CareerStats,
    pub recent_form: RecentForm,
    pub surface_stats: BTreeMap<Surface, SplitRecord>,
    pub level_stats: Vec<(TourneyLevel, SplitRecord)>,
    pub metrics: DetailedMetrics,
    pub latest_match: Option<LatestMatchInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub name: Option<String>,
    pub rating: f64,
    pub matches: usize,
    pub win_pct: Option<f64>,
}

/// One side of the surface comparison in a matchup
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceComparison {
    pub surface: Surface,
    pub player_a: SplitRecord,
    pub player_b: SplitRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchupReport {
    pub player_a: PlayerId,
    pub player_b: PlayerId,
    pub name_a: Option<String>,
    pub name_b: Option<String>,
    pub surface: Option<Surface>,
    pub prediction: HybridProbability,
    pub head_to_head: HeadToHead,
    pub form_a: RecentForm,
    pub form_b: RecentForm,
    pub surface_comparison: Option<SurfaceComparison>,
}

impl MatchupReport {
    pub fn display_a(&self) -> &str {
        self.name_a.as_deref().unwrap_or(self.player_a.as_str())
    }

    pub fn display_b(&self) -> &str {
        self.name_b.as_deref().unwrap_or(self.player_b.as_str())
    }

    pub fn key_advantages(&self) -> &[String] {
        self.prediction.key_advantages()
    }
}

/// Builds reports over one ratings snapshot and one statistics snapshot
pub struct Reporter<'a> {
    ratings: &'a RatingEngine,
    stats: &'a StatisticsEngine,
    probability: ProbabilityConfig,
}

impl<'a> Reporter<'a> {
    pub fn new(ratings: &'a RatingEngine, stats: &'a StatisticsEngine, config: &Config) -> Self {
        Reporter {
            ratings,
            stats,
            probability: config.probability.clone(),
        }
    }

    /// Resolve a player by exact id, then by case-insensitive name
    pub fn find_player(&self, query: &str) -> Result<PlayerId> {
        let id = PlayerId::new(query.trim());
        if self.stats.has_player(&id) {
            return Ok(id);
        }

        let wanted = query.trim().to_lowercase();
        let names = self.stats.matches().player_names();
        let mut hits: Vec<&PlayerId> = names
            .iter()
            .filter(|(_, name)| name.to_lowercase() == wanted)
            .map(|(id, _)| id)
            .collect();
        hits.sort();

        hits.first().map(|id| (*id).clone()).ok_or(TennisError::PlayerNotFound(id))
    }

    fn ensure_known(&self, player: &PlayerId) -> Result<()> {
        if self.stats.has_player(player) {
            Ok(())
        } else {
            Err(TennisError::PlayerNotFound(player.clone()))
        }
    }

    fn name(&self, player: &PlayerId) -> Option<String> {
        self.stats.matches().player_name(player).map(str::to_string)
    }

    pub fn player_summary(&self, player: &PlayerId) -> Result<PlayerSummary> {
        self.ensure_known(player)?;

        let surface_ratings = Surface::ALL
            .iter()
            .map(|&s| (s, self.ratings.get_surface_adjusted_rating(player, s)))
            .collect();

        Ok(PlayerSummary {
            player_id: player.clone(),
            name: self.name(player),
            rating: self.ratings.global_rating(player),
            surface_ratings,
            career: self.stats.career_stats(player),
            recent_form: self.stats.recent_form(player, self.stats.config().recent_form_matches),
            surface_stats: self.stats.surface_stats(player),
            level_stats: self.stats.level_stats(player),
            metrics: self.stats.detailed_metrics(player),
            latest_match: self.stats.latest_match_info(player, None),
        })
    }

    /// Top players by global rating with at least `min_matches` played
    pub fn rankings(&self, min_matches: usize, limit: usize) -> Vec<RankingEntry> {
        let names = self.stats.matches().player_names();
        self.ratings
            .rankings()
            .into_iter()
            .filter(|(id, _)| self.stats.match_count(id) >= min_matches)
            .take(limit)
            .enumerate()
            .map(|(i, (id, rating))| {
                let career = self.stats.career_stats(&id);
                RankingEntry {
                    rank: i + 1,
                    name: names.get(&id).cloned(),
                    player_id: id,
                    rating,
                    matches: career.total,
                    win_pct: career.win_pct,
                }
            })
            .collect()
    }

    pub fn matchup(&self, a: &PlayerId, b: &PlayerId, surface: Option<Surface>) -> Result<MatchupReport> {
        self.ensure_known(a)?;
        self.ensure_known(b)?;

        let head_to_head = self.stats.head_to_head(a, b);
        let estimator = ProbabilityEstimator::new(self.ratings, Some(self.stats), self.probability.clone());
        let prediction = estimator.hybrid_probability(a, b, surface, Some(&head_to_head));

        let n = self.stats.config().recent_form_matches;
        let surface_comparison = surface.map(|s| {
            let pick = |p: &PlayerId| self.stats.surface_stats(p).remove(&s).unwrap_or_default();
            SurfaceComparison {
                surface: s,
                player_a: pick(a),
                player_b: pick(b),
            }
        });

        Ok(MatchupReport {
            player_a: a.clone(),
            player_b: b.clone(),
            name_a: self.name(a),
            name_b: self.name(b),
            surface,
            prediction,
            head_to_head,
            form_a: self.stats.recent_form(a, n),
            form_b: self.stats.recent_form(b, n),
            surface_comparison,
        })
    }
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}%", v * 100.0))
}

/// Format a matchup report for display
pub fn format_matchup(report: &MatchupReport) -> String {
    let name_a = report.display_a();
    let name_b = report.display_b();
    let p = report.prediction.probability;
    let (favourite, win_prob) = if p.player_a >= 0.5 {
        (name_a, p.player_a)
    } else {
        (name_b, p.player_b)
    };
    let surface = report.surface.map_or_else(|| "any".to_string(), |s| s.to_string());
    let h2h = &report.head_to_head;

    let mut out = format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {} ({})
├─────────────────────────────────────────────────┤
│  Win probability:  {} {:.1}%
│  Elo:              {:.0} - {:.0}
│  Confidence:       {}
│  Method:           {}
│  Head-to-head:     {} - {} ({} meetings)
│  Recent form:      {} - {}
"#,
        name_a,
        name_b,
        surface,
        favourite,
        win_prob * 100.0,
        report.prediction.elo_a,
        report.prediction.elo_b,
        report.prediction.confidence,
        report.prediction.method,
        h2h.player_a_wins,
        h2h.player_b_wins,
        h2h.total_matches,
        pct(report.form_a.win_pct),
        pct(report.form_b.win_pct),
    );

    if let Some(cmp) = &report.surface_comparison {
        out.push_str(&format!(
            "│  On {}:{}{} - {}\n",
            cmp.surface,
            " ".repeat(15usize.saturating_sub(cmp.surface.name().len())),
            pct(cmp.player_a.win_pct),
            pct(cmp.player_b.win_pct),
        ));
    }
    if let Some(reason) = &report.prediction.fallback_reason {
        out.push_str(&format!("│  Fallback:         {}\n", reason));
    }
    if !report.key_advantages().is_empty() {
        out.push_str("├─────────────────────────────────────────────────┤\n");
        for adv in report.key_advantages() {
            out.push_str(&format!("│  • {}\n", adv));
        }
    }
    out.push_str("└─────────────────────────────────────────────────┘\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MatchTable;
    use crate::predict::win_prob::Method;
    use crate::MatchRecord;
    use chrono::NaiveDate;

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    fn make_match(day: u32, winner: &str, loser: &str, surface: Surface) -> MatchRecord {
        let mut m = MatchRecord::new(NaiveDate::from_ymd_opt(2024, 3, day).unwrap(), pid(winner), pid(loser));
        m.winner_name = Some(format!("Player {}", winner.to_uppercase()));
        m.loser_name = Some(format!("Player {}", loser.to_uppercase()));
        m.surface = Some(surface);
        m.score = Some("6-3 6-4".to_string());
        m.minutes = Some(90.0);
        m
    }

    fn setup() -> (RatingEngine, StatisticsEngine) {
        let table = MatchTable::new(vec![
            make_match(1, "a", "b", Surface::Hard),
            make_match(2, "a", "c", Surface::Clay),
            make_match(3, "b", "c", Surface::Hard),
            make_match(4, "a", "b", Surface::Hard),
            make_match(5, "c", "b", Surface::Clay),
            make_match(6, "a", "c", Surface::Hard),
        ]);
        let config = Config::default();
        let mut ratings = RatingEngine::new(config.elo.clone());
        ratings.calculate_ratings_from_matches(&table);
        let stats = StatisticsEngine::from_config(table, &config);
        (ratings, stats)
    }

    #[test]
    fn test_find_player() {
        let (ratings, stats) = setup();
        let config = Config::default();
        let reporter = Reporter::new(&ratings, &stats, &config);

        assert_eq!(reporter.find_player("a").unwrap(), pid("a"));
        assert_eq!(reporter.find_player("player b").unwrap(), pid("b"));
        assert!(matches!(
            reporter.find_player("nobody"),
            Err(TennisError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn test_player_summary() {
        let (ratings, stats) = setup();
        let config = Config::default();
        let reporter = Reporter::new(&ratings, &stats, &config);

        let summary = reporter.player_summary(&pid("a")).unwrap();
        assert_eq!(summary.name.as_deref(), Some("Player A"));
        assert_eq!(summary.career.wins, 4);
        assert_eq!(summary.career.losses, 0);
        assert!(summary.rating > 1500.0);
        assert_eq!(summary.surface_ratings.len(), 4);
        assert_eq!(summary.surface_stats[&Surface::Hard].wins, 3);
        assert!(summary.latest_match.is_some());

        assert!(matches!(
            reporter.player_summary(&pid("zzz")),
            Err(TennisError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn test_rankings() {
        let (ratings, stats) = setup();
        let config = Config::default();
        let reporter = Reporter::new(&ratings, &stats, &config);

        let top = reporter.rankings(1, 10);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].player_id, pid("a"));
        assert_eq!(top[0].rank, 1);
        assert!(top.windows(2).all(|w| w[0].rating >= w[1].rating));

        assert_eq!(reporter.rankings(1, 2).len(), 2);
        assert!(reporter.rankings(100, 10).is_empty());
    }

    #[test]
    fn test_matchup_report() {
        let (ratings, stats) = setup();
        let config = Config::default();
        let reporter = Reporter::new(&ratings, &stats, &config);

        let report = reporter.matchup(&pid("a"), &pid("b"), Some(Surface::Hard)).unwrap();
        assert_eq!(report.head_to_head.total_matches, 2);
        assert_eq!(report.head_to_head.player_a_wins, 2);
        assert!(report.prediction.probability.player_a > 0.5);
        let p = report.prediction.probability;
        assert!((p.player_a + p.player_b - 1.0).abs() < 1e-12);
        assert_ne!(report.prediction.method, Method::EloGlobal);
        let cmp = report.surface_comparison.as_ref().unwrap();
        assert_eq!(cmp.player_a.wins, 3);

        let text = format_matchup(&report);
        assert!(text.contains("Player A vs Player B"));
        assert!(text.contains("Win probability:  Player A"));

        assert!(matches!(
            reporter.matchup(&pid("a"), &pid("ghost"), None),
            Err(TennisError::PlayerNotFound(_))
        ));
    }
}
