//! Player statistics computation
//!
//! Read-only aggregates over a loaded match table: career and recent
//! records, surface and tournament-level splits, head-to-head history and
//! the detailed metrics bundle fed to the comparator. Every statistic is
//! computed against the whole table the engine was built from.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::data::{MatchTable, ParsedScore};
use crate::features::comparator::{ComparisonResult, MetricsComparator};
use crate::{Config, MatchRecord, MetricWeights, PlayerId, StatsConfig, Surface, TourneyLevel};

/// wins / (wins + losses), or None below `min_matches`
pub fn calculate_win_percentage(wins: usize, losses: usize, min_matches: usize) -> Option<f64> {
    let total = wins + losses;
    if total < min_matches || total == 0 {
        None
    } else {
        Some(wins as f64 / total as f64)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Win/loss record over all matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareerStats {
    pub wins: usize,
    pub losses: usize,
    pub win_pct: Option<f64>,
    pub total: usize,
}

/// Win/loss record over the most recent matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentForm {
    pub wins: usize,
    pub losses: usize,
    pub win_pct: Option<f64>,
    pub matches: usize,
}

/// The single most recent match of a player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestMatchInfo {
    pub date: NaiveDate,
    pub won: bool,
    pub days_ago: i64,
}

/// Win/loss record on one surface or tournament level
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SplitRecord {
    pub wins: usize,
    pub losses: usize,
    pub win_pct: Option<f64>,
    pub matches: usize,
}

/// One past meeting between two players
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meeting {
    pub date: NaiveDate,
    pub winner: PlayerId,
    pub loser: PlayerId,
    pub surface: Option<Surface>,
    pub score: Option<String>,
}

/// Head-to-head summary from player A's side
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeadToHead {
    pub total_matches: usize,
    pub player_a_wins: usize,
    pub player_b_wins: usize,
    /// Most recent meetings first
    pub recent: Vec<Meeting>,
}

impl HeadToHead {
    pub fn player_a_win_rate(&self) -> Option<f64> {
        if self.total_matches == 0 {
            None
        } else {
            Some(self.player_a_wins as f64 / self.total_matches as f64)
        }
    }
}

/// Detailed per-player metrics. None means the underlying sample was empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailedMetrics {
    /// Mean games margin over wins with a parseable score
    pub avg_winning_margin: Option<f64>,
    pub avg_minutes_for_wins: Option<f64>,
    /// Share of first sets won, as a fraction
    pub first_set_win_pct: Option<f64>,
    pub second_set_win_pct: Option<f64>,
    /// Aces per 100 service points
    pub ace_pct: Option<f64>,
    pub most_lost_surface: Option<Surface>,
    pub avg_losing_game_time: Option<f64>,
    pub avg_opponent_age_when_lost: Option<f64>,
    pub avg_opponent_age_when_won: Option<f64>,
    /// Mean margin over the 10 most recent wins
    pub form_last_10_wins: Option<f64>,
    pub form_last_5_wins: Option<f64>,
}

/// Statistics over an immutable match table
pub struct StatisticsEngine {
    matches: MatchTable,
    /// Row indices per player, in date order
    by_player: HashMap<PlayerId, Vec<usize>>,
    config: StatsConfig,
    comparator: MetricsComparator,
}

impl StatisticsEngine {
    pub fn new(matches: MatchTable, config: StatsConfig, weights: MetricWeights) -> Self {
        let mut by_player: HashMap<PlayerId, Vec<usize>> = HashMap::new();
        for (idx, m) in matches.iter().enumerate() {
            by_player.entry(m.winner_id.clone()).or_default().push(idx);
            if m.loser_id != m.winner_id {
                by_player.entry(m.loser_id.clone()).or_default().push(idx);
            }
        }

        StatisticsEngine {
            matches,
            by_player,
            config,
            comparator: MetricsComparator::new(weights),
        }
    }

    pub fn from_config(matches: MatchTable, config: &Config) -> Self {
        Self::new(matches, config.stats.clone(), config.weights.clone())
    }

    pub fn matches(&self) -> &MatchTable {
        &self.matches
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.by_player.contains_key(player)
    }

    /// A player's matches, oldest first
    pub fn player_matches<'a>(&'a self, player: &PlayerId) -> impl DoubleEndedIterator<Item = &'a MatchRecord> + 'a {
        let rows = self.by_player.get(player).map(Vec::as_slice).unwrap_or(&[]);
        rows.iter().map(move |&i| &self.matches.matches()[i])
    }

    pub fn match_count(&self, player: &PlayerId) -> usize {
        self.by_player.get(player).map_or(0, Vec::len)
    }

    fn wins_losses<'a>(player: &PlayerId, matches: impl Iterator<Item = &'a MatchRecord>) -> (usize, usize) {
        matches.fold((0, 0), |(w, l), m| {
            if &m.winner_id == player {
                (w + 1, l)
            } else {
                (w, l + 1)
            }
        })
    }

    pub fn career_stats(&self, player: &PlayerId) -> CareerStats {
        let (wins, losses) = Self::wins_losses(player, self.player_matches(player));
        CareerStats {
            wins,
            losses,
            win_pct: calculate_win_percentage(wins, losses, self.config.min_matches_for_stats),
            total: wins + losses,
        }
    }

    /// Record over the `n` most recent matches
    pub fn recent_form(&self, player: &PlayerId, n: usize) -> RecentForm {
        let (wins, losses) = Self::wins_losses(player, self.player_matches(player).rev().take(n));
        RecentForm {
            wins,
            losses,
            win_pct: calculate_win_percentage(wins, losses, 1),
            matches: wins + losses,
        }
    }

    /// Most recent match, with `days_ago` measured from `reference`
    /// (defaults to the last date in the table)
    pub fn latest_match_info(&self, player: &PlayerId, reference: Option<NaiveDate>) -> Option<LatestMatchInfo> {
        let latest = self.player_matches(player).next_back()?;
        let reference = reference.or_else(|| self.matches.last_date())?;
        Some(LatestMatchInfo {
            date: latest.date,
            won: &latest.winner_id == player,
            days_ago: (reference - latest.date).num_days(),
        })
    }

    /// Record per surface. Surfaces never played report zeros.
    pub fn surface_stats(&self, player: &PlayerId) -> BTreeMap<Surface, SplitRecord> {
        Surface::ALL
            .iter()
            .map(|&surface| {
                let (wins, losses) = Self::wins_losses(
                    player,
                    self.player_matches(player).filter(|m| m.surface == Some(surface)),
                );
                let record = SplitRecord {
                    wins,
                    losses,
                    win_pct: calculate_win_percentage(wins, losses, self.config.min_matches_for_surface_stats),
                    matches: wins + losses,
                };
                (surface, record)
            })
            .collect()
    }

    /// Record per tournament level, only for levels the player has played
    pub fn level_stats(&self, player: &PlayerId) -> Vec<(TourneyLevel, SplitRecord)> {
        TourneyLevel::REPORTED
            .iter()
            .filter_map(|&level| {
                let (wins, losses) =
                    Self::wins_losses(player, self.player_matches(player).filter(|m| m.level == level));
                if wins + losses == 0 {
                    return None;
                }
                Some((
                    level,
                    SplitRecord {
                        wins,
                        losses,
                        win_pct: calculate_win_percentage(wins, losses, 1),
                        matches: wins + losses,
                    },
                ))
            })
            .collect()
    }

    pub fn head_to_head(&self, a: &PlayerId, b: &PlayerId) -> HeadToHead {
        let meetings: Vec<&MatchRecord> = self
            .player_matches(a)
            .filter(|m| m.opponent(a) == Some(b))
            .collect();

        let player_a_wins = meetings.iter().filter(|m| &m.winner_id == a).count();
        let recent = meetings
            .iter()
            .rev()
            .take(self.config.h2h_recent_meetings)
            .map(|m| Meeting {
                date: m.date,
                winner: m.winner_id.clone(),
                loser: m.loser_id.clone(),
                surface: m.surface,
                score: m.score.clone(),
            })
            .collect();

        HeadToHead {
            total_matches: meetings.len(),
            player_a_wins,
            player_b_wins: meetings.len() - player_a_wins,
            recent,
        }
    }

    pub fn detailed_metrics(&self, player: &PlayerId) -> DetailedMetrics {
        let all: Vec<&MatchRecord> = self.player_matches(player).collect();
        if all.is_empty() {
            return DetailedMetrics::default();
        }
        let wins: Vec<&MatchRecord> = all.iter().copied().filter(|m| &m.winner_id == player).collect();
        let losses: Vec<&MatchRecord> = all.iter().copied().filter(|m| &m.loser_id == player).collect();

        let win_minutes: Vec<f64> = wins.iter().filter_map(|m| m.minutes).collect();
        let loss_minutes: Vec<f64> = losses.iter().filter_map(|m| m.minutes).collect();
        let ages_when_lost: Vec<f64> = losses.iter().filter_map(|m| m.winner_age).collect();
        let ages_when_won: Vec<f64> = wins.iter().filter_map(|m| m.loser_age).collect();

        DetailedMetrics {
            avg_winning_margin: Self::avg_margin(wins.iter().copied()).map(|v| round_to(v, 2)),
            avg_minutes_for_wins: mean(&win_minutes).map(|v| round_to(v, 1)),
            first_set_win_pct: Self::set_win_pct(&all, player, 1).map(|v| round_to(v, 3)),
            second_set_win_pct: Self::set_win_pct(&all, player, 2).map(|v| round_to(v, 3)),
            ace_pct: Self::ace_pct(&all, player).map(|v| round_to(v, 2)),
            most_lost_surface: Self::most_lost_surface(&losses),
            avg_losing_game_time: mean(&loss_minutes).map(|v| round_to(v, 1)),
            avg_opponent_age_when_lost: mean(&ages_when_lost).map(|v| round_to(v, 1)),
            avg_opponent_age_when_won: mean(&ages_when_won).map(|v| round_to(v, 1)),
            form_last_10_wins: Self::avg_margin(wins.iter().rev().take(10).copied()).map(|v| round_to(v, 2)),
            form_last_5_wins: Self::avg_margin(wins.iter().rev().take(5).copied()).map(|v| round_to(v, 2)),
        }
    }

    pub fn compare_detailed_metrics(&self, a: &PlayerId, b: &PlayerId, surface: Option<Surface>) -> ComparisonResult {
        let metrics_a = self.detailed_metrics(a);
        let metrics_b = self.detailed_metrics(b);
        self.comparator.compare_all(&metrics_a, &metrics_b, surface)
    }

    /// Mean games margin; matches with unparseable scores are skipped
    fn avg_margin<'a>(wins: impl Iterator<Item = &'a MatchRecord>) -> Option<f64> {
        let margins: Vec<f64> = wins
            .filter_map(MatchRecord::parsed_score)
            .map(|p| p.winning_margin_games as f64)
            .collect();
        mean(&margins)
    }

    fn set_win_pct(matches: &[&MatchRecord], player: &PlayerId, set_number: usize) -> Option<f64> {
        let outcomes: Vec<bool> = matches
            .iter()
            .filter_map(|m| {
                let parsed: ParsedScore = m.parsed_score()?;
                parsed.set_won_by(set_number, &m.winner_id == player)
            })
            .collect();
        if outcomes.is_empty() {
            return None;
        }
        let won = outcomes.iter().filter(|w| **w).count();
        Some(won as f64 / outcomes.len() as f64)
    }

    fn ace_pct(matches: &[&MatchRecord], player: &PlayerId) -> Option<f64> {
        let (aces, points) = matches
            .iter()
            .filter_map(|m| {
                let serve = m.serve_for(player)?;
                match (serve.aces, serve.service_points) {
                    (Some(a), Some(p)) if p > 0.0 => Some((a, p)),
                    _ => None,
                }
            })
            .fold((0.0, 0.0), |(sa, sp), (a, p)| (sa + a, sp + p));
        if points > 0.0 {
            Some(aces / points * 100.0)
        } else {
            None
        }
    }

    /// Surface with the most losses. Ties go to the surface lost on first.
    fn most_lost_surface(losses: &[&MatchRecord]) -> Option<Surface> {
        let mut counts: Vec<(Surface, usize)> = Vec::new();
        for surface in losses.iter().filter_map(|m| m.surface) {
            match counts.iter_mut().find(|(s, _)| *s == surface) {
                Some((_, c)) => *c += 1,
                None => counts.push((surface, 1)),
            }
        }
        counts
            .into_iter()
            .fold(None, |best: Option<(Surface, usize)>, (s, c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((s, c)),
            })
            .map(|(s, _)| s)
    }
}
