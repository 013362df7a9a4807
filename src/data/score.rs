//! Match score parsing
//!
//! Turns score strings such as `"7-6(3) 6-3"` into per-set results and
//! match-level aggregates, always from the match winner's side.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// One set, from the match winner's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetScore {
    pub winner_games: u32,
    pub loser_games: u32,
    pub tiebreak: bool,
    /// Points won in the tiebreak by the side that lost it
    pub tiebreak_score: Option<u32>,
}

impl SetScore {
    pub fn won(&self) -> bool {
        self.winner_games > self.loser_games
    }
}

/// Structured view of a full match score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedScore {
    pub sets: Vec<SetScore>,
    pub num_sets: usize,
    pub total_games_won: u32,
    pub total_games_lost: u32,
    pub first_set_won: bool,
    /// None when only one set was played
    pub second_set_won: Option<bool>,
    /// Games won minus games lost, negative for some retirement scores
    pub winning_margin_games: i32,
}

impl ParsedScore {
    /// Whether the given side won set `number` (1-based). None if the set was not played.
    pub fn set_won_by(&self, number: usize, by_winner: bool) -> Option<bool> {
        let won = match number {
            1 => Some(self.first_set_won),
            2 => self.second_set_won,
            _ => None,
        }?;
        Some(won == by_winner)
    }
}

fn set_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)-(\d+)(?:\((\d+)\))?").ok())
        .as_ref()
}

/// Stateless score parser
pub struct ScoreParser;

impl ScoreParser {
    /// Parse a score string. Any malformed set token rejects the whole score.
    pub fn parse(score: &str) -> Option<ParsedScore> {
        let tokens: Vec<&str> = score.split_whitespace().collect();
        if tokens.is_empty() {
            return None;
        }

        let sets = tokens
            .iter()
            .map(|token| Self::parse_set(token))
            .collect::<Option<Vec<_>>>()?;

        let total_games_won = sets
            .iter()
            .try_fold(0u32, |acc, s| acc.checked_add(s.winner_games))?;
        let total_games_lost = sets
            .iter()
            .try_fold(0u32, |acc, s| acc.checked_add(s.loser_games))?;
        let winning_margin_games =
            i32::try_from(i64::from(total_games_won) - i64::from(total_games_lost)).ok()?;

        Some(ParsedScore {
            num_sets: sets.len(),
            total_games_won,
            total_games_lost,
            first_set_won: sets[0].won(),
            second_set_won: sets.get(1).map(SetScore::won),
            winning_margin_games,
            sets,
        })
    }

    /// Parse an optional score, missing input yields None
    pub fn parse_opt(score: Option<&str>) -> Option<ParsedScore> {
        score.and_then(Self::parse)
    }

    fn parse_set(token: &str) -> Option<SetScore> {
        let caps = set_pattern()?.captures(token)?;
        let winner_games = caps.get(1)?.as_str().parse().ok()?;
        let loser_games = caps.get(2)?.as_str().parse().ok()?;
        let tiebreak_score = match caps.get(3) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };

        Some(SetScore {
            winner_games,
            loser_games,
            tiebreak: tiebreak_score.is_some(),
            tiebreak_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_sets() {
        let parsed = ScoreParser::parse("6-4 6-2").unwrap();
        assert_eq!(parsed.num_sets, 2);
        assert!(parsed.first_set_won);
        assert_eq!(parsed.second_set_won, Some(true));
        assert_eq!(parsed.winning_margin_games, 6);
        assert_eq!(parsed.total_games_won, 12);
        assert_eq!(parsed.total_games_lost, 6);
        assert!(parsed.sets.iter().all(|s| !s.tiebreak));
    }

    #[test]
    fn test_tiebreak_set() {
        let parsed = ScoreParser::parse("7-6(3) 6-3").unwrap();
        assert!(parsed.sets[0].tiebreak);
        assert_eq!(parsed.sets[0].tiebreak_score, Some(3));
        assert_eq!(parsed.sets[0].winner_games, 7);
        assert_eq!(parsed.sets[0].loser_games, 6);
        assert!(!parsed.sets[1].tiebreak);
        assert_eq!(parsed.winning_margin_games, 4);
    }

    #[test]
    fn test_three_sets_lost_second() {
        let parsed = ScoreParser::parse("6-3 4-6 6-2").unwrap();
        assert_eq!(parsed.num_sets, 3);
        assert!(parsed.first_set_won);
        assert_eq!(parsed.second_set_won, Some(false));
        assert_eq!(parsed.winning_margin_games, 5);
        assert_eq!(parsed.set_won_by(2, false), Some(true));
    }

    #[test]
    fn test_single_set_has_no_second() {
        let parsed = ScoreParser::parse("  6-1 ").unwrap();
        assert_eq!(parsed.num_sets, 1);
        assert_eq!(parsed.second_set_won, None);
        assert_eq!(parsed.set_won_by(2, true), None);
    }

    #[test]
    fn test_invalid_scores() {
        assert!(ScoreParser::parse("").is_none());
        assert!(ScoreParser::parse("   ").is_none());
        assert!(ScoreParser::parse("invalid").is_none());
        assert!(ScoreParser::parse_opt(None).is_none());
        // One bad token rejects everything
        assert!(ScoreParser::parse("6-4 RET").is_none());
        assert!(ScoreParser::parse("W/O").is_none());
    }

    #[test]
    fn test_oversized_game_counts() {
        assert!(ScoreParser::parse("4294967295-0 1-0").is_none());
        assert!(ScoreParser::parse("0-4294967295 0-1").is_none());
        assert!(ScoreParser::parse("3000000000-0").is_none());
        assert!(ScoreParser::parse("99999999999-0").is_none());

        let parsed = ScoreParser::parse("2000000000-0 6-4").unwrap();
        assert_eq!(parsed.total_games_won, 2_000_000_006);
        assert_eq!(parsed.winning_margin_games, 2_000_000_002);
    }

    #[test]
    fn test_retirement_margin_can_be_negative() {
        let parsed = ScoreParser::parse("2-6 1-3").unwrap();
        assert!(!parsed.first_set_won);
        assert_eq!(parsed.winning_margin_games, -6);
    }
}
