//! Date-ordered match history
//!
//! `MatchTable` is the only container the rating, statistics and backtest
//! code accept. It sorts once on construction (stable, so same-day matches
//! keep their input order) and every consumer can then replay it directly.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::{MatchRecord, PlayerId};

/// Immutable, chronologically sorted collection of matches
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    matches: Vec<MatchRecord>,
}

impl MatchTable {
    pub fn new(mut matches: Vec<MatchRecord>) -> Self {
        matches.sort_by_key(|m| m.date);
        MatchTable { matches }
    }

    /// Wrap records that are already in date order
    fn from_sorted(matches: Vec<MatchRecord>) -> Self {
        debug_assert!(matches.windows(2).all(|w| w[0].date <= w[1].date));
        MatchTable { matches }
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchRecord> {
        self.matches.iter()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.matches.first().map(|m| m.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.matches.last().map(|m| m.date)
    }

    /// Matches with `start <= date <= end`
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> MatchTable {
        let lo = self.matches.partition_point(|m| m.date < start);
        let hi = self.matches.partition_point(|m| m.date <= end);
        let slice = if lo < hi { &self.matches[lo..hi] } else { &[] };
        Self::from_sorted(slice.to_vec())
    }

    /// Matches strictly before `date`
    pub fn before(&self, date: NaiveDate) -> MatchTable {
        let hi = self.matches.partition_point(|m| m.date < date);
        Self::from_sorted(self.matches[..hi].to_vec())
    }

    /// Keep matches satisfying the predicate, order preserved
    pub fn filter<F>(&self, mut keep: F) -> MatchTable
    where
        F: FnMut(&MatchRecord) -> bool,
    {
        Self::from_sorted(self.matches.iter().filter(|m| keep(m)).cloned().collect())
    }

    /// Every player appearing in the table, sorted by id
    pub fn players(&self) -> BTreeSet<PlayerId> {
        self.matches
            .iter()
            .flat_map(|m| [m.winner_id.clone(), m.loser_id.clone()])
            .collect()
    }

    /// Display names by player. Names seen as winner take precedence.
    pub fn player_names(&self) -> HashMap<PlayerId, String> {
        let mut names = HashMap::new();
        for m in &self.matches {
            if let Some(name) = &m.winner_name {
                names.entry(m.winner_id.clone()).or_insert_with(|| name.clone());
            }
        }
        for m in &self.matches {
            if let Some(name) = &m.loser_name {
                names.entry(m.loser_id.clone()).or_insert_with(|| name.clone());
            }
        }
        names
    }

    /// Most recent name recorded for a player
    pub fn player_name(&self, player: &PlayerId) -> Option<&str> {
        self.matches.iter().rev().find_map(|m| {
            if &m.winner_id == player {
                m.winner_name.as_deref()
            } else if &m.loser_id == player {
                m.loser_name.as_deref()
            } else {
                None
            }
        })
    }

    pub fn contains_player(&self, player: &PlayerId) -> bool {
        self.matches.iter().any(|m| m.involves(player))
    }
}

impl FromIterator<MatchRecord> for MatchTable {
    fn from_iter<I: IntoIterator<Item = MatchRecord>>(iter: I) -> Self {
        MatchTable::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MatchTable {
    type Item = &'a MatchRecord;
    type IntoIter = std::slice::Iter<'a, MatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}
