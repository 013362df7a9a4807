//! Match file ingestion
//!
//! Reads a JSON array of match rows using the Sackmann column names
//! (`tourney_date`, `winner_id`, `w_ace`, ...) and converts them into a
//! [`MatchTable`]. Rows without a usable identity or date are dropped.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::data::table::MatchTable;
use crate::{MatchRecord, PlayerId, Result, ServeStats, Surface, TennisError, TourneyLevel};

pub const REQUIRED_COLUMNS: [&str; 3] = ["tourney_date", "winner_id", "loser_id"];

type Row = Map<String, Value>;

/// Load matches from a JSON file
pub fn load_matches(path: &str) -> Result<MatchTable> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        TennisError::Config(format!("Failed to read match file {}: {}", path, e))
    })?;
    let table = parse_matches(&content)?;
    log::info!("Loaded {} matches from {}", table.len(), path);
    Ok(table)
}

/// Parse a JSON array of match rows
pub fn parse_matches(json: &str) -> Result<MatchTable> {
    let rows: Vec<Row> = serde_json::from_str(json)?;
    records_from_rows(&rows)
}

/// Convert raw rows, validating that the identity columns exist
pub fn records_from_rows(rows: &[Row]) -> Result<MatchTable> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !rows.iter().any(|row| row.contains_key(**col)))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TennisError::MissingColumns(missing));
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut bad_identity = 0usize;
    let mut bad_date = 0usize;

    for row in rows {
        let (Some(winner), Some(loser)) = (text(row, "winner_id"), text(row, "loser_id")) else {
            bad_identity += 1;
            continue;
        };
        let Some(date) = row.get("tourney_date").and_then(parse_date) else {
            bad_date += 1;
            continue;
        };
        records.push(record_from_row(row, date, PlayerId(winner), PlayerId(loser)));
    }

    if bad_identity > 0 {
        log::warn!("Dropped {} rows with missing player ids", bad_identity);
    }
    if bad_date > 0 {
        log::warn!("Dropped {} rows with unparseable dates", bad_date);
    }

    Ok(MatchTable::new(records))
}

fn record_from_row(row: &Row, date: NaiveDate, winner_id: PlayerId, loser_id: PlayerId) -> MatchRecord {
    MatchRecord {
        date,
        winner_id,
        loser_id,
        winner_name: text(row, "winner_name"),
        loser_name: text(row, "loser_name"),
        surface: text(row, "surface").and_then(|s| Surface::parse(&s)),
        level: text(row, "tourney_level")
            .map(|code| TourneyLevel::from_code(&code))
            .unwrap_or_default(),
        score: text(row, "score"),
        minutes: number(row, "minutes"),
        winner_age: number(row, "winner_age"),
        loser_age: number(row, "loser_age"),
        winner_rank: number(row, "winner_rank"),
        loser_rank: number(row, "loser_rank"),
        winner_serve: serve_stats(row, "w_"),
        loser_serve: serve_stats(row, "l_"),
    }
}

fn serve_stats(row: &Row, prefix: &str) -> ServeStats {
    ServeStats {
        aces: number(row, &format!("{}ace", prefix)),
        service_points: number(row, &format!("{}svpt", prefix)),
        bp_saved: number(row, &format!("{}bpSaved", prefix)),
        bp_faced: number(row, &format!("{}bpFaced", prefix)),
    }
}

/// Non-empty text value. Numbers are rendered without a trailing `.0`.
fn text(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| {
                if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }),
        },
        _ => None,
    }
}

fn number(row: &Row, key: &str) -> Option<f64> {
    let value = match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Accepts `YYYYMMDD` (number or string) or an ISO date, optionally with a time part
fn parse_date(value: &Value) -> Option<NaiveDate> {
    let raw = match value {
        Value::Number(n) => n.as_i64()?.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(&raw, "%Y%m%d").ok();
    }
    let date_part = raw.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sackmann_rows() {
        let json = r#"[
            {"tourney_date": 20240115, "winner_id": 104925, "loser_id": 206173,
             "winner_name": "Novak Djokovic", "loser_name": "Jannik Sinner",
             "surface": "Hard", "tourney_level": "G", "score": "6-3 6-4",
             "minutes": 95, "w_ace": 8, "w_svpt": 60, "w_bpSaved": 2, "w_bpFaced": 3,
             "l_ace": 4, "l_svpt": 70, "l_bpSaved": 5, "l_bpFaced": 8,
             "winner_age": 36.6, "loser_age": 22.4, "winner_rank": 1, "loser_rank": 4},
            {"tourney_date": "2024-01-10", "winner_id": "206173", "loser_id": "104925",
             "surface": "clay"}
        ]"#;
        let table = parse_matches(json).unwrap();
        assert_eq!(table.len(), 2);

        // Sorted by date, ISO date row first
        let first = &table.matches()[0];
        assert_eq!(first.winner_id, PlayerId::from("206173"));
        assert_eq!(first.surface, Some(Surface::Clay));
        assert_eq!(first.level, TourneyLevel::Masters);

        let second = &table.matches()[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(second.winner_id, PlayerId::from("104925"));
        assert_eq!(second.level, TourneyLevel::GrandSlam);
        assert_eq!(second.winner_serve.aces, Some(8.0));
        assert_eq!(second.loser_serve.bp_faced, Some(8.0));
        assert_eq!(second.winner_rank, Some(1.0));
        assert_eq!(second.winner_name.as_deref(), Some("Novak Djokovic"));
    }

    #[test]
    fn test_missing_columns_rejected() {
        let json = r#"[{"winner_id": "a", "tourney_date": 20240101}]"#;
        match parse_matches(json) {
            Err(TennisError::MissingColumns(cols)) => assert_eq!(cols, vec!["loser_id".to_string()]),
            other => panic!("expected MissingColumns, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_bad_rows_dropped() {
        let json = r#"[
            {"tourney_date": 20240101, "winner_id": "a", "loser_id": "b"},
            {"tourney_date": "not a date", "winner_id": "a", "loser_id": "b"},
            {"tourney_date": 20240102, "winner_id": "", "loser_id": "b"},
            {"tourney_date": 20240103, "winner_id": "a", "loser_id": null}
        ]"#;
        let table = parse_matches(json).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unknown_surface_and_blank_numbers() {
        let json = r#"[{"tourney_date": "20240101", "winner_id": "a", "loser_id": "b",
                        "surface": "Indoor", "minutes": "", "score": "  "}]"#;
        let table = parse_matches(json).unwrap();
        let m = &table.matches()[0];
        assert_eq!(m.surface, None);
        assert_eq!(m.minutes, None);
        assert_eq!(m.score, None);
    }
}
