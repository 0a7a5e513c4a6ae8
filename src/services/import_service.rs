//! Bulk fixture and result exchange as CSV.
//!
//! Every row is parsed before anything is written, and every write goes
//! through [`MatchService`](crate::services::MatchService) so imports obey the
//! same rules as the direct API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::fixture::{format_utc, parse_utc};
use crate::domain::{Match, MatchId, Scoreline};
use crate::services::match_service::MatchError;
use crate::services::settlement::SettlementSummary;

pub const FIXTURE_HEADER: [&str; 3] = ["home_team", "away_team", "kickoff"];

pub const RESULT_HEADER: [&str; 7] = [
    "match_id",
    "round",
    "home_team",
    "away_team",
    "kickoff",
    "home_score",
    "away_score",
];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("No matches found for round {0}")]
    RoundNotFound(i32),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImportError {
    fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }
}

impl From<MatchError> for ImportError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Validation(msg) => Self::Validation(msg),
            MatchError::NotFound(id) => Self::MatchNotFound(id),
            MatchError::RoundNotFound(round) => Self::RoundNotFound(round),
            MatchError::Conflict(msg) => Self::Conflict(msg),
            MatchError::Database(msg) => Self::Database(msg),
            MatchError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for ImportError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// One parsed fixture row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRow {
    pub line: usize,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
}

/// One parsed result row. Only the id and the scores are acted upon; the
/// descriptive columns are there for humans filling in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub line: usize,
    pub match_id: MatchId,
    pub score: Scoreline,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureImportSummary {
    pub round: i32,
    pub created: Vec<Match>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultImportSummary {
    pub rows: usize,
    /// Matches whose stored result changed.
    pub updated: usize,
    pub settlements: Vec<SettlementSummary>,
}

#[async_trait::async_trait]
pub trait ImportService: Send + Sync {
    /// Creates one match per row in `round`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Malformed`] with the offending line before
    /// anything is written.
    async fn import_fixtures(
        &self,
        round: i32,
        csv: &str,
    ) -> Result<FixtureImportSummary, ImportError>;

    /// A results sheet for `round` with empty score columns.
    async fn export_results_template(&self, round: i32) -> Result<String, ImportError>;

    /// Records every row as a finished result.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::MatchNotFound`] naming the first unknown match
    /// id, before any result is written.
    async fn import_results(&self, csv: &str) -> Result<ResultImportSummary, ImportError>;
}

// ============================================================================
// CSV helpers
// ============================================================================

/// Splits CSV text into records, keeping 1-based line numbers. Blank lines
/// are skipped. Fields may be double-quoted with `""` as an escaped quote.
/// A record never spans lines; team names cannot hold line breaks.
pub fn parse_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, ImportError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        records.push((line, split_record(raw, line)?));
    }
    Ok(records)
}

fn split_record(raw: &str, line: usize) -> Result<Vec<String>, ImportError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = raw.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            ('"', false) if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            (',', false) => fields.push(std::mem::take(&mut field).trim().to_string()),
            (c, _) => field.push(c),
        }
    }

    if in_quotes {
        return Err(ImportError::malformed(line, "unterminated quoted field"));
    }
    fields.push(field.trim().to_string());
    Ok(fields)
}

/// Maps the expected column names to their positions in the header row.
fn column_positions<const N: usize>(
    header: &[String],
    line: usize,
    expected: [&str; N],
) -> Result<[usize; N], ImportError> {
    let mut positions = [0; N];
    for (slot, name) in positions.iter_mut().zip(expected) {
        *slot = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| ImportError::malformed(line, format!("missing column '{name}'")))?;
    }
    Ok(positions)
}

fn cell<'a>(record: &'a [String], index: usize, line: usize, name: &str) -> Result<&'a str, ImportError> {
    match record.get(index).map(String::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ImportError::malformed(line, format!("'{name}' is empty"))),
    }
}

fn parse_int(value: &str, line: usize, name: &str) -> Result<i32, ImportError> {
    value
        .parse()
        .map_err(|_| ImportError::malformed(line, format!("'{name}' must be an integer, got '{value}'")))
}

pub fn parse_fixture_rows(text: &str) -> Result<Vec<FixtureRow>, ImportError> {
    let mut records = parse_records(text)?.into_iter();
    let Some((header_line, header)) = records.next() else {
        return Err(ImportError::Validation("The file is empty".to_string()));
    };
    let [home, away, kickoff] = column_positions(&header, header_line, FIXTURE_HEADER)?;

    let rows = records
        .map(|(line, record)| {
            let raw_kickoff = cell(&record, kickoff, line, "kickoff")?;
            Ok(FixtureRow {
                line,
                home_team: cell(&record, home, line, "home_team")?.to_string(),
                away_team: cell(&record, away, line, "away_team")?.to_string(),
                kickoff: parse_utc(raw_kickoff).map_err(|_| {
                    ImportError::malformed(line, format!("unreadable kickoff '{raw_kickoff}'"))
                })?,
            })
        })
        .collect::<Result<Vec<_>, ImportError>>()?;

    if rows.is_empty() {
        return Err(ImportError::Validation("The file has no data rows".to_string()));
    }
    Ok(rows)
}

pub fn parse_result_rows(text: &str) -> Result<Vec<ResultRow>, ImportError> {
    let mut records = parse_records(text)?.into_iter();
    let Some((header_line, header)) = records.next() else {
        return Err(ImportError::Validation("The file is empty".to_string()));
    };
    let [id, home, away] = column_positions(
        &header,
        header_line,
        [RESULT_HEADER[0], RESULT_HEADER[5], RESULT_HEADER[6]],
    )?;

    let mut seen = std::collections::HashSet::new();
    let mut rows = Vec::new();
    for (line, record) in records {
        let match_id = MatchId::new(parse_int(cell(&record, id, line, "match_id")?, line, "match_id")?);
        let score = Scoreline::new(
            parse_int(cell(&record, home, line, "home_score")?, line, "home_score")?,
            parse_int(cell(&record, away, line, "away_score")?, line, "away_score")?,
        );
        if !seen.insert(match_id) {
            return Err(ImportError::malformed(
                line,
                format!("match {match_id} appears more than once"),
            ));
        }
        rows.push(ResultRow {
            line,
            match_id,
            score,
        });
    }

    if rows.is_empty() {
        return Err(ImportError::Validation("The file has no data rows".to_string()));
    }
    Ok(rows)
}

fn quote(value: &str) -> String {
    if value.contains([',', '"']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders the results sheet for a set of matches.
#[must_use]
pub fn render_results_template(matches: &[Match]) -> String {
    use std::fmt::Write;

    let mut csv = RESULT_HEADER.join(",");
    csv.push('\n');
    for m in matches {
        let (home, away) = m
            .final_score
            .map_or((String::new(), String::new()), |s| {
                (s.home.to_string(), s.away.to_string())
            });
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{}",
            m.id,
            m.round,
            quote(&m.home_team),
            quote(&m.away_team),
            format_utc(m.kickoff),
            home,
            away
        );
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchStatus;
    use chrono::TimeZone;

    #[test]
    fn quoted_line_breaks_are_malformed() {
        let err = parse_records("home_team,away_team,kickoff\n\"Sport\nRecife\",Náutico,2025-05-11\n")
            .unwrap_err();
        assert!(matches!(err, ImportError::Malformed { line: 2, .. }));
    }

    #[test]
    fn quoted_fields_and_blank_lines() {
        let records = parse_records("a,\"b, c\",\"say \"\"hi\"\"\"\n\n  \nx,y,z\r\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, 1);
        assert_eq!(records[0].1, vec!["a", "b, c", "say \"hi\""]);
        assert_eq!(records[1].0, 4);

        assert!(matches!(
            parse_records("a,\"open"),
            Err(ImportError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn fixture_rows_parse_with_line_numbers() {
        let csv = "home_team,away_team,kickoff\n\
                   Grêmio,Internacional,2025-05-10 19:00:00\n\
                   Santos,Corinthians,2025-05-11T16:00:00-03:00\n";
        let rows = parse_fixture_rows(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].home_team, "Grêmio");
        assert_eq!(
            rows[1].kickoff,
            Utc.with_ymd_and_hms(2025, 5, 11, 19, 0, 0).unwrap()
        );

        let err = parse_fixture_rows("home_team,away_team,kickoff\nA,B,tomorrow\n").unwrap_err();
        assert!(matches!(err, ImportError::Malformed { line: 2, .. }));

        let err = parse_fixture_rows("home,away,kickoff\nA,B,2025-05-10 19:00\n").unwrap_err();
        assert!(matches!(err, ImportError::Malformed { line: 1, .. }));
    }

    #[test]
    fn result_rows_need_both_scores() {
        let csv = "match_id,round,home_team,away_team,kickoff,home_score,away_score\n\
                   4,1,A,B,2025-05-10T19:00:00Z,2,1\n\
                   5,1,C,D,2025-05-10T21:00:00Z,,\n";
        let err = parse_result_rows(csv).unwrap_err();
        assert!(matches!(err, ImportError::Malformed { line: 3, .. }));

        let rows = parse_result_rows(
            "match_id,home_score,away_score\n4,2,1\n",
        )
        .unwrap();
        assert_eq!(rows[0].match_id, MatchId::new(4));
        assert_eq!(rows[0].score, Scoreline::new(2, 1));
    }

    #[test]
    fn template_round_trips_through_the_parser() {
        let fixture = Match {
            id: MatchId::new(9),
            round: 3,
            home_team: "Atlético, MG".to_string(),
            away_team: "Cruzeiro".to_string(),
            kickoff: Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap(),
            status: MatchStatus::Scheduled,
            final_score: None,
            settled_at: None,
        };
        let csv = render_results_template(&[fixture]);
        assert!(csv.starts_with("match_id,round,home_team,away_team,kickoff,home_score,away_score\n"));
        assert!(csv.contains("9,3,\"Atlético, MG\",Cruzeiro,2025-06-01T20:00:00Z,,"));

        let filled = csv.replace("Z,,", "Z,1,1");
        let rows = parse_result_rows(&filled).unwrap();
        assert_eq!(rows[0].score, Scoreline::new(1, 1));
    }
}
