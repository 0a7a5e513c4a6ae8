//! Default implementation of the `ImportService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::db::NewMatch;
use crate::domain::ResultEntry;
use crate::services::import_service::{
    FixtureImportSummary, ImportError, ImportService, ResultImportSummary, parse_fixture_rows,
    parse_result_rows, render_results_template,
};
use crate::services::match_service::{MatchError, MatchService};

pub struct DefaultImportService {
    matches: Arc<dyn MatchService>,
}

impl DefaultImportService {
    #[must_use]
    pub fn new(matches: Arc<dyn MatchService>) -> Self {
        Self { matches }
    }
}

#[async_trait]
impl ImportService for DefaultImportService {
    async fn import_fixtures(
        &self,
        round: i32,
        csv: &str,
    ) -> Result<FixtureImportSummary, ImportError> {
        let rows = parse_fixture_rows(csv)?;

        for row in &rows {
            if row.home_team.eq_ignore_ascii_case(&row.away_team) {
                return Err(ImportError::Malformed {
                    line: row.line,
                    message: "home and away teams must be different".to_string(),
                });
            }
        }

        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let line = row.line;
            let fixture = self
                .matches
                .create_match(NewMatch {
                    round,
                    home_team: row.home_team,
                    away_team: row.away_team,
                    kickoff: row.kickoff,
                })
                .await
                .map_err(|e| match e {
                    MatchError::Validation(message) => ImportError::Malformed { line, message },
                    other => other.into(),
                })?;
            created.push(fixture);
        }

        info!(
            event = "fixtures_imported",
            round,
            count = created.len(),
            "Imported {} fixtures into round {round}",
            created.len()
        );

        Ok(FixtureImportSummary { round, created })
    }

    async fn export_results_template(&self, round: i32) -> Result<String, ImportError> {
        let matches = self.matches.list_by_round(round).await?;
        Ok(render_results_template(&matches))
    }

    async fn import_results(&self, csv: &str) -> Result<ResultImportSummary, ImportError> {
        let rows = parse_result_rows(csv)?;

        let mut current = Vec::with_capacity(rows.len());
        for row in &rows {
            current.push(self.matches.get_match(row.match_id).await?);
        }

        let mut updated = 0;
        let mut settlements = Vec::new();
        for (row, before) in rows.iter().zip(current) {
            let recorded = self
                .matches
                .record_result(row.match_id, ResultEntry::finished(row.score))
                .await?;

            if recorded.fixture.status != before.status
                || recorded.fixture.final_score != before.final_score
            {
                updated += 1;
            }
            if let Some(summary) = recorded.settlement {
                settlements.push(summary);
            }
        }

        info!(
            event = "results_imported",
            rows = rows.len(),
            updated,
            settled = settlements.len(),
            "Imported results"
        );

        Ok(ResultImportSummary {
            rows: rows.len(),
            updated,
            settlements,
        })
    }
}
