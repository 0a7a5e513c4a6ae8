use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_import_matches(config: &Config, file: &Path, round: i32) -> anyhow::Result<()> {
    let csv = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let state = SharedState::new(config.clone()).await?;
    let summary = state
        .import_service
        .import_fixtures(round, &csv)
        .await
        .map_err(|e| anyhow::anyhow!("Import failed: {e}"))?;

    println!("Imported {} matches into round {}:", summary.created.len(), round);
    println!("{:-<70}", "");
    for fixture in &summary.created {
        println!(
            "  #{:<5} {:<40} {}",
            fixture.id,
            fixture.label(),
            crate::domain::fixture::format_utc(fixture.kickoff)
        );
    }

    Ok(())
}
