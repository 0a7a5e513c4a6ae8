use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_import_results(config: &Config, file: &Path) -> anyhow::Result<()> {
    let csv = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let state = SharedState::new(config.clone()).await?;
    let summary = state
        .import_service
        .import_results(&csv)
        .await
        .map_err(|e| anyhow::anyhow!("Import failed: {e}"))?;

    println!(
        "✓ {} rows read, {} matches updated",
        summary.rows, summary.updated
    );

    if summary.settlements.is_empty() {
        println!("No match was settled by this import.");
        return Ok(());
    }

    println!();
    println!("Settled:");
    for s in &summary.settlements {
        println!(
            "  Match {} ({}): {} predictions, {} correct, {} points awarded",
            s.match_id, s.score, s.predictions, s.correct, s.points_awarded
        );
    }

    Ok(())
}
