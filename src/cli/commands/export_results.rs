use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_export_results(
    config: &Config,
    round: i32,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let csv = state
        .import_service
        .export_results_template(round)
        .await
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;

    match out {
        Some(path) => {
            tokio::fs::write(path, csv)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ Results sheet for round {round} written to {}", path.display());
        }
        None => print!("{csv}"),
    }

    Ok(())
}
