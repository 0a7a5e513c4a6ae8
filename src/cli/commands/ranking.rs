use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_ranking(config: &Config, limit: Option<u64>) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let standings = state
        .ranking_service
        .ranking(limit)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if standings.is_empty() {
        println!("No players yet.");
        return Ok(());
    }

    println!("{:>4}  {:<30} {:>6}", "#", "Player", "Points");
    println!("{:-<42}", "");
    for s in standings {
        println!("{:>4}  {:<30} {:>6}", s.position, s.username, s.points);
    }

    Ok(())
}
