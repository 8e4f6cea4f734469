//! Wanted episodes command handler

use chrono::Local;

use crate::config::Config;
use crate::domain::{ShowId, epoch_date};
use crate::services::wanted_segments;
use crate::state::SharedState;

pub async fn cmd_wanted(config: &Config, show_id: i32) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let show = state.library.get_show(ShowId::new(show_id)).await?;

    let segment = wanted_segments(state.library.as_ref(), &show, epoch_date()).await?;

    println!("{} (ID: {})", show.name, show.id);
    if show.paused {
        println!("  Paused - skipped by backlog passes");
    }

    if segment.is_empty() {
        println!("  Nothing wanted.");
        return Ok(());
    }

    let today = Local::now().date_naive();
    for (season, episodes) in segment.seasons() {
        println!("  Season {season}:");
        for episode in episodes {
            let aired = episode
                .airdate
                .filter(|date| *date <= today)
                .map_or_else(|| "unaired".to_string(), |date| date.to_string());
            println!(
                "    {} {:<40} {:<10} {}",
                episode.key(),
                episode.name.as_deref().unwrap_or("-"),
                aired,
                episode.status
            );
        }
    }

    println!(
        "Total: {} episode(s) across {} season(s)",
        segment.episode_count(),
        segment.season_count()
    );
    Ok(())
}
