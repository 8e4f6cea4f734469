//! Manual search and failed-retry command handlers

use crate::config::Config;
use crate::domain::{EpisodeKey, ShowId};
use crate::services::QueueItem;
use crate::state::SharedState;

pub(super) fn print_outcomes(items: &[QueueItem]) {
    for item in items {
        match item.results().first() {
            Some(result) if item.succeeded() => {
                println!("  ✓ {}: snatched {} ({})", item.name(), result.name, result.provider);
            }
            _ => println!("  ✗ {}: nothing snatched", item.name()),
        }
    }
}

pub async fn cmd_search(
    config: &Config,
    show_id: i32,
    season: i32,
    episode: i32,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    let name = state
        .queue
        .queue_manual_search(
            state.library.as_ref(),
            ShowId::new(show_id),
            EpisodeKey::new(season, episode),
        )
        .await?;
    println!("Searching: {name}");

    let items = state.queue.drain(&state.context).await;
    print_outcomes(&items);
    Ok(())
}

pub async fn cmd_retry(
    config: &Config,
    show_id: i32,
    season: i32,
    episodes: &[i32],
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    let keys: Vec<EpisodeKey> = episodes
        .iter()
        .map(|number| EpisodeKey::new(season, *number))
        .collect();
    let names = state
        .queue
        .queue_failed_retry(state.library.as_ref(), ShowId::new(show_id), &keys)
        .await?;
    println!(
        "Retrying {} episode(s) in {} item(s): {}",
        keys.len(),
        names.len(),
        names.join(", ")
    );

    let items = state.queue.drain(&state.context).await;
    print_outcomes(&items);
    Ok(())
}
