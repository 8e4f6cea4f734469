//! Backlog pass command handlers

use crate::config::Config;
use crate::domain::ShowId;
use crate::state::SharedState;

use super::search::print_outcomes;

pub async fn cmd_backlog(config: &Config, show_ids: &[i32]) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    let shows = if show_ids.is_empty() {
        None
    } else {
        let mut shows = Vec::with_capacity(show_ids.len());
        for id in show_ids {
            shows.push(state.library.get_show(ShowId::new(*id)).await?);
        }
        Some(shows)
    };

    let queued = state.searcher.run(shows).await?;
    if queued == 0 {
        println!("Nothing wanted, backlog is clear.");
        return Ok(());
    }

    println!("Queued {queued} backlog search(es), searching...");
    let items = state.queue.drain(&state.context).await;
    print_outcomes(&items);
    Ok(())
}

pub async fn cmd_force_backlog(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    state.scheduler.force_search().await?;
    println!("✓ The next backlog pass will search every aired episode.");
    Ok(())
}
