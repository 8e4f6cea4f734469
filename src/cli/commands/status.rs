//! Backlog/queue status command handler

use serde::Serialize;

use crate::config::Config;
use crate::domain::{ORDINAL_EPOCH, from_ordinal};
use crate::services::QueueEntry;
use crate::state::SharedState;

#[derive(Serialize)]
struct StatusReport {
    last_full_pass: Option<String>,
    next_full_pass: String,
    cycle_days: i64,
    backlog_paused: bool,
    queue: Vec<QueueEntry>,
}

pub async fn cmd_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    let marker = state.searcher.last_backlog();
    let last_full_pass = if marker <= ORDINAL_EPOCH {
        None
    } else {
        from_ordinal(marker).map(|date| date.to_string())
    };

    let report = StatusReport {
        last_full_pass,
        next_full_pass: state.scheduler.next_run().to_string(),
        cycle_days: state.searcher.cycle_days(),
        backlog_paused: state.queue.is_backlog_paused().await,
        queue: state.queue.snapshot().await,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Backlog");
    println!("{:-<50}", "");
    println!(
        "  Last full pass: {}",
        report.last_full_pass.as_deref().unwrap_or("never")
    );
    println!("  Next full pass: {}", report.next_full_pass);
    println!("  Cycle:          {} day(s)", report.cycle_days);
    println!("  Paused:         {}", report.backlog_paused);

    println!();
    println!("Queue ({} item(s))", report.queue.len());
    println!("{:-<50}", "");
    for entry in &report.queue {
        println!(
            "  {:<16} {:<12} {:?}/{:?} {} episode(s)",
            entry.name, entry.kind, entry.priority, entry.state, entry.episodes
        );
    }

    Ok(())
}
