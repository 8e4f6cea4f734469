//! Command-line interface, parsed with clap.

mod commands;

use clap::{Parser, Subcommand};

/// Backlogarr - backlog search scheduler for TV libraries
#[derive(Parser)]
#[command(name = "backlogarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the search worker and backlog scheduler until Ctrl-C
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Run one backlog pass and work through the queue
    #[command(alias = "b")]
    Backlog {
        /// Restrict the pass to these show IDs (the marker is left alone)
        #[arg(long = "show")]
        shows: Vec<i32>,
    },

    /// Make the next backlog pass a full one
    ForceBacklog,

    /// Show the wanted episodes of one show
    #[command(alias = "w")]
    Wanted {
        /// Show ID
        show_id: i32,
    },

    /// Search for a single episode now
    #[command(alias = "s")]
    Search {
        show_id: i32,
        season: i32,
        episode: i32,
    },

    /// Fail the current release of episodes and search for another
    Retry {
        show_id: i32,
        season: i32,
        /// One or more episode numbers within the season
        #[arg(required = true)]
        episodes: Vec<i32>,
    },

    /// Show the backlog marker, next due date and queue state
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
