pub mod library_service;
pub use library_service::{BacklogMarkerStore, LibraryError, LibraryService};

pub mod library_service_impl;
pub use library_service_impl::SeaOrmLibraryService;

pub mod failed_history;
pub mod failed_history_impl;
pub use failed_history::{FailedHistory, FailedRelease};
pub use failed_history_impl::SeaOrmFailedHistory;

pub mod provider;
pub use provider::{
    DisabledProvider, SearchError, SearchOutcome, SearchProvider, SearchRequest, TorznabProvider,
    search_providers,
};

pub mod snatch;
pub use snatch::{DryRunSnatcher, HistorySnatcher, QBitSnatcher, Snatcher};

pub mod notify;
pub use notify::Notifier;

pub mod queue_item;
pub use queue_item::{ItemContext, ItemKey, ItemKind, ItemState, ItemTarget, Priority, QueueItem};

pub mod search_queue;
pub use search_queue::{QueueEntry, QueueError, SearchQueue};

pub mod backlog;
pub use backlog::{BacklogSearcher, SearchProgress, wanted_segments};

#[cfg(test)]
pub(crate) mod testing;
