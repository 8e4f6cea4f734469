use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::info;

use crate::clients::qbittorrent::{QBitClient, QBitConfig};
use crate::clients::torznab::TorznabClient;
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::scheduler::BacklogScheduler;
use crate::services::{
    BacklogSearcher, DisabledProvider, DryRunSnatcher, FailedHistory, HistorySnatcher,
    ItemContext, LibraryService, Notifier, QBitSnatcher, SeaOrmFailedHistory,
    SeaOrmLibraryService, SearchProvider, SearchQueue, Snatcher, TorznabProvider,
};

#[derive(Clone)]
pub struct SharedState {
    pub library: Arc<dyn LibraryService>,

    pub queue: Arc<SearchQueue>,

    /// Collaborators handed to every queue item when it runs.
    pub context: Arc<ItemContext>,

    pub searcher: Arc<BacklogSearcher>,

    pub scheduler: Arc<BacklogScheduler>,

    pub event_bus: broadcast::Sender<NotificationEvent>,
}

fn build_provider(config: &Config, store: &Store) -> anyhow::Result<Arc<dyn SearchProvider>> {
    let torznab = &config.torznab;
    if !torznab.enabled {
        info!("No search provider configured, searches will find nothing");
        return Ok(Arc::new(DisabledProvider));
    }

    let client = TorznabClient::new(
        &torznab.url,
        &torznab.api_key,
        torznab.categories.clone(),
        Duration::from_secs(u64::from(torznab.request_timeout_seconds)),
    )?;
    Ok(Arc::new(
        TorznabProvider::new(torznab.name.clone(), client).with_failed_filter(store.clone()),
    ))
}

fn build_snatcher(config: &Config, store: &Store) -> anyhow::Result<Arc<dyn Snatcher>> {
    let qbit = &config.qbittorrent;
    let inner: Arc<dyn Snatcher> = if qbit.enabled {
        let client = QBitClient::new(QBitConfig {
            base_url: qbit.url.clone(),
            username: qbit.username.clone(),
            password: qbit.password.clone(),
        })?;
        Arc::new(QBitSnatcher::new(client, Some(&qbit.default_category)))
    } else {
        info!("qBittorrent disabled, snatches are dry runs");
        Arc::new(DryRunSnatcher)
    };

    Ok(Arc::new(HistorySnatcher::new(inner, store.clone())))
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size.max(1));
        let notifier: Arc<dyn Notifier> = Arc::new(event_bus.clone());

        let library_impl = Arc::new(SeaOrmLibraryService::new(store.clone()));
        let library: Arc<dyn LibraryService> = library_impl.clone();
        let failed_history: Arc<dyn FailedHistory> =
            Arc::new(SeaOrmFailedHistory::new(store.clone()));

        let provider = build_provider(&config, &store)?;
        let snatcher = build_snatcher(&config, &store)?;

        let queue = Arc::new(SearchQueue::new(snatcher).with_notifier(Arc::clone(&notifier)));

        let context = Arc::new(ItemContext {
            provider,
            library: Arc::clone(&library),
            failed_history,
            notifier: Arc::clone(&notifier),
            prefer_episode_releases: config.backlog.prefer_episode_releases,
        });

        let searcher = Arc::new(
            BacklogSearcher::new(
                Arc::clone(&library),
                library_impl,
                Arc::clone(&queue),
                notifier,
                config.backlog.cycle_days,
                config.backlog.recent_days,
            )
            .await?,
        );

        let scheduler = Arc::new(BacklogScheduler::new(
            Arc::clone(&searcher),
            config.scheduler.clone(),
        ));

        Ok(Self {
            library,
            queue,
            context,
            searcher,
            scheduler,
            event_bus,
        })
    }
}
