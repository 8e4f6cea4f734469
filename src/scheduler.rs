//! Periodic trigger for backlog passes.
//!
//! The scheduler only decides *when* to ask the searcher for a pass; whether
//! that pass is a full sweep or a narrow recent one is the searcher's call,
//! driven by the persisted marker.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime};
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::domain::{ORDINAL_EPOCH, from_ordinal};
use crate::services::{BacklogSearcher, LibraryError};

const JOB_NAME: &str = "backlog_search";

pub struct BacklogScheduler {
    searcher: Arc<BacklogSearcher>,
    config: SchedulerConfig,
    /// `None` until the first pass; forcing a search clears it again.
    last_run: RwLock<Option<NaiveDateTime>>,
    running: Arc<RwLock<bool>>,
}

impl BacklogScheduler {
    pub fn new(searcher: Arc<BacklogSearcher>, config: SchedulerConfig) -> Self {
        Self {
            searcher,
            config,
            last_run: RwLock::new(None),
            running: Arc::new(RwLock::new(false)),
        }
    }

    #[must_use]
    pub const fn searcher(&self) -> &Arc<BacklogSearcher> {
        &self.searcher
    }

    fn frequency(&self) -> ChronoDuration {
        ChronoDuration::minutes(i64::from(self.config.backlog_frequency_minutes.max(1)))
    }

    pub async fn last_run(&self) -> Option<NaiveDateTime> {
        *self.last_run.read().await
    }

    /// Date the next full pass is due.
    #[must_use]
    pub fn next_run(&self) -> NaiveDate {
        self.next_run_on(Local::now().date_naive())
    }

    #[must_use]
    pub fn next_run_on(&self, today: NaiveDate) -> NaiveDate {
        let marker = self.searcher.last_backlog();
        if marker <= ORDINAL_EPOCH {
            return today;
        }
        from_ordinal(marker + self.searcher.cycle_days()).unwrap_or(today)
    }

    /// Resets the marker so the next pass is a full one, and makes the next
    /// tick fire regardless of the frequency.
    pub async fn force_search(&self) -> Result<(), LibraryError> {
        info!("Forcing a full backlog search on the next tick");
        self.searcher.reset_marker().await?;
        *self.last_run.write().await = None;
        Ok(())
    }

    pub async fn tick(&self) -> Result<bool, LibraryError> {
        self.tick_at(Local::now().naive_local()).await
    }

    /// Runs a pass if the searcher is not paused and the frequency has
    /// elapsed since the last one. Returns whether a pass was started.
    pub async fn tick_at(&self, now: NaiveDateTime) -> Result<bool, LibraryError> {
        if self.searcher.is_paused() {
            debug!("Backlog searcher is paused, skipping tick");
            return Ok(false);
        }

        {
            let mut last_run = self.last_run.write().await;
            if let Some(previous) = *last_run
                && now - previous < self.frequency()
            {
                return Ok(false);
            }
            *last_run = Some(now);
        }

        self.run_pass(now.date()).await?;
        Ok(true)
    }

    async fn run_pass(&self, today: NaiveDate) -> Result<(), LibraryError> {
        let start = std::time::Instant::now();
        info!(
            event = "job_started",
            job_name = JOB_NAME,
            next_full = %self.next_run_on(today),
            "Starting scheduled backlog search"
        );

        let queued = self.searcher.run_on(today, None).await?;

        info!(
            event = "job_finished",
            job_name = JOB_NAME,
            queued,
            marker = self.searcher.last_backlog(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled backlog search finished"
        );
        Ok(())
    }

    /// Runs until [`stop`](Self::stop) is called.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting backlog scheduler");

        if let Some(cron_expr) = self.config.cron_expression.clone() {
            self.run_with_cron(&cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(self: Arc<Self>, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let scheduler = Arc::clone(&self);
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let scheduler = Arc::clone(&scheduler);
            Box::pin(async move {
                if !scheduler.is_running().await || scheduler.searcher.is_paused() {
                    return;
                }
                *scheduler.last_run.write().await = Some(Local::now().naive_local());
                if let Err(e) = scheduler.run_pass(Local::now().date_naive()).await {
                    error!(event = "job_failed", job_name = JOB_NAME, error = %e, "Scheduled backlog search failed");
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;
        info!("Backlog scheduler running with cron: {}", cron_expr);

        while self.is_running().await {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(self: Arc<Self>) -> Result<()> {
        let tick_secs = self.config.tick_seconds.max(1);
        info!(
            "Backlog scheduler running: pass every {}m, checked every {}s",
            self.config.backlog_frequency_minutes.max(1),
            tick_secs
        );

        let mut ticker = interval(Duration::from_secs(u64::from(tick_secs)));
        loop {
            ticker.tick().await;
            if !self.is_running().await {
                break;
            }

            match self.tick().await {
                Ok(true) => {}
                Ok(false) => debug!("Backlog search not due yet"),
                Err(e) => {
                    error!(event = "job_failed", job_name = JOB_NAME, error = %e, "Scheduled backlog search failed");
                }
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
