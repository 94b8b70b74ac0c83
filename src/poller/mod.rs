pub mod filter;
pub mod guard;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{AppError, Result};
use crate::store::ProcessedStore;
use crate::workflow::{self, Services};

use filter::Verdict;
use guard::CycleGuard;

/// Counters for one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub listed: usize,
    pub skipped_foreign: usize,
    pub skipped_processed: usize,
    pub completed: usize,
    pub failed: usize,
}

impl CycleReport {
    fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: at,
            finished_at: None,
            listed: 0,
            skipped_foreign: 0,
            skipped_processed: 0,
            completed: 0,
            failed: 0,
        }
    }
}

/// Execution context for the poll loop, built once at startup.
pub struct Poller {
    services: Services,
    store: ProcessedStore,
    guard: CycleGuard,
    actor: String,
    label: String,
    interval: Duration,
    last_report: RwLock<Option<CycleReport>>,
}

impl Poller {
    pub fn new(
        services: Services,
        store: ProcessedStore,
        actor: String,
        label: String,
        interval: Duration,
    ) -> Self {
        Self {
            services,
            store,
            guard: CycleGuard::new(),
            actor,
            label,
            interval,
            last_report: RwLock::new(None),
        }
    }

    pub fn guard(&self) -> &CycleGuard {
        &self.guard
    }

    pub async fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().await.clone()
    }

    /// Tick on the configured interval until `shutdown` resolves, then wait
    /// for any in-flight cycle.
    pub async fn run<S>(self: Arc<Self>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<()>> = None;

        tracing::info!(interval_secs = self.interval.as_secs(), "Poll scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Some(handle) = Arc::clone(&self).tick() {
                        in_flight = Some(handle);
                    }
                }
            }
        }

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                tracing::info!("Waiting for in-flight cycle to finish");
            }
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Cycle task aborted");
            }
        }

        tracing::info!("Poll scheduler stopped");
    }

    /// One scheduler tick: start a cycle unless one is already running.
    ///
    /// A tick that finds the guard held does nothing else.
    pub fn tick(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let Some(permit) = self.guard.try_acquire() else {
            tracing::info!("Already processing, skipping");
            return None;
        };

        Some(tokio::spawn(async move {
            let _permit = permit;
            // Errors are logged by run_guarded
            let _ = self.run_guarded().await;
        }))
    }

    /// Run exactly one cycle under the guard.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let _permit = self
            .guard
            .try_acquire()
            .ok_or_else(|| AppError::Internal("A poll cycle is already running".to_string()))?;
        self.run_guarded().await
    }

    async fn run_guarded(&self) -> Result<CycleReport> {
        let result = self.run_cycle().await;

        match &result {
            Ok(report) => {
                tracing::info!(
                    listed = report.listed,
                    completed = report.completed,
                    failed = report.failed,
                    skipped_processed = report.skipped_processed,
                    skipped_foreign = report.skipped_foreign,
                    "Cycle finished"
                );
                *self.last_report.write().await = Some(report.clone());
            }
            Err(e) => {
                tracing::error!(error = %e, "Error checking events");
            }
        }

        result
    }

    /// List labeled items, filter them, and run each eligible item's workflow
    /// in listing order.
    ///
    /// Only listing and state-read failures fail the cycle; item failures are
    /// logged, counted, and left unrecorded so the next cycle retries them.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::started(Utc::now());
        tracing::info!(at = %report.started_at.to_rfc3339(), "Checking for events");

        let mut items = self
            .services
            .platform
            .list_open_items_with_label(&self.label)
            .await?;
        let processed = self.store.load().await?;

        // Pages can shift between requests and repeat an entry
        let mut seen = HashSet::new();
        items.retain(|item| seen.insert((item.kind, item.number)));
        report.listed = items.len();

        for item in &items {
            match filter::classify(item, &self.actor, &processed) {
                Verdict::Eligible => {}
                Verdict::ForeignAuthor => {
                    tracing::debug!(number = item.number, author = %item.author, "Skipping item by another author");
                    report.skipped_foreign += 1;
                    continue;
                }
                Verdict::AlreadyProcessed => {
                    tracing::debug!(number = item.number, kind = %item.kind, "Skipping processed item");
                    report.skipped_processed += 1;
                    continue;
                }
            }

            tracing::info!(number = item.number, kind = %item.kind, title = %item.title, "Processing item");

            match workflow::process_item(&self.services, item).await {
                Ok(outcome) => match self.store.mark(item.kind, item.number).await {
                    Ok(_) => {
                        tracing::info!(number = item.number, outcome = ?outcome, "Item completed");
                        report.completed += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            number = item.number,
                            error = %e,
                            "Item completed but could not be recorded"
                        );
                        report.failed += 1;
                    }
                },
                Err(e) => {
                    tracing::error!(
                        number = item.number,
                        kind = %item.kind,
                        error = %e,
                        "Item failed, will retry next cycle"
                    );
                    report.failed += 1;
                }
            }
        }

        report.finished_at = Some(Utc::now());
        Ok(report)
    }
}
