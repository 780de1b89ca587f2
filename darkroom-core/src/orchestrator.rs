//! Pagination driver.
//!
//! Pages are processed one at a time. Within a page every asset gets its own
//! task, admitted through a semaphore, and the page is a barrier: the next
//! page is not requested until every admitted task has settled.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::asset::Asset;
use crate::catalog::{BlobFetcher, CatalogEnumerator, Cursor};
use crate::config::GatherConfig;
use crate::error::{GatherError, Result};
use crate::metadata::MetadataStatus;
use crate::pipeline::{AssetOutcome, AssetPipeline, AssetReport, Stage};
use crate::thumbnail::ImageTransform;

/// Largest admission limit a run accepts; larger settings are clamped.
pub const MAX_CONCURRENT_ASSETS: usize = Semaphore::MAX_PERMITS;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedAsset {
    pub asset: String,
    pub stage: Stage,
    pub message: String,
}

/// Tally of one run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub pages: usize,
    /// Every asset handed to a task, processable or not.
    pub assets_seen: usize,
    pub skipped: usize,
    pub completed: usize,
    pub failed: Vec<FailedAsset>,
    /// Admitted tasks that stopped early because the run was cancelled.
    pub interrupted: usize,
    pub fetched: usize,
    pub thumbnails_generated: usize,
    pub metadata_copied: usize,
    pub metadata_unresolved: Vec<String>,
    /// Highest number of asset tasks observed running at once.
    pub peak_active_tasks: usize,
    pub cancelled: bool,
}

impl RunReport {
    fn record(&mut self, report: AssetReport) {
        if report.fetched {
            self.fetched += 1;
        }
        self.thumbnails_generated += report.generated.len();
        match &report.metadata {
            Some(MetadataStatus::Copied { .. }) => self.metadata_copied += 1,
            Some(MetadataStatus::Unresolved) => {
                self.metadata_unresolved.push(report.asset.name().to_string())
            }
            Some(MetadataStatus::Present) | None => {}
        }

        match report.outcome {
            AssetOutcome::Skipped => self.skipped += 1,
            AssetOutcome::Completed => self.completed += 1,
            AssetOutcome::Failed {
                error: GatherError::Cancelled(_),
                ..
            } => self.interrupted += 1,
            AssetOutcome::Failed { stage, error } => {
                self.failed.push(FailedAsset {
                    asset: report.asset.name().to_string(),
                    stage,
                    message: error.to_string(),
                })
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Live count of running asset tasks plus its high-water mark.
#[derive(Debug, Default)]
struct ActiveGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActiveGauge {
    fn enter(self: &Arc<Self>) -> ActiveGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(Arc::clone(self))
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveGuard(Arc<ActiveGauge>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Orchestrator {
    catalog: Arc<dyn CatalogEnumerator>,
    pipeline: Arc<AssetPipeline>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("catalog", &self.catalog)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        config: Arc<GatherConfig>,
        catalog: Arc<dyn CatalogEnumerator>,
        fetcher: Arc<dyn BlobFetcher>,
    ) -> Self {
        Self {
            catalog,
            pipeline: Arc::new(AssetPipeline::new(config, fetcher)),
        }
    }

    pub fn with_transform(
        config: Arc<GatherConfig>,
        catalog: Arc<dyn CatalogEnumerator>,
        fetcher: Arc<dyn BlobFetcher>,
        transform: Arc<dyn ImageTransform>,
    ) -> Self {
        Self {
            catalog,
            pipeline: Arc::new(AssetPipeline::with_transform(
                config, fetcher, transform,
            )),
        }
    }

    pub fn config(&self) -> &GatherConfig {
        self.pipeline.config()
    }

    /// Reconcile the whole catalog under the configured prefix.
    ///
    /// Only a catalog failure is returned as an error. Per-asset failures are
    /// collected in the report, and cancellation yields a partial report with
    /// `cancelled` set.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport> {
        let config = self.pipeline.config();
        let limit = admission_limit(config.max_concurrent_assets);
        if limit != config.max_concurrent_assets {
            warn!(
                target: "gather::summary",
                requested = config.max_concurrent_assets,
                limit,
                "max_concurrent_assets clamped"
            );
        }
        let permits = Arc::new(Semaphore::new(limit));
        let gauge = Arc::new(ActiveGauge::default());
        let mut report = RunReport::default();
        let mut cursor: Option<Cursor> = None;

        info!(
            target: "gather::summary",
            prefix = %config.prefix,
            base_dir = %config.base_dir.display(),
            page_size = config.page_size,
            max_concurrent_assets = config.max_concurrent_assets,
            "starting gather run"
        );

        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                page = self.catalog.list(
                    &config.prefix,
                    config.page_size,
                    cursor.as_ref(),
                ) => page,
            };
            let page = page.map_err(|err| {
                let err = match err {
                    GatherError::Catalog(_) => err,
                    other => GatherError::Catalog(other.to_string()),
                };
                error!(
                    target: "gather::page",
                    page = report.pages + 1,
                    error = %err,
                    "failed to list catalog; aborting run"
                );
                err
            })?;

            report.pages += 1;
            info!(
                target: "gather::page",
                page = report.pages,
                assets = page.assets.len(),
                last = page.next.is_none(),
                "processing page"
            );

            self.run_page(page.assets, &permits, &gauge, &cancel, &mut report)
                .await;

            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        report.peak_active_tasks = gauge.peak();
        info!(
            target: "gather::summary",
            pages = report.pages,
            seen = report.assets_seen,
            completed = report.completed,
            skipped = report.skipped,
            failed = report.failed.len(),
            interrupted = report.interrupted,
            fetched = report.fetched,
            thumbnails = report.thumbnails_generated,
            metadata_copied = report.metadata_copied,
            metadata_unresolved = report.metadata_unresolved.len(),
            cancelled = report.cancelled,
            "gather run finished"
        );
        Ok(report)
    }

    async fn run_page(
        &self,
        assets: Vec<Asset>,
        permits: &Arc<Semaphore>,
        gauge: &Arc<ActiveGauge>,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) {
        let mut tasks = JoinSet::new();
        let total = assets.len();

        for asset in assets {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                acquired = Arc::clone(permits).acquire_owned() => acquired.ok(),
            };
            let Some(permit) = permit else {
                debug!(
                    target: "gather::page",
                    admitted = tasks.len(),
                    total,
                    "admission stopped"
                );
                break;
            };

            report.assets_seen += 1;
            let name = asset.name().to_string();
            let pipeline = Arc::clone(&self.pipeline);
            let gauge = Arc::clone(gauge);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let _active = gauge.enter();
                let outcome = AssertUnwindSafe(pipeline.process(asset, &cancel))
                    .catch_unwind()
                    .await;
                (name, outcome)
            });
        }

        // Page barrier.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(asset_report))) => report.record(asset_report),
                Ok((asset, Err(_))) => {
                    error!(
                        target: "gather::asset",
                        asset = %asset,
                        "asset task panicked"
                    );
                    report.failed.push(FailedAsset {
                        asset,
                        stage: Stage::Task,
                        message: "task panicked".into(),
                    });
                }
                Err(err) => {
                    // Panics are caught above; only runtime shutdown lands here.
                    warn!(
                        target: "gather::asset",
                        error = %err,
                        "asset task did not finish"
                    );
                }
            }
        }
    }
}

fn admission_limit(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENT_ASSETS)
}
