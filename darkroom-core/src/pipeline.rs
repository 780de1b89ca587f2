//! Per-asset reconciliation: filter, probe specs, resolve the source at most
//! once, fan out missing thumbnails, then reconcile the sidecar.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::asset::Asset;
use crate::catalog::BlobFetcher;
use crate::config::GatherConfig;
use crate::error::GatherError;
use crate::fetch::{FetchCache, SourceOrigin};
use crate::metadata::{MetadataReconciler, MetadataStatus};
use crate::resolver::LocalResolver;
use crate::thumbnail::{
    ImageTransform, JpegThumbnailer, Probe, ThumbnailCache, ThumbnailSpec,
};

/// Step of an asset task that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Probe,
    Resolve,
    Generate,
    Metadata,
    /// The task itself panicked or was aborted.
    Task,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Probe => "probe",
            Stage::Resolve => "resolve",
            Stage::Generate => "generate",
            Stage::Metadata => "metadata",
            Stage::Task => "task",
        })
    }
}

#[derive(Debug)]
pub enum AssetOutcome {
    /// Filtered out by extension. Nothing was touched.
    Skipped,
    Completed,
    Failed { stage: Stage, error: GatherError },
}

/// What one asset task did. Partial progress is kept on failure: thumbnails
/// published before a sibling spec failed stay counted.
#[derive(Debug)]
pub struct AssetReport {
    pub asset: Asset,
    pub fetched: bool,
    pub generated: Vec<ThumbnailSpec>,
    pub metadata: Option<MetadataStatus>,
    pub outcome: AssetOutcome,
}

impl AssetReport {
    fn new(asset: Asset) -> Self {
        Self {
            asset,
            fetched: false,
            generated: Vec::new(),
            metadata: None,
            outcome: AssetOutcome::Completed,
        }
    }
}

type StageResult = std::result::Result<(), (Stage, GatherError)>;

fn ensure_live(cancel: &CancellationToken, stage: Stage) -> StageResult {
    if cancel.is_cancelled() {
        return Err((stage, GatherError::Cancelled(format!("before {stage}"))));
    }
    Ok(())
}

/// Components shared, read-only, by every asset task of a run.
#[derive(Debug)]
pub struct AssetPipeline {
    config: Arc<GatherConfig>,
    fetch: FetchCache,
    thumbnails: ThumbnailCache,
    metadata: MetadataReconciler,
}

impl AssetPipeline {
    pub fn new(config: Arc<GatherConfig>, fetcher: Arc<dyn BlobFetcher>) -> Self {
        let transform = Arc::new(JpegThumbnailer::new(
            config.jpeg_quality,
            config.orientation,
        ));
        Self::with_transform(config, fetcher, transform)
    }

    pub fn with_transform(
        config: Arc<GatherConfig>,
        fetcher: Arc<dyn BlobFetcher>,
        transform: Arc<dyn ImageTransform>,
    ) -> Self {
        let layout = config.layout();
        let resolver = LocalResolver::new(config.effective_search_roots());

        Self {
            fetch: FetchCache::new(resolver.clone(), layout.clone(), fetcher),
            thumbnails: ThumbnailCache::new(layout.clone(), transform),
            metadata: MetadataReconciler::new(layout, resolver),
            config,
        }
    }

    pub fn config(&self) -> &GatherConfig {
        &self.config
    }

    pub async fn process(&self, asset: Asset, cancel: &CancellationToken) -> AssetReport {
        let mut report = AssetReport::new(asset);

        if !report.asset.is_processable(&self.config.extensions) {
            debug!(
                target: "gather::asset",
                asset = %report.asset,
                extension = report.asset.extension().unwrap_or_default(),
                "ignoring entry with unprocessable extension"
            );
            report.outcome = AssetOutcome::Skipped;
            return report;
        }

        debug!(target: "gather::asset", asset = %report.asset, "processing");
        if let Err((stage, error)) = self.reconcile(&mut report, cancel).await {
            if matches!(error, GatherError::Cancelled(_)) {
                debug!(target: "gather::asset", asset = %report.asset, %stage, "interrupted");
            } else {
                warn!(
                    target: "gather::asset",
                    asset = %report.asset,
                    %stage,
                    error = %error,
                    "asset failed; continuing with siblings"
                );
            }
            report.outcome = AssetOutcome::Failed { stage, error };
        }
        report
    }

    async fn reconcile(&self, report: &mut AssetReport, cancel: &CancellationToken) -> StageResult {
        let asset = report.asset.clone();

        let mut missing = Vec::new();
        for spec in &self.config.thumbnails {
            let probe = self
                .thumbnails
                .probe(&asset, spec)
                .await
                .map_err(|e| (Stage::Probe, e))?;
            if let Probe::Missing(_) = probe {
                missing.push(*spec);
            }
        }

        if !missing.is_empty() {
            ensure_live(cancel, Stage::Resolve)?;
            let source = self
                .fetch
                .resolve(&asset, cancel)
                .await
                .map_err(|e| (Stage::Resolve, e))?;
            report.fetched = source.origin == SourceOrigin::Fetched;

            ensure_live(cancel, Stage::Generate)?;
            let results = join_all(missing.iter().map(|spec| {
                let (path, asset) = (&source.path, &asset);
                async move { (*spec, self.thumbnails.generate(path, asset, spec).await) }
            }))
            .await;

            let mut first_error = None;
            for (spec, result) in results {
                match result {
                    Ok(generated) => {
                        info!(
                            target: "gather::asset",
                            asset = %asset,
                            spec = %spec,
                            width = generated.width,
                            height = generated.height,
                            "created thumbnail"
                        );
                        report.generated.push(spec);
                    }
                    Err(err) => {
                        warn!(
                            target: "gather::asset",
                            asset = %asset,
                            spec = %spec,
                            error = %err,
                            "thumbnail failed"
                        );
                        first_error.get_or_insert(err);
                    }
                }
            }
            if let Some(err) = first_error {
                return Err((Stage::Generate, err));
            }
        }

        ensure_live(cancel, Stage::Metadata)?;
        let status = self
            .metadata
            .ensure(&asset)
            .await
            .map_err(|e| (Stage::Metadata, e))?;
        if let MetadataStatus::Copied { .. } = status {
            info!(target: "gather::asset", asset = %asset, "copied meta");
        }
        report.metadata = Some(status);
        Ok(())
    }
}
