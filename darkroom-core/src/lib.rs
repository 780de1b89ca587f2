//! # Darkroom Core
//!
//! Reconciles a remote photo catalog against local storage, so that every
//! processable asset ends up with its derived thumbnails and a local copy of
//! its metadata sidecar.
//!
//! ## Overview
//!
//! A run walks the catalog page by page. For each asset it:
//!
//! - **Filters** by extension; anything else is skipped untouched
//! - **Probes** every configured thumbnail slot under `<base>/thumbnails/<key>/`
//! - **Resolves** the original once, preferring search roots over the remote
//! - **Generates** the missing thumbnails concurrently from that one source
//! - **Reconciles** `<base>/metadata/<name>.json` from the search roots
//!
//! Presence of a file at its canonical path is the only cache signal, and
//! every artifact is published with write-to-temp then rename, so a run can
//! be interrupted and repeated at any point.
//!
//! ## Architecture
//!
//! - [`catalog`]: enumeration and blob transfer seams, plus a directory-backed store
//! - [`fetch`]: local lookup with remote fallback into `download/`
//! - [`thumbnail`]: spec model, orientation handling and the JPEG thumbnailer
//! - [`metadata`]: sidecar reconciliation and the read-only sidecar inventory
//! - [`orchestrator`]: pagination, bounded admission and the run report
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use darkroom_core::{DirectoryStore, GatherConfig, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn gather() -> darkroom_core::Result<()> {
//!     let config = Arc::new(GatherConfig::with_base_dir("/tmp/pictures-foo"));
//!     let remote = Arc::new(DirectoryStore::new("/mnt/bucket"));
//!     let orchestrator = Orchestrator::new(config, remote.clone(), remote);
//!
//!     let report = orchestrator.run(CancellationToken::new()).await?;
//!     println!("{} thumbnails generated", report.thumbnails_generated);
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod metadata;
pub mod orchestrator;
pub mod pipeline;
pub mod resolver;
pub mod store;
pub mod thumbnail;

pub use asset::Asset;
pub use catalog::{
    BlobFetcher, BlobReader, CatalogEnumerator, CatalogPage, Cursor, DirectoryStore,
};
pub use config::GatherConfig;
pub use error::{GatherError, Result};
pub use fetch::{FetchCache, ResolvedSource, SourceOrigin};
pub use layout::StorageLayout;
pub use metadata::{MetadataReconciler, MetadataStatus, Sidecar, SidecarInventory};
pub use orchestrator::{
    FailedAsset, MAX_CONCURRENT_ASSETS, Orchestrator, RunReport,
};
pub use pipeline::{AssetOutcome, AssetPipeline, AssetReport, Stage};
pub use resolver::LocalResolver;
pub use thumbnail::{
    ImageTransform, JpegThumbnailer, OrientationPolicy, ThumbnailCache, ThumbnailSpec,
};
