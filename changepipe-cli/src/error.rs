//! Error types emitted by the changepipe CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use changepipe_core::{CacheError, ResolveError};
use changepipe_data::osm_api::ApiBuildError;
use changepipe_data::osm_change::OsmChangeError;
use thiserror::Error;

/// Errors emitted by the changepipe CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name of the option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag name of the option.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag name of the option.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag name of the option.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The `--area` value is not four comma-separated coordinates.
    #[error("invalid area {value:?}: {reason}")]
    InvalidArea {
        /// Raw option value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The `--near-margin` value is negative or not finite.
    #[error("near margin must be a finite, non-negative number of degrees, got {0}")]
    InvalidMargin(f64),
    /// Reading the osmChange input failed.
    #[error("failed to read changes from {path:?}: {source}")]
    ReadChanges {
        /// Input path.
        path: Utf8PathBuf,
        /// Reader failure.
        #[source]
        source: OsmChangeError,
    },
    /// Opening the geometry cache failed.
    #[error("failed to open geometry cache: {0}")]
    OpenCache(#[source] CacheError),
    /// Writing changes into the geometry cache failed.
    #[error("failed to remember changes: {0}")]
    Ingest(#[source] CacheError),
    /// Constructing the OSM API client failed.
    #[error("failed to build OSM API client for {base_url:?}: {source}")]
    BuildApi {
        /// Configured base URL.
        base_url: String,
        /// Client construction failure.
        #[source]
        source: ApiBuildError,
    },
    /// The overlap check failed.
    #[error("overlap check failed: {0}")]
    Overlap(#[from] ResolveError),
    /// Serialising a report failed.
    #[error("failed to serialise report: {0}")]
    Serialise(#[source] serde_json::Error),
    /// Writing a report failed.
    #[error("failed to write report: {0}")]
    Write(#[source] std::io::Error),
}
