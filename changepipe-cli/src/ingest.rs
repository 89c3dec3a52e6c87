//! Ingest command implementation for the changepipe CLI.

use std::collections::BTreeSet;
use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use changepipe_core::{
    ChangedElement, ChangesetId, DEFAULT_CACHE_TTL, IngestSummary, SqliteGeometryCache,
    remember_changes,
};
use changepipe_data::osm_change::read_osm_change;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::fs::require_existing;
use crate::{
    ARG_CACHE_DB, ARG_CACHE_TTL_SECS, ARG_INGEST_OSC_PATH, CliError, DEFAULT_CACHE_DB,
    ENV_INGEST_OSC_PATH,
};

/// CLI arguments for the `ingest` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read an osmChange file and remember every node, way and \
                 relation it touches, keyed by changeset, so later overlap \
                 checks can answer from the cache.",
    about = "Load an osmChange file into the geometry cache"
)]
#[ortho_config(prefix = "CHANGEPIPE")]
pub(crate) struct IngestArgs {
    /// Path to the osmChange (`.osc`) file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) osc_path: Option<Utf8PathBuf>,
    /// SQLite geometry cache to write into.
    #[arg(long = ARG_CACHE_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) cache_db: Option<Utf8PathBuf>,
    /// Lifetime of cache records in seconds.
    #[arg(long = ARG_CACHE_TTL_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_ttl_secs: Option<u64>,
}

impl IngestArgs {
    pub(crate) fn into_config(self) -> Result<IngestConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        IngestConfig::try_from(merged)
    }
}

/// Resolved `ingest` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IngestConfig {
    pub(crate) osc_path: Utf8PathBuf,
    pub(crate) cache_db: Utf8PathBuf,
    pub(crate) cache_ttl: Duration,
}

impl IngestConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.osc_path, ARG_INGEST_OSC_PATH)
    }
}

impl TryFrom<IngestArgs> for IngestConfig {
    type Error = CliError;

    fn try_from(args: IngestArgs) -> Result<Self, Self::Error> {
        let osc_path = args.osc_path.ok_or(CliError::MissingArgument {
            field: ARG_INGEST_OSC_PATH,
            env: ENV_INGEST_OSC_PATH,
        })?;
        Ok(Self {
            osc_path,
            cache_db: args
                .cache_db
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DB)),
            cache_ttl: args
                .cache_ttl_secs
                .map_or(DEFAULT_CACHE_TTL, Duration::from_secs),
        })
    }
}

/// JSON summary printed after a successful ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IngestReport {
    pub(crate) cache_db: Utf8PathBuf,
    pub(crate) nodes: usize,
    pub(crate) ways: usize,
    pub(crate) relations: usize,
    pub(crate) changesets: BTreeSet<ChangesetId>,
}

impl IngestReport {
    fn new(cache_db: Utf8PathBuf, summary: IngestSummary) -> Self {
        Self {
            cache_db,
            nodes: summary.nodes,
            ways: summary.ways,
            relations: summary.relations,
            changesets: summary.changesets,
        }
    }
}

pub(crate) fn run_ingest(args: IngestArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_ingest_with(args, &mut stdout)
}

pub(crate) fn run_ingest_with(args: IngestArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let report = execute_ingest(&config)?;
    write_report(writer, &report)
}

pub(crate) fn execute_ingest(config: &IngestConfig) -> Result<IngestReport, CliError> {
    let changes = load_changes(&config.osc_path)?;
    let cache = SqliteGeometryCache::open(config.cache_db.as_std_path(), config.cache_ttl)
        .map_err(CliError::OpenCache)?;
    let summary = remember_changes(&cache, changes).map_err(CliError::Ingest)?;
    info!(
        "remembered {} nodes, {} ways and {} relations from {} changesets",
        summary.nodes,
        summary.ways,
        summary.relations,
        summary.changesets.len()
    );
    Ok(IngestReport::new(config.cache_db.clone(), summary))
}

fn load_changes(path: &Utf8Path) -> Result<Vec<ChangedElement>, CliError> {
    read_osm_change(path).map_err(|source| CliError::ReadChanges {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_report<T: Serialize>(writer: &mut dyn Write, report: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(report).map_err(CliError::Serialise)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::Write)?;
    writer.write_all(b"\n").map_err(CliError::Write)?;
    Ok(())
}
