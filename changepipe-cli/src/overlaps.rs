//! Overlaps command implementation for the changepipe CLI.

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use changepipe_core::{
    ChangesetId, DEFAULT_CACHE_TTL, DEFAULT_NEAR_MARGIN, OverlapCheck, OverlapDetector,
    SqliteGeometryCache, rect_polygon,
};
use changepipe_data::osm_api::{DEFAULT_BASE_URL, HttpOsmApi, OsmApiConfig};
use clap::Parser;
use geo::{Coord, Rect};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::ingest::write_report;
use crate::{
    ARG_CACHE_DB, ARG_CACHE_TTL_SECS, ARG_OVERLAPS_API_BASE_URL, ARG_OVERLAPS_AREA,
    ARG_OVERLAPS_CHANGESET, ARG_OVERLAPS_NEAR_MARGIN, CliError, DEFAULT_CACHE_DB,
    ENV_OVERLAPS_AREA, ENV_OVERLAPS_CHANGESET,
};

/// CLI arguments for the `overlaps` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Decide whether a changeset touches a bounding box. Members \
                 are located from the geometry cache first; the OSM API is \
                 only consulted when the cache cannot settle the question.",
    about = "Check a changeset against an area of interest"
)]
#[ortho_config(prefix = "CHANGEPIPE")]
pub(crate) struct OverlapsArgs {
    /// Changeset identifier.
    #[arg(long = ARG_OVERLAPS_CHANGESET, value_name = "id")]
    #[serde(default)]
    pub(crate) changeset: Option<u64>,
    /// Area of interest as `minlon,minlat,maxlon,maxlat`.
    #[arg(long = ARG_OVERLAPS_AREA, value_name = "bbox", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) area: Option<String>,
    /// SQLite geometry cache to read from and write into.
    #[arg(long = ARG_CACHE_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) cache_db: Option<Utf8PathBuf>,
    /// Base URL of the OSM API (e.g. "https://api.openstreetmap.org/api/0.6").
    #[arg(long = ARG_OVERLAPS_API_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) api_base_url: Option<String>,
    /// Elements further than this many degrees from the area end the check.
    #[arg(long = ARG_OVERLAPS_NEAR_MARGIN, value_name = "degrees")]
    #[serde(default)]
    pub(crate) near_margin: Option<f64>,
    /// Lifetime of cache records in seconds.
    #[arg(long = ARG_CACHE_TTL_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_ttl_secs: Option<u64>,
}

impl OverlapsArgs {
    pub(crate) fn into_config(self) -> Result<OverlapsConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        OverlapsConfig::try_from(merged)
    }
}

/// Resolved `overlaps` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OverlapsConfig {
    pub(crate) changeset: ChangesetId,
    pub(crate) area: Rect<f64>,
    pub(crate) cache_db: Utf8PathBuf,
    pub(crate) api_base_url: String,
    pub(crate) near_margin: f64,
    pub(crate) cache_ttl: Duration,
}

impl TryFrom<OverlapsArgs> for OverlapsConfig {
    type Error = CliError;

    fn try_from(args: OverlapsArgs) -> Result<Self, Self::Error> {
        let changeset = args.changeset.ok_or(CliError::MissingArgument {
            field: ARG_OVERLAPS_CHANGESET,
            env: ENV_OVERLAPS_CHANGESET,
        })?;
        let raw_area = args.area.ok_or(CliError::MissingArgument {
            field: ARG_OVERLAPS_AREA,
            env: ENV_OVERLAPS_AREA,
        })?;
        let near_margin = args.near_margin.unwrap_or(DEFAULT_NEAR_MARGIN);
        if !near_margin.is_finite() || near_margin < 0.0 {
            return Err(CliError::InvalidMargin(near_margin));
        }

        Ok(Self {
            changeset: ChangesetId(changeset),
            area: parse_area(&raw_area)?,
            cache_db: args
                .cache_db
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DB)),
            api_base_url: args
                .api_base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            near_margin,
            cache_ttl: args
                .cache_ttl_secs
                .map_or(DEFAULT_CACHE_TTL, Duration::from_secs),
        })
    }
}

/// Parse `minlon,minlat,maxlon,maxlat` into a rectangle (`x = lon`).
pub(crate) fn parse_area(value: &str) -> Result<Rect<f64>, CliError> {
    let invalid = |reason| CliError::InvalidArea {
        value: value.to_owned(),
        reason,
    };
    let parsed = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid("coordinates must be numbers"))?;
    let &[min_lon, min_lat, max_lon, max_lat] = parsed.as_slice() else {
        return Err(invalid("expected minlon,minlat,maxlon,maxlat"));
    };
    if [min_lon, min_lat, max_lon, max_lat]
        .iter()
        .any(|coordinate| !coordinate.is_finite())
    {
        return Err(invalid("coordinates must be finite"));
    }
    if min_lon > max_lon || min_lat > max_lat {
        return Err(invalid("minimum corner must not exceed maximum corner"));
    }
    Ok(Rect::new(
        Coord {
            x: min_lon,
            y: min_lat,
        },
        Coord {
            x: max_lon,
            y: max_lat,
        },
    ))
}

/// JSON answer printed by the `overlaps` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct OverlapReport {
    pub(crate) changeset: ChangesetId,
    pub(crate) overlaps: bool,
}

/// Builds the overlap check for the current invocation.
pub(super) trait OverlapCheckBuilder {
    fn build(&self, config: &OverlapsConfig) -> Result<Box<dyn OverlapCheck>, CliError>;
}

/// SQLite cache in front of the live OSM API.
pub(super) struct DefaultOverlapCheckBuilder;

impl OverlapCheckBuilder for DefaultOverlapCheckBuilder {
    fn build(&self, config: &OverlapsConfig) -> Result<Box<dyn OverlapCheck>, CliError> {
        let cache = SqliteGeometryCache::open(config.cache_db.as_std_path(), config.cache_ttl)
            .map_err(CliError::OpenCache)?;
        let api = HttpOsmApi::with_config(OsmApiConfig::new(config.api_base_url.clone()))
            .map_err(|source| CliError::BuildApi {
                base_url: config.api_base_url.clone(),
                source,
            })?;
        Ok(Box::new(
            OverlapDetector::new(cache, api).with_margin(config.near_margin),
        ))
    }
}

pub(super) fn run_overlaps(args: OverlapsArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_overlaps_with(args, &DefaultOverlapCheckBuilder, &mut stdout)
}

pub(super) fn run_overlaps_with(
    args: OverlapsArgs,
    builder: &dyn OverlapCheckBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let report = execute_overlaps(&config, builder)?;
    write_report(writer, &report)
}

pub(super) fn execute_overlaps(
    config: &OverlapsConfig,
    builder: &dyn OverlapCheckBuilder,
) -> Result<OverlapReport, CliError> {
    let check = builder.build(config)?;
    let overlaps = check.overlaps(config.changeset, &rect_polygon(&config.area))?;
    info!("{}: overlaps area: {overlaps}", config.changeset);
    Ok(OverlapReport {
        changeset: config.changeset,
        overlaps,
    })
}
