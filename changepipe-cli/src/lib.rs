//! Command-line interface for the changepipe overlap engine.
#![forbid(unsafe_code)]

use clap::Parser;
use clap::Subcommand;

mod error;
mod fs;
mod ingest;
mod overlaps;

pub use error::CliError;

use ingest::{IngestArgs, run_ingest};
use overlaps::{OverlapsArgs, run_overlaps};

const ARG_INGEST_OSC_PATH: &str = "osc-path";
const ARG_CACHE_DB: &str = "cache-db";
const ARG_CACHE_TTL_SECS: &str = "cache-ttl-secs";
const ARG_OVERLAPS_CHANGESET: &str = "changeset";
const ARG_OVERLAPS_AREA: &str = "area";
const ARG_OVERLAPS_API_BASE_URL: &str = "api-base-url";
const ARG_OVERLAPS_NEAR_MARGIN: &str = "near-margin";
const ENV_INGEST_OSC_PATH: &str = "CHANGEPIPE_CMDS_INGEST_OSC_PATH";
const ENV_OVERLAPS_CHANGESET: &str = "CHANGEPIPE_CMDS_OVERLAPS_CHANGESET";
const ENV_OVERLAPS_AREA: &str = "CHANGEPIPE_CMDS_OVERLAPS_AREA";

const DEFAULT_CACHE_DB: &str = "changepipe-cache.db";

/// Run the changepipe CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when argument parsing, configuration merging or the
/// selected command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Ingest(args) => run_ingest(args),
        Command::Overlaps(args) => run_overlaps(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "changepipe",
    about = "Decide whether OpenStreetMap changesets touch an area of interest",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Remember the elements of an osmChange file in the geometry cache.
    Ingest(IngestArgs),
    /// Check whether a changeset touches a bounding box.
    Overlaps(OverlapsArgs),
}

#[cfg(test)]
mod tests;
