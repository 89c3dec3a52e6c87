//! Behaviour-driven step definitions driving the ingest and overlaps commands.

use super::helpers::{CHANGES, CacheOnlyBuilder, workspace, write_utf8};
use super::*;
use crate::ingest::{IngestArgs, IngestReport, run_ingest_with};
use crate::overlaps::{OverlapReport, run_overlaps_with};
use camino::Utf8PathBuf;
use changepipe_core::ChangesetId;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tempfile::TempDir;

struct CommandWorld {
    _tmp: TempDir,
    osc_path: Utf8PathBuf,
    cache_db: Utf8PathBuf,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl CommandWorld {
    fn new() -> Self {
        let (tmp, root) = workspace();
        Self {
            _tmp: tmp,
            osc_path: root.join("changes.osc"),
            cache_db: root.join("cache.db"),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn ingest_args(&self) -> IngestArgs {
        let argv = [
            "changepipe",
            "ingest",
            self.osc_path.as_str(),
            "--cache-db",
            self.cache_db.as_str(),
        ];
        match Cli::try_parse_from(argv).expect("ingest arguments parse").command {
            Command::Ingest(args) => args,
            Command::Overlaps(_) => panic!("expected ingest command"),
        }
    }

    fn ingest(&self) -> Result<(), CliError> {
        run_ingest_with(self.ingest_args(), &mut *self.stdout.borrow_mut())
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }

    fn stdout(&self) -> String {
        String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8")
    }
}

#[fixture]
fn world() -> CommandWorld {
    CommandWorld::new()
}

#[given("an osmChange file with edits in London and Sydney")]
fn change_file_exists(#[from(world)] world: &CommandWorld) {
    write_utf8(&world.osc_path, CHANGES.as_bytes());
}

#[given("the file has been ingested")]
fn file_has_been_ingested(#[from(world)] world: &CommandWorld) {
    world.ingest().expect("ingest succeeds");
    world.stdout.borrow_mut().clear();
}

#[when("I run the ingest command")]
fn run_ingest_command(#[from(world)] world: &CommandWorld) {
    let outcome = world.ingest();
    world.result.replace(Some(outcome));
}

#[when("I check changeset {changeset} against \"{area}\"")]
fn run_overlaps_command(#[from(world)] world: &CommandWorld, changeset: u64, area: String) {
    let changeset_arg = changeset.to_string();
    let area_arg = format!("--{ARG_OVERLAPS_AREA}={}", area.trim_matches('"'));
    let argv = [
        "changepipe",
        "overlaps",
        "--changeset",
        changeset_arg.as_str(),
        area_arg.as_str(),
        "--cache-db",
        world.cache_db.as_str(),
    ];
    let outcome = Cli::try_parse_from(argv)
        .map_err(CliError::from)
        .and_then(|cli| match cli.command {
            Command::Overlaps(args) => {
                run_overlaps_with(args, &CacheOnlyBuilder, &mut *world.stdout.borrow_mut())
            }
            Command::Ingest(_) => panic!("expected overlaps command"),
        });
    world.result.replace(Some(outcome));
}

#[then("the ingest report counts {nodes} nodes, {ways} ways and {relations} relations")]
fn ingest_report_counts(
    #[from(world)] world: &CommandWorld,
    nodes: usize,
    ways: usize,
    relations: usize,
) {
    let report: IngestReport = serde_json::from_str(&world.stdout()).expect("JSON ingest report");
    assert_eq!((report.nodes, report.ways, report.relations), (nodes, ways, relations));
    assert_eq!(report.cache_db, world.cache_db);
}

#[then("the overlap report says {answer}")]
fn overlap_report_says(#[from(world)] world: &CommandWorld, answer: bool) {
    {
        let borrowed = world.result.borrow();
        let result = borrowed.as_ref().expect("result recorded");
        result.as_ref().expect("expected success");
    }
    let report: OverlapReport =
        serde_json::from_str(&world.stdout()).expect("JSON overlap report");
    assert_eq!(report.overlaps, answer);
    assert!(matches!(report.changeset, ChangesetId(5001 | 5002)));
}

#[then("the command fails because the area is invalid")]
fn command_fails_invalid_area(#[from(world)] world: &CommandWorld) {
    match &*world.error() {
        CliError::InvalidArea { value, .. } => assert_eq!(value, "west,south"),
        other => panic!("expected InvalidArea, found {other:?}"),
    }
}

#[then("the command fails because the change file is missing")]
fn command_fails_missing_change_file(#[from(world)] world: &CommandWorld) {
    match &*world.error() {
        CliError::MissingSourceFile { field, path } => {
            assert_eq!(*field, ARG_INGEST_OSC_PATH);
            assert_eq!(*path, world.osc_path);
        }
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

macro_rules! register_command_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/overlaps_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CommandWorld) {
            let _ = world;
        }
    };
}

register_command_scenario!(ingest_change_file, "ingesting a change file");
register_command_scenario!(nearby_changeset, "a changeset edited inside the area");
register_command_scenario!(
    distant_changeset,
    "a changeset edited on the other side of the world"
);
register_command_scenario!(malformed_area, "rejecting a malformed area");
register_command_scenario!(missing_change_file, "rejecting a missing change file");
