//! Focused unit tests covering overlaps CLI configuration and execution.

use super::helpers::{CHANGES, CacheOnlyBuilder, workspace, write_utf8};
use super::*;
use crate::ingest::{IngestConfig, execute_ingest};
use crate::overlaps::{
    OverlapReport, OverlapsArgs, OverlapsConfig, execute_overlaps, parse_area,
};
use camino::Utf8PathBuf;
use changepipe_core::ChangesetId;
use changepipe_data::osm_api::DEFAULT_BASE_URL;
use geo::{Rect, coord};
use rstest::rstest;
use std::time::Duration;

fn complete_args() -> OverlapsArgs {
    OverlapsArgs {
        changeset: Some(5001),
        area: Some("-0.2,51.45,-0.1,51.55".to_owned()),
        ..OverlapsArgs::default()
    }
}

#[rstest]
#[case::changeset(ARG_OVERLAPS_CHANGESET, ENV_OVERLAPS_CHANGESET)]
#[case::area(ARG_OVERLAPS_AREA, ENV_OVERLAPS_AREA)]
fn converting_overlaps_without_required_values_errors(
    #[case] expected_field: &'static str,
    #[case] expected_env: &'static str,
) {
    let mut args = complete_args();
    if expected_field == ARG_OVERLAPS_CHANGESET {
        args.changeset = None;
    } else {
        args.area = None;
    }

    match OverlapsConfig::try_from(args) {
        Err(CliError::MissingArgument { field, env }) => {
            assert_eq!(field, expected_field);
            assert_eq!(env, expected_env);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn overlaps_config_applies_defaults() {
    let config = OverlapsConfig::try_from(complete_args()).expect("config should build");

    assert_eq!(config.changeset, ChangesetId(5001));
    assert_eq!(
        config.area,
        Rect::new(coord! { x: -0.2, y: 51.45 }, coord! { x: -0.1, y: 51.55 })
    );
    assert_eq!(config.cache_db, Utf8PathBuf::from(DEFAULT_CACHE_DB));
    assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
    assert_eq!(config.near_margin, 5.0);
    assert_eq!(config.cache_ttl, Duration::from_secs(3600));
}

#[rstest]
#[case(-1.0)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn overlaps_config_rejects_unusable_margins(#[case] margin: f64) {
    let args = OverlapsArgs {
        near_margin: Some(margin),
        ..complete_args()
    };

    assert!(matches!(
        OverlapsConfig::try_from(args),
        Err(CliError::InvalidMargin(_))
    ));
}

#[rstest]
#[case("-0.2,51.45,-0.1,51.55", -0.2, 51.45, -0.1, 51.55)]
#[case(" 10 , 20 , 10 , 20 ", 10.0, 20.0, 10.0, 20.0)]
fn parses_valid_areas(
    #[case] raw: &str,
    #[case] min_lon: f64,
    #[case] min_lat: f64,
    #[case] max_lon: f64,
    #[case] max_lat: f64,
) {
    assert_eq!(
        parse_area(raw).expect("valid area"),
        Rect::new(
            coord! { x: min_lon, y: min_lat },
            coord! { x: max_lon, y: max_lat }
        )
    );
}

#[rstest]
#[case::too_few("1,2,3")]
#[case::too_many("1,2,3,4,5")]
#[case::not_numbers("west,south,east,north")]
#[case::not_finite("1,2,inf,4")]
#[case::inverted("3,2,1,4")]
#[case::empty("")]
fn rejects_invalid_areas(#[case] raw: &str) {
    match parse_area(raw) {
        Err(CliError::InvalidArea { value, .. }) => assert_eq!(value, raw),
        other => panic!("expected InvalidArea, found {other:?}"),
    }
}

#[rstest]
#[case::nearby(5001, true)]
#[case::distant(5002, false)]
fn execute_overlaps_answers_from_ingested_cache(#[case] changeset: u64, #[case] expected: bool) {
    let (_tmp, root) = workspace();
    let osc_path = root.join("changes.osc");
    write_utf8(&osc_path, CHANGES.as_bytes());
    let cache_db = root.join("cache.db");
    execute_ingest(&IngestConfig {
        osc_path,
        cache_db: cache_db.clone(),
        cache_ttl: Duration::from_secs(3600),
    })
    .expect("ingest succeeds");

    let config = OverlapsConfig {
        changeset: ChangesetId(changeset),
        cache_db,
        ..OverlapsConfig::try_from(complete_args()).expect("config should build")
    };
    let report = execute_overlaps(&config, &CacheOnlyBuilder).expect("check succeeds");

    assert_eq!(
        report,
        OverlapReport {
            changeset: ChangesetId(changeset),
            overlaps: expected,
        }
    );
}

#[rstest]
fn execute_overlaps_surfaces_upstream_failures() {
    let (_tmp, root) = workspace();
    let config = OverlapsConfig {
        cache_db: root.join("empty.db"),
        ..OverlapsConfig::try_from(complete_args()).expect("config should build")
    };

    match execute_overlaps(&config, &CacheOnlyBuilder) {
        Err(CliError::Overlap(_)) => {}
        other => panic!("expected Overlap error, found {other:?}"),
    }
}
