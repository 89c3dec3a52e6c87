//! Test helpers for writing CLI inputs into temporary workspaces.

use camino::{Utf8Path, Utf8PathBuf};
use changepipe_core::OverlapCheck;
use changepipe_core::SqliteGeometryCache;
use changepipe_core::test_support::StubUpstream;
use changepipe_core::OverlapDetector;
use tempfile::TempDir;

use crate::CliError;
use crate::overlaps::{OverlapCheckBuilder, OverlapsConfig};

/// Two changesets: 5001 edits around Westminster, 5002 adds a node in
/// Sydney and deletes a relation.
pub(super) const CHANGES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osmChange version="0.6" generator="changepipe tests">
  <create>
    <node id="101" version="1" changeset="5001" lat="51.5007" lon="-0.1246"/>
    <node id="102" version="1" changeset="5001" lat="51.5010" lon="-0.1240"/>
    <way id="201" version="1" changeset="5001">
      <nd ref="101"/>
      <nd ref="102"/>
    </way>
    <node id="301" version="1" changeset="5002" lat="-33.8568" lon="151.2153"/>
  </create>
  <delete>
    <relation id="401" version="2" changeset="5002"/>
  </delete>
</osmChange>
"#;

pub(super) fn workspace() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write file");
}

/// Opens the configured SQLite cache but answers every upstream request
/// with an error, so a successful check proves the cache was enough.
pub(super) struct CacheOnlyBuilder;

impl OverlapCheckBuilder for CacheOnlyBuilder {
    fn build(&self, config: &OverlapsConfig) -> Result<Box<dyn OverlapCheck>, CliError> {
        let cache = SqliteGeometryCache::open(config.cache_db.as_std_path(), config.cache_ttl)
            .map_err(CliError::OpenCache)?;
        Ok(Box::new(
            OverlapDetector::new(cache, StubUpstream::default()).with_margin(config.near_margin),
        ))
    }
}
