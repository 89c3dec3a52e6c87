//! Reader for osmChange documents.
//!
//! An osmChange file groups element states under `create`, `modify` and
//! `delete` blocks. Every element also names the changeset that made the
//! change, which is what lets the geometry cache answer "which elements did
//! this changeset touch?".
//!
//! Elements with missing or malformed `id`, `version` or `changeset`
//! attributes are skipped with a warning; a document that is not XML, or
//! whose root is not `osmChange`, is an error.

use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use changepipe_core::{ChangeAction, ChangedElement, ChangesetId, ElementChange, NodeRecord, WayRecord};
use changepipe_fs::read_utf8_to_string;
use log::warn;
use roxmltree::{Document, Node};
use thiserror::Error;

/// Errors returned when reading an osmChange document.
#[derive(Debug, Error)]
pub enum OsmChangeError {
    /// The file could not be read.
    #[error("failed to read osmChange file at {path}")]
    Read {
        /// Location of the file.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not well-formed XML.
    #[error("failed to parse osmChange XML: {0}")]
    Xml(#[from] roxmltree::Error),
    /// The document root is not `osmChange`.
    #[error("expected an osmChange root element, found {0:?}")]
    UnexpectedRoot(String),
}

/// Why a single element was skipped.
#[derive(Debug, Error, PartialEq, Eq)]
enum Malformed {
    #[error("missing {0} attribute")]
    Missing(&'static str),
    #[error("invalid {name} attribute {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Read and parse the osmChange file at `path`.
///
/// # Errors
///
/// Returns [`OsmChangeError`] if the file cannot be read or parsed.
pub fn read_osm_change(path: &Utf8Path) -> Result<Vec<ChangedElement>, OsmChangeError> {
    let text = read_utf8_to_string(path).map_err(|source| OsmChangeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_osm_change(&text)
}

/// Parse an osmChange document held in memory.
///
/// Elements are returned in document order. Relations are kept with their
/// identity only.
///
/// # Examples
///
/// ```
/// use changepipe_core::{ChangeAction, ElementChange, NodeRecord};
/// use changepipe_data::osm_change::parse_osm_change;
///
/// let xml = r#"<osmChange version="0.6">
///   <create>
///     <node id="1" version="1" changeset="42" lat="51.5" lon="-0.1"/>
///   </create>
/// </osmChange>"#;
///
/// let changes = parse_osm_change(xml)?;
/// assert_eq!(changes[0].action, ChangeAction::Create);
/// assert_eq!(changes[0].change, ElementChange::Node(NodeRecord::new(1, 1, 51.5, -0.1)));
/// # Ok::<(), changepipe_data::osm_change::OsmChangeError>(())
/// ```
///
/// # Errors
///
/// Returns [`OsmChangeError`] if the text is not an osmChange document.
pub fn parse_osm_change(text: &str) -> Result<Vec<ChangedElement>, OsmChangeError> {
    let document = Document::parse(text)?;
    let root = document.root_element();
    if root.tag_name().name() != "osmChange" {
        return Err(OsmChangeError::UnexpectedRoot(
            root.tag_name().name().to_owned(),
        ));
    }

    let mut elements = Vec::new();
    for block in root.children().filter(Node::is_element) {
        let Some(action) = action_of(block.tag_name().name()) else {
            continue;
        };
        for element in block.children().filter(Node::is_element) {
            match changed_element(element, action) {
                Ok(Some(changed)) => elements.push(changed),
                Ok(None) => {}
                Err(reason) => warn!(
                    "skipping {} at byte {}: {reason}",
                    element.tag_name().name(),
                    element.range().start
                ),
            }
        }
    }
    Ok(elements)
}

fn action_of(tag: &str) -> Option<ChangeAction> {
    match tag {
        "create" => Some(ChangeAction::Create),
        "modify" => Some(ChangeAction::Modify),
        "delete" => Some(ChangeAction::Delete),
        _ => None,
    }
}

fn changed_element(
    element: Node<'_, '_>,
    action: ChangeAction,
) -> Result<Option<ChangedElement>, Malformed> {
    let tag = element.tag_name().name();
    if !matches!(tag, "node" | "way" | "relation") {
        return Ok(None);
    }
    let id = required(element, "id")?;
    let version = required(element, "version")?;
    let changeset = ChangesetId(required(element, "changeset")?);

    let change = match tag {
        "node" => ElementChange::Node(NodeRecord {
            id,
            version,
            lat: optional(element, "lat")?,
            lon: optional(element, "lon")?,
        }),
        "way" => ElementChange::Way(WayRecord::new(id, version, node_refs(element)?)),
        _ => ElementChange::Relation { id, version },
    };
    Ok(Some(ChangedElement {
        action,
        changeset,
        change,
    }))
}

fn node_refs(way: Node<'_, '_>) -> Result<Vec<u64>, Malformed> {
    way.children()
        .filter(|child| child.has_tag_name("nd"))
        .map(|nd| required(nd, "ref"))
        .collect()
}

fn required<T: FromStr>(element: Node<'_, '_>, name: &'static str) -> Result<T, Malformed> {
    optional(element, name)?.ok_or(Malformed::Missing(name))
}

fn optional<T: FromStr>(element: Node<'_, '_>, name: &'static str) -> Result<Option<T>, Malformed> {
    element
        .attribute(name)
        .map(|raw| {
            raw.parse().map_err(|_| Malformed::Invalid {
                name,
                value: raw.to_owned(),
            })
        })
        .transpose()
}
