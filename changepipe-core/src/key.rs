//! Structured identifiers for cached elements and changesets.
//!
//! Keys render to the `kind-id` strings used by the original cache layout
//! (`node-42`, `way-7`, `relation-3`, `changeset-9`). The rendered form is
//! also the sort key used when iterating changeset members, so the order in
//! which members are examined stays stable across cache backends.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Kind of OSM element referenced by a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered list of node references.
    Way,
    /// A grouping of other elements.
    Relation,
}

impl ElementKind {
    /// Prefix used when rendering keys of this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Key of an element touched by a changeset.
///
/// # Examples
///
/// ```
/// use changepipe_core::ElementKey;
///
/// let key: ElementKey = "way-42".parse()?;
/// assert_eq!(key, ElementKey::Way(42));
/// assert_eq!(key.to_string(), "way-42");
/// # Ok::<(), changepipe_core::ParseKeyError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKey {
    /// Key of a node.
    Node(u64),
    /// Key of a way.
    Way(u64),
    /// Key of a relation.
    Relation(u64),
}

impl ElementKey {
    /// Build a key from its kind and identifier.
    #[must_use]
    pub const fn new(kind: ElementKind, id: u64) -> Self {
        match kind {
            ElementKind::Node => Self::Node(id),
            ElementKind::Way => Self::Way(id),
            ElementKind::Relation => Self::Relation(id),
        }
    }

    /// Kind of element this key refers to.
    #[must_use]
    pub const fn kind(self) -> ElementKind {
        match self {
            Self::Node(_) => ElementKind::Node,
            Self::Way(_) => ElementKind::Way,
            Self::Relation(_) => ElementKind::Relation,
        }
    }

    /// Numeric identifier of the element.
    #[must_use]
    pub const fn id(self) -> u64 {
        match self {
            Self::Node(id) | Self::Way(id) | Self::Relation(id) => id,
        }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind(), self.id())
    }
}

/// Errors returned when parsing a rendered key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
    /// The key did not contain a `-` separator.
    #[error("key {0:?} is missing the kind separator")]
    MissingSeparator(String),
    /// The prefix did not name a known element kind.
    #[error("key {0:?} has an unknown element kind")]
    UnknownKind(String),
    /// The identifier was not an unsigned integer.
    #[error("key {0:?} has a malformed identifier")]
    InvalidId(String),
}

impl FromStr for ElementKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, raw_id) = s
            .split_once('-')
            .ok_or_else(|| ParseKeyError::MissingSeparator(s.to_owned()))?;
        let kind = match prefix {
            "node" => ElementKind::Node,
            "way" => ElementKind::Way,
            "relation" => ElementKind::Relation,
            _ => return Err(ParseKeyError::UnknownKind(s.to_owned())),
        };
        let id = raw_id
            .parse::<u64>()
            .map_err(|_| ParseKeyError::InvalidId(s.to_owned()))?;
        Ok(Self::new(kind, id))
    }
}

/// Identifier of a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ChangesetId(pub u64);

impl ChangesetId {
    /// Raw numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "changeset-{}", self.0)
    }
}
