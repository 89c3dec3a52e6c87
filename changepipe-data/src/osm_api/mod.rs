//! HTTP access to the OpenStreetMap API.
//!
//! This module provides [`HttpOsmApi`], an implementation of
//! [`changepipe_core::UpstreamGeoApi`] that reads changesets, nodes and ways
//! from an OSM API 0.6 endpoint using its JSON representation.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use changepipe_core::UpstreamGeoApi;
//! use changepipe_data::osm_api::{HttpOsmApi, OsmApiConfig};
//!
//! let config = OsmApiConfig::default()
//!     .with_timeout(Duration::from_secs(10))
//!     .with_user_agent("my-app/1.0");
//! let api = HttpOsmApi::with_config(config)?;
//!
//! let node = api.node(1)?;
//! println!("node 1 is at {:?}", node.point());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod client;
mod json;

pub use client::{ApiBuildError, DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpOsmApi, OsmApiConfig};
