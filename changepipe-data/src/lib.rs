//! Data access adapters for the changepipe engine.
//!
//! Responsibilities:
//! - Fetch authoritative element data from the OSM API ([`osm_api`]).
//! - Read osmChange documents into change records ([`osm_change`]).
//!
//! Boundaries:
//! - Do not encode domain rules (live in `changepipe-core`).
//! - Keep blocking I/O off async executors.

#![forbid(unsafe_code)]

pub mod osm_api;
pub mod osm_change;
