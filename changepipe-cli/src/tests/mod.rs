//! Shared test harness modules for the changepipe CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod helpers;
mod overlaps_steps;
mod overlaps_unit;
