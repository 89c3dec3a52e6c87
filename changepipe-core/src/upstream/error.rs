use thiserror::Error;

use crate::ElementKind;

/// Errors from [`crate::upstream::UpstreamGeoApi`] lookups.
///
/// Missing data is never reported here: a node without coordinates or a way
/// deleted at its current revision are ordinary return values. Everything
/// below aborts the overlap check that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The request exceeded its deadline.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The service answered with a non-success status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The request could not be delivered.
    #[error("network error while requesting {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Error description.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse response from {url}: {message}")]
    Parse {
        /// Requested URL.
        url: String,
        /// Decoder message.
        message: String,
    },
    /// A well-formed response did not contain the requested element.
    #[error("response did not contain {kind} {id}")]
    MissingElement {
        /// Kind of the requested element.
        kind: ElementKind,
        /// Identifier of the requested element.
        id: u64,
    },
    /// The response did not contain the requested changeset.
    #[error("response did not contain changeset {id}")]
    MissingChangeset {
        /// Identifier of the requested changeset.
        id: u64,
    },
}
