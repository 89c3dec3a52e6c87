//! Blocking OSM API 0.6 client built on `reqwest`.
//!
//! The [`UpstreamGeoApi`] trait is synchronous so the core crate stays usable
//! from plain threads. The client bridges to async HTTP by blocking on a
//! Tokio runtime it owns.

use std::future::Future;
use std::time::Duration;

use changepipe_core::{
    ChangesetId, ElementKind, FullWay, NodeRecord, UpstreamError, UpstreamGeoApi, WayRecord,
};
use geo::Rect;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::json::{ChangesetDocument, ElementsDocument, missing};

/// Public OpenStreetMap API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openstreetmap.org/api/0.6";

/// Default user agent for API requests.
pub const DEFAULT_USER_AGENT: &str = "changepipe/0.1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while constructing an [`HttpOsmApi`].
#[derive(Debug, Error)]
pub enum ApiBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Configuration for [`HttpOsmApi`].
#[derive(Debug, Clone)]
pub struct OsmApiConfig {
    /// API root including the version segment, e.g.
    /// `"https://api.openstreetmap.org/api/0.6"`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for OsmApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OsmApiConfig {
    /// Create a configuration for the API rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// [`UpstreamGeoApi`] backed by the OSM API's JSON representation.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime, requests run on the client's own
/// current-thread runtime. Inside a multi-threaded runtime, the caller's
/// handle is used through [`tokio::task::block_in_place`]. Inside a
/// current-thread runtime the client falls back to its own runtime, which
/// can deadlock if the request depends on IO driven by the caller's runtime.
pub struct HttpOsmApi {
    client: Client,
    config: OsmApiConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpOsmApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOsmApi")
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl HttpOsmApi {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiBuildError> {
        Self::with_config(OsmApiConfig::new(base_url))
    }

    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: OsmApiConfig) -> Result<Self, ApiBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ApiBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ApiBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &OsmApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn changeset_url(&self, changeset: ChangesetId) -> String {
        self.url(&format!("changeset/{}.json", changeset.get()))
    }

    fn node_url(&self, id: u64) -> String {
        self.url(&format!("node/{id}.json"))
    }

    fn full_way_url(&self, id: u64) -> String {
        self.url(&format!("way/{id}/full.json"))
    }

    fn way_version_url(&self, id: u64, version: u64) -> String {
        self.url(&format!("way/{id}/{version}.json"))
    }

    fn nodes_url(&self, ids: &[u64]) -> String {
        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.url(&format!("nodes.json?nodes={joined}"))
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }

    /// Fetch `url`, returning `None` when the element is gone (`410 Gone`).
    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, UpstreamError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        if response.status() == StatusCode::GONE {
            debug!("{url} is gone");
            return Ok(None);
        }
        let body = response
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        body.json::<T>()
            .await
            .map(Some)
            .map_err(|err| UpstreamError::Parse {
                url: url.to_owned(),
                message: err.to_string(),
            })
    }

    /// Fetch `url`, treating `410 Gone` like any other failure status.
    async fn fetch_present<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        self.fetch(url).await?.ok_or_else(|| UpstreamError::Http {
            url: url.to_owned(),
            status: StatusCode::GONE.as_u16(),
            message: "element is gone".to_owned(),
        })
    }

    /// Convert a reqwest error to an [`UpstreamError`].
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> UpstreamError {
        if error.is_timeout() {
            return UpstreamError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return UpstreamError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        if error.is_decode() {
            return UpstreamError::Parse {
                url: url.to_owned(),
                message: error.to_string(),
            };
        }
        UpstreamError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl UpstreamGeoApi for HttpOsmApi {
    fn changeset_bounds(&self, changeset: ChangesetId) -> Result<Option<Rect<f64>>, UpstreamError> {
        let url = self.changeset_url(changeset);
        let document: ChangesetDocument = self.block_on(self.fetch_present(&url))?;
        if document.changeset.id != changeset.get() {
            return Err(UpstreamError::MissingChangeset {
                id: changeset.get(),
            });
        }
        Ok(document.changeset.bounds())
    }

    /// A node answered with `410 Gone` is returned without location and with
    /// version `0`, since the API does not report the deleting version.
    fn node(&self, id: u64) -> Result<NodeRecord, UpstreamError> {
        let url = self.node_url(id);
        let Some(document) = self.block_on(self.fetch::<ElementsDocument>(&url))? else {
            return Ok(NodeRecord::without_location(id, 0));
        };
        document
            .into_node(id)
            .ok_or_else(|| missing(ElementKind::Node, id))
    }

    fn full_way(&self, id: u64) -> Result<Option<FullWay>, UpstreamError> {
        let url = self.full_way_url(id);
        let Some(document) = self.block_on(self.fetch::<ElementsDocument>(&url))? else {
            return Ok(None);
        };
        document
            .into_full_way(id)
            .map(Some)
            .ok_or_else(|| missing(ElementKind::Way, id))
    }

    fn way_version(&self, id: u64, version: u64) -> Result<WayRecord, UpstreamError> {
        let url = self.way_version_url(id, version);
        let document: ElementsDocument = self.block_on(self.fetch_present(&url))?;
        document
            .into_way(id)
            .ok_or_else(|| missing(ElementKind::Way, id))
    }

    fn nodes(&self, ids: &[u64]) -> Result<Vec<NodeRecord>, UpstreamError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.nodes_url(ids);
        let document: ElementsDocument = self.block_on(self.fetch_present(&url))?;
        Ok(document.into_nodes())
    }
}
