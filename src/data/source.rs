//! Marker data sources
//!
//! The controller only needs "give me the markers of this page"; where they
//! come from is up to the [`MarkerSource`] implementation.

use crate::{constants::API_CACHE_CAPACITY, data::payload::MarkerPayload, MapError, Result};
use async_trait::async_trait;
use lru::LruCache;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Shared HTTP client so that connection pools are reused across maps.
pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("datamaps/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            Client::new()
        })
});

/// What to fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerRequest {
    /// Page that holds the map definition
    pub page: String,
    /// Pin to a revision; latest if `None`
    pub revision: Option<u64>,
    /// Only markers tagged with one of these layers
    pub layers: Option<Vec<String>>,
}

impl MarkerRequest {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            revision: None,
            layers: None,
        }
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn with_layers(mut self, layers: Vec<String>) -> Self {
        self.layers = Some(layers);
        self
    }
}

/// Data-fetch collaborator
#[async_trait]
pub trait MarkerSource: Send + Sync {
    async fn fetch(&self, request: &MarkerRequest) -> Result<MarkerPayload>;
}

/// Serves a payload that is already in memory, e.g. embedded in the page
#[derive(Debug, Clone, Default)]
pub struct StaticMarkerSource {
    payload: MarkerPayload,
}

impl StaticMarkerSource {
    pub fn new(payload: MarkerPayload) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl MarkerSource for StaticMarkerSource {
    async fn fetch(&self, request: &MarkerRequest) -> Result<MarkerPayload> {
        Ok(match &request.layers {
            Some(layers) => self.payload.filtered(layers),
            None => self.payload.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    markers: MarkerPayload,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

/// Fetches markers from a MediaWiki API endpoint (`action=queryDataMap`).
///
/// Responses for revision-pinned requests never change, so they are kept in
/// an LRU cache.
pub struct ApiMarkerSource {
    endpoint: Url,
    cache: Mutex<LruCache<MarkerRequest, MarkerPayload>>,
}

impl ApiMarkerSource {
    /// `endpoint` is the wiki's `api.php` URL
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| MapError::InvalidConfig(format!("bad API endpoint {}: {}", endpoint, e)))?;
        let capacity = NonZeroUsize::new(API_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            endpoint,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Full request URL for a marker query
    pub fn request_url(&self, request: &MarkerRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("action", "queryDataMap")
                .append_pair("format", "json")
                .append_pair("formatversion", "2")
                .append_pair("title", &request.page);
            if let Some(revision) = request.revision {
                query.append_pair("revid", &revision.to_string());
            }
            if let Some(layers) = &request.layers {
                query.append_pair("layers", &layers.join("|"));
            }
        }
        url
    }

    /// Extracts the payload from an API response body
    pub fn parse_response(body: &str) -> Result<MarkerPayload> {
        let response: ApiResponse = serde_json::from_str(body)
            .map_err(|e| MapError::FetchFailed(format!("malformed API response: {}", e)))?;
        if let Some(error) = response.error {
            return Err(MapError::FetchFailed(format!("{}: {}", error.code, error.info)));
        }
        response
            .query
            .map(|query| query.markers)
            .ok_or_else(|| MapError::FetchFailed("API response has no marker data".to_string()))
    }

    fn cached(&self, request: &MarkerRequest) -> Option<MarkerPayload> {
        request.revision?;
        self.cache.lock().ok()?.get(request).cloned()
    }

    fn remember(&self, request: &MarkerRequest, payload: &MarkerPayload) {
        if request.revision.is_none() {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(request.clone(), payload.clone());
        }
    }
}

#[async_trait]
impl MarkerSource for ApiMarkerSource {
    async fn fetch(&self, request: &MarkerRequest) -> Result<MarkerPayload> {
        if let Some(payload) = self.cached(request) {
            log::debug!("marker cache hit for {} @ {:?}", request.page, request.revision);
            return Ok(payload);
        }

        let url = self.request_url(request);
        log::debug!("fetching markers from {}", url);
        let response = HTTP_CLIENT
            .get(url)
            .send()
            .await
            .map_err(|e| MapError::FetchFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MapError::FetchFailed(format!("HTTP {}", response.status())));
        }
        let body = response
            .text()
            .await
            .map_err(|e| MapError::FetchFailed(e.to_string()))?;

        let payload = Self::parse_response(&body)?;
        log::info!("fetched {} markers for {}", payload.len(), request.page);
        self.remember(request, &payload);
        Ok(payload)
    }
}
