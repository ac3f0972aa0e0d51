//! HTTP client for the dashboard backend.
//!
//! Every call is a fresh round trip; nothing is cached. Errors are mapped to
//! the four client-side kinds: transport (no response), server (non-2xx),
//! validation (refused locally) and malformed (unexpected body).

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sigdash_core::{
    CollectionSettings, FilterCriteria, PageEnvelope, Signal, SignalPage, StoredSettings,
};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::types::{ApiMessage, ChartData, ChartEnvelope, DashboardStats, SelectOptions};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which signal listing endpoint to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStyle {
    /// `POST /api/signals/list`, 1-based page, answers `{content, totalPages}`.
    #[default]
    Body,
    /// `GET /api/signals?page=..`, 0-based page, answers `{content, totalElements}`.
    Query,
}

/// Body of `POST /api/signals/list`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignalListRequest<'a> {
    #[serde(flatten)]
    filter: &'a FilterCriteria,
    /// 1-based.
    page: u32,
    size: u32,
}

/// Client for the dashboard REST API.
#[derive(Debug, Clone)]
pub struct DashboardApi {
    /// HTTP client.
    pub(crate) client: Client,
    /// Base URL without trailing slash (e.g., "http://localhost:8080").
    base_url: String,
    /// Signal listing endpoint flavour.
    listing: ListingStyle,
}

impl DashboardApi {
    /// Create a new client with the default timeout.
    ///
    /// # Arguments
    /// * `base_url` - backend origin (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new client with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            listing: ListingStyle::default(),
        })
    }

    /// Select the signal listing endpoint.
    #[must_use]
    pub fn with_listing(mut self, listing: ListingStyle) -> Self {
        self.listing = listing;
        self
    }

    pub fn listing(&self) -> ListingStyle {
        self.listing
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    /// Send a request and return the response if the status is 2xx.
    pub(crate) async fn send(&self, request: RequestBuilder, what: &str) -> ClientResult<Response> {
        let response = request.send().await.map_err(|e| {
            warn!(request = what, error = %e, "Request failed without response");
            ClientError::Transport(format!("{what}: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .ok()
            .and_then(|m| m.text().map(str::to_string))
            .unwrap_or(body);
        warn!(request = what, status = status.as_u16(), %message, "Server rejected request");

        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Send a request and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> ClientResult<T> {
        let response = self.send(request, what).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("{what}: failed to read body: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Malformed(format!("{what}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send_json(self.client.get(self.url(path)), path).await
    }

    // ------------------------------------------------------------------
    // Settings and options
    // ------------------------------------------------------------------

    /// Fetch the stored collection settings as-is (fields may be missing).
    pub async fn load_settings(&self) -> ClientResult<StoredSettings> {
        debug!("Loading collection settings");
        let path = "/api/getSettings";
        let response = self.send(self.client.get(self.url(path)), path).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("{path}: failed to read body: {e}")))?;

        // Empty body or `null` before the first save.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoredSettings::default());
        }
        let stored: Option<StoredSettings> = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Malformed(format!("{path}: {e}")))?;
        Ok(stored.unwrap_or_default())
    }

    /// Persist settings. Invariants are checked first; nothing is sent when
    /// they fail.
    pub async fn save_settings(&self, settings: &CollectionSettings) -> ClientResult<()> {
        settings.validate()?;

        let request = self.client.post(self.url("/api/saveSettings")).json(settings);
        self.send(request, "/api/saveSettings").await?;

        info!(
            mode = %settings.crypto_mode,
            coins = settings.crypto_symbols.len(),
            exchanges = settings.exchange_types.len(),
            proxies = settings.proxies.len(),
            fetch_frequency = settings.fetch_frequency_minutes,
            "Saved collection settings"
        );
        Ok(())
    }

    /// Fetch dropdown options (exchanges, strategy names, default coins).
    pub async fn select_options(&self) -> ClientResult<SelectOptions> {
        self.get_json("/api/select-options").await
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    /// Fetch one page of signals (`page` is 1-based) and normalise the
    /// envelope.
    pub async fn signal_page(
        &self,
        filter: &FilterCriteria,
        page: u32,
        page_size: u32,
    ) -> ClientResult<SignalPage> {
        if page_size == 0 {
            return Err(ClientError::Validation("page size must be positive".to_string()));
        }
        filter.validate()?;
        let page = page.max(1);

        let envelope: PageEnvelope = match self.listing {
            ListingStyle::Body => {
                let body = SignalListRequest {
                    filter,
                    page,
                    size: page_size,
                };
                let request = self.client.post(self.url("/api/signals/list")).json(&body);
                self.send_json(request, "/api/signals/list").await?
            }
            ListingStyle::Query => {
                let mut query = vec![
                    ("page", (page - 1).to_string()),
                    ("size", page_size.to_string()),
                ];
                query.extend(filter.query_pairs());
                let request = self.client.get(self.url("/api/signals")).query(&query);
                self.send_json(request, "/api/signals").await?
            }
        };

        let page = envelope.into_page(page, page_size)?;
        debug!(
            listing = ?self.listing,
            page = page.current_page(),
            total_pages = page.total_pages(),
            items = page.items().len(),
            "Fetched signal page"
        );
        Ok(page)
    }

    /// Fetch the most recent `limit` signals, unaffected by any filter.
    pub async fn latest_signals(&self, limit: u32) -> ClientResult<Vec<Signal>> {
        let request = self
            .client
            .get(self.url("/api/dashboard/latest-signals"))
            .query(&[("limit", limit)]);
        self.send_json(request, "/api/dashboard/latest-signals").await
    }

    // ------------------------------------------------------------------
    // Dashboard
    // ------------------------------------------------------------------

    pub async fn dashboard_stats(&self) -> ClientResult<DashboardStats> {
        self.get_json("/api/dashboard/stats").await
    }

    /// Fetch the monthly buy/sell series.
    pub async fn dashboard_chart(&self) -> ClientResult<ChartData> {
        let envelope: ChartEnvelope = self.get_json("/api/dashboard/chart").await?;
        let chart = envelope
            .chart_data
            .ok_or_else(|| ClientError::Malformed("chart response has no chartData".to_string()))?;

        if !chart.is_consistent() {
            return Err(ClientError::Malformed(format!(
                "chart has {} labels but {} buy and {} sell points",
                chart.labels.len(),
                chart.buy_data.len(),
                chart.sell_data.len()
            )));
        }
        Ok(chart)
    }
}
