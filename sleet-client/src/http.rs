//! Low-level HTTP access: URL construction, discovery fetches, CDN
//! object fetches with optional byte ranges.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use sleet_types::{CdnHash, CdnInfo, ContentType, ProgramCode, Region, VersionInfo};

use crate::error::{Error, Result};
use crate::response_types;

/// Domain of the region-prefixed discovery servers.
const PATCH_SERVER_DOMAIN: &str = "patch.example";
/// Port the discovery servers listen on.
const PATCH_SERVER_PORT: u16 = 1119;

/// Default maximum retries for transient failures
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial backoff in milliseconds
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;

/// Default maximum backoff in milliseconds
const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

/// Default backoff multiplier
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default jitter factor (0.0 to 1.0)
const DEFAULT_JITTER_FACTOR: f64 = 0.1;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout; downloads of large archives are slow
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Build the URL of a CDN object.
///
/// Objects fan out over two directory levels taken from the first four
/// hex digits of the hash:
/// `http://{host}/{path}/{content_type}/{hh}/{ii}/{hex}{suffix}`.
/// Always uses the first listed mirror host.
pub fn cdn_url(cdn: &CdnInfo, content_type: ContentType, hash: &CdnHash, suffix: &str) -> String {
    let hex = hash.to_string();
    format!(
        "http://{}/{}/{}/{}/{}/{}{}",
        cdn.hosts[0],
        cdn.path,
        content_type,
        &hex[0..2],
        &hex[2..4],
        hex,
        suffix,
    )
}

/// HTTP client for the delivery network.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct CdnClient {
    client: Client,
    /// Discovery base override (scheme + authority); tests point this at
    /// a local server. `None` uses the region-prefixed production hosts.
    patch_base: Option<String>,
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

/// Builder for [`CdnClient`].
#[derive(Debug, Clone)]
pub struct CdnClientBuilder {
    patch_base: Option<String>,
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
    connect_timeout: Duration,
    request_timeout: Duration,
    user_agent: Option<String>,
}

impl Default for CdnClientBuilder {
    fn default() -> Self {
        Self {
            patch_base: None,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
        }
    }
}

impl CdnClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point discovery requests at `base` (e.g. `http://127.0.0.1:8080`)
    /// instead of the region-prefixed production servers.
    pub fn patch_base(mut self, base: impl Into<String>) -> Self {
        self.patch_base = Some(base.into());
        self
    }

    /// Maximum retries for connect failures, timeouts and 5xx answers.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn initial_backoff_ms(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    pub fn max_backoff_ms(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<CdnClient> {
        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .pool_max_idle_per_host(20);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        Ok(CdnClient {
            client: builder.build()?,
            patch_base: self.patch_base,
            max_retries: self.max_retries,
            initial_backoff_ms: self.initial_backoff_ms,
            max_backoff_ms: self.max_backoff_ms,
            backoff_multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
        })
    }
}

impl CdnClient {
    /// Create a client with default configuration.
    pub fn new() -> Result<Self> {
        CdnClientBuilder::new().build()
    }

    pub fn builder() -> CdnClientBuilder {
        CdnClientBuilder::new()
    }

    /// URL of a discovery endpoint (`cdns` or `versions`).
    fn patch_url(&self, program: &ProgramCode, region: &Region, endpoint: &str) -> String {
        match &self.patch_base {
            Some(base) => format!("{base}/{program}/{endpoint}"),
            None => format!(
                "http://{region}.{PATCH_SERVER_DOMAIN}:{PATCH_SERVER_PORT}/{program}/{endpoint}"
            ),
        }
    }

    /// Backoff before retry `attempt`, with jitter.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff_ms as f64);

        let jitter_range = capped * self.jitter_factor;
        let jitter = rand::random::<f64>() * 2.0 * jitter_range - jitter_range;
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    /// Send a request, retrying transient failures, racing against the
    /// cancellation token, and checking the status code.
    async fn execute(
        &self,
        url: &str,
        range: Option<(u32, u32)>,
        wanted: StatusCode,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.calculate_backoff(attempt - 1);
                debug!("retry attempt {attempt} after {backoff:?} backoff");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Canceled),
                    _ = sleep(backoff) => {}
                }
            }

            let mut request: RequestBuilder = self.client.get(url);
            if let Some((start, end)) = range {
                request = request.header("Range", format!("bytes={start}-{end}"));
            }

            debug!("GET {url} (attempt {})", attempt + 1);
            let sent = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Canceled),
                sent = request.send() => sent,
            };

            match sent {
                Ok(response) => {
                    let status = response.status();
                    trace!("response status {status} for {url}");

                    if status == wanted {
                        return Ok(response);
                    }

                    let retryable =
                        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    let err = Error::BadStatus {
                        status,
                        wanted,
                        url: url.to_string(),
                    };
                    if retryable && attempt < self.max_retries {
                        warn!("request to {url} returned {status}, will retry");
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let retryable = e.is_connect() || e.is_timeout() || e.is_request();
                    if retryable && attempt < self.max_retries {
                        warn!("request to {url} failed (attempt {}): {e}", attempt + 1);
                        last_error = Some(Error::Http(e));
                        continue;
                    }
                    return Err(Error::Http(e));
                }
            }
        }

        // Only reachable when every attempt failed with a retryable
        // error.
        Err(last_error.unwrap_or(Error::Canceled))
    }

    /// Fetch a whole CDN object. Expects `200 OK`.
    pub async fn get(
        &self,
        cdn: &CdnInfo,
        content_type: ContentType,
        hash: &CdnHash,
        suffix: &str,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let url = cdn_url(cdn, content_type, hash, suffix);
        self.execute(&url, None, StatusCode::OK, cancel).await
    }

    /// Fetch `size` bytes at `offset` inside a CDN object. Expects
    /// `206 Partial Content`.
    pub async fn get_range(
        &self,
        cdn: &CdnInfo,
        content_type: ContentType,
        hash: &CdnHash,
        offset: u32,
        size: u32,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let url = cdn_url(cdn, content_type, hash, "");
        self.execute(
            &url,
            Some((offset, offset + size)),
            StatusCode::PARTIAL_CONTENT,
            cancel,
        )
        .await
    }

    /// Fetch and parse the `cdns` discovery table.
    pub async fn cdns(
        &self,
        program: &ProgramCode,
        region: &Region,
        cancel: &CancellationToken,
    ) -> Result<Vec<CdnInfo>> {
        let url = self.patch_url(program, region, "cdns");
        let response = self.execute(&url, None, StatusCode::OK, cancel).await?;
        let body = read_text(response, cancel).await?;
        response_types::parse_cdns(&body)
    }

    /// Fetch and parse the `versions` discovery table.
    pub async fn versions(
        &self,
        program: &ProgramCode,
        region: &Region,
        cancel: &CancellationToken,
    ) -> Result<Vec<VersionInfo>> {
        let url = self.patch_url(program, region, "versions");
        let response = self.execute(&url, None, StatusCode::OK, cancel).await?;
        let body = read_text(response, cancel).await?;
        response_types::parse_versions(&body)
    }

    /// Fetch both discovery tables concurrently and select the rows for
    /// `region`.
    pub async fn info(
        &self,
        program: &ProgramCode,
        region: &Region,
        cancel: &CancellationToken,
    ) -> Result<(CdnInfo, VersionInfo)> {
        let (cdns, versions) = tokio::try_join!(
            self.cdns(program, region, cancel),
            self.versions(program, region, cancel),
        )?;

        let unknown = || Error::UnknownRegion {
            region: region.to_string(),
        };
        let cdn = cdns
            .into_iter()
            .find(|c| c.name == *region)
            .ok_or_else(unknown)?;
        let version = versions
            .into_iter()
            .find(|v| v.region == *region)
            .ok_or_else(unknown)?;

        Ok((cdn, version))
    }
}

/// Drain a response body, racing against cancellation.
pub async fn read_body(response: Response, cancel: &CancellationToken) -> Result<Bytes> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Canceled),
        body = response.bytes() => Ok(body?),
    }
}

/// Drain a response body as text, racing against cancellation.
pub async fn read_text(response: Response, cancel: &CancellationToken) -> Result<String> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Canceled),
        body = response.text() => Ok(body?),
    }
}
