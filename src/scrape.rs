//! The scrape module fetches a single trail-detail page and stores the parsed
//! trail in the session database.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use url::Url;

use crate::constants::{BROWSER_HEADERS, USER_AGENTS};
use crate::error::{FetchError, ParseError};
use crate::parse::{clean_location, parse_trail};
use crate::storage::Storage;
use crate::trail::TrailRecord;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Why a request produced no response at all.
#[derive(Debug, Clone)]
pub enum TransportError {
    Timeout,
    Connection(String),
}

/// Issues the actual GET request. Implemented over reqwest for real use.
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response arrives at all. Error
    /// statuses are responses, not errors.
    async fn get(&self, url: &Url, user_agent: &str)
    -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a reqwest client with browser-like default headers.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in BROWSER_HEADERS {
            headers.insert(
                HeaderName::from_static(*name),
                HeaderValue::from_static(*value),
            );
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &Url,
        user_agent: &str,
    ) -> Result<TransportResponse, TransportError> {
        let classify = |error: reqwest::Error| {
            if error.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(error.to_string())
            }
        };

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(TransportResponse { status, body })
    }
}

/// Retry and validation settings for [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Total number of requests made before giving up.
    pub max_attempts: u32,
    /// Delay before retry `n` is `base_delay * n` plus jitter.
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to every delay.
    pub jitter: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Accepted host suffixes; empty accepts any host.
    pub allowed_hosts: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            jitter: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            allowed_hosts: vec!["alltrails.com".to_string()],
        }
    }
}

/// Fetches trail-detail pages with user-agent rotation and incremental backoff.
pub struct Fetcher {
    transport: Box<dyn Transport>,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(transport: Box<dyn Transport>, config: FetchConfig) -> Self {
        Self { transport, config }
    }

    /// Creates a fetcher that talks to the network through reqwest.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_reqwest(config: FetchConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::new(Box::new(transport), config))
    }

    /// Checks that `input` is an http(s) URL on an accepted host.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when the scheme, host or allow-list check fails.
    pub fn validate_url(&self, input: &str) -> Result<Url, FetchError> {
        let invalid = |reason: &str| FetchError::InvalidUrl {
            url: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        let host = url
            .host_str()
            .ok_or_else(|| invalid("URL has no host"))?
            .to_lowercase();

        let allowed = self.config.allowed_hosts.is_empty()
            || self.config.allowed_hosts.iter().any(|suffix| {
                let suffix = suffix.to_lowercase();
                host == suffix || host.ends_with(&format!(".{suffix}"))
            });
        if !allowed {
            return Err(invalid(&format!(
                "host must be one of: {}",
                self.config.allowed_hosts.join(", ")
            )));
        }

        Ok(url)
    }

    /// Downloads the page at `input`, retrying on 403/429, timeouts and
    /// connection failures.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] before any request for bad input,
    /// [`FetchError::Http`] immediately for other error statuses, and
    /// [`FetchError::Blocked`], [`FetchError::Timeout`] or [`FetchError::Network`]
    /// once every attempt has failed.
    pub async fn fetch(&self, input: &str) -> Result<String, FetchError> {
        let url = self.validate_url(input)?;
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = FetchError::Network {
            attempts,
            message: "no attempt made".to_string(),
        };

        for attempt in 1..=attempts {
            let user_agent = USER_AGENTS
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or_default();
            debug!("GET {url} (attempt {attempt}/{attempts}) as {user_agent}");

            match self.transport.get(&url, user_agent).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    info!("Fetched {url} with {}", response.status);
                    return Ok(response.body);
                }
                Ok(response) if matches!(response.status, 403 | 429) => {
                    warn!("Blocked by {url} with {} on attempt {attempt}", response.status);
                    last_error = FetchError::Blocked { attempts };
                }
                Ok(response) => {
                    warn!("Giving up on {url}: status {}", response.status);
                    return Err(FetchError::Http {
                        status: response.status,
                    });
                }
                Err(TransportError::Timeout) => {
                    warn!("Timed out fetching {url} on attempt {attempt}");
                    last_error = FetchError::Timeout { attempts };
                }
                Err(TransportError::Connection(message)) => {
                    warn!("Network error fetching {url} on attempt {attempt}: {message}");
                    last_error = FetchError::Network { attempts, message };
                }
            }

            if attempt < attempts {
                let delay = self.backoff(attempt);
                debug!("Waiting {:.1}s before retrying", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error)
    }

    /// Delay before retry number `attempt` (1-based): `base_delay * attempt`
    /// plus a random jitter of at most `jitter`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter_ms = u64::try_from(self.config.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = Duration::from_millis(rand::rng().random_range(0..=jitter_ms));
        self.config.base_delay.saturating_mul(attempt) + jitter
    }
}

/// Fetches and parses the trail at `url`, then stores it as the session's trail.
///
/// Any itinerary generated for a previous trail is discarded.
///
/// # Errors
///
/// Returns an error if:
/// * The URL is invalid or the page cannot be fetched
/// * The page does not parse into a trail record
/// * Database operations fail
pub async fn scrape_trail(fetcher: &Fetcher, url: &str, db_path: &str) -> Result<TrailRecord> {
    let html = fetcher.fetch(url).await?;
    let trail = parse_trail(&html)?;
    info!("Parsed trail {} in {}", trail.name, trail.location);

    let storage = Storage::new(db_path)?;
    let mut session = storage.load_session()?;
    session.replace_trail(Some(url.to_string()), trail.clone());
    storage.save_session(&session)?;

    Ok(trail)
}

/// Stores a manually entered trail as the session's trail.
///
/// This is the recovery path when the page cannot be scraped.
///
/// # Errors
///
/// Returns an error if the name or location is blank, or if database
/// operations fail.
pub fn enter_trail(db_path: &str, mut trail: TrailRecord) -> Result<()> {
    trail.name = trail.name.trim().to_string();
    trail.location = clean_location(&trail.location);
    if trail.name.is_empty() {
        return Err(ParseError::MissingField("name").into());
    }
    if trail.location.is_empty() {
        return Err(ParseError::MissingField("location").into());
    }

    let storage = Storage::new(db_path)?;
    let mut session = storage.load_session()?;
    info!("Entered trail {} in {}", trail.name, trail.location);
    session.replace_trail(None, trail);
    storage.save_session(&session)?;

    Ok(())
}
