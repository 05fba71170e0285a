//! Typed errors for each stage of the pipeline.
//!
//! Every stage surfaces its own error to the command that triggered it; no
//! stage recovers on behalf of another.

use thiserror::Error;

const SCRAPE_HINT: &str = "scraping failed, try again or enter the trail manually";

/// Failures of the HTML fetcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The input does not look like a trail-detail URL.
    #[error("Invalid trail URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The site kept answering 403/429.
    #[error("Access denied after {attempts} attempts; {}", SCRAPE_HINT)]
    Blocked { attempts: u32 },

    /// Every attempt timed out.
    #[error("Request timed out after {attempts} attempts; {}", SCRAPE_HINT)]
    Timeout { attempts: u32 },

    /// Connection-level failure on the last attempt.
    #[error("Network error after {attempts} attempts ({message}); {}", SCRAPE_HINT)]
    Network { attempts: u32, message: String },

    /// Any other non-success status. Not retried.
    #[error("HTTP error {status}; {}", SCRAPE_HINT)]
    Http { status: u16 },
}

/// The page did not have the layout the parser expects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Required field '{0}' not found in trail page")]
    MissingField(&'static str),

    #[error("Page looks like a bot-protection interstitial ({0})")]
    Interstitial(String),
}

/// Failures of the itinerary generation request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("Failed to build LLM model: {0}")]
    Build(String),

    #[error("Authentication with the generation API failed: {0}")]
    Auth(String),

    #[error("Generation API rate limit reached, wait and try again: {0}")]
    RateLimit(String),

    #[error("Network error while calling the generation API: {0}")]
    Network(String),

    #[error("Generation API error: {0}")]
    Provider(String),

    #[error("Generation API returned an empty itinerary")]
    EmptyResponse,
}

/// Raised only by the strict extraction policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Line {line_number} of the Places Mentioned section does not parse: {text:?}")]
    MalformedLine { line_number: usize, text: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Generation API key not configured: set {env} or add it to {path}")]
    MissingApiKey { env: &'static str, path: String },

    #[error("Failed to read secrets file {path}: {source}")]
    SecretsRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse secrets file {path}: {source}")]
    SecretsParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
