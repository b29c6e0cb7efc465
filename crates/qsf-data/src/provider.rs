//! The data-provider trait and its boundary types.

use std::fmt;

/// A single OHLCV bar as returned by an upstream data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    /// Canonical timeframe string (e.g. `"1D"`, `"5m"`).
    pub timeframe: String,
    /// Bar end timestamp as UTC epoch seconds.
    pub end_ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Parameters for a historical fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub symbol: String,
    pub timeframe: String,
    /// Inclusive period as `YYYY-MM-DD` dates.
    pub start_date: String,
    pub end_date: String,
}

/// Provider self-report for `data status` / health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub kind: String,
    pub reachable: bool,
    pub detail: String,
}

/// Errors a provider implementation may return.
#[derive(Debug)]
pub enum ProviderError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value (e.g. API key) is missing or invalid.
    Config(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Api {
                code: Some(c),
                message,
            } => write!(f, "provider api error code={c}: {message}"),
            ProviderError::Api {
                code: None,
                message,
            } => write!(f, "provider api error: {message}"),
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Synchronous provider boundary. Implementations live outside the
/// substrate; the swarm only ever consumes the interface.
pub trait DataProvider {
    fn fetch(&self, req: &FetchRequest) -> Result<Vec<Bar>, ProviderError>;
    fn status(&self) -> ProviderStatus;
}
