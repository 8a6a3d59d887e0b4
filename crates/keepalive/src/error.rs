use thiserror::Error;

/// Failures of the underlying key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("libsql error: {0}")]
    Libsql(#[from] libsql::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The key-value store rejected or failed the operation.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// A stored blob could not be decoded.
    #[error("malformed value under key {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Caller supplied input that can never succeed.
    #[error("{0}")]
    Validation(String),

    #[error("domain not found: {0}")]
    NotFound(String),

    /// The verification code matched neither the entry nor the admin code.
    #[error("verification code does not match")]
    Unauthorized,
}

/// Problems resolving which domains a run should wake up.
///
/// These never abort a run; they become the summary of an empty report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no domains configured: set up a key-value store or the TARGET_DOMAINS variable")]
    Missing,

    #[error("the key-value store holds no domains yet, add one through the API")]
    NoDomainsInStore,

    #[error("key-value store connection failed: {0}")]
    StoreUnreachable(String),

    #[error("TARGET_DOMAINS is malformed: {0}")]
    MalformedTargetDomains(String),

    #[error("unsupported schedule expression: {0}")]
    UnsupportedSchedule(String),
}

/// Transport-level failure of a single HTTP attempt (DNS, TLS, timeout, reset).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(pub String);
