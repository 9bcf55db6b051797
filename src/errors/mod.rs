use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Main error type for siphon pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    ReqwestMiddleware(#[from] reqwest_middleware::Error),

    #[error("Invalid header name: {0}")]
    HeaderName(#[from] reqwest::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    HeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("JSON serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Line codec error: {0}")]
    LinesCodec(#[from] LinesCodecError),

    /// A defect in a user-supplied observer/adapter callback.
    #[error("Callback error: {0}")]
    CallbackError(String),

    /// An exporter failed to write its payload to a sink.
    #[error("Exporter error: {0}")]
    ExportError(String),

    /// A build-time defect in the supplied settings, fatal before workers start.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pagination or renderer-URL construction failed for an observation variant.
    #[error("Observation error: {0}")]
    ObservationError(String),

    /// A fatal defect in the manager's own routing invariants.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// An exporter named a sink not present in the session registry.
    #[error("Unsupported sink: {0}")]
    UnsupportedSink(String),

    #[error("Lock poisoned: {0}")]
    PoisonError(String),
}

/// Convenience Result type that uses `PipelineError`.
pub type Result<T> = std::result::Result<T, PipelineError>;
