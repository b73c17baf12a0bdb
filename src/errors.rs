use thiserror::Error;

/// All errors that can occur when using the Hybrik client.
#[derive(Error, Debug)]
pub enum HybrikError {
    /// The base URL could not be parsed, or required credentials are missing.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// Login did not return a session token.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// An HTTP method the request router does not handle.
    #[error("unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },

    /// A transport-level error from reqwest (connection, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A request body could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A convenience alias for `Result<T, HybrikError>`.
pub type Result<T> = std::result::Result<T, HybrikError>;
