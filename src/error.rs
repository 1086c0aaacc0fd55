use thiserror::Error;

/// Main error type for the trading loop
#[derive(Error, Debug)]
pub enum PrinterError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Venue errors
    #[error("Venue request failed: {endpoint} ({status}): {message}")]
    VenueRequest {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    // Collaborator errors
    #[error("Advice request failed: {0}")]
    Advice(String),

    #[error("News request failed: {0}")]
    News(String),

    // Decision loop errors
    #[error("Invalid phase transition: from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Snapshot incomplete: {0}")]
    Snapshot(String),

    #[error("Signature error: {0}")]
    Signature(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for PrinterError
pub type Result<T> = std::result::Result<T, PrinterError>;

impl PrinterError {
    /// Whether the error came back from the venue (as opposed to a local fault)
    pub fn is_venue_error(&self) -> bool {
        matches!(
            self,
            PrinterError::VenueRequest { .. }
                | PrinterError::RateLimited(_)
                | PrinterError::Http(_)
                | PrinterError::OrderNotFound(_)
        )
    }
}
