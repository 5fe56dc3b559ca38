//! Error types shared by the library

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TradeError {
    /// The exchange answered with an error payload
    #[error("API error: {0}")]
    Api(String),

    /// A price tick or prior transaction required for the snapshot is missing
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("API credentials are not configured")]
    MissingCredentials,

    #[error("invalid stored value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TradeError {
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }

    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, Self::DataUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, TradeError>;
