//! Error types for the bot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("API error: {0}")]
    Api(String),

    /// Structured rejection returned by the exchange (`{"code": .., "msg": ..}`)
    #[error("Exchange error {code}: {msg}")]
    Exchange { code: i64, msg: String },

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
