use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Book service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Book not found: {book}")]
    NotFound { book: String },

    #[error("Server error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    Server {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Invalid response from book service: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
