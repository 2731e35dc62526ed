use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlacedbError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Corrupt content in {map}: {message}")]
    Corruption { map: String, message: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, PlacedbError>;

impl PlacedbError {
    pub fn corruption(map: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corruption { map: map.into(), message: message.into() }
    }
}

// Helper conversions
impl From<rusqlite::Error> for PlacedbError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<std::io::Error> for PlacedbError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}
impl From<config::ConfigError> for PlacedbError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for PlacedbError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
