use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub fn shape(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
