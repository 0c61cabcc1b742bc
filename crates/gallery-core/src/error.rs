use thiserror::Error;

/// Configuration problems. All of them are recovered from locally by falling back to a default.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("pattern list is empty")]
    EmptyPatterns,
    #[error("pattern {index} has a zero dimension ({width}x{height})")]
    InvalidShape { index: usize, width: u32, height: u32 },
    #[error("pattern {index} is {width}x{height}, larger than {max} cells per side")]
    ShapeTooLarge {
        index: usize,
        width: u32,
        height: u32,
        max: u32,
    },
    #[error("malformed pattern list: {0}")]
    MalformedPatterns(String),
    #[error("malformed configuration: {0}")]
    Malformed(String),
    #[error("`{name}` must be {expected}, got `{value}`")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("no data source configured")]
    MissingDataSource,
}

/// A page fetch that failed or could not be started.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_error(err: &dyn std::error::Error) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Asynchronous content for a single rendered element failed to load.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("asset failed to load: {0}")]
pub struct AssetError(pub String);
