#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown item: {0}")]
    UnknownItem(u64),

    #[error("Search index not ready (state: {state})")]
    IndexNotReady { state: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

impl RepositoryError {
    /// Short machine-readable name, used in performance records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnknownItem(_) => "unknown_item",
            Self::IndexNotReady { .. } => "index_not_ready",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}
