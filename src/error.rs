use thiserror::Error;

/// Failures surfaced by the storage adapter.
///
/// `Configuration` is only ever produced while building an adapter. The other
/// variants are scoped to a single upload or URL lookup and leave the adapter
/// usable.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Filename generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("Upload of '{key}' failed: {source}")]
    Upload {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AdapterError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        AdapterError::Configuration(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, AdapterError::Configuration(_))
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, AdapterError::Generation(_))
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, AdapterError::Upload { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, AdapterError::InvalidState(_))
    }
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;
