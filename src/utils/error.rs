use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Invalid connection string: {message}")]
    ConnectionStringError { message: String },

    #[error("Invalid SAS token: {message}")]
    SasTokenError { message: String },

    #[error("IoT Edge environment error: {message}")]
    EdgeError { message: String },

    #[error("Inbox is empty")]
    InboxEmpty,

    #[error("Pipeline operation '{operation}' never completed")]
    PipelineError { operation: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl FixtureError {
    pub fn connection_string(message: impl Into<String>) -> Self {
        FixtureError::ConnectionStringError {
            message: message.into(),
        }
    }

    pub fn sas_token(message: impl Into<String>) -> Self {
        FixtureError::SasTokenError {
            message: message.into(),
        }
    }

    pub fn edge(message: impl Into<String>) -> Self {
        FixtureError::EdgeError {
            message: message.into(),
        }
    }

    /// 是否為憑證格式錯誤 (connection string / SAS token)
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            FixtureError::ConnectionStringError { .. } | FixtureError::SasTokenError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FixtureError>;
