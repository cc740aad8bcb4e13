use thiserror::Error;

/// Coarse status class of a control-plane failure. Only the two idempotency
/// codes get special treatment; everything else is a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    Other,
}

#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation {name} failed: {message} (code {code})")]
    OperationFailed {
        name: String,
        code: i32,
        message: String,
    },

    #[error("Operation {0} did not finish before its deadline")]
    OperationTimeout(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl ControlPlaneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControlPlaneError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            ControlPlaneError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Maps an HTTP error response (google.rpc.Status envelope) to an error.
    pub fn from_status(status: u16, rpc_status: Option<&str>, message: String) -> Self {
        match (status, rpc_status) {
            (_, Some("ALREADY_EXISTS")) | (409, None) => {
                ControlPlaneError::AlreadyExists(message)
            }
            (_, Some("NOT_FOUND")) | (404, None) => {
                ControlPlaneError::NotFound(message)
            }
            _ => ControlPlaneError::Api { status, message },
        }
    }
}

pub type ControlResult<T> = Result<T, ControlPlaneError>;
