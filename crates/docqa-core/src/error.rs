use thiserror::Error;

/// Opaque message returned to callers for unexpected failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt artifact '{name}': {source}")]
    Artifact {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Io,
    Unexpected,
}

impl ErrorKind {
    /// HTTP-style status for the kind: client faults are 4xx, the rest 500.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Io | ErrorKind::Unexpected => 500,
        }
    }

    pub fn is_client_fault(self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::NotFound)
    }
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io(_) | Error::Artifact { .. } => ErrorKind::Io,
            Error::InvalidConfig(_) | Error::Generation(_) | Error::Operation(_) => {
                ErrorKind::Unexpected
            }
        }
    }

    /// Message safe to hand back to a caller. Unexpected failures are logged
    /// in full and replaced by [`INTERNAL_ERROR_MESSAGE`].
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound => self.to_string(),
            ErrorKind::Io => "Storage failure".to_string(),
            ErrorKind::Unexpected => {
                tracing::error!(error = %self, "unexpected failure");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(Error::validation("empty").kind().status_code(), 400);
        assert_eq!(Error::not_found("corpus").kind().status_code(), 404);
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "ro"));
        assert_eq!(io.kind(), ErrorKind::Io);
        assert_eq!(Error::Operation("boom".into()).kind().status_code(), 500);
    }

    #[test]
    fn unexpected_errors_are_opaque() {
        let err = Error::Generation("api key sk-123 rejected".into());
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
        let err = Error::validation("question must not be empty");
        assert!(err.public_message().contains("question must not be empty"));
        assert!(err.kind().is_client_fault());
    }
}
