//! Errors raised by local tool handlers

use thiserror::Error;
use toolpod_application::SandboxError;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path escapes the sandbox root: {0}")]
    OutsideRoot(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Failed(String),

    /// The instance cannot be used again.
    #[error("{0}")]
    Fatal(String),
}

impl ToolError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ToolError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::Fatal(_))
    }
}

impl From<ToolError> for SandboxError {
    fn from(err: ToolError) -> Self {
        if err.is_fatal() {
            SandboxError::fatal(err.to_string())
        } else {
            SandboxError::invocation(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_sandbox_error() {
        let err: SandboxError = ToolError::NotFound("a.txt".to_string()).into();
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Not found: a.txt");

        let err: SandboxError = ToolError::Fatal("shell is gone".to_string()).into();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_io_display() {
        let err = ToolError::io(
            "Failed to read src/lib.rs",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "Failed to read src/lib.rs: denied");
    }
}
