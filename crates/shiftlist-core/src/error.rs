//! Shiftlist error types.

/// Distinguishable error categories exposed to callers.
///
/// The CRUD layer maps these onto API responses; the message text is for logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Forbidden,
    Conflict,
    PreconditionFailed,
    Dependency,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid_argument"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Forbidden => write!(f, "forbidden"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::PreconditionFailed => write!(f, "precondition_failed"),
            ErrorKind::Dependency => write!(f, "dependency"),
        }
    }
}

/// Core error type for all Shiftlist operations.
#[derive(Debug, thiserror::Error)]
pub enum ShiftlistError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShiftlistError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict(message.into())
    }

    pub fn dependency<S: Into<String>>(message: S) -> Self {
        Self::Dependency(message.into())
    }

    /// Category of this error. Config errors are bad input, I/O errors are dependency failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::Dependency(_) | Self::Io(_) => ErrorKind::Dependency,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShiftlistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ShiftlistError::invalid("x").kind(), ErrorKind::InvalidArgument);
        assert_eq!(ShiftlistError::Config("bad".into()).kind(), ErrorKind::InvalidArgument);
        assert_eq!(ShiftlistError::conflict("dup").kind(), ErrorKind::Conflict);
        let io = std::io::Error::other("disk full");
        assert_eq!(ShiftlistError::from(io).kind(), ErrorKind::Dependency);
    }

    #[test]
    fn test_display_includes_message() {
        let err = ShiftlistError::not_found("task 7");
        assert_eq!(err.to_string(), "Not found: task 7");
        assert_eq!(err.kind().to_string(), "not_found");
    }
}
