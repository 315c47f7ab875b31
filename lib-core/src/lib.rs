use std::{error::Error, fmt::Display};

pub mod client;
pub mod config;
pub mod extensions;
pub mod interceptor;
pub mod media;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrType {
    InvalidInput,
    Precondition,
    SessionBusy,
    ServiceUnreachable,
    ServiceRejected,
    ArtifactNotFound,

    ConfigError,
    FsError,
    MediaError,
}
impl ErrType {
    #[track_caller]
    pub fn msg(self, message: impl Into<String>) -> AppError {
        AppError::init(self, None, message)
    }

    #[track_caller]
    pub fn err(self, err: impl Into<Box<dyn Error>>, message: impl Into<String>) -> AppError {
        AppError::init(self, Some(err.into()), message)
    }
}
impl Display for ErrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ErrType::InvalidInput => "InvalidInput",
                ErrType::Precondition => "Precondition",
                ErrType::SessionBusy => "SessionBusy",
                ErrType::ServiceUnreachable => "ServiceUnreachable",
                ErrType::ServiceRejected => "ServiceRejected",
                ErrType::ArtifactNotFound => "ArtifactNotFound",

                ErrType::ConfigError => "ConfigError",
                ErrType::FsError => "FileSystemError",
                ErrType::MediaError => "MediaError",
            }
        )
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    _type: ErrType,
    message: String,
    at: String,
    err_msg: String,
}

impl AppError {
    #[track_caller]
    fn init(_type: ErrType, err: Option<Box<dyn Error>>, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        let at = format!("{}:{}:{}", location.file(), location.line(), location.column());
        AppError {
            _type,
            message: message.into(),
            at,
            err_msg: err.map(|e| e.to_string()).unwrap_or("".into()),
        }
    }

    pub fn err_type(&self) -> ErrType {
        self._type
    }

    /// User facing message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Text of the underlying error, empty when built with [`ErrType::msg`]
    pub fn err_message(&self) -> &str {
        &self.err_msg
    }

    pub fn at(&self) -> &str {
        &self.at
    }

    /// Emit the error on the tracing pipeline at a level matching its type
    pub fn trace(&self) {
        let message = format!("[{}]: {}", self._type, self.message);
        match self._type {
            ErrType::ServiceUnreachable | ErrType::ConfigError | ErrType::FsError => {
                tracing::error!(message = message, at = self.at, err = self.err_msg)
            }
            ErrType::InvalidInput | ErrType::Precondition | ErrType::SessionBusy => {
                tracing::debug!(message = message, at = self.at)
            }
            _ => tracing::warn!(message = message, at = self.at, err = self.err_msg),
        };
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_caller_location_and_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ErrType::FsError.err(source, "Failed to save diff");

        assert_eq!(err.err_type(), ErrType::FsError);
        assert_eq!(err.to_string(), "Failed to save diff");
        assert_eq!(err.err_message(), "missing");
        assert!(err.at().contains("lib.rs"));
    }
}
