use serde::{Deserialize, Serialize};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("All sources failed: {message}")]
	AllSourcesFailed { message: String },
	#[error("Collection timed out: {message}")]
	Timeout { message: String },
	#[error("Storage error: {message}")]
	Persistence { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
}
impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Validation { .. } => ErrorKind::ValidationError,
			Self::AllSourcesFailed { .. } => ErrorKind::AllSourcesFailed,
			Self::Timeout { .. } => ErrorKind::Timeout,
			Self::Persistence { .. } => ErrorKind::PersistenceError,
			Self::NotFound { .. } => ErrorKind::NotFound,
		}
	}
}
impl From<kwi_storage::Error> for Error {
	fn from(err: kwi_storage::Error) -> Self {
		match err {
			kwi_storage::Error::InvalidArgument(message) => Self::Validation { message },
			other => Self::Persistence { message: other.to_string() },
		}
	}
}

/// Machine-checkable error code carried by failed responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	ValidationError,
	AllSourcesFailed,
	Timeout,
	PersistenceError,
	NotFound,
}
impl ErrorKind {
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::ValidationError => "VALIDATION_ERROR",
			Self::AllSourcesFailed => "ALL_SOURCES_FAILED",
			Self::Timeout => "TIMEOUT",
			Self::PersistenceError => "PERSISTENCE_ERROR",
			Self::NotFound => "NOT_FOUND",
		}
	}
}
