use kwi_domain::{SourceType, WarningKind};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Source {source_type} is unavailable: {message}")]
	SourceUnavailable { source_type: SourceType, message: String },
	#[error("Source {source_type} returned a malformed response: {message}")]
	SourceMalformed { source_type: SourceType, message: String },
	#[error("Source {source_type} is misconfigured: {message}")]
	InvalidConfig { source_type: SourceType, message: String },
}
impl Error {
	/// Only transient fetch failures are worth another attempt.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::SourceUnavailable { .. })
	}

	pub fn warning_kind(&self) -> WarningKind {
		match self {
			Self::SourceUnavailable { .. } => WarningKind::SourceUnavailable,
			Self::SourceMalformed { .. } | Self::InvalidConfig { .. } => WarningKind::SourceMalformed,
		}
	}
}
