use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot read keyword engine config {path:?}.")]
	ReadConfig { path: PathBuf, source: std::io::Error },
	#[error("Keyword engine config {path:?} is not valid TOML for this schema.")]
	ParseConfig { path: PathBuf, source: toml::de::Error },
	/// An `[[analytics.intent_rules]]` pattern that does not compile.
	#[error("analytics.intent_rules {label:?} pattern {pattern:?} is not a valid regex.")]
	IntentPattern { label: String, pattern: String, source: regex::Error },
	#[error("{message}")]
	Validation { message: String },
}
