use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{batch::SourceWarning, normalize, volume::SearchVolume};

/// Origin category of a keyword. Part of keyword identity: the same text under two source types is
/// two keywords.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
	Autosuggest,
	RelatedSearch,
	TogetherSearched,
	HotTopics,
	#[default]
	Unknown,
}
impl SourceType {
	/// Source types an adapter can be configured for.
	pub const COLLECTABLE: [Self; 4] =
		[Self::Autosuggest, Self::RelatedSearch, Self::TogetherSearched, Self::HotTopics];

	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Autosuggest => "autosuggest",
			Self::RelatedSearch => "relatedSearch",
			Self::TogetherSearched => "togetherSearched",
			Self::HotTopics => "hotTopics",
			Self::Unknown => "unknown",
		}
	}

	pub const fn config_key(&self) -> &'static str {
		match self {
			Self::Autosuggest => "autosuggest",
			Self::RelatedSearch => "related_search",
			Self::TogetherSearched => "together_searched",
			Self::HotTopics => "hot_topics",
			Self::Unknown => "unknown",
		}
	}

	/// Accepts both the wire label and the config key. Anything else is `Unknown`.
	pub fn parse(value: &str) -> Self {
		let trimmed = value.trim();

		Self::COLLECTABLE
			.into_iter()
			.find(|source_type| source_type.as_str() == trimmed || source_type.config_key() == trimmed)
			.unwrap_or(Self::Unknown)
	}
}
impl std::fmt::Display for SourceType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One candidate keyword as returned by a source adapter, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
	pub text: String,
	pub href: Option<String>,
	pub image_alt: Option<String>,
	pub group: Option<u32>,
	pub volume: Option<SearchVolume>,
}
impl RawEntry {
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into(), ..Self::default() }
	}

	pub fn with_group(mut self, group: u32) -> Self {
		self.group = Some(group);

		self
	}

	pub fn with_volume(mut self, volume: SearchVolume) -> Self {
		self.volume = Some(volume);

		self
	}
}

/// Matching key between runs: source type, group, then case-folded text.
pub type KeywordKey = (SourceType, u32, String);

/// One canonical keyword observed in one collection run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRecord {
	pub query: String,
	pub source_type: SourceType,
	/// Display text: trimmed, whitespace collapsed, original casing.
	pub text: String,
	pub rank: u32,
	pub group: u32,
	pub href: Option<String>,
	pub image_alt: Option<String>,
	pub volume: Option<SearchVolume>,
	#[serde(with = "time::serde::rfc3339")]
	pub collected_at: OffsetDateTime,
}
impl KeywordRecord {
	pub fn comparison_text(&self) -> String {
		normalize::fold(&self.text)
	}

	pub fn key(&self) -> KeywordKey {
		(self.source_type, self.group, self.comparison_text())
	}
}

/// A committed run as read back from the snapshot store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
	pub run_id: Uuid,
	pub query: String,
	#[serde(with = "time::serde::rfc3339")]
	pub collected_at: OffsetDateTime,
	/// Sources the run attempted, failed ones included.
	#[serde(default)]
	pub sources: Vec<SourceType>,
	pub records: Vec<KeywordRecord>,
	#[serde(default)]
	pub warnings: Vec<SourceWarning>,
}
impl Snapshot {
	pub fn records_for(&self, source_type: SourceType) -> impl Iterator<Item = &KeywordRecord> {
		self.records.iter().filter(move |record| record.source_type == source_type)
	}

	/// Whether the run attempted `source_type` and the source did not fail. Only such runs say
	/// anything about which keywords the source had.
	pub fn observed(&self, source_type: SourceType) -> bool {
		self.sources.contains(&source_type)
			&& !self.warnings.iter().any(|warning| warning.source_type == source_type)
	}

	/// Attempted sources that did not fail, in `SourceType` order.
	pub fn observed_sources(&self) -> Vec<SourceType> {
		let mut sources: Vec<SourceType> =
			self.sources.iter().copied().filter(|source_type| self.observed(*source_type)).collect();

		sources.sort();
		sources.dedup();

		sources
	}
}
