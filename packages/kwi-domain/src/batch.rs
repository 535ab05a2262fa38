use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::keyword::{RawEntry, SourceType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
	SourceUnavailable,
	SourceMalformed,
	Timeout,
}

/// A per-source failure absorbed into a run instead of aborting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceWarning {
	pub source_type: SourceType,
	pub kind: WarningKind,
	pub message: String,
	pub attempts: u32,
}

/// Raw adapter output for one query, partitioned by `(source type, group)`.
///
/// Partitions live in a sorted map so the merged view does not depend on which adapter finished
/// first.
#[derive(Clone, Debug)]
pub struct CollectionBatch {
	pub query: String,
	pub collected_at: OffsetDateTime,
	partitions: BTreeMap<(SourceType, u32), Vec<RawEntry>>,
	raw_counts: BTreeMap<SourceType, usize>,
	warnings: Vec<SourceWarning>,
}
impl CollectionBatch {
	pub fn new(query: impl Into<String>, collected_at: OffsetDateTime) -> Self {
		Self {
			query: query.into(),
			collected_at,
			partitions: BTreeMap::new(),
			raw_counts: BTreeMap::new(),
			warnings: Vec::new(),
		}
	}

	/// Adds one adapter's entries. Entries without a group land in group 0; order within a group
	/// is kept as returned.
	pub fn push_source(&mut self, source_type: SourceType, entries: Vec<RawEntry>) {
		*self.raw_counts.entry(source_type).or_default() += entries.len();

		for entry in entries {
			let group = entry.group.unwrap_or(0);

			self.partitions.entry((source_type, group)).or_default().push(entry);
		}
	}

	/// Marks a source as attempted with nothing to contribute.
	pub fn push_failure(&mut self, warning: SourceWarning) {
		self.raw_counts.entry(warning.source_type).or_default();
		self.warnings.push(warning);
	}

	pub fn partitions(&self) -> impl Iterator<Item = (SourceType, u32, &[RawEntry])> {
		self.partitions
			.iter()
			.map(|((source_type, group), entries)| (*source_type, *group, entries.as_slice()))
	}

	pub fn raw_count(&self, source_type: SourceType) -> usize {
		self.raw_counts.get(&source_type).copied().unwrap_or(0)
	}

	pub fn sources(&self) -> impl Iterator<Item = SourceType> {
		self.raw_counts.keys().copied()
	}

	pub fn warnings(&self) -> &[SourceWarning] {
		&self.warnings
	}

	/// Sorts warnings by source type so the report is stable across completion orders.
	pub fn sort_warnings(&mut self) {
		self.warnings.sort_by_key(|warning| warning.source_type);
	}

	pub fn is_empty(&self) -> bool {
		self.partitions.values().all(Vec::is_empty)
	}
}
