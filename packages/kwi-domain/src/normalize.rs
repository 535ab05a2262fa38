//! Deduplication and dense ranking of a collection batch.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
	batch::CollectionBatch,
	keyword::{KeywordRecord, RawEntry},
};

pub const ELLIPSIS: &str = "…";

/// Trims and collapses internal whitespace runs to a single space.
pub fn collapse_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison form of a keyword: NFKC, whitespace collapsed, lowercased.
pub fn fold(text: &str) -> String {
	let composed: String = text.nfkc().collect();

	collapse_whitespace(&composed).to_lowercase()
}

/// Caps `text` at `max_chars` grapheme clusters, replacing the tail with [`ELLIPSIS`].
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
	let graphemes: Vec<&str> = text.graphemes(true).collect();

	if graphemes.len() <= max_chars {
		return text.to_string();
	}

	let keep = max_chars.saturating_sub(1);
	let mut out = graphemes[..keep].concat();

	out.push_str(ELLIPSIS);

	out
}

/// Builds the canonical record set for one run.
///
/// Per `(source type, group)` partition: collapse whitespace, drop empties, truncate, then keep the
/// first occurrence of each folded text and assign ranks 1..N in that order.
pub fn normalize_batch(batch: &CollectionBatch, max_chars: usize) -> Vec<KeywordRecord> {
	let mut records = Vec::new();

	for (source_type, group, entries) in batch.partitions() {
		for (rank, entry) in dedup_partition(entries, max_chars).into_iter().enumerate() {
			records.push(KeywordRecord {
				query: batch.query.clone(),
				source_type,
				text: entry.text,
				rank: rank as u32 + 1,
				group,
				href: entry.href,
				image_alt: entry.image_alt,
				volume: entry.volume,
				collected_at: batch.collected_at,
			});
		}
	}

	records
}

fn dedup_partition(entries: &[RawEntry], max_chars: usize) -> Vec<RawEntry> {
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(entries.len());

	for entry in entries {
		let collapsed = collapse_whitespace(&entry.text);

		if collapsed.is_empty() {
			continue;
		}

		let text = truncate_with_ellipsis(&collapsed, max_chars);

		if !seen.insert(fold(&text)) {
			continue;
		}

		out.push(RawEntry { text, ..entry.clone() });
	}

	out
}
