//! Trend analyzer: diffs a run against the preceding run keyed by source type, group, and folded
//! text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use kwi_domain::{KeywordKey, KeywordRecord, SearchVolume, Snapshot, SourceType};

use crate::{Error, KwiService, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendState {
	New,
	Rising,
	Stable,
	Falling,
	Disappeared,
}
impl TrendState {
	pub const ALL: [Self; 5] =
		[Self::New, Self::Rising, Self::Stable, Self::Falling, Self::Disappeared];

	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::New => "new",
			Self::Rising => "rising",
			Self::Stable => "stable",
			Self::Falling => "falling",
			Self::Disappeared => "disappeared",
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub struct TrendThresholds {
	/// Minimum rank move, in positions, that counts as movement.
	pub rank_delta: u32,
	/// Minimum relative change of total volume that counts as movement.
	pub volume_change_ratio: f64,
}
impl Default for TrendThresholds {
	fn default() -> Self {
		Self { rank_delta: 1, volume_change_ratio: 0.1 }
	}
}
impl From<&kwi_config::Trend> for TrendThresholds {
	fn from(cfg: &kwi_config::Trend) -> Self {
		Self { rank_delta: cfg.rank_delta_threshold, volume_change_ratio: cfg.volume_change_ratio }
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendEntry {
	pub source_type: SourceType,
	pub group: u32,
	pub text: String,
	pub normalized_text: String,
	pub state: TrendState,
	/// Absent for disappeared keywords.
	pub rank: Option<u32>,
	pub prior_rank: Option<u32>,
	/// `prior_rank - rank`. Positive means the keyword moved up.
	pub rank_delta: Option<i64>,
	pub volume: Option<SearchVolume>,
	pub prior_volume: Option<SearchVolume>,
	/// Relative change of total volume. Absent unless both runs report volume and the prior total
	/// is non-zero.
	pub volume_change: Option<f64>,
}
impl TrendEntry {
	fn appeared(key: &KeywordKey, record: &KeywordRecord) -> Self {
		Self {
			source_type: key.0,
			group: key.1,
			text: record.text.clone(),
			normalized_text: key.2.clone(),
			state: TrendState::New,
			rank: Some(record.rank),
			prior_rank: None,
			rank_delta: None,
			volume: record.volume,
			prior_volume: None,
			volume_change: None,
		}
	}

	fn disappeared(key: &KeywordKey, before: &KeywordRecord) -> Self {
		Self {
			source_type: key.0,
			group: key.1,
			text: before.text.clone(),
			normalized_text: key.2.clone(),
			state: TrendState::Disappeared,
			rank: None,
			prior_rank: Some(before.rank),
			rank_delta: None,
			volume: None,
			prior_volume: before.volume,
			volume_change: None,
		}
	}

	fn compared(
		key: &KeywordKey,
		record: &KeywordRecord,
		before: &KeywordRecord,
		thresholds: &TrendThresholds,
	) -> Self {
		let rank_delta = i64::from(before.rank) - i64::from(record.rank);
		let rank_threshold = i64::from(thresholds.rank_delta.max(1));
		let (volume_change, volume_state) =
			compare_volume(record.volume, before.volume, thresholds.volume_change_ratio);
		// Rank movement decides first; volume only breaks a rank tie.
		let state = if rank_delta >= rank_threshold {
			TrendState::Rising
		} else if rank_delta <= -rank_threshold {
			TrendState::Falling
		} else {
			volume_state.unwrap_or(TrendState::Stable)
		};

		Self {
			source_type: key.0,
			group: key.1,
			text: record.text.clone(),
			normalized_text: key.2.clone(),
			state,
			rank: Some(record.rank),
			prior_rank: Some(before.rank),
			rank_delta: Some(rank_delta),
			volume: record.volume,
			prior_volume: before.volume,
			volume_change,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRequest {
	pub query: String,
	/// Analyze the latest run at or before this instant instead of the absolute latest.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub at: Option<OffsetDateTime>,
}

/// The run a source was compared against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorRun {
	pub source_type: SourceType,
	pub run_id: Uuid,
	#[serde(with = "time::serde::rfc3339")]
	pub collected_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResponse {
	pub query: String,
	pub run_id: Uuid,
	#[serde(with = "time::serde::rfc3339")]
	pub collected_at: OffsetDateTime,
	pub priors: Vec<PriorRun>,
	pub entries: Vec<TrendEntry>,
}

impl KwiService {
	pub async fn trends(&self, req: TrendRequest) -> Result<TrendResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::Validation { message: "query must be non-empty.".to_string() });
		}

		// Stored timestamps carry microsecond precision, so this makes `at` itself inclusive.
		let before = req.at.map(|at| at + Duration::microseconds(1));
		let current = self.store.load_latest(query, None, before).await?.ok_or_else(|| {
			Error::NotFound { message: format!("No committed run for query {query:?}.") }
		})?;
		let (entries, priors) = self.compare_with_prior(&current).await?;

		Ok(TrendResponse {
			query: current.query,
			run_id: current.run_id,
			collected_at: current.collected_at,
			priors,
			entries,
		})
	}

	/// Compares each source `current` observed with the latest earlier run that also observed it.
	/// Sources that `current` skipped or that failed in it are left out; nothing was seen, so
	/// nothing can be reported as disappeared.
	pub(crate) async fn compare_with_prior(
		&self,
		current: &Snapshot,
	) -> Result<(Vec<TrendEntry>, Vec<PriorRun>)> {
		let thresholds = TrendThresholds::from(&self.cfg.trend);
		let mut entries = Vec::new();
		let mut priors = Vec::new();

		for source_type in &current.observed_sources() {
			let prior = self
				.store
				.load_latest(&current.query, Some(*source_type), Some(current.collected_at))
				.await?;
			let records: Vec<KeywordRecord> = current.records_for(*source_type).cloned().collect();

			if let Some(prior) = prior.as_ref() {
				priors.push(PriorRun {
					source_type: *source_type,
					run_id: prior.run_id,
					collected_at: prior.collected_at,
				});
			}

			entries.extend(analyze(
				&records,
				prior.as_ref().map(|prior| prior.records.as_slice()),
				&thresholds,
			));
		}

		entries.sort_by(|a, b| entry_order(a).cmp(&entry_order(b)));

		Ok((entries, priors))
	}
}

/// Classifies every keyword of `current` against `prior`.
///
/// Presence decides before movement: a key missing from `prior` is `New`, a key only in `prior` is
/// `Disappeared`. Without a prior run everything is `New`. Output is sorted, so it does not depend
/// on input order.
pub fn analyze(
	current: &[KeywordRecord],
	prior: Option<&[KeywordRecord]>,
	thresholds: &TrendThresholds,
) -> Vec<TrendEntry> {
	let current_index = index(current);
	let prior_index = prior.map(index).unwrap_or_default();
	let mut entries = Vec::with_capacity(current_index.len());

	for (key, record) in &current_index {
		let entry = match prior_index.get(key) {
			Some(before) => TrendEntry::compared(key, record, before, thresholds),
			None => TrendEntry::appeared(key, record),
		};

		entries.push(entry);
	}
	for (key, before) in &prior_index {
		if !current_index.contains_key(key) {
			entries.push(TrendEntry::disappeared(key, before));
		}
	}

	entries.sort_by(|a, b| entry_order(a).cmp(&entry_order(b)));

	entries
}

/// One record per key. Should a run ever carry a duplicate key, the best rank wins.
fn index(records: &[KeywordRecord]) -> BTreeMap<KeywordKey, &KeywordRecord> {
	let mut index: BTreeMap<KeywordKey, &KeywordRecord> = BTreeMap::new();

	for record in records {
		index
			.entry(record.key())
			.and_modify(|kept| {
				if (record.rank, record.text.as_str()) < (kept.rank, kept.text.as_str()) {
					*kept = record;
				}
			})
			.or_insert(record);
	}

	index
}

fn compare_volume(
	current: Option<SearchVolume>,
	prior: Option<SearchVolume>,
	ratio: f64,
) -> (Option<f64>, Option<TrendState>) {
	let (Some(current), Some(prior)) = (current, prior) else {
		return (None, None);
	};
	let (now, before) = (current.total(), prior.total());

	if before == 0 {
		return (None, (now > 0).then_some(TrendState::Rising));
	}

	let change = (now as f64 - before as f64) / before as f64;
	let state = if change > 0.0 && change >= ratio {
		Some(TrendState::Rising)
	} else if change < 0.0 && -change >= ratio {
		Some(TrendState::Falling)
	} else {
		None
	};

	(Some(change), state)
}

/// Source, group, present keywords by rank, then disappeared keywords by prior rank.
fn entry_order(entry: &TrendEntry) -> (SourceType, u32, bool, u32, &str) {
	(
		entry.source_type,
		entry.group,
		entry.rank.is_none(),
		entry.rank.or(entry.prior_rank).unwrap_or(u32::MAX),
		entry.normalized_text.as_str(),
	)
}
