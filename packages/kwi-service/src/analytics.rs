//! Analytics aggregator: a read-side rollup of stored runs and freshly computed trend entries.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

use kwi_domain::{IntentClassifier, KeywordRecord, SearchVolume, Snapshot, SourceType, normalize};

use crate::{Error, KwiService, Result, TrendEntry, TrendState};

const MONTH_LABELS: [&str; 12] =
	["01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12"];
const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRequest {
	pub query: String,
	/// Window start. Defaults to `window_days` before `to`.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub from: Option<OffsetDateTime>,
	/// Window end. Defaults to now.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub to: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
	pub analytics: AnalyticsSummary,
	pub related_keywords: Vec<RelatedKeyword>,
	pub chart_data: ChartData,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
	pub query: String,
	pub run_count: usize,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub latest_collected_at: Option<OffsetDateTime>,
	/// Records in the latest run.
	pub keyword_total: usize,
	/// Distinct folded texts in the latest run, across sources.
	pub unique_keywords: usize,
	pub per_source_counts: BTreeMap<SourceType, usize>,
	pub per_state_counts: BTreeMap<TrendState, usize>,
	pub volume: Option<VolumeSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSummary {
	pub pc: u64,
	pub mobile: u64,
	pub total: u64,
	pub pc_ratio: f64,
	pub mobile_ratio: f64,
}
impl From<SearchVolume> for VolumeSummary {
	fn from(volume: SearchVolume) -> Self {
		Self {
			pc: volume.pc(),
			mobile: volume.mobile(),
			total: volume.total(),
			pc_ratio: volume.pc_ratio(),
			mobile_ratio: volume.mobile_ratio(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedKeyword {
	pub text: String,
	pub source_type: SourceType,
	pub group: u32,
	pub rank: u32,
	pub state: TrendState,
	pub score: f64,
	pub intent: String,
	pub volume: Option<SearchVolume>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
	pub label: String,
	pub value: f64,
}
impl ChartPoint {
	fn new(label: impl Into<String>, value: f64) -> Self {
		Self { label: label.into(), value }
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
	pub search_trends: Vec<ChartPoint>,
	pub monthly_ratios: Vec<ChartPoint>,
	pub weekday_ratios: Vec<ChartPoint>,
	pub issue_analysis: Vec<ChartPoint>,
	pub intent_analysis: Vec<ChartPoint>,
}

impl KwiService {
	pub async fn analytics(&self, req: AnalyticsRequest) -> Result<AnalyticsResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::Validation { message: "query must be non-empty.".to_string() });
		}

		let to = req.to.unwrap_or_else(OffsetDateTime::now_utc);
		let from = req.from.unwrap_or(to - Duration::days(self.cfg.analytics.window_days));

		if from > to {
			return Err(Error::Validation { message: "from must not be after to.".to_string() });
		}

		let runs = self.store.load_range(query, from, to).await?;
		let entries = match runs.last() {
			Some(current) => self.compare_with_prior(current).await?.0,
			None => Vec::new(),
		};

		tracing::debug!(query, runs = runs.len(), entries = entries.len(), "Analytics computed.");

		Ok(summarize(query, &runs, &entries, &self.cfg.analytics, self.intent.as_ref()))
	}
}

/// Builds the dashboard view. `runs` must be ordered oldest first; the last one is treated as
/// current. `entries` are the trend entries of that current run. Empty input gives an empty view.
pub fn summarize(
	query: &str,
	runs: &[Snapshot],
	entries: &[TrendEntry],
	cfg: &kwi_config::Analytics,
	intent: &dyn IntentClassifier,
) -> AnalyticsResponse {
	let current = runs.last();
	let run_volumes: Vec<(OffsetDateTime, Option<SearchVolume>)> =
		runs.iter().map(|run| (run.collected_at, run_volume(&run.records))).collect();
	let related_keywords = top_keywords(entries, cfg, intent);
	let analytics = AnalyticsSummary {
		query: query.to_string(),
		run_count: runs.len(),
		latest_collected_at: current.map(|run| run.collected_at),
		keyword_total: current.map(|run| run.records.len()).unwrap_or(0),
		unique_keywords: current
			.map(|run| {
				run.records.iter().map(KeywordRecord::comparison_text).collect::<HashSet<_>>().len()
			})
			.unwrap_or(0),
		per_source_counts: current
			.map(|run| {
				let mut counts = BTreeMap::new();

				for record in &run.records {
					*counts.entry(record.source_type).or_default() += 1;
				}

				counts
			})
			.unwrap_or_default(),
		per_state_counts: state_counts(entries),
		volume: run_volumes.last().and_then(|(_, volume)| volume.map(VolumeSummary::from)),
	};
	let chart_data = ChartData {
		search_trends: run_volumes
			.iter()
			.filter_map(|(at, volume)| {
				volume.map(|volume| ChartPoint::new(format_timestamp(*at), volume.total() as f64))
			})
			.collect(),
		monthly_ratios: calendar_ratios(&run_volumes, &MONTH_LABELS, |at| {
			usize::from(u8::from(at.month())) - 1
		}),
		weekday_ratios: calendar_ratios(&run_volumes, &WEEKDAY_LABELS, |at| {
			usize::from(at.weekday().number_days_from_monday())
		}),
		issue_analysis: state_counts(entries)
			.into_iter()
			.map(|(state, count)| ChartPoint::new(state.as_str(), count as f64))
			.collect(),
		intent_analysis: intent_counts(entries, intent),
	};

	AnalyticsResponse { analytics, related_keywords, chart_data }
}

/// Sum of volumes across one run, counting each folded text once. Records are walked in source
/// order, so the first source that reports a volume for a text wins.
fn run_volume(records: &[KeywordRecord]) -> Option<SearchVolume> {
	let mut ordered: Vec<&KeywordRecord> =
		records.iter().filter(|record| record.volume.is_some()).collect();

	ordered.sort_by_key(|record| (record.source_type, record.group, record.rank));

	let mut seen = HashSet::new();
	let mut total: Option<SearchVolume> = None;

	for record in ordered {
		if let Some(volume) = record.volume
			&& seen.insert(normalize::fold(&record.text))
		{
			total = Some(total.map_or(volume, |sum| sum + volume));
		}
	}

	total
}

fn top_keywords(
	entries: &[TrendEntry],
	cfg: &kwi_config::Analytics,
	intent: &dyn IntentClassifier,
) -> Vec<RelatedKeyword> {
	let mut scored: Vec<(f64, &TrendEntry, u32)> = entries
		.iter()
		.filter_map(|entry| {
			let rank = entry.rank?;

			state_weight(entry.state, &cfg.state_weights)
				.map(|weight| (cfg.rank_weight / f64::from(rank) + weight, entry, rank))
		})
		.collect();

	scored.sort_by(|(a_score, a, _), (b_score, b, _)| {
		b_score
			.total_cmp(a_score)
			.then_with(|| a.normalized_text.cmp(&b.normalized_text))
			.then_with(|| a.source_type.cmp(&b.source_type))
			.then_with(|| a.group.cmp(&b.group))
	});
	scored.truncate(cfg.top_n as usize);

	scored
		.into_iter()
		.map(|(score, entry, rank)| RelatedKeyword {
			text: entry.text.clone(),
			source_type: entry.source_type,
			group: entry.group,
			rank,
			state: entry.state,
			score,
			intent: intent.classify(&entry.text),
			volume: entry.volume,
		})
		.collect()
}

/// Weight of a present keyword's state. Disappeared keywords are not ranked.
fn state_weight(state: TrendState, weights: &kwi_config::StateWeights) -> Option<f64> {
	match state {
		TrendState::New => Some(weights.new),
		TrendState::Rising => Some(weights.rising),
		TrendState::Stable => Some(weights.stable),
		TrendState::Falling => Some(weights.falling),
		TrendState::Disappeared => None,
	}
}

/// Every state with its count, zeros included.
fn state_counts(entries: &[TrendEntry]) -> BTreeMap<TrendState, usize> {
	let mut counts: BTreeMap<TrendState, usize> =
		TrendState::ALL.into_iter().map(|state| (state, 0)).collect();

	for entry in entries {
		*counts.entry(entry.state).or_default() += 1;
	}

	counts
}

fn intent_counts(entries: &[TrendEntry], intent: &dyn IntentClassifier) -> Vec<ChartPoint> {
	let mut counts: BTreeMap<String, usize> = BTreeMap::new();

	for entry in entries.iter().filter(|entry| entry.rank.is_some()) {
		*counts.entry(intent.classify(&entry.text)).or_default() += 1;
	}

	counts.into_iter().map(|(label, count)| ChartPoint::new(label, count as f64)).collect()
}

/// Share of total volume per calendar bucket. Empty when no run carries volume.
fn calendar_ratios(
	run_volumes: &[(OffsetDateTime, Option<SearchVolume>)],
	labels: &[&str],
	bucket: impl Fn(OffsetDateTime) -> usize,
) -> Vec<ChartPoint> {
	let mut sums = vec![0_u64; labels.len()];

	for (at, volume) in run_volumes {
		if let Some(volume) = volume
			&& let Some(sum) = sums.get_mut(bucket(*at))
		{
			*sum = sum.saturating_add(volume.total());
		}
	}

	let grand_total: u64 = sums.iter().sum();

	if grand_total == 0 {
		return Vec::new();
	}

	labels
		.iter()
		.zip(sums)
		.map(|(label, sum)| ChartPoint::new(*label, sum as f64 / grand_total as f64))
		.collect()
}

fn format_timestamp(at: OffsetDateTime) -> String {
	at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}
