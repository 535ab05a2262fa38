//! Collection orchestrator: fan out to source adapters, absorb per-source failures, normalize, and
//! commit one run.

use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
	time::Duration,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::{sync::Semaphore, task::JoinSet, time::Instant};
use uuid::Uuid;

use kwi_domain::{
	CollectionBatch, KeywordRecord, RawEntry, SourceType, SourceWarning, WarningKind, normalize,
};
use kwi_providers::{FetchOptions, SourceAdapter};

use crate::{Error, ErrorKind, KwiService, Result};

const MAX_BACKOFF_EXP: u32 = 4;
const MAX_BACKOFF_MS: u64 = 10_000;

/// Per-call overrides of the `[collection]` defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectOptions {
	pub source_types: Option<Vec<String>>,
	pub max_pages_per_module: Option<u32>,
	pub wait_timeout_ms: Option<u64>,
	pub sleep_min_ms: Option<u64>,
	pub sleep_max_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectRequest {
	pub query: String,
	#[serde(default)]
	pub options: Option<CollectOptions>,
}
impl CollectRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), options: None }
	}

	pub fn with_options(mut self, options: CollectOptions) -> Self {
		self.options = Some(options);

		self
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectStats {
	/// Canonical records per attempted source. Failed sources report 0.
	pub per_source_counts: BTreeMap<SourceType, usize>,
	pub total: usize,
	pub duration_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectResponse {
	pub success: bool,
	pub data: Vec<KeywordRecord>,
	pub stats: CollectStats,
	pub warnings: Vec<SourceWarning>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_kind: Option<ErrorKind>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub run_id: Option<Uuid>,
}
impl CollectResponse {
	pub fn failed(err: &Error, stats: CollectStats, warnings: Vec<SourceWarning>) -> Self {
		Self {
			success: false,
			data: Vec::new(),
			stats,
			warnings,
			error: Some(err.to_string()),
			error_kind: Some(err.kind()),
			run_id: None,
		}
	}
}

/// Request options resolved against config defaults.
#[derive(Clone, Debug)]
pub struct CollectPlan {
	pub source_types: Vec<SourceType>,
	pub fetch: FetchOptions,
	pub concurrency: usize,
	pub max_attempts: u32,
	pub wait_timeout: Duration,
}

/// Whatever the orchestrator gathered before every source reported or the deadline passed.
#[derive(Debug)]
pub struct Collected {
	pub batch: CollectionBatch,
	/// Sources whose fetch returned, including those with zero entries.
	pub succeeded: usize,
	pub timed_out: bool,
}

impl KwiService {
	pub async fn collect(&self, req: CollectRequest) -> CollectResponse {
		self.collect_at(req, OffsetDateTime::now_utc()).await
	}

	/// Runs one collection stamped with `collected_at`. Failures come back as `success: false`
	/// responses so callers still see the per-source warnings.
	pub async fn collect_at(
		&self,
		req: CollectRequest,
		collected_at: OffsetDateTime,
	) -> CollectResponse {
		let started = Instant::now();
		let query = req.query.trim().to_string();
		let plan = match self.plan(&query, req.options.as_ref()) {
			Ok(plan) => plan,
			Err(err) => {
				tracing::warn!(query = %query, error = %err, "Collection request rejected.");

				return CollectResponse::failed(&err, CollectStats::default(), Vec::new());
			},
		};
		let adapters = plan
			.source_types
			.iter()
			.filter_map(|source_type| {
				self.adapter(*source_type).map(|adapter| (*source_type, adapter))
			})
			.collect();

		tracing::info!(query = %query, sources = plan.source_types.len(), "Collection started.");

		let collected = orchestrate(&query, adapters, &plan, collected_at).await;
		let mut batch = collected.batch;

		batch.sort_warnings();

		let warnings = batch.warnings().to_vec();
		let mut stats = CollectStats {
			per_source_counts: batch.sources().map(|source_type| (source_type, 0)).collect(),
			total: 0,
			duration_ms: 0,
		};

		if collected.succeeded == 0 {
			let err = if collected.timed_out {
				Error::Timeout {
					message: format!(
						"No source finished within {} ms.",
						plan.wait_timeout.as_millis()
					),
				}
			} else {
				Error::AllSourcesFailed {
					message: format!("{} source(s) attempted, none returned data.", warnings.len()),
				}
			};

			self.record_failed_run(&query, collected_at, &err, &warnings).await;

			stats.duration_ms = elapsed_ms(started);

			return CollectResponse::failed(&err, stats, warnings);
		}

		let records =
			normalize::normalize_batch(&batch, self.cfg.collection.max_keyword_chars as usize);

		for record in &records {
			*stats.per_source_counts.entry(record.source_type).or_default() += 1;
		}

		stats.total = records.len();

		let attempted: Vec<SourceType> = batch.sources().collect();
		let saved = self.store.save(&query, &attempted, &records, &warnings, collected_at).await;
		let run_id = match saved {
			Ok(run_id) => run_id,
			Err(err) => {
				let err = Error::Persistence { message: err.to_string() };

				tracing::error!(query = %query, error = %err, "Failed to commit collection run.");

				stats.duration_ms = elapsed_ms(started);

				return CollectResponse::failed(&err, stats, warnings);
			},
		};

		stats.duration_ms = elapsed_ms(started);

		tracing::info!(
			query = %query,
			%run_id,
			total = stats.total,
			warnings = warnings.len(),
			duration_ms = stats.duration_ms,
			"Collection committed."
		);

		CollectResponse {
			success: true,
			data: records,
			stats,
			warnings,
			error: None,
			error_kind: None,
			run_id: Some(run_id),
		}
	}

	/// Validates the request and merges its options over the configured defaults. Nothing is
	/// fetched when this fails.
	pub fn plan(&self, query: &str, options: Option<&CollectOptions>) -> Result<CollectPlan> {
		if query.trim().is_empty() {
			return Err(Error::Validation { message: "query must be non-empty.".to_string() });
		}

		let defaults = &self.cfg.collection;
		let options = options.cloned().unwrap_or_default();
		let mut source_types = Vec::new();

		match options.source_types.as_ref() {
			Some(requested) => {
				if requested.is_empty() {
					return Err(Error::Validation {
						message: "options.sourceTypes must not be empty when provided.".to_string(),
					});
				}

				for raw in requested {
					let source_type = SourceType::parse(raw);

					if source_type == SourceType::Unknown {
						return Err(Error::Validation {
							message: format!("Unknown source type {raw:?}."),
						});
					}
					if self.adapter(source_type).is_none() {
						return Err(Error::Validation {
							message: format!("Source type {source_type} is not enabled."),
						});
					}
					if !source_types.contains(&source_type) {
						source_types.push(source_type);
					}
				}
			},
			None =>
				for raw in &defaults.source_types {
					let source_type = SourceType::parse(raw);

					if self.adapter(source_type).is_some() && !source_types.contains(&source_type) {
						source_types.push(source_type);
					}
				},
		}

		if source_types.is_empty() {
			return Err(Error::Validation {
				message: "No enabled source to collect from.".to_string(),
			});
		}

		let max_pages = options.max_pages_per_module.unwrap_or(defaults.max_pages_per_module);
		let wait_timeout_ms = options.wait_timeout_ms.unwrap_or(defaults.wait_timeout_ms);
		let sleep_min_ms = options.sleep_min_ms.unwrap_or(defaults.sleep_min_ms);
		let sleep_max_ms = options.sleep_max_ms.unwrap_or(defaults.sleep_max_ms);

		if max_pages == 0 {
			return Err(Error::Validation {
				message: "maxPagesPerModule must be greater than zero.".to_string(),
			});
		}
		if wait_timeout_ms == 0 {
			return Err(Error::Validation {
				message: "waitTimeoutMs must be greater than zero.".to_string(),
			});
		}
		if sleep_min_ms > sleep_max_ms {
			return Err(Error::Validation {
				message: "sleepMinMs must be less than or equal to sleepMaxMs.".to_string(),
			});
		}

		Ok(CollectPlan {
			source_types,
			fetch: FetchOptions {
				max_pages,
				sleep_min_ms,
				sleep_max_ms,
				default_pc_ratio: self.cfg.analytics.default_pc_ratio,
			},
			concurrency: defaults.concurrency.max(1) as usize,
			max_attempts: defaults.max_attempts.max(1),
			wait_timeout: Duration::from_millis(wait_timeout_ms),
		})
	}

	async fn record_failed_run(
		&self,
		query: &str,
		collected_at: OffsetDateTime,
		err: &Error,
		warnings: &[SourceWarning],
	) {
		tracing::warn!(query = %query, error = %err, "Collection failed.");

		if let Err(store_err) =
			self.store.record_failure(query, collected_at, &err.to_string(), warnings).await
		{
			tracing::warn!(query = %query, error = %store_err, "Failed to record the failed run.");
		}
	}
}

/// Runs every adapter under one semaphore and one deadline. Sources still pending at the deadline
/// are cancelled and reported with a `TIMEOUT` warning.
pub async fn orchestrate(
	query: &str,
	adapters: Vec<(SourceType, Arc<dyn SourceAdapter>)>,
	plan: &CollectPlan,
	collected_at: OffsetDateTime,
) -> Collected {
	let semaphore = Arc::new(Semaphore::new(plan.concurrency.max(1)));
	let mut pending = BTreeSet::new();
	let mut tasks = JoinSet::new();

	for (source_type, adapter) in adapters {
		if !pending.insert(source_type) {
			continue;
		}

		let semaphore = semaphore.clone();
		let query = query.to_string();
		let options = plan.fetch.clone();
		let max_attempts = plan.max_attempts;

		tasks.spawn(async move {
			let _permit = semaphore.acquire_owned().await.ok();
			let outcome =
				fetch_with_retry(adapter.as_ref(), &query, source_type, &options, max_attempts).await;

			(source_type, outcome)
		});
	}

	let deadline = Instant::now() + plan.wait_timeout;
	let mut batch = CollectionBatch::new(query, collected_at);
	let mut succeeded = 0;
	let mut timed_out = false;

	loop {
		match tokio::time::timeout_at(deadline, tasks.join_next()).await {
			Ok(Some(Ok((source_type, Ok(entries))))) => {
				pending.remove(&source_type);

				tracing::debug!(source_type = %source_type, count = entries.len(), "Source finished.");

				batch.push_source(source_type, entries);

				succeeded += 1;
			},
			Ok(Some(Ok((source_type, Err(warning))))) => {
				pending.remove(&source_type);
				batch.push_failure(warning);
			},
			Ok(Some(Err(err))) => {
				tracing::error!(error = %err, "Source task failed.");
			},
			Ok(None) => break,
			Err(_) => {
				timed_out = true;

				tasks.abort_all();

				break;
			},
		}
	}

	for source_type in pending {
		let (kind, message) = if timed_out {
			(
				WarningKind::Timeout,
				format!("Source did not finish within {} ms.", plan.wait_timeout.as_millis()),
			)
		} else {
			(WarningKind::SourceUnavailable, "Source task ended without a result.".to_string())
		};

		tracing::warn!(source_type = %source_type, reason = %message, "Source degraded.");

		batch.push_failure(SourceWarning { source_type, kind, message, attempts: 0 });
	}

	Collected { batch, succeeded, timed_out }
}

/// Retries transient failures with jittered exponential backoff. Permanent failures and
/// exhausted retries become a warning for the batch.
async fn fetch_with_retry(
	adapter: &dyn SourceAdapter,
	query: &str,
	source_type: SourceType,
	options: &FetchOptions,
	max_attempts: u32,
) -> std::result::Result<Vec<RawEntry>, SourceWarning> {
	let mut attempt = 1;

	loop {
		match adapter.fetch(query, source_type, options).await {
			Ok(entries) => return Ok(entries),
			Err(err) if err.is_retryable() && attempt < max_attempts => {
				let delay = backoff_for_attempt(attempt, options);

				tracing::warn!(
					source_type = %source_type,
					attempt,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"Source fetch failed. Retrying."
				);
				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => {
				tracing::warn!(
					source_type = %source_type,
					attempts = attempt,
					error = %err,
					"Source degraded to empty."
				);

				return Err(SourceWarning {
					source_type,
					kind: err.warning_kind(),
					message: err.to_string(),
					attempts: attempt,
				});
			},
		}
	}
}

fn backoff_for_attempt(attempt: u32, options: &FetchOptions) -> Duration {
	let base = kwi_providers::jitter(options.sleep_min_ms, options.sleep_max_ms);
	let exp = attempt.saturating_sub(1).min(MAX_BACKOFF_EXP);

	base.saturating_mul(1 << exp).min(Duration::from_millis(MAX_BACKOFF_MS))
}

fn elapsed_ms(started: Instant) -> u64 {
	started.elapsed().as_millis() as u64
}
