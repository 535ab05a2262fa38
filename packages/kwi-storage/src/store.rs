//! Snapshot store contract and its Postgres and in-memory implementations.
//!
//! Runs are append-only. A run and all of its records become visible together or not at all.

use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex},
};

use time::OffsetDateTime;
use uuid::Uuid;

use kwi_domain::{KeywordRecord, SearchVolume, Snapshot, SourceType, SourceWarning};

use crate::{
	Error, Result,
	db::Db,
	models::{KeywordRecordRow, KeywordRun},
	queries,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SnapshotStore
where
	Self: Send + Sync,
{
	/// Appends a committed run and returns its identifier. `sources` lists every source the run
	/// attempted, including the ones that failed or returned nothing.
	fn save<'a>(
		&'a self,
		query: &'a str,
		sources: &'a [SourceType],
		records: &'a [KeywordRecord],
		warnings: &'a [SourceWarning],
		collected_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<Uuid>>;

	/// Appends a failed attempt. Failed attempts are never returned by the load operations.
	fn record_failure<'a>(
		&'a self,
		query: &'a str,
		collected_at: OffsetDateTime,
		message: &'a str,
		warnings: &'a [SourceWarning],
	) -> BoxFuture<'a, Result<Uuid>>;

	/// Most recent committed run strictly before `before`, or the latest overall when `before` is
	/// `None`. With `source_type`, only runs that attempted that source without a failure qualify,
	/// and only its records are returned.
	fn load_latest<'a>(
		&'a self,
		query: &'a str,
		source_type: Option<SourceType>,
		before: Option<OffsetDateTime>,
	) -> BoxFuture<'a, Result<Option<Snapshot>>>;

	/// Committed runs with `from <= collected_at <= to`, ordered by `collected_at` ascending.
	fn load_range<'a>(
		&'a self,
		query: &'a str,
		from: OffsetDateTime,
		to: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<Snapshot>>>;
}

pub struct PgSnapshotStore {
	db: Db,
}
impl PgSnapshotStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}

	pub fn db(&self) -> &Db {
		&self.db
	}

	async fn save_run(
		&self,
		query: &str,
		sources: &[SourceType],
		records: &[KeywordRecord],
		warnings: &[SourceWarning],
		collected_at: OffsetDateTime,
	) -> Result<Uuid> {
		validate_records(query, records, collected_at)?;

		let run_id = Uuid::new_v4();
		let sources = source_labels(sources);
		let warnings = serde_json::to_value(warnings)?;
		let mut tx = self.db.pool.begin().await?;

		queries::insert_run_tx(
			&mut tx,
			run_id,
			query,
			collected_at,
			queries::STATUS_COMMITTED,
			None,
			&sources,
			&warnings,
		)
		.await?;

		for record in records {
			queries::insert_record_tx(&mut tx, &record_row(run_id, record)).await?;
		}

		tx.commit().await?;

		tracing::debug!(%run_id, query, records = records.len(), "Run committed.");

		Ok(run_id)
	}

	async fn save_failure(
		&self,
		query: &str,
		collected_at: OffsetDateTime,
		message: &str,
		warnings: &[SourceWarning],
	) -> Result<Uuid> {
		let run_id = Uuid::new_v4();
		let warnings = serde_json::to_value(warnings)?;
		let mut tx = self.db.pool.begin().await?;

		queries::insert_run_tx(
			&mut tx,
			run_id,
			query,
			collected_at,
			queries::STATUS_FAILED,
			Some(message),
			&[],
			&warnings,
		)
		.await?;

		tx.commit().await?;

		Ok(run_id)
	}

	async fn latest(
		&self,
		query: &str,
		source_type: Option<SourceType>,
		before: Option<OffsetDateTime>,
	) -> Result<Option<Snapshot>> {
		let run = queries::latest_committed_run(
			&self.db,
			query,
			source_type.map(|source_type| source_type.as_str()),
			before,
		)
		.await?;
		let Some(run) = run else {
			return Ok(None);
		};
		let rows = queries::records_for_runs(&self.db, &[run.run_id]).await?;
		let mut snapshots = assemble_snapshots(vec![run], rows)?;
		let mut snapshot = snapshots.pop();

		if let (Some(snapshot), Some(source_type)) = (snapshot.as_mut(), source_type) {
			snapshot.records.retain(|record| record.source_type == source_type);
		}

		Ok(snapshot)
	}

	async fn range(
		&self,
		query: &str,
		from: OffsetDateTime,
		to: OffsetDateTime,
	) -> Result<Vec<Snapshot>> {
		if from > to {
			return Err(Error::InvalidArgument("from must not be after to.".to_string()));
		}

		let runs = queries::committed_runs_in_range(&self.db, query, from, to).await?;
		let run_ids: Vec<Uuid> = runs.iter().map(|run| run.run_id).collect();
		let rows = queries::records_for_runs(&self.db, &run_ids).await?;

		assemble_snapshots(runs, rows)
	}
}
impl SnapshotStore for PgSnapshotStore {
	fn save<'a>(
		&'a self,
		query: &'a str,
		sources: &'a [SourceType],
		records: &'a [KeywordRecord],
		warnings: &'a [SourceWarning],
		collected_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<Uuid>> {
		Box::pin(self.save_run(query, sources, records, warnings, collected_at))
	}

	fn record_failure<'a>(
		&'a self,
		query: &'a str,
		collected_at: OffsetDateTime,
		message: &'a str,
		warnings: &'a [SourceWarning],
	) -> BoxFuture<'a, Result<Uuid>> {
		Box::pin(self.save_failure(query, collected_at, message, warnings))
	}

	fn load_latest<'a>(
		&'a self,
		query: &'a str,
		source_type: Option<SourceType>,
		before: Option<OffsetDateTime>,
	) -> BoxFuture<'a, Result<Option<Snapshot>>> {
		Box::pin(self.latest(query, source_type, before))
	}

	fn load_range<'a>(
		&'a self,
		query: &'a str,
		from: OffsetDateTime,
		to: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<Snapshot>>> {
		Box::pin(self.range(query, from, to))
	}
}

#[derive(Clone, Debug)]
struct StoredRun {
	snapshot: Snapshot,
	committed: bool,
	error: Option<String>,
}

/// Process-local store. Each run is pushed under one lock, which gives run-level atomicity.
#[derive(Clone, Debug, Default)]
pub struct MemorySnapshotStore {
	runs: Arc<Mutex<Vec<StoredRun>>>,
}
impl MemorySnapshotStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of failed attempts recorded for `query`.
	pub fn failure_count(&self, query: &str) -> usize {
		let runs = self.runs.lock().unwrap_or_else(|err| err.into_inner());

		runs.iter().filter(|run| !run.committed && run.snapshot.query == query).count()
	}

	pub fn last_failure(&self, query: &str) -> Option<String> {
		let runs = self.runs.lock().unwrap_or_else(|err| err.into_inner());

		runs.iter()
			.rev()
			.find(|run| !run.committed && run.snapshot.query == query)
			.and_then(|run| run.error.clone())
	}

	fn push(&self, run: StoredRun) -> Uuid {
		let run_id = run.snapshot.run_id;
		let mut runs = self.runs.lock().unwrap_or_else(|err| err.into_inner());

		runs.push(run);

		run_id
	}

	/// Committed runs for `query` in `(collected_at, insertion)` order.
	fn committed(&self, query: &str) -> Vec<Snapshot> {
		let runs = self.runs.lock().unwrap_or_else(|err| err.into_inner());
		let mut out: Vec<Snapshot> = runs
			.iter()
			.filter(|run| run.committed && run.snapshot.query == query)
			.map(|run| run.snapshot.clone())
			.collect();

		// Stable sort keeps insertion order among equal timestamps.
		out.sort_by_key(|snapshot| snapshot.collected_at);

		out
	}
}
impl SnapshotStore for MemorySnapshotStore {
	fn save<'a>(
		&'a self,
		query: &'a str,
		sources: &'a [SourceType],
		records: &'a [KeywordRecord],
		warnings: &'a [SourceWarning],
		collected_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<Uuid>> {
		Box::pin(async move {
			validate_records(query, records, collected_at)?;

			let mut records = records.to_vec();

			sort_records(&mut records);

			Ok(self.push(StoredRun {
				snapshot: Snapshot {
					run_id: Uuid::new_v4(),
					query: query.to_string(),
					collected_at,
					sources: sources.to_vec(),
					records,
					warnings: warnings.to_vec(),
				},
				committed: true,
				error: None,
			}))
		})
	}

	fn record_failure<'a>(
		&'a self,
		query: &'a str,
		collected_at: OffsetDateTime,
		message: &'a str,
		warnings: &'a [SourceWarning],
	) -> BoxFuture<'a, Result<Uuid>> {
		Box::pin(async move {
			Ok(self.push(StoredRun {
				snapshot: Snapshot {
					run_id: Uuid::new_v4(),
					query: query.to_string(),
					collected_at,
					sources: Vec::new(),
					records: Vec::new(),
					warnings: warnings.to_vec(),
				},
				committed: false,
				error: Some(message.to_string()),
			}))
		})
	}

	fn load_latest<'a>(
		&'a self,
		query: &'a str,
		source_type: Option<SourceType>,
		before: Option<OffsetDateTime>,
	) -> BoxFuture<'a, Result<Option<Snapshot>>> {
		Box::pin(async move {
			let latest = self
				.committed(query)
				.into_iter()
				.rev()
				.filter(|snapshot| before.map(|before| snapshot.collected_at < before).unwrap_or(true))
				.find(|snapshot| {
					source_type.map(|source_type| snapshot.observed(source_type)).unwrap_or(true)
				});

			Ok(latest.map(|mut snapshot| {
				if let Some(source_type) = source_type {
					snapshot.records.retain(|record| record.source_type == source_type);
				}

				snapshot
			}))
		})
	}

	fn load_range<'a>(
		&'a self,
		query: &'a str,
		from: OffsetDateTime,
		to: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<Snapshot>>> {
		Box::pin(async move {
			if from > to {
				return Err(Error::InvalidArgument("from must not be after to.".to_string()));
			}

			Ok(self
				.committed(query)
				.into_iter()
				.filter(|snapshot| snapshot.collected_at >= from && snapshot.collected_at <= to)
				.collect())
		})
	}
}

fn validate_records(
	query: &str,
	records: &[KeywordRecord],
	collected_at: OffsetDateTime,
) -> Result<()> {
	if query.trim().is_empty() {
		return Err(Error::InvalidArgument("query must be non-empty.".to_string()));
	}

	for record in records {
		if record.query != query {
			return Err(Error::InvalidArgument(format!(
				"Record {:?} belongs to query {:?}, not {query:?}.",
				record.text, record.query
			)));
		}
		if record.collected_at != collected_at {
			return Err(Error::InvalidArgument(format!(
				"Record {:?} carries a different collected_at than its run.",
				record.text
			)));
		}
		if record.rank == 0 {
			return Err(Error::InvalidArgument(format!("Record {:?} has rank 0.", record.text)));
		}
	}

	Ok(())
}

fn sort_records(records: &mut [KeywordRecord]) {
	records.sort_by(|a, b| {
		(a.source_type, a.group, a.rank).cmp(&(b.source_type, b.group, b.rank))
	});
}

fn source_labels(sources: &[SourceType]) -> Vec<String> {
	sources.iter().map(|source_type| source_type.as_str().to_string()).collect()
}

fn record_row(run_id: Uuid, record: &KeywordRecord) -> KeywordRecordRow {
	KeywordRecordRow {
		run_id,
		source_type: record.source_type.as_str().to_string(),
		grp: record.group as i32,
		rank: record.rank as i32,
		text: record.text.clone(),
		normalized_text: record.comparison_text(),
		href: record.href.clone(),
		image_alt: record.image_alt.clone(),
		pc_volume: record.volume.map(|volume| volume.pc() as i64),
		mobile_volume: record.volume.map(|volume| volume.mobile() as i64),
	}
}

fn assemble_snapshots(runs: Vec<KeywordRun>, rows: Vec<KeywordRecordRow>) -> Result<Vec<Snapshot>> {
	let mut by_run: HashMap<Uuid, Vec<KeywordRecordRow>> = HashMap::new();

	for row in rows {
		by_run.entry(row.run_id).or_default().push(row);
	}

	let mut snapshots = Vec::with_capacity(runs.len());

	for run in runs {
		let warnings: Vec<SourceWarning> = serde_json::from_value(run.warnings)?;
		let sources = run.sources.iter().map(|label| SourceType::parse(label)).collect();
		let mut records: Vec<KeywordRecord> = by_run
			.remove(&run.run_id)
			.unwrap_or_default()
			.into_iter()
			.map(|row| KeywordRecord {
				query: run.query.clone(),
				source_type: SourceType::parse(&row.source_type),
				text: row.text,
				rank: row.rank.max(1) as u32,
				group: row.grp.max(0) as u32,
				href: row.href,
				image_alt: row.image_alt,
				volume: row_volume(row.pc_volume, row.mobile_volume),
				collected_at: run.collected_at,
			})
			.collect();

		sort_records(&mut records);
		snapshots.push(Snapshot {
			run_id: run.run_id,
			query: run.query,
			collected_at: run.collected_at,
			sources,
			records,
			warnings,
		});
	}

	Ok(snapshots)
}

fn row_volume(pc: Option<i64>, mobile: Option<i64>) -> Option<SearchVolume> {
	if pc.is_none() && mobile.is_none() {
		return None;
	}

	let to_count = |value: Option<i64>| value.unwrap_or(0).max(0) as u64;

	Some(SearchVolume::new(to_count(pc), to_count(mobile)))
}
