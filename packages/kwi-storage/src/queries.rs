use serde_json::Value;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{KeywordRecordRow, KeywordRun},
};

pub const STATUS_COMMITTED: &str = "committed";
pub const STATUS_FAILED: &str = "failed";

pub async fn insert_run_tx(
	tx: &mut Transaction<'_, Postgres>,
	run_id: Uuid,
	query: &str,
	collected_at: OffsetDateTime,
	status: &str,
	error: Option<&str>,
	sources: &[String],
	warnings: &Value,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO keyword_runs (
	run_id,
	query,
	collected_at,
	status,
	error,
	sources,
	warnings
)
VALUES ($1,$2,$3,$4,$5,$6,$7)",
	)
	.bind(run_id)
	.bind(query)
	.bind(collected_at)
	.bind(status)
	.bind(error)
	.bind(sources)
	.bind(warnings)
	.execute(&mut **tx)
	.await?;

	Ok(())
}

pub async fn insert_record_tx(
	tx: &mut Transaction<'_, Postgres>,
	row: &KeywordRecordRow,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO keyword_records (
	run_id,
	source_type,
	grp,
	rank,
	text,
	normalized_text,
	href,
	image_alt,
	pc_volume,
	mobile_volume
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
	)
	.bind(row.run_id)
	.bind(row.source_type.as_str())
	.bind(row.grp)
	.bind(row.rank)
	.bind(row.text.as_str())
	.bind(row.normalized_text.as_str())
	.bind(row.href.as_deref())
	.bind(row.image_alt.as_deref())
	.bind(row.pc_volume)
	.bind(row.mobile_volume)
	.execute(&mut **tx)
	.await?;

	Ok(())
}

/// Latest committed run strictly before `before` (or overall when `None`). When `source_type` is
/// set, only runs that attempted that source without a failure qualify.
pub async fn latest_committed_run(
	db: &Db,
	query: &str,
	source_type: Option<&str>,
	before: Option<OffsetDateTime>,
) -> Result<Option<KeywordRun>> {
	let failed_filter =
		source_type.map(|source_type| serde_json::json!([{ "sourceType": source_type }]));
	let run = sqlx::query_as::<_, KeywordRun>(
		"\
SELECT run_id, query, collected_at, status, error, sources, warnings
FROM keyword_runs
WHERE query = $1
	AND status = 'committed'
	AND ($2::timestamptz IS NULL OR collected_at < $2)
	AND ($3::text IS NULL OR ($3 = ANY(sources) AND NOT (warnings @> $4::jsonb)))
ORDER BY collected_at DESC, seq DESC
LIMIT 1",
	)
	.bind(query)
	.bind(before)
	.bind(source_type)
	.bind(failed_filter)
	.fetch_optional(&db.pool)
	.await?;

	Ok(run)
}

/// Committed runs with `from <= collected_at <= to`, oldest first.
pub async fn committed_runs_in_range(
	db: &Db,
	query: &str,
	from: OffsetDateTime,
	to: OffsetDateTime,
) -> Result<Vec<KeywordRun>> {
	let runs = sqlx::query_as::<_, KeywordRun>(
		"\
SELECT run_id, query, collected_at, status, error, sources, warnings
FROM keyword_runs
WHERE query = $1
	AND status = 'committed'
	AND collected_at >= $2
	AND collected_at <= $3
ORDER BY collected_at ASC, seq ASC",
	)
	.bind(query)
	.bind(from)
	.bind(to)
	.fetch_all(&db.pool)
	.await?;

	Ok(runs)
}

pub async fn records_for_runs(db: &Db, run_ids: &[Uuid]) -> Result<Vec<KeywordRecordRow>> {
	if run_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, KeywordRecordRow>(
		"\
SELECT
	run_id,
	source_type,
	grp,
	rank,
	text,
	normalized_text,
	href,
	image_alt,
	pc_volume,
	mobile_volume
FROM keyword_records
WHERE run_id = ANY($1)
ORDER BY run_id, source_type, grp, rank",
	)
	.bind(run_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
