use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct KeywordRun {
	pub run_id: Uuid,
	pub query: String,
	pub collected_at: OffsetDateTime,
	pub status: String,
	pub error: Option<String>,
	pub sources: Vec<String>,
	pub warnings: Value,
}

#[derive(Debug, sqlx::FromRow)]
pub struct KeywordRecordRow {
	pub run_id: Uuid,
	pub source_type: String,
	pub grp: i32,
	pub rank: i32,
	pub text: String,
	pub normalized_text: String,
	pub href: Option<String>,
	pub image_alt: Option<String>,
	pub pc_volume: Option<i64>,
	pub mobile_volume: Option<i64>,
}
