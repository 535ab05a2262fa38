pub mod db;
pub mod models;
pub mod queries;
pub mod schema;
pub mod store;

mod error;

pub use error::Error;
pub use store::{BoxFuture, MemorySnapshotStore, PgSnapshotStore, SnapshotStore};

pub type Result<T, E = Error> = std::result::Result<T, E>;

use std::sync::Arc;

use crate::db::Db;

/// Postgres when `[storage.postgres]` is configured, otherwise a process-local store that is lost
/// on restart.
pub async fn open(cfg: &kwi_config::Storage) -> Result<Arc<dyn SnapshotStore>> {
	let Some(postgres) = cfg.postgres.as_ref() else {
		tracing::warn!("No [storage.postgres] configured. Runs are kept in memory only.");

		return Ok(Arc::new(MemorySnapshotStore::new()));
	};
	let db = Db::connect(postgres).await?;

	db.ensure_schema().await?;

	Ok(Arc::new(PgSnapshotStore::new(db)))
}
