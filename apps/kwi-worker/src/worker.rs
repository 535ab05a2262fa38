use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use kwi_service::{CollectRequest, KwiService};

pub struct WorkerState {
	pub service: KwiService,
	pub queries: Vec<String>,
	pub interval: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundReport {
	pub succeeded: usize,
	pub failed: usize,
}

pub async fn run_worker(state: WorkerState) -> color_eyre::Result<()> {
	let mut ticker = time::interval(state.interval);

	// A slow round pushes the next one back instead of firing a burst.
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	tracing::info!(
		queries = state.queries.len(),
		interval_seconds = state.interval.as_secs(),
		"Worker started."
	);

	loop {
		ticker.tick().await;

		let report = run_round(&state.service, &state.queries).await;

		tracing::info!(succeeded = report.succeeded, failed = report.failed, "Round finished.");
	}
}

/// Collects each query in order, one at a time. A failed query is logged and the round moves on.
pub async fn run_round(service: &KwiService, queries: &[String]) -> RoundReport {
	let mut report = RoundReport::default();

	for query in queries {
		let response = service.collect(CollectRequest::new(query.as_str())).await;

		if response.success {
			report.succeeded += 1;

			tracing::info!(
				query = %query,
				run_id = ?response.run_id,
				total = response.stats.total,
				per_source_counts = ?response.stats.per_source_counts,
				warnings = response.warnings.len(),
				"Collected query."
			);
		} else {
			report.failed += 1;

			tracing::error!(
				query = %query,
				error_kind = ?response.error_kind,
				error = response.error.as_deref().unwrap_or_default(),
				"Collection failed."
			);
		}
	}

	report
}
