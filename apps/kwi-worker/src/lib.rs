pub mod worker;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use color_eyre::eyre;

use kwi_service::KwiService;

#[derive(Debug, Parser)]
#[command(
	version = kwi_cli::VERSION,
	rename_all = "kebab",
	styles = kwi_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Collect every watch-list query once and exit.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = kwi_config::load(&args.config)?;

	kwi_cli::init_tracing(&config.service.log_level);

	let Some(watch) = config.worker.clone() else {
		return Err(eyre::eyre!("The [worker] section is required to run the worker."));
	};
	let store = kwi_storage::open(&config.storage).await?;
	let service = KwiService::new(config, store)?;

	if args.once {
		let report = worker::run_round(&service, &watch.queries).await;

		tracing::info!(succeeded = report.succeeded, failed = report.failed, "Round finished.");

		return Ok(());
	}

	let state = worker::WorkerState {
		service,
		queries: watch.queries,
		interval: Duration::from_secs(watch.interval_seconds),
	};

	worker::run_worker(state).await
}
