use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = kwi_worker::Args::parse();

	kwi_worker::run(args).await
}
