use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = kwi_api::Args::parse();

	kwi_api::run(args).await
}
