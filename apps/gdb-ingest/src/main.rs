use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = gdb_ingest::Args::parse();
	gdb_ingest::run(args).await
}
