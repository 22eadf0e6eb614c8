use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = gdb_api::Args::parse();
	gdb_api::run(args).await
}
