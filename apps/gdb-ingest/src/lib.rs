pub mod ingest;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use gdb_service::GraphicsService;
use gdb_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = gdb_cli::VERSION,
	rename_all = "kebab",
	styles = gdb_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Creates the per-source tables and vector indexes, then exits.
	InitDb,
	/// Loads assets from a provider into its source table.
	Ingest {
		#[arg(long, value_enum)]
		source: IngestSource,
		/// Maximum assets to insert; unlimited when omitted.
		#[arg(long)]
		limit: Option<usize>,
		/// Download GLBs and reject out-of-scale models before insertion.
		#[arg(long)]
		validate_scale: bool,
		/// Poly Haven asset type: "textures" or "hdris".
		#[arg(long, default_value = "textures")]
		asset_type: String,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IngestSource {
	Objaverse,
	Polyhaven,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = gdb_config::load(&args.config)?;
	init_tracing(&config)?;

	let db = Db::connect(&config.storage.postgres).await?;
	let clip_dim = config.providers.clip.dimensions;
	let sbert_dim =
		config.providers.sbert.as_ref().map(|sbert| sbert.dimensions).unwrap_or(clip_dim);

	db.ensure_schema(clip_dim, sbert_dim).await?;

	match args.command {
		Command::InitDb => {
			tracing::info!("Database schema is ready.");
		},
		Command::Ingest { source, limit, validate_scale, asset_type } => {
			let service = GraphicsService::new(config, &db);

			match source {
				IngestSource::Objaverse =>
					ingest::ingest_objaverse(&service, limit, validate_scale).await?,
				IngestSource::Polyhaven => {
					if validate_scale {
						return Err(eyre::eyre!(
							"Scale validation applies to model sources only."
						));
					}

					ingest::ingest_polyhaven(&service, limit, &asset_type).await?
				},
			}
		},
	}

	Ok(())
}

fn init_tracing(config: &gdb_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
	Ok(())
}
