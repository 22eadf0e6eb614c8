use std::sync::Arc;

use gdb_service::GraphicsService;
use gdb_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<GraphicsService>,
}
impl AppState {
	pub async fn new(config: gdb_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;
		let clip_dim = config.providers.clip.dimensions;
		let sbert_dim = config
			.providers
			.sbert
			.as_ref()
			.map(|sbert| sbert.dimensions)
			.unwrap_or(clip_dim);

		db.ensure_schema(clip_dim, sbert_dim).await?;

		let service = GraphicsService::new(config, &db);

		Ok(Self { service: Arc::new(service) })
	}

	pub fn with_service(service: GraphicsService) -> Self {
		Self { service: Arc::new(service) }
	}
}
