pub mod detail;
pub mod filter;
pub mod materialize;
pub mod search;

use std::{future::Future, pin::Pin, sync::Arc};

use gdb_config::{AssetProviderConfig, Config, EmbeddingProviderConfig};
use gdb_domain::Source;
use gdb_providers::{embedding, objaverse, polyhaven};
use gdb_storage::{
	db::Db,
	tables::{AssetTable, ObjaverseTable, PolyhavenTable},
};

pub use detail::{AssetMetadata, Dimensions, Healthcheck};
pub use filter::{MaterialFilters, ObjectFilters};
pub use search::SearchItem;

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Resolves and downloads the GLB payload for a model uid. `Ok(None)` means
/// the uid is unknown upstream.
pub trait ModelFetcher
where
	Self: Send + Sync,
{
	fn fetch_glb<'a>(
		&'a self,
		cfg: &'a AssetProviderConfig,
		uid: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Vec<u8>>>>;
}

/// Resolves and downloads the 1k diffuse map for a material uid.
pub trait PreviewFetcher
where
	Self: Send + Sync,
{
	fn fetch_diffuse_1k<'a>(
		&'a self,
		cfg: &'a AssetProviderConfig,
		uid: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Vec<u8>>>>;
}

#[derive(Debug)]
pub enum ServiceError {
	NotFound { what: String },
	InvalidRequest { message: String },
	Provider { message: String },
	Storage { message: String },
	Unimplemented { operation: String },
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::NotFound { what } => write!(f, "Not found: {what}"),
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::Provider { message } => write!(f, "Provider error: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
			Self::Unimplemented { operation } => write!(f, "Not implemented: {operation}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<gdb_storage::Error> for ServiceError {
	fn from(err: gdb_storage::Error) -> Self {
		match err {
			gdb_storage::Error::NotFound(what) => Self::NotFound { what },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub models: Arc<dyn ModelFetcher>,
	pub previews: Arc<dyn PreviewFetcher>,
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		models: Arc<dyn ModelFetcher>,
		previews: Arc<dyn PreviewFetcher>,
	) -> Self {
		Self { embedding, models, previews }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self { embedding: provider.clone(), models: provider.clone(), previews: provider }
	}
}

pub struct GraphicsService {
	pub cfg: Config,
	/// Probe priority order for cross-source uid lookups: model tables
	/// before material tables.
	pub tables: Vec<Arc<dyn AssetTable>>,
	pub providers: Providers,
}

impl GraphicsService {
	pub fn new(cfg: Config, db: &Db) -> Self {
		let tables: Vec<Arc<dyn AssetTable>> = vec![
			Arc::new(ObjaverseTable::new(db.pool.clone())),
			Arc::new(PolyhavenTable::new(db.pool.clone())),
		];

		Self { cfg, tables, providers: Providers::default() }
	}

	pub fn with_parts(
		cfg: Config,
		tables: Vec<Arc<dyn AssetTable>>,
		providers: Providers,
	) -> Self {
		Self { cfg, tables, providers }
	}

	pub fn table(&self, source: Source) -> ServiceResult<&Arc<dyn AssetTable>> {
		self.tables.iter().find(|table| table.source() == source).ok_or_else(|| {
			ServiceError::Storage { message: format!("No table wired for source {source}.") }
		})
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl ModelFetcher for DefaultProviders {
	fn fetch_glb<'a>(
		&'a self,
		cfg: &'a AssetProviderConfig,
		uid: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Vec<u8>>>> {
		Box::pin(async move {
			let Some(annotation) = objaverse::get_annotation(cfg, uid).await? else {
				return Ok(None);
			};
			let Some(url) = annotation.uri else {
				return Ok(None);
			};

			objaverse::download_glb(cfg, &url).await
		})
	}
}

impl PreviewFetcher for DefaultProviders {
	fn fetch_diffuse_1k<'a>(
		&'a self,
		cfg: &'a AssetProviderConfig,
		uid: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Vec<u8>>>> {
		Box::pin(async move {
			let Some(files) = polyhaven::asset_files(cfg, uid).await? else {
				return Ok(None);
			};
			let Some(url) = polyhaven::diffuse_url_1k(&files) else {
				return Ok(None);
			};

			polyhaven::download(cfg, &url).await
		})
	}
}
