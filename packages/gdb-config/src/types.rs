use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub search: Search,
	pub materialize: Materialize,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	/// CLIP-space gateway; always active.
	pub clip: EmbeddingProviderConfig,
	/// SBERT-space gateway; present in hybrid deployments only.
	pub sbert: Option<EmbeddingProviderConfig>,
	pub objaverse: AssetProviderConfig,
	pub polyhaven: AssetProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetProviderConfig {
	pub api_base: String,
	pub user_agent: String,
	pub timeout_ms: u64,
	pub download_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_top_k")]
	pub default_top_k: u32,
	/// Multiplier applied to the oracle fetch limit when post-fetch
	/// predicates are active.
	pub overfetch_factor: u32,
	/// Absolute ceiling on any single oracle fetch.
	pub max_candidates: u32,
}

#[derive(Debug, Deserialize)]
pub struct Materialize {
	pub cache_dir: PathBuf,
	/// Download worker count; unset means half of the machine's cores.
	pub download_workers: Option<usize>,
	pub max_thumbnail_batch: usize,
	pub max_preview_batch: usize,
	pub scale: Scale,
	pub thumbnail: Thumbnail,
}

#[derive(Debug, Deserialize)]
pub struct Scale {
	/// Largest allowed bounding-box edge, in meters.
	pub max_edge_length: f32,
	/// "reject" or "rescale"; only "reject" is implemented.
	pub policy: String,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
	pub resolution: u32,
	#[serde(default)]
	pub overwrite: bool,
}

fn default_top_k() -> u32 {
	5
}
