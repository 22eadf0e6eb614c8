mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	AssetProviderConfig, Config, EmbeddingProviderConfig, Materialize, Postgres, Providers, Scale,
	Search, Service, Storage, Thumbnail,
};

use std::{fs, path::Path};

pub const SCALE_POLICY_REJECT: &str = "reject";
pub const SCALE_POLICY_RESCALE: &str = "rescale";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	validate_embedding_provider("clip", &cfg.providers.clip)?;

	if let Some(sbert) = cfg.providers.sbert.as_ref() {
		validate_embedding_provider("sbert", sbert)?;
	}

	for (label, provider) in
		[("objaverse", &cfg.providers.objaverse), ("polyhaven", &cfg.providers.polyhaven)]
	{
		if provider.user_agent.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.{label}.user_agent must be non-empty."),
			});
		}
		if provider.timeout_ms == 0 || provider.download_timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label} timeouts must be greater than zero."),
			});
		}
	}

	if cfg.search.default_top_k == 0 {
		return Err(Error::Validation {
			message: "search.default_top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.overfetch_factor == 0 {
		return Err(Error::Validation {
			message: "search.overfetch_factor must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_candidates < cfg.search.default_top_k {
		return Err(Error::Validation {
			message: "search.max_candidates must be at least search.default_top_k.".to_string(),
		});
	}

	if cfg.materialize.max_thumbnail_batch == 0 || cfg.materialize.max_preview_batch == 0 {
		return Err(Error::Validation {
			message: "materialize batch limits must be greater than zero.".to_string(),
		});
	}
	if !cfg.materialize.scale.max_edge_length.is_finite()
		|| cfg.materialize.scale.max_edge_length <= 0.0
	{
		return Err(Error::Validation {
			message: "materialize.scale.max_edge_length must be a positive finite number."
				.to_string(),
		});
	}
	if !matches!(
		cfg.materialize.scale.policy.as_str(),
		SCALE_POLICY_REJECT | SCALE_POLICY_RESCALE
	) {
		return Err(Error::Validation {
			message: "materialize.scale.policy must be one of reject or rescale.".to_string(),
		});
	}
	if cfg.materialize.thumbnail.resolution == 0 {
		return Err(Error::Validation {
			message: "materialize.thumbnail.resolution must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_embedding_provider(label: &str, cfg: &EmbeddingProviderConfig) -> Result<()> {
	if cfg.dimensions == 0 {
		return Err(Error::Validation {
			message: format!("providers.{label}.dimensions must be greater than zero."),
		});
	}
	if cfg.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: format!("providers.{label}.api_key must be non-empty."),
		});
	}
	if cfg.timeout_ms == 0 {
		return Err(Error::Validation {
			message: format!("providers.{label}.timeout_ms must be greater than zero."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.materialize.download_workers == Some(0) {
		cfg.materialize.download_workers = None;
	}
}
