//! Asset materialization: uid → validated, locally cached, rendering-ready
//! file.
//!
//! Per-uid state machine: REQUESTED → CACHED | DOWNLOADING → MATERIALIZED |
//! FAILED. The cache check is the first branch and short-circuits network
//! access. FAILED is terminal and silent: a batch with a few bad uids still
//! returns the good ones, and callers detect the gaps by set difference.

use std::{
	collections::{HashMap, HashSet},
	path::{Path, PathBuf},
	sync::Arc,
	thread,
};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use gdb_domain::Source;
use gdb_geometry::{ScaleCheck, ThumbnailOptions, aabb, thumbnail};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{GraphicsService, ServiceError, ServiceResult};

const MODEL_MAP_KIND: &str = "model";
const MODEL_RESOLUTION: &str = "source";
const PREVIEW_MAP_KIND: &str = "diff";
const PREVIEW_RESOLUTION: &str = "1k";

/// Cache keys are provider/uid/resolution with the filename encoding uid, map
/// kind, and resolution. Entries are append-only and never invalidated:
/// upstream content at a key is assumed immutable.
pub fn model_cache_path(cache_dir: &Path, uid: &str) -> PathBuf {
	cache_dir
		.join(Source::Objaverse.as_str())
		.join(uid)
		.join(MODEL_RESOLUTION)
		.join(format!("{uid}_{MODEL_MAP_KIND}_{MODEL_RESOLUTION}.glb"))
}

pub fn preview_cache_path(cache_dir: &Path, uid: &str) -> PathBuf {
	cache_dir
		.join(Source::Polyhaven.as_str())
		.join(uid)
		.join(PREVIEW_RESOLUTION)
		.join(format!("{uid}_{PREVIEW_MAP_KIND}_{PREVIEW_RESOLUTION}.jpg"))
}

/// Half the cores: downloads share the machine with request handling and the
/// network layer.
fn default_worker_count() -> usize {
	let cores = thread::available_parallelism().map(|count| count.get()).unwrap_or(2);

	(cores / 2).max(1)
}

impl GraphicsService {
	/// Resolves model uids to local GLB paths. Uids that fail anywhere in the
	/// pipeline are absent from the map; nothing is raised.
	pub async fn download_models(&self, uids: &[String]) -> HashMap<String, PathBuf> {
		let mut resolved = HashMap::new();
		let mut pending = Vec::new();
		let mut seen = HashSet::new();

		for uid in uids {
			if !seen.insert(uid.as_str()) {
				continue;
			}

			let path = model_cache_path(&self.cfg.materialize.cache_dir, uid);

			if path.exists() {
				resolved.insert(uid.clone(), path);
			} else {
				pending.push((uid.clone(), path));
			}
		}

		if pending.is_empty() {
			return resolved;
		}

		let workers =
			self.cfg.materialize.download_workers.unwrap_or_else(default_worker_count);
		let semaphore = Arc::new(Semaphore::new(workers));
		let mut tasks = JoinSet::new();

		for (uid, path) in pending {
			let semaphore = semaphore.clone();
			let fetcher = self.providers.models.clone();
			let provider_cfg = self.cfg.providers.objaverse.clone();

			tasks.spawn(async move {
				let _permit = semaphore.acquire_owned().await.ok()?;

				match fetcher.fetch_glb(&provider_cfg, &uid).await {
					Ok(Some(bytes)) => {
						if let Err(err) = write_cache_entry(&path, &bytes).await {
							tracing::warn!(uid, error = %err, "Failed to store downloaded model.");

							return None;
						}

						Some((uid, path))
					},
					Ok(None) => {
						tracing::warn!(uid, "Model not found upstream.");

						None
					},
					Err(err) => {
						tracing::warn!(uid, error = %err, "Model download failed.");

						None
					},
				}
			});
		}

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok(Some((uid, path))) => {
					resolved.insert(uid, path);
				},
				Ok(None) => {},
				Err(err) => tracing::warn!(error = %err, "Download worker panicked."),
			}
		}

		resolved
	}

	/// Checks every downloaded file against the scale threshold. Validation
	/// is recomputed per call; it is cheap next to a download. A file that
	/// fails to load counts as rejected, with the load error as the reason.
	pub async fn validate_scales(
		&self,
		paths: &HashMap<String, PathBuf>,
	) -> ServiceResult<HashMap<String, ScaleCheck>> {
		let scale = &self.cfg.materialize.scale;

		if scale.policy == gdb_config::SCALE_POLICY_RESCALE {
			return Err(ServiceError::Unimplemented {
				operation: "scale policy \"rescale\"".to_string(),
			});
		}

		let threshold = scale.max_edge_length;
		let mut results = HashMap::new();

		for (uid, path) in paths {
			let glb_path = path.clone();
			let outcome = tokio::task::spawn_blocking(move || {
				aabb::bounds_from_file(&glb_path)
					.map(|bounds| aabb::check_scale(&bounds, threshold))
			})
			.await;
			let check = match outcome {
				Ok(Ok(check)) => check,
				Ok(Err(err)) => ScaleCheck {
					passed: false,
					max_edge: 0.0,
					reason: Some(format!("Error validating asset: {err}.")),
				},
				Err(err) => ScaleCheck {
					passed: false,
					max_edge: 0.0,
					reason: Some(format!("Error validating asset: {err}.")),
				},
			};

			if !check.passed {
				tracing::info!(
					uid,
					reason = check.reason.as_deref().unwrap_or(""),
					"Rejecting asset.",
				);
			}

			results.insert(uid.clone(), check);
		}

		Ok(results)
	}

	/// Renders an isometric thumbnail next to each cached GLB. Idempotent
	/// unless overwrite is configured; a failed render drops its uid from the
	/// map without touching the rest of the batch.
	pub async fn render_thumbnails(
		&self,
		paths: &HashMap<String, PathBuf>,
	) -> HashMap<String, PathBuf> {
		let options = ThumbnailOptions {
			resolution: self.cfg.materialize.thumbnail.resolution,
			overwrite: self.cfg.materialize.thumbnail.overwrite,
		};
		let mut thumbnails = HashMap::new();

		for (uid, glb_path) in paths {
			let output = glb_path.with_extension("png");
			let glb_path = glb_path.clone();
			let task_output = output.clone();
			let task_options = options.clone();
			let outcome = tokio::task::spawn_blocking(move || {
				thumbnail::render_isometric(&glb_path, &task_output, &task_options)
			})
			.await;

			match outcome {
				Ok(Ok(_)) => {
					thumbnails.insert(uid.clone(), output);
				},
				Ok(Err(err)) => {
					tracing::warn!(uid, error = %err, "Thumbnail render failed.");
				},
				Err(err) => {
					tracing::warn!(uid, error = %err, "Thumbnail worker panicked.");
				},
			}
		}

		thumbnails
	}

	/// Full thumbnail pipeline: batch guard, download, render, encode.
	pub async fn thumbnails_base64(
		&self,
		uids: &[String],
	) -> ServiceResult<HashMap<String, String>> {
		ensure_batch(uids, self.cfg.materialize.max_thumbnail_batch)?;

		let paths = self.download_models(uids).await;
		let thumbnails = self.render_thumbnails(&paths).await;
		let mut encoded = HashMap::new();

		for (uid, path) in thumbnails {
			match tokio::fs::read(&path).await {
				Ok(bytes) => {
					encoded.insert(uid, BASE64.encode(bytes));
				},
				Err(err) => tracing::warn!(uid, error = %err, "Failed to read thumbnail."),
			}
		}

		Ok(encoded)
	}

	/// Downloads 1k diffuse maps for material previews, cache first.
	pub async fn download_previews(
		&self,
		uids: &[String],
	) -> ServiceResult<HashMap<String, PathBuf>> {
		ensure_batch(uids, self.cfg.materialize.max_preview_batch)?;

		let mut resolved = HashMap::new();
		let mut seen = HashSet::new();

		for uid in uids {
			if !seen.insert(uid.as_str()) {
				continue;
			}

			let path = preview_cache_path(&self.cfg.materialize.cache_dir, uid);

			if path.exists() {
				resolved.insert(uid.clone(), path);

				continue;
			}

			match self
				.providers
				.previews
				.fetch_diffuse_1k(&self.cfg.providers.polyhaven, uid)
				.await
			{
				Ok(Some(bytes)) => {
					if let Err(err) = write_cache_entry(&path, &bytes).await {
						tracing::warn!(uid, error = %err, "Failed to store diffuse map.");

						continue;
					}

					resolved.insert(uid.clone(), path);
				},
				Ok(None) => tracing::warn!(uid, "No 1k diffuse map found."),
				Err(err) => tracing::warn!(uid, error = %err, "Diffuse map download failed."),
			}
		}

		Ok(resolved)
	}

	/// The cached GLB for a uid, materializing it on demand.
	pub async fn model_file(&self, uid: &str) -> ServiceResult<PathBuf> {
		let paths = self.download_models(std::slice::from_ref(&uid.to_string())).await;

		paths
			.get(uid)
			.cloned()
			.ok_or_else(|| ServiceError::NotFound { what: format!("asset {uid}") })
	}
}

/// Batch-size policy violations are rejected before any work starts.
fn ensure_batch(uids: &[String], cap: usize) -> ServiceResult<()> {
	if uids.is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "No asset uids provided.".to_string(),
		});
	}
	if uids.len() > cap {
		return Err(ServiceError::InvalidRequest {
			message: format!("Too many assets requested (max {cap})."),
		});
	}

	Ok(())
}

/// Concurrent writers on the same key race benignly: content per key is
/// deterministic, so the last writer wins with identical bytes.
async fn write_cache_entry(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
	if let Some(parent) = path.parent() {
		tokio::fs::create_dir_all(parent).await?;
	}

	tokio::fs::write(path, bytes).await
}
