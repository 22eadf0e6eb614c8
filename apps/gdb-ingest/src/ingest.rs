//! Corpus loading: provider listings → embeddings → categorized rows.

use color_eyre::{Result, eyre};

use gdb_config::EmbeddingProviderConfig;
use gdb_domain::{AssetType, Source, categorize, describe};
use gdb_providers::{objaverse, polyhaven};
use gdb_service::GraphicsService;
use gdb_storage::models::{AssetRecord, NewAsset};

/// How many candidates to collect before validation. Validation rejects a
/// fraction, so the loader over-collects 2x and stops early once the
/// validated quota is met.
fn collection_target(limit: Option<usize>, validate_scale: bool) -> Option<usize> {
	match (limit, validate_scale) {
		(Some(limit), true) => Some(limit * 2),
		(limit, false) => limit,
		(None, true) => None,
	}
}

pub async fn ingest_objaverse(
	service: &GraphicsService,
	limit: Option<usize>,
	validate_scale: bool,
) -> Result<()> {
	let cfg = &service.cfg;
	let annotations = objaverse::list_annotations(&cfg.providers.objaverse).await?;
	let target = collection_target(limit, validate_scale);

	// Stable order across runs; the listing is an unordered map.
	let mut uids: Vec<String> = annotations.keys().cloned().collect();

	uids.sort();

	let mut candidates = Vec::new();

	for uid in uids {
		let annotation = &annotations[&uid];

		if !annotation.is_complete() {
			continue;
		}

		candidates.push((uid, annotation.clone()));

		if let Some(target) = target
			&& candidates.len() >= target
		{
			break;
		}
	}

	tracing::info!(count = candidates.len(), "Collected candidate annotations.");

	let texts: Vec<String> = candidates
		.iter()
		.map(|(uid, annotation)| {
			let name = annotation.name.clone().unwrap_or_else(|| uid.clone());

			describe::embedding_text(&name, &[], &annotation.tag_names())
		})
		.collect();
	let clip_vectors = embed_batch(service, &cfg.providers.clip, &texts).await?;
	let sbert_vectors = match cfg.providers.sbert.as_ref() {
		Some(sbert_cfg) => Some(embed_batch(service, sbert_cfg, &texts).await?),
		None => None,
	};

	let mut rows = Vec::with_capacity(candidates.len());

	for (index, (uid, annotation)) in candidates.into_iter().enumerate() {
		let tags = annotation.tag_names();
		let derived = categorize::categorize_objaverse(&tags);
		let record = AssetRecord {
			uid,
			url: annotation.viewer_url.clone().unwrap_or_default(),
			tags,
			source: Source::Objaverse,
			license: annotation.license.clone(),
			asset_type: AssetType::Model,
			asset_category: Some(derived.asset_category),
			asset_subcategory: None,
			geometric_complexity: Some(derived.geometric_complexity),
			has_textures: Some(derived.has_textures),
			file_format: Some(derived.file_format),
			surface_type: None,
			material_properties: None,
			resolution_available: None,
			categories: None,
		};

		rows.push(NewAsset {
			record,
			clip_embedding: clip_vectors[index].clone(),
			sbert_embedding: sbert_vectors.as_ref().map(|vectors| vectors[index].clone()),
		});
	}

	if validate_scale && !rows.is_empty() {
		let uids: Vec<String> = rows.iter().map(|row| row.record.uid.clone()).collect();

		tracing::info!(count = uids.len(), "Downloading GLB files for scale validation.");

		let paths = service.download_models(&uids).await;
		let checks = service.validate_scales(&paths).await?;
		let before = rows.len();

		rows.retain(|row| {
			checks.get(&row.record.uid).map(|check| check.passed).unwrap_or(false)
		});

		tracing::info!(
			passed = rows.len(),
			rejected = before - rows.len(),
			"Scale validation complete.",
		);
	}

	if let Some(limit) = limit {
		rows.truncate(limit);
	}

	if rows.is_empty() {
		tracing::warn!("Nothing to insert.");

		return Ok(());
	}

	let inserted = service
		.table(Source::Objaverse)
		.map_err(|err| eyre::eyre!(err.to_string()))?
		.insert(&rows)
		.await?;

	tracing::info!(inserted, "Inserted Objaverse assets.");

	Ok(())
}

pub async fn ingest_polyhaven(
	service: &GraphicsService,
	limit: Option<usize>,
	asset_type: &str,
) -> Result<()> {
	if !matches!(asset_type, "textures" | "hdris") {
		return Err(eyre::eyre!("asset_type must be textures or hdris."));
	}

	let cfg = &service.cfg;
	let listing = polyhaven::list_assets(&cfg.providers.polyhaven, asset_type).await?;
	let row_type = asset_type
		.strip_suffix('s')
		.and_then(AssetType::parse)
		.unwrap_or(AssetType::Texture);

	let mut asset_ids: Vec<String> = listing.keys().cloned().collect();

	asset_ids.sort();

	let mut rows = Vec::new();

	for asset_id in asset_ids {
		if let Some(limit) = limit
			&& rows.len() >= limit
		{
			break;
		}

		let Some(info) = polyhaven::asset_info(&cfg.providers.polyhaven, &asset_id).await? else {
			tracing::warn!(asset_id, "Failed to fetch asset info, skipping.");

			continue;
		};
		let text = describe::embedding_text(&asset_id, &info.categories, &info.tags);

		if text.trim().is_empty() {
			tracing::warn!(asset_id, "Empty text description, skipping.");

			continue;
		}

		let clip = embed_batch(service, &cfg.providers.clip, std::slice::from_ref(&text))
			.await?
			.remove(0);
		let sbert = match cfg.providers.sbert.as_ref() {
			Some(sbert_cfg) =>
				Some(embed_batch(service, sbert_cfg, std::slice::from_ref(&text)).await?.remove(0)),
			None => None,
		};

		let mut tags = info.categories.clone();

		tags.extend(info.tags.iter().cloned());

		let derived = categorize::categorize_polyhaven(&asset_id, &tags);
		let record = AssetRecord {
			url: format!("https://polyhaven.com/a/{asset_id}"),
			uid: asset_id,
			tags,
			source: Source::Polyhaven,
			license: Some("CC0".to_string()),
			asset_type: row_type,
			asset_category: Some(derived.asset_category),
			asset_subcategory: Some(derived.asset_subcategory),
			geometric_complexity: None,
			has_textures: None,
			file_format: None,
			surface_type: Some(derived.surface_type),
			material_properties: Some(derived.material_properties),
			resolution_available: Some(derived.resolution_available),
			categories: Some(info.categories),
		};

		rows.push(NewAsset { record, clip_embedding: clip, sbert_embedding: sbert });
	}

	if rows.is_empty() {
		tracing::warn!("Nothing to insert.");

		return Ok(());
	}

	let inserted = service
		.table(Source::Polyhaven)
		.map_err(|err| eyre::eyre!(err.to_string()))?
		.insert(&rows)
		.await?;

	tracing::info!(inserted, "Inserted Poly Haven assets.");

	Ok(())
}

async fn embed_batch(
	service: &GraphicsService,
	cfg: &EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let vectors = service.providers.embedding.embed(cfg, texts).await?;

	if vectors.len() != texts.len() {
		return Err(eyre::eyre!("Embedding provider returned a mismatched vector count."));
	}
	for vector in &vectors {
		if vector.len() != cfg.dimensions as usize {
			return Err(eyre::eyre!("Embedding vector dimension mismatch."));
		}
	}

	Ok(vectors)
}
