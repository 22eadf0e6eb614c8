//! Post-fetch attribute predicates.
//!
//! Predicates run after ranking rather than inside the similarity query, so
//! the candidate fetch over-provisions. Best effort only: an under-filled
//! page is returned as-is, never re-queried.

use gdb_domain::{AssetType, resolution};
use gdb_storage::models::ScoredAsset;

#[derive(Debug, Clone, Default)]
pub struct ObjectFilters {
	/// Pushed into the oracle query.
	pub category: Option<String>,
	pub has_textures: Option<bool>,
	pub complexity: Option<String>,
}

impl ObjectFilters {
	pub fn post_fetch_active(&self) -> bool {
		self.has_textures.is_some() || self.complexity.is_some()
	}
}

#[derive(Debug, Clone, Default)]
pub struct MaterialFilters {
	/// Pushed into the oracle query.
	pub category: Option<String>,
	pub surface_type: Option<String>,
	/// Texture is the corpus default and therefore not filtered on.
	pub asset_type: Option<AssetType>,
	pub resolution: Option<String>,
}

impl MaterialFilters {
	pub fn post_fetch_active(&self) -> bool {
		self.surface_type.is_some()
			|| self.resolution.is_some()
			|| matches!(self.asset_type, Some(asset_type) if asset_type != AssetType::Texture)
	}
}

/// Over-fetch policy: multiply the limit while any post-fetch predicate is
/// active, capped at the configured absolute ceiling.
pub(crate) fn fetch_limit(
	top_k: u32,
	post_fetch_active: bool,
	cfg: &gdb_config::Search,
) -> u32 {
	if post_fetch_active {
		top_k.saturating_mul(cfg.overfetch_factor).min(cfg.max_candidates)
	} else {
		top_k
	}
}

pub(crate) fn apply_object_filters(
	hits: Vec<ScoredAsset>,
	filters: &ObjectFilters,
) -> Vec<ScoredAsset> {
	hits.into_iter()
		.filter(|hit| {
			if let Some(has_textures) = filters.has_textures
				&& hit.asset.has_textures != Some(has_textures)
			{
				return false;
			}
			if let Some(complexity) = filters.complexity.as_deref()
				&& hit.asset.geometric_complexity.as_deref() != Some(complexity)
			{
				return false;
			}

			true
		})
		.collect()
}

pub(crate) fn apply_material_filters(
	hits: Vec<ScoredAsset>,
	filters: &MaterialFilters,
) -> Vec<ScoredAsset> {
	hits.into_iter()
		.filter(|hit| {
			if let Some(surface_type) = filters.surface_type.as_deref()
				&& hit.asset.surface_type.as_deref() != Some(surface_type)
			{
				return false;
			}
			if let Some(asset_type) = filters.asset_type
				&& asset_type != AssetType::Texture
				&& hit.asset.asset_type != asset_type
			{
				return false;
			}
			if let Some(requested) = filters.resolution.as_deref() {
				let available = hit.asset.resolution_available.as_deref().unwrap_or_default();

				if !resolution::meets_minimum(available, requested) {
					return false;
				}
			}

			true
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use gdb_domain::Source;
	use gdb_storage::models::AssetRecord;

	use super::*;

	fn search_cfg() -> gdb_config::Search {
		gdb_config::Search { default_top_k: 5, overfetch_factor: 3, max_candidates: 100 }
	}

	fn object_hit(uid: &str, has_textures: bool, complexity: &str) -> ScoredAsset {
		ScoredAsset {
			asset: AssetRecord {
				uid: uid.to_string(),
				url: String::new(),
				tags: Vec::new(),
				source: Source::Objaverse,
				license: None,
				asset_type: AssetType::Model,
				asset_category: Some("furniture".to_string()),
				asset_subcategory: None,
				geometric_complexity: Some(complexity.to_string()),
				has_textures: Some(has_textures),
				file_format: Some("glb".to_string()),
				surface_type: None,
				material_properties: None,
				resolution_available: None,
				categories: None,
			},
			similarity_score: 0.5,
		}
	}

	fn material_hit(uid: &str, surface_type: &str, resolutions: &[&str]) -> ScoredAsset {
		ScoredAsset {
			asset: AssetRecord {
				uid: uid.to_string(),
				url: String::new(),
				tags: Vec::new(),
				source: Source::Polyhaven,
				license: Some("CC0".to_string()),
				asset_type: AssetType::Texture,
				asset_category: Some("wood".to_string()),
				asset_subcategory: None,
				geometric_complexity: None,
				has_textures: None,
				file_format: None,
				surface_type: Some(surface_type.to_string()),
				material_properties: Some(Vec::new()),
				resolution_available: Some(
					resolutions.iter().map(|resolution| resolution.to_string()).collect(),
				),
				categories: None,
			},
			similarity_score: 0.5,
		}
	}

	#[test]
	fn limit_multiplies_only_under_post_filters() {
		let cfg = search_cfg();

		assert_eq!(fetch_limit(10, false, &cfg), 10);
		assert_eq!(fetch_limit(10, true, &cfg), 30);
	}

	#[test]
	fn limit_respects_absolute_ceiling() {
		let cfg = search_cfg();

		assert_eq!(fetch_limit(50, true, &cfg), 100);
	}

	#[test]
	fn object_filters_never_grow_the_result() {
		let hits = vec![
			object_hit("a", true, "simple"),
			object_hit("b", false, "complex"),
			object_hit("c", true, "complex"),
		];
		let unfiltered = apply_object_filters(hits.clone(), &ObjectFilters::default());

		assert_eq!(unfiltered.len(), 3);

		let textured = apply_object_filters(
			hits.clone(),
			&ObjectFilters { has_textures: Some(true), ..Default::default() },
		);

		assert_eq!(textured.len(), 2);

		let narrowed = apply_object_filters(
			hits,
			&ObjectFilters {
				has_textures: Some(true),
				complexity: Some("complex".to_string()),
				..Default::default()
			},
		);

		assert_eq!(narrowed.len(), 1);
		assert_eq!(narrowed[0].asset.uid, "c");
		assert!(narrowed.len() <= textured.len());
	}

	#[test]
	fn resolution_predicate_uses_the_ordinal_ladder() {
		let hits = vec![
			material_hit("low", "rough", &["1k", "2k"]),
			material_hit("high", "rough", &["1k", "8k"]),
		];
		let filtered = apply_material_filters(
			hits,
			&MaterialFilters { resolution: Some("4k".to_string()), ..Default::default() },
		);

		assert_eq!(filtered.len(), 1);
		assert_eq!(filtered[0].asset.uid, "high");
	}

	#[test]
	fn default_texture_type_is_not_filtered() {
		let hits = vec![material_hit("a", "rough", &["1k"])];
		let filters =
			MaterialFilters { asset_type: Some(AssetType::Texture), ..Default::default() };

		assert!(!filters.post_fetch_active());
		assert_eq!(apply_material_filters(hits, &filters).len(), 1);
	}

	#[test]
	fn hdri_type_filters_out_textures() {
		let hits = vec![material_hit("a", "rough", &["1k"])];
		let filters = MaterialFilters { asset_type: Some(AssetType::Hdri), ..Default::default() };

		assert!(filters.post_fetch_active());
		assert!(apply_material_filters(hits, &filters).is_empty());
	}
}
