//! Query embedding and cross-source ranking fusion.

use std::cmp::Ordering;

use gdb_config::EmbeddingProviderConfig;
use gdb_domain::categorize;
use gdb_storage::models::{AssetRecord, QueryVectors, ScoredAsset, TableSearch};

use crate::{
	GraphicsService, ServiceError, ServiceResult,
	filter::{self, MaterialFilters, ObjectFilters},
};

/// A ranked hit plus the read-time derived fields; never persisted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchItem {
	#[serde(flatten)]
	pub asset: AssetRecord,
	pub similarity_score: f32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub suggested_surfaces: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub usage: Option<String>,
}

impl GraphicsService {
	/// Cross-source search: one bounded oracle query per table, then a
	/// fan-in merge truncated to `top_k`. An empty corpus yields an empty
	/// list, not an error.
	pub async fn search_assets(
		&self,
		query: &str,
		top_k: Option<u32>,
		validate_scale: bool,
	) -> ServiceResult<Vec<SearchItem>> {
		let top_k = self.effective_top_k(top_k);
		let vectors = self.embed_query(query).await?;
		let mut per_table = Vec::with_capacity(self.tables.len());

		for table in &self.tables {
			let search = TableSearch { vectors: vectors.clone(), limit: top_k, category: None };

			per_table.push(table.search(&search).await?);
		}

		let mut merged = merge_ranked(per_table, top_k as usize);

		if merged.is_empty() {
			tracing::debug!(query, "No results found.");

			return Ok(Vec::new());
		}

		if validate_scale {
			let uids: Vec<String> = merged.iter().map(|hit| hit.asset.uid.clone()).collect();
			let paths = self.download_models(&uids).await;
			let checks = self.validate_scales(&paths).await?;

			merged.retain(|hit| {
				checks.get(&hit.asset.uid).map(|check| check.passed).unwrap_or(false)
			});
		}

		Ok(merged.into_iter().map(plain_item).collect())
	}

	/// Objaverse-only search with attribute filtering. The category predicate
	/// is pushed into the oracle query; the rest narrow the over-fetched
	/// candidate list afterwards.
	pub async fn search_objects(
		&self,
		query: &str,
		top_k: Option<u32>,
		filters: &ObjectFilters,
	) -> ServiceResult<Vec<SearchItem>> {
		let top_k = self.effective_top_k(top_k);
		let limit = filter::fetch_limit(top_k, filters.post_fetch_active(), &self.cfg.search);
		let vectors = self.embed_query(query).await?;
		let table = self.table(gdb_domain::Source::Objaverse)?;
		let search = TableSearch { vectors, limit, category: filters.category.clone() };
		let hits = table.search(&search).await?;
		let mut filtered = filter::apply_object_filters(hits, filters);

		filtered.truncate(top_k as usize);

		Ok(filtered.into_iter().map(object_item).collect())
	}

	/// Poly Haven-only search with attribute filtering.
	pub async fn search_materials(
		&self,
		query: &str,
		top_k: Option<u32>,
		filters: &MaterialFilters,
	) -> ServiceResult<Vec<SearchItem>> {
		let top_k = self.effective_top_k(top_k);
		let limit = filter::fetch_limit(top_k, filters.post_fetch_active(), &self.cfg.search);
		let vectors = self.embed_query(query).await?;
		let table = self.table(gdb_domain::Source::Polyhaven)?;
		let search = TableSearch { vectors, limit, category: filters.category.clone() };
		let hits = table.search(&search).await?;
		let mut filtered = filter::apply_material_filters(hits, filters);

		filtered.truncate(top_k as usize);

		Ok(filtered.into_iter().map(material_item).collect())
	}

	pub(crate) async fn embed_query(&self, query: &str) -> ServiceResult<QueryVectors> {
		let clip = self.embed_single(&self.cfg.providers.clip, query).await?;
		let sbert = match self.cfg.providers.sbert.as_ref() {
			Some(cfg) => Some(self.embed_single(cfg, query).await?),
			None => None,
		};

		Ok(QueryVectors { clip, sbert })
	}

	async fn embed_single(
		&self,
		cfg: &EmbeddingProviderConfig,
		query: &str,
	) -> ServiceResult<Vec<f32>> {
		let embeddings = self
			.providers
			.embedding
			.embed(cfg, std::slice::from_ref(&query.to_string()))
			.await?;
		let Some(vector) = embeddings.into_iter().next() else {
			return Err(ServiceError::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vector.len() != cfg.dimensions as usize {
			return Err(ServiceError::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}

	fn effective_top_k(&self, top_k: Option<u32>) -> u32 {
		top_k.unwrap_or(self.cfg.search.default_top_k).max(1)
	}
}

/// Fan-in merge of per-table rankings: descending by similarity, stable, so
/// ties keep the oracle order within a table and table priority across
/// tables. Worst case inspects `top_k × tables` rows and returns `top_k`.
pub(crate) fn merge_ranked(per_table: Vec<Vec<ScoredAsset>>, top_k: usize) -> Vec<ScoredAsset> {
	let mut merged: Vec<ScoredAsset> = per_table.into_iter().flatten().collect();

	merged.sort_by(|a, b| {
		b.similarity_score.partial_cmp(&a.similarity_score).unwrap_or(Ordering::Equal)
	});
	merged.truncate(top_k);

	merged
}

fn plain_item(hit: ScoredAsset) -> SearchItem {
	SearchItem {
		asset: hit.asset,
		similarity_score: hit.similarity_score,
		suggested_surfaces: None,
		usage: None,
	}
}

fn object_item(hit: ScoredAsset) -> SearchItem {
	SearchItem {
		asset: hit.asset,
		similarity_score: hit.similarity_score,
		suggested_surfaces: None,
		usage: Some("place_in_scene".to_string()),
	}
}

fn material_item(hit: ScoredAsset) -> SearchItem {
	let suggested = hit
		.asset
		.asset_category
		.as_deref()
		.map(categorize::suggested_surfaces)
		.unwrap_or_else(|| categorize::suggested_surfaces(""));

	SearchItem {
		suggested_surfaces: Some(suggested.iter().map(|surface| surface.to_string()).collect()),
		usage: Some("apply_to_surface".to_string()),
		similarity_score: hit.similarity_score,
		asset: hit.asset,
	}
}
