use gdb_domain::{AssetType, Source};

/// An asset row projected for responses. Source-specific columns stay `None`
/// for the other source and are dropped from serialized output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AssetRecord {
	pub uid: String,
	pub url: String,
	pub tags: Vec<String>,
	pub source: Source,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub license: Option<String>,
	pub asset_type: AssetType,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub asset_category: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub asset_subcategory: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub geometric_complexity: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub has_textures: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub file_format: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub surface_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub material_properties: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolution_available: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub categories: Option<Vec<String>>,
}

/// A search hit: projection plus the oracle-computed similarity.
#[derive(Debug, Clone)]
pub struct ScoredAsset {
	pub asset: AssetRecord,
	pub similarity_score: f32,
}

/// Query-side embeddings. `sbert` is present only in hybrid deployments; the
/// adapters emit the combined distance expression when it is.
#[derive(Debug, Clone)]
pub struct QueryVectors {
	pub clip: Vec<f32>,
	pub sbert: Option<Vec<f32>>,
}

/// A row to insert. The clip embedding is required by construction; hybrid
/// deployments supply both vectors.
#[derive(Debug, Clone)]
pub struct NewAsset {
	pub record: AssetRecord,
	pub clip_embedding: Vec<f32>,
	pub sbert_embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct TableSearch {
	pub vectors: QueryVectors,
	pub limit: u32,
	/// Pushed into the oracle query as an equality predicate.
	pub category: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryCount {
	pub asset_category: String,
	pub count: i64,
}
