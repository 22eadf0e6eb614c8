/// Renders the bootstrap DDL for both source tables. Statements are split on
/// ';' by the caller, so none of them may embed a semicolon.
pub fn render_schema(clip_dim: u32, sbert_dim: u32) -> String {
	format!(
		"\
CREATE EXTENSION IF NOT EXISTS vector;
CREATE TABLE IF NOT EXISTS objaverse_assets (
	uid TEXT PRIMARY KEY,
	viewer_url TEXT NOT NULL,
	license TEXT,
	tags TEXT[] NOT NULL DEFAULT '{{}}',
	asset_category TEXT,
	geometric_complexity TEXT,
	has_textures BOOLEAN NOT NULL DEFAULT FALSE,
	file_format TEXT NOT NULL DEFAULT 'glb',
	clip_embedding VECTOR({clip_dim}) NOT NULL,
	sbert_embedding VECTOR({sbert_dim}),
	created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS objaverse_assets_clip_idx
	ON objaverse_assets USING hnsw (clip_embedding vector_cosine_ops);
CREATE INDEX IF NOT EXISTS objaverse_assets_sbert_idx
	ON objaverse_assets USING hnsw (sbert_embedding vector_cosine_ops);
CREATE INDEX IF NOT EXISTS objaverse_assets_category_idx
	ON objaverse_assets (asset_category);
CREATE TABLE IF NOT EXISTS polyhaven_assets (
	uid TEXT PRIMARY KEY,
	polyhaven_url TEXT NOT NULL,
	asset_category TEXT,
	asset_subcategory TEXT,
	surface_type TEXT,
	material_properties TEXT[] NOT NULL DEFAULT '{{}}',
	resolution_available TEXT[] NOT NULL DEFAULT '{{}}',
	tags TEXT[] NOT NULL DEFAULT '{{}}',
	categories TEXT[] NOT NULL DEFAULT '{{}}',
	asset_type TEXT NOT NULL DEFAULT 'texture',
	clip_embedding VECTOR({clip_dim}) NOT NULL,
	sbert_embedding VECTOR({sbert_dim}),
	created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS polyhaven_assets_clip_idx
	ON polyhaven_assets USING hnsw (clip_embedding vector_cosine_ops);
CREATE INDEX IF NOT EXISTS polyhaven_assets_sbert_idx
	ON polyhaven_assets USING hnsw (sbert_embedding vector_cosine_ops);
CREATE INDEX IF NOT EXISTS polyhaven_assets_category_idx
	ON polyhaven_assets (asset_category)"
	)
}
