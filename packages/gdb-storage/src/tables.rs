//! One adapter per source table behind a single capability contract.
//!
//! Uids are unique only within a table; callers that need cross-source lookup
//! probe adapters in a fixed priority order.

use std::{future::Future, pin::Pin};

use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use gdb_domain::{AssetType, Source};

use crate::{
	Error, Result,
	models::{AssetRecord, CategoryCount, NewAsset, ScoredAsset, TableSearch},
	vector_literal,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const OBJAVERSE_COLUMNS: &str = "\
uid, viewer_url AS url, tags, license, asset_category, geometric_complexity, has_textures, \
file_format";
const POLYHAVEN_COLUMNS: &str = "\
uid, polyhaven_url AS url, tags, categories, asset_category, asset_subcategory, surface_type, \
material_properties, resolution_available, asset_type";

pub trait AssetTable
where
	Self: Send + Sync,
{
	fn source(&self) -> Source;

	fn table_name(&self) -> &'static str;

	fn search<'a>(&'a self, query: &'a TableSearch) -> BoxFuture<'a, Result<Vec<ScoredAsset>>>;

	fn insert<'a>(&'a self, rows: &'a [NewAsset]) -> BoxFuture<'a, Result<u64>>;

	fn get_by_uid<'a>(&'a self, uid: &'a str) -> BoxFuture<'a, Result<Option<AssetRecord>>>;

	fn count<'a>(&'a self) -> BoxFuture<'a, Result<i64>>;

	fn get_by_category<'a>(
		&'a self,
		category: &'a str,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<AssetRecord>>>;

	fn categories<'a>(&'a self) -> BoxFuture<'a, Result<Vec<CategoryCount>>>;

	/// Surface types are a Poly Haven concept; other sources report nothing.
	fn get_by_surface_type<'a>(
		&'a self,
		_surface_type: &'a str,
		_limit: i64,
	) -> BoxFuture<'a, Result<Vec<AssetRecord>>> {
		Box::pin(async { Ok(Vec::new()) })
	}
}

pub struct ObjaverseTable {
	pool: PgPool,
}
impl ObjaverseTable {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

pub struct PolyhavenTable {
	pool: PgPool,
}
impl PolyhavenTable {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

impl AssetTable for ObjaverseTable {
	fn source(&self) -> Source {
		Source::Objaverse
	}

	fn table_name(&self) -> &'static str {
		"objaverse_assets"
	}

	fn search<'a>(&'a self, query: &'a TableSearch) -> BoxFuture<'a, Result<Vec<ScoredAsset>>> {
		Box::pin(search_rows(&self.pool, self.table_name(), OBJAVERSE_COLUMNS, query, objaverse_record))
	}

	fn insert<'a>(&'a self, rows: &'a [NewAsset]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			check_rows_source(rows, Source::Objaverse)?;

			let mut tx = self.pool.begin().await?;

			for row in rows {
				sqlx::query(
					"\
INSERT INTO objaverse_assets (
	uid, viewer_url, license, tags, asset_category, geometric_complexity, has_textures,
	file_format, clip_embedding, sbert_embedding
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::text::vector, $10::text::vector)",
				)
				.bind(&row.record.uid)
				.bind(&row.record.url)
				.bind(&row.record.license)
				.bind(&row.record.tags)
				.bind(&row.record.asset_category)
				.bind(&row.record.geometric_complexity)
				.bind(row.record.has_textures.unwrap_or(false))
				.bind(row.record.file_format.as_deref().unwrap_or("glb"))
				.bind(vector_literal(&row.clip_embedding))
				.bind(row.sbert_embedding.as_deref().map(vector_literal))
				.execute(&mut *tx)
				.await?;
			}

			tx.commit().await?;

			Ok(rows.len() as u64)
		})
	}

	fn get_by_uid<'a>(&'a self, uid: &'a str) -> BoxFuture<'a, Result<Option<AssetRecord>>> {
		Box::pin(async move {
			let sql =
				format!("SELECT {OBJAVERSE_COLUMNS} FROM objaverse_assets WHERE uid = $1");
			let row = sqlx::query(&sql).bind(uid).fetch_optional(&self.pool).await?;

			row.as_ref().map(objaverse_record).transpose()
		})
	}

	fn count<'a>(&'a self) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move {
			let count = sqlx::query_scalar("SELECT COUNT(*) FROM objaverse_assets")
				.fetch_one(&self.pool)
				.await?;

			Ok(count)
		})
	}

	fn get_by_category<'a>(
		&'a self,
		category: &'a str,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<AssetRecord>>> {
		Box::pin(fetch_by_category(
			&self.pool,
			"objaverse_assets",
			OBJAVERSE_COLUMNS,
			category,
			limit,
			objaverse_record,
		))
	}

	fn categories<'a>(&'a self) -> BoxFuture<'a, Result<Vec<CategoryCount>>> {
		Box::pin(fetch_categories(&self.pool, "objaverse_assets"))
	}
}

impl AssetTable for PolyhavenTable {
	fn source(&self) -> Source {
		Source::Polyhaven
	}

	fn table_name(&self) -> &'static str {
		"polyhaven_assets"
	}

	fn search<'a>(&'a self, query: &'a TableSearch) -> BoxFuture<'a, Result<Vec<ScoredAsset>>> {
		Box::pin(search_rows(&self.pool, self.table_name(), POLYHAVEN_COLUMNS, query, polyhaven_record))
	}

	fn insert<'a>(&'a self, rows: &'a [NewAsset]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			check_rows_source(rows, Source::Polyhaven)?;

			let mut tx = self.pool.begin().await?;

			for row in rows {
				sqlx::query(
					"\
INSERT INTO polyhaven_assets (
	uid, polyhaven_url, asset_category, asset_subcategory, surface_type,
	material_properties, resolution_available, tags, categories, asset_type,
	clip_embedding, sbert_embedding
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::text::vector, $12::text::vector)",
				)
				.bind(&row.record.uid)
				.bind(&row.record.url)
				.bind(&row.record.asset_category)
				.bind(&row.record.asset_subcategory)
				.bind(&row.record.surface_type)
				.bind(row.record.material_properties.clone().unwrap_or_default())
				.bind(row.record.resolution_available.clone().unwrap_or_default())
				.bind(&row.record.tags)
				.bind(row.record.categories.clone().unwrap_or_default())
				.bind(row.record.asset_type.as_str())
				.bind(vector_literal(&row.clip_embedding))
				.bind(row.sbert_embedding.as_deref().map(vector_literal))
				.execute(&mut *tx)
				.await?;
			}

			tx.commit().await?;

			Ok(rows.len() as u64)
		})
	}

	fn get_by_uid<'a>(&'a self, uid: &'a str) -> BoxFuture<'a, Result<Option<AssetRecord>>> {
		Box::pin(async move {
			let sql =
				format!("SELECT {POLYHAVEN_COLUMNS} FROM polyhaven_assets WHERE uid = $1");
			let row = sqlx::query(&sql).bind(uid).fetch_optional(&self.pool).await?;

			row.as_ref().map(polyhaven_record).transpose()
		})
	}

	fn count<'a>(&'a self) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move {
			let count = sqlx::query_scalar("SELECT COUNT(*) FROM polyhaven_assets")
				.fetch_one(&self.pool)
				.await?;

			Ok(count)
		})
	}

	fn get_by_category<'a>(
		&'a self,
		category: &'a str,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<AssetRecord>>> {
		Box::pin(fetch_by_category(
			&self.pool,
			"polyhaven_assets",
			POLYHAVEN_COLUMNS,
			category,
			limit,
			polyhaven_record,
		))
	}

	fn categories<'a>(&'a self) -> BoxFuture<'a, Result<Vec<CategoryCount>>> {
		Box::pin(fetch_categories(&self.pool, "polyhaven_assets"))
	}

	fn get_by_surface_type<'a>(
		&'a self,
		surface_type: &'a str,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<AssetRecord>>> {
		Box::pin(async move {
			let sql = format!(
				"SELECT {POLYHAVEN_COLUMNS} FROM polyhaven_assets WHERE surface_type = $1 LIMIT $2"
			);
			let rows =
				sqlx::query(&sql).bind(surface_type).bind(limit).fetch_all(&self.pool).await?;

			rows.iter().map(polyhaven_record).collect()
		})
	}
}

async fn search_rows(
	pool: &PgPool,
	table: &str,
	columns: &str,
	query: &TableSearch,
	map_record: fn(&PgRow) -> Result<AssetRecord>,
) -> Result<Vec<ScoredAsset>> {
	let clip = vector_literal(&query.vectors.clip);
	let sbert = query.vectors.sbert.as_ref().map(|vector| vector_literal(vector));
	let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");

	qb.push(columns);
	qb.push(", (");
	push_similarity(&mut qb, &clip, sbert.as_deref());
	qb.push(")::real AS similarity_score FROM ");
	qb.push(table);

	if let Some(category) = query.category.as_deref() {
		qb.push(" WHERE asset_category = ");
		qb.push_bind(category.to_string());
	}

	qb.push(" ORDER BY ");
	push_distance(&mut qb, &clip, sbert.as_deref());
	qb.push(" LIMIT ");
	qb.push_bind(query.limit as i64);

	let rows = qb.build().fetch_all(pool).await?;
	let mut hits = Vec::with_capacity(rows.len());

	for row in &rows {
		let asset = map_record(row)?;
		let similarity_score: f32 = row.try_get("similarity_score")?;

		hits.push(ScoredAsset { asset, similarity_score });
	}

	Ok(hits)
}

/// Hybrid score: sum of the per-space cosine similarities.
fn push_similarity(qb: &mut QueryBuilder<'_, Postgres>, clip: &str, sbert: Option<&str>) {
	match sbert {
		Some(sbert) => {
			qb.push("(1 - (clip_embedding <=> ");
			qb.push_bind(clip.to_string());
			qb.push("::text::vector)) + (1 - (sbert_embedding <=> ");
			qb.push_bind(sbert.to_string());
			qb.push("::text::vector))");
		},
		None => {
			qb.push("1 - (clip_embedding <=> ");
			qb.push_bind(clip.to_string());
			qb.push("::text::vector)");
		},
	}
}

/// Ordering uses the distance sum directly; it is monotonic with the
/// similarity sum and saves the subtraction per row.
fn push_distance(qb: &mut QueryBuilder<'_, Postgres>, clip: &str, sbert: Option<&str>) {
	match sbert {
		Some(sbert) => {
			qb.push("(clip_embedding <=> ");
			qb.push_bind(clip.to_string());
			qb.push("::text::vector) + (sbert_embedding <=> ");
			qb.push_bind(sbert.to_string());
			qb.push("::text::vector)");
		},
		None => {
			qb.push("clip_embedding <=> ");
			qb.push_bind(clip.to_string());
			qb.push("::text::vector");
		},
	}
}

async fn fetch_by_category(
	pool: &PgPool,
	table: &str,
	columns: &str,
	category: &str,
	limit: i64,
	map_record: fn(&PgRow) -> Result<AssetRecord>,
) -> Result<Vec<AssetRecord>> {
	let sql = format!("SELECT {columns} FROM {table} WHERE asset_category = $1 LIMIT $2");
	let rows = sqlx::query(&sql).bind(category).bind(limit).fetch_all(pool).await?;

	rows.iter().map(map_record).collect()
}

async fn fetch_categories(pool: &PgPool, table: &str) -> Result<Vec<CategoryCount>> {
	let sql = format!(
		"\
SELECT asset_category, COUNT(*) AS count
FROM {table}
WHERE asset_category IS NOT NULL
GROUP BY asset_category
ORDER BY count DESC"
	);
	let rows = sqlx::query(&sql).fetch_all(pool).await?;

	rows.iter()
		.map(|row| {
			Ok(CategoryCount {
				asset_category: row.try_get("asset_category")?,
				count: row.try_get("count")?,
			})
		})
		.collect()
}

fn check_rows_source(rows: &[NewAsset], expected: Source) -> Result<()> {
	for row in rows {
		if row.record.source != expected {
			return Err(Error::InvalidArgument(format!(
				"Row {} belongs to source {}, not {}.",
				row.record.uid, row.record.source, expected
			)));
		}
	}

	Ok(())
}

fn objaverse_record(row: &PgRow) -> Result<AssetRecord> {
	Ok(AssetRecord {
		uid: row.try_get("uid")?,
		url: row.try_get("url")?,
		tags: row.try_get::<Option<Vec<String>>, _>("tags")?.unwrap_or_default(),
		source: Source::Objaverse,
		license: row.try_get("license")?,
		asset_type: AssetType::Model,
		asset_category: row.try_get("asset_category")?,
		asset_subcategory: None,
		geometric_complexity: row.try_get("geometric_complexity")?,
		has_textures: row.try_get("has_textures")?,
		file_format: row.try_get("file_format")?,
		surface_type: None,
		material_properties: None,
		resolution_available: None,
		categories: None,
	})
}

fn polyhaven_record(row: &PgRow) -> Result<AssetRecord> {
	let asset_type: String = row.try_get("asset_type")?;

	Ok(AssetRecord {
		uid: row.try_get("uid")?,
		url: row.try_get("url")?,
		tags: row.try_get::<Option<Vec<String>>, _>("tags")?.unwrap_or_default(),
		source: Source::Polyhaven,
		// Poly Haven publishes everything under CC0.
		license: Some("CC0".to_string()),
		asset_type: AssetType::parse(&asset_type).unwrap_or(AssetType::Texture),
		asset_category: row.try_get("asset_category")?,
		asset_subcategory: row.try_get("asset_subcategory")?,
		geometric_complexity: None,
		has_textures: None,
		file_format: None,
		surface_type: row.try_get("surface_type")?,
		material_properties: row.try_get("material_properties")?,
		resolution_available: row.try_get("resolution_available")?,
		categories: row.try_get("categories")?,
	})
}
