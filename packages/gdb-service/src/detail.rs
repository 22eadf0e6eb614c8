//! Single-asset lookups, dimensions, and liveness.

use std::collections::BTreeMap;

use gdb_domain::Source;
use gdb_geometry::aabb;
use gdb_storage::models::{AssetRecord, CategoryCount};

use crate::{GraphicsService, ServiceError, ServiceResult};

#[derive(Debug, Clone, serde::Serialize)]
pub struct Dimensions {
	pub x: f32,
	pub y: f32,
	pub z: f32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AssetMetadata {
	pub uid: String,
	pub dimensions: Dimensions,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Healthcheck {
	pub status: &'static str,
	pub db: &'static str,
	pub data_exists: bool,
	pub counts: BTreeMap<&'static str, i64>,
}

impl GraphicsService {
	/// Cross-source lookup. Tables are probed in the service's fixed priority
	/// order (model table first), so a uid that collides across sources
	/// resolves to the earlier table by policy, not by accident.
	pub async fn get_asset(&self, uid: &str) -> ServiceResult<AssetRecord> {
		for table in &self.tables {
			if let Some(record) = table.get_by_uid(uid).await? {
				return Ok(record);
			}
		}

		Err(ServiceError::NotFound { what: format!("asset {uid}") })
	}

	/// Bounding-box dimensions of the materialized GLB.
	pub async fn asset_metadata(&self, uid: &str) -> ServiceResult<AssetMetadata> {
		let path = self.model_file(uid).await?;
		let bounds = tokio::task::spawn_blocking(move || aabb::bounds_from_file(&path))
			.await
			.map_err(|err| ServiceError::Storage { message: err.to_string() })?
			.map_err(|err| ServiceError::Storage {
				message: format!("Failed to measure asset {uid}: {err}"),
			})?;
		let [x, y, z] = bounds.dimensions();

		Ok(AssetMetadata { uid: uid.to_string(), dimensions: Dimensions { x, y, z } })
	}

	pub async fn healthcheck(&self) -> ServiceResult<Healthcheck> {
		let mut counts = BTreeMap::new();

		for table in &self.tables {
			counts.insert(table.source().as_str(), table.count().await?);
		}

		let data_exists = counts.values().any(|count| *count > 0);

		Ok(Healthcheck { status: "ok", db: "ok", data_exists, counts })
	}

	pub async fn categories(&self, source: Source) -> ServiceResult<Vec<CategoryCount>> {
		Ok(self.table(source)?.categories().await?)
	}

	pub async fn assets_by_category(
		&self,
		source: Source,
		category: &str,
		limit: i64,
	) -> ServiceResult<Vec<AssetRecord>> {
		Ok(self.table(source)?.get_by_category(category, limit).await?)
	}

	pub async fn materials_by_surface_type(
		&self,
		surface_type: &str,
		limit: i64,
	) -> ServiceResult<Vec<AssetRecord>> {
		Ok(self.table(Source::Polyhaven)?.get_by_surface_type(surface_type, limit).await?)
	}
}
