use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gdb_domain::Source;
use gdb_service::{MaterialFilters, ObjectFilters, SearchItem, ServiceError};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/healthcheck", get(healthcheck))
		.route("/api/v0/assets/search", get(search_assets))
		.route("/api/v0/assets/thumbnails", post(asset_thumbnails))
		.route("/api/v0/assets/download/{asset_uid}/glb", get(download_glb))
		.route("/api/v0/assets/{asset_uid}/metadata", get(asset_metadata))
		.route("/api/v0/objects/search", get(search_objects))
		.route("/api/v0/objects/categories", get(object_categories))
		.route("/api/v0/objects/category/{category_name}", get(objects_by_category))
		.route("/api/v0/objects/thumbnails", post(object_thumbnails))
		.route("/api/v0/objects/{object_uid}", get(object_details))
		.route("/api/v0/materials/search", get(search_materials))
		.route("/api/v0/materials/categories", get(material_categories))
		.route("/api/v0/materials/surface-types", get(surface_types))
		.route("/api/v0/materials/category/{category_name}", get(materials_by_category))
		.route("/api/v0/materials/previews", post(material_previews))
		.route("/api/v0/materials/surface/{surface_type}", get(materials_by_surface))
		.route("/api/v0/materials/{material_uid}", get(material_details))
		.with_state(state)
}

async fn healthcheck(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	let health = state.service.healthcheck().await?;

	Ok(Json(serde_json::to_value(health).map_err(internal)?))
}

#[derive(Debug, Deserialize)]
struct AssetSearchParams {
	query: String,
	top_k: Option<u32>,
	#[serde(default)]
	validate_scale: bool,
}

async fn search_assets(
	State(state): State<AppState>,
	Query(params): Query<AssetSearchParams>,
) -> Result<Json<Vec<SearchItem>>, ApiError> {
	check_top_k(params.top_k)?;

	let items = state
		.service
		.search_assets(&params.query, params.top_k, params.validate_scale)
		.await?;

	Ok(Json(items))
}

#[derive(Debug, Deserialize)]
struct AssetThumbnailsRequest {
	asset_uids: Vec<String>,
}

async fn asset_thumbnails(
	State(state): State<AppState>,
	Json(request): Json<AssetThumbnailsRequest>,
) -> Result<Json<Value>, ApiError> {
	let thumbnails = state.service.thumbnails_base64(&request.asset_uids).await?;

	Ok(Json(serde_json::to_value(thumbnails).map_err(internal)?))
}

async fn download_glb(
	State(state): State<AppState>,
	Path(asset_uid): Path<String>,
) -> Result<Response, ApiError> {
	let path = state.service.model_file(&asset_uid).await?;
	let bytes = tokio::fs::read(&path).await.map_err(|err| {
		tracing::error!(asset_uid, error = %err, "Failed to read cached GLB.");

		ApiError::new(
			StatusCode::INTERNAL_SERVER_ERROR,
			"storage_error",
			"Failed to serve .glb file.",
		)
	})?;
	let headers = [
		(header::CONTENT_TYPE, "model/gltf-binary".to_string()),
		(
			header::CONTENT_DISPOSITION,
			format!("attachment; filename=\"{asset_uid}.glb\""),
		),
	];

	Ok((headers, bytes).into_response())
}

async fn asset_metadata(
	State(state): State<AppState>,
	Path(asset_uid): Path<String>,
) -> Result<Json<Value>, ApiError> {
	let metadata = state.service.asset_metadata(&asset_uid).await?;

	Ok(Json(serde_json::to_value(metadata).map_err(internal)?))
}

#[derive(Debug, Deserialize)]
struct ObjectSearchParams {
	query: String,
	top_k: Option<u32>,
	category: Option<String>,
	has_textures: Option<bool>,
	complexity: Option<String>,
}

#[derive(Debug, Serialize)]
struct ObjectSearchResponse {
	results: Vec<SearchItem>,
	query: String,
	total_results: usize,
	filters_applied: Value,
}

async fn search_objects(
	State(state): State<AppState>,
	Query(params): Query<ObjectSearchParams>,
) -> Result<Json<ObjectSearchResponse>, ApiError> {
	check_top_k(params.top_k)?;

	if let Some(complexity) = params.complexity.as_deref()
		&& !matches!(complexity, "simple" | "moderate" | "complex")
	{
		return Err(bad_request("complexity must be one of simple, moderate, or complex."));
	}

	let filters = ObjectFilters {
		category: params.category.clone(),
		has_textures: params.has_textures,
		complexity: params.complexity.clone(),
	};
	let results = state.service.search_objects(&params.query, params.top_k, &filters).await?;

	Ok(Json(ObjectSearchResponse {
		total_results: results.len(),
		filters_applied: serde_json::json!({
			"category": params.category,
			"has_textures": params.has_textures,
			"complexity": params.complexity,
		}),
		query: params.query,
		results,
	}))
}

async fn object_categories(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	let categories = state.service.categories(Source::Objaverse).await?;

	Ok(Json(serde_json::json!({
		"total_categories": categories.len(),
		"categories": categories,
	})))
}

#[derive(Debug, Deserialize)]
struct LimitParam {
	limit: Option<i64>,
}

async fn objects_by_category(
	State(state): State<AppState>,
	Path(category_name): Path<String>,
	Query(params): Query<LimitParam>,
) -> Result<Json<Value>, ApiError> {
	let limit = check_limit(params.limit)?;
	let objects = state
		.service
		.assets_by_category(Source::Objaverse, &category_name, limit)
		.await?;

	if objects.is_empty() {
		return Err(ApiError::new(
			StatusCode::NOT_FOUND,
			"not_found",
			format!("No objects found in category: {category_name}"),
		));
	}

	Ok(Json(serde_json::json!({
		"category": category_name,
		"count": objects.len(),
		"objects": objects,
	})))
}

#[derive(Debug, Deserialize)]
struct ObjectThumbnailsRequest {
	object_uids: Vec<String>,
}

async fn object_thumbnails(
	State(state): State<AppState>,
	Json(request): Json<ObjectThumbnailsRequest>,
) -> Result<Json<Value>, ApiError> {
	let thumbnails = state.service.thumbnails_base64(&request.object_uids).await?;

	Ok(Json(serde_json::json!({
		"generated_count": thumbnails.len(),
		"thumbnails": thumbnails,
	})))
}

async fn object_details(
	State(state): State<AppState>,
	Path(object_uid): Path<String>,
) -> Result<Json<Value>, ApiError> {
	let record = state.service.get_asset(&object_uid).await?;
	let mut value = serde_json::to_value(record).map_err(internal)?;

	if let Some(object) = value.as_object_mut() {
		object.insert("usage".to_string(), Value::String("place_in_scene".to_string()));
	}

	Ok(Json(value))
}

#[derive(Debug, Deserialize)]
struct MaterialSearchParams {
	query: String,
	top_k: Option<u32>,
	category: Option<String>,
	surface_type: Option<String>,
	asset_type: Option<String>,
	resolution: Option<String>,
}

async fn search_materials(
	State(state): State<AppState>,
	Query(params): Query<MaterialSearchParams>,
) -> Result<Json<Value>, ApiError> {
	check_top_k(params.top_k)?;
	check_surface_type(params.surface_type.as_deref())?;

	let asset_type = match params.asset_type.as_deref() {
		None => None,
		Some(raw @ ("texture" | "hdri")) => gdb_domain::AssetType::parse(raw),
		Some(_) => return Err(bad_request("asset_type must be texture or hdri.")),
	};

	if let Some(resolution) = params.resolution.as_deref()
		&& !matches!(resolution, "1k" | "2k" | "4k" | "8k")
	{
		return Err(bad_request("resolution must be one of 1k, 2k, 4k, or 8k."));
	}

	let filters = MaterialFilters {
		category: params.category.clone(),
		surface_type: params.surface_type.clone(),
		asset_type,
		resolution: params.resolution.clone(),
	};
	let results = state.service.search_materials(&params.query, params.top_k, &filters).await?;

	Ok(Json(serde_json::json!({
		"total_results": results.len(),
		"results": results,
		"query": params.query,
		"filters_applied": {
			"category": params.category,
			"surface_type": params.surface_type,
			"asset_type": params.asset_type,
			"resolution": params.resolution,
		},
	})))
}

async fn material_categories(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
	let categories = state.service.categories(Source::Polyhaven).await?;

	Ok(Json(serde_json::json!({
		"total_categories": categories.len(),
		"categories": categories,
	})))
}

async fn surface_types() -> Json<Value> {
	Json(serde_json::json!({
		"surface_types": [
			{ "surface_type": "rough", "description": "Textured, bumpy surfaces" },
			{ "surface_type": "smooth", "description": "Even, flat surfaces" },
			{ "surface_type": "glossy", "description": "Shiny, reflective surfaces" },
		],
	}))
}

async fn materials_by_category(
	State(state): State<AppState>,
	Path(category_name): Path<String>,
	Query(params): Query<LimitParam>,
) -> Result<Json<Value>, ApiError> {
	let limit = check_limit(params.limit)?;
	let materials = state
		.service
		.assets_by_category(Source::Polyhaven, &category_name, limit)
		.await?;

	if materials.is_empty() {
		return Err(ApiError::new(
			StatusCode::NOT_FOUND,
			"not_found",
			format!("No materials found in category: {category_name}"),
		));
	}

	Ok(Json(serde_json::json!({
		"category": category_name,
		"count": materials.len(),
		"materials": materials,
	})))
}

#[derive(Debug, Deserialize)]
struct MaterialPreviewsRequest {
	material_uids: Vec<String>,
}

async fn material_previews(
	State(state): State<AppState>,
	Json(request): Json<MaterialPreviewsRequest>,
) -> Result<Json<Value>, ApiError> {
	let downloads = state.service.download_previews(&request.material_uids).await?;
	let downloads: serde_json::Map<String, Value> = downloads
		.into_iter()
		.map(|(uid, path)| (uid, Value::String(path.display().to_string())))
		.collect();

	Ok(Json(serde_json::json!({
		"successful_downloads": downloads.len(),
		"requested_count": request.material_uids.len(),
		"downloads": downloads,
	})))
}

async fn materials_by_surface(
	State(state): State<AppState>,
	Path(surface_type): Path<String>,
	Query(params): Query<LimitParam>,
) -> Result<Json<Value>, ApiError> {
	check_surface_type(Some(surface_type.as_str()))?;

	let limit = check_limit(params.limit)?;
	let materials = state.service.materials_by_surface_type(&surface_type, limit).await?;

	if materials.is_empty() {
		return Err(ApiError::new(
			StatusCode::NOT_FOUND,
			"not_found",
			format!("No materials found with surface type: {surface_type}"),
		));
	}

	Ok(Json(serde_json::json!({
		"surface_type": surface_type,
		"count": materials.len(),
		"materials": materials,
	})))
}

async fn material_details(
	State(state): State<AppState>,
	Path(material_uid): Path<String>,
) -> Result<Json<Value>, ApiError> {
	let record = state.service.get_asset(&material_uid).await?;
	let mut value = serde_json::to_value(record).map_err(internal)?;

	if let Some(material) = value.as_object_mut() {
		material.insert("usage".to_string(), Value::String("apply_to_surface".to_string()));
		material.insert(
			"available_maps".to_string(),
			serde_json::json!(["diffuse", "normal", "roughness", "displacement"]),
		);
	}

	Ok(Json(value))
}

fn check_top_k(top_k: Option<u32>) -> Result<(), ApiError> {
	match top_k {
		Some(top_k) if !(1..=100).contains(&top_k) =>
			Err(bad_request("top_k must be between 1 and 100.")),
		_ => Ok(()),
	}
}

fn check_limit(limit: Option<i64>) -> Result<i64, ApiError> {
	let limit = limit.unwrap_or(50);

	if !(1..=200).contains(&limit) {
		return Err(bad_request("limit must be between 1 and 200."));
	}

	Ok(limit)
}

fn check_surface_type(surface_type: Option<&str>) -> Result<(), ApiError> {
	match surface_type {
		Some(surface_type) if !matches!(surface_type, "rough" | "smooth" | "glossy") =>
			Err(bad_request("surface_type must be one of rough, smooth, or glossy.")),
		_ => Ok(()),
	}
}

fn bad_request(message: impl Into<String>) -> ApiError {
	ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message)
}

fn internal(err: serde_json::Error) -> ApiError {
	ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "encoding_error", err.to_string())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match &err {
			ServiceError::NotFound { .. } =>
				Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string()),
			ServiceError::InvalidRequest { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", err.to_string()),
			ServiceError::Provider { .. } =>
				Self::new(StatusCode::BAD_GATEWAY, "upstream_unavailable", err.to_string()),
			ServiceError::Storage { .. } =>
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", err.to_string()),
			ServiceError::Unimplemented { .. } =>
				Self::new(StatusCode::NOT_IMPLEMENTED, "not_implemented", err.to_string()),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
