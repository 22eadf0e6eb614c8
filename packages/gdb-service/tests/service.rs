use std::{
	collections::HashMap,
	env, fs,
	path::PathBuf,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use gdb_config::{
	AssetProviderConfig, Config, EmbeddingProviderConfig, Materialize, Postgres,
	Providers as ProviderConfigs, Scale, Search, Service, Storage, Thumbnail,
};
use gdb_domain::{AssetType, Source};
use gdb_service::{
	BoxFuture, EmbeddingProvider, GraphicsService, MaterialFilters, ModelFetcher, ObjectFilters,
	PreviewFetcher, Providers, ServiceError,
};
use gdb_storage::{
	models::{AssetRecord, CategoryCount, NewAsset, ScoredAsset, TableSearch},
	tables::AssetTable,
};

fn embedding_cfg(dimensions: u32) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://localhost".to_string(),
		api_key: "key".to_string(),
		path: "/v1/embeddings".to_string(),
		model: "test-model".to_string(),
		dimensions,
		timeout_ms: 1_000,
		default_headers: serde_json::Map::new(),
	}
}

fn asset_cfg() -> AssetProviderConfig {
	AssetProviderConfig {
		api_base: "http://localhost".to_string(),
		user_agent: "gdb-test".to_string(),
		timeout_ms: 1_000,
		download_timeout_ms: 1_000,
	}
}

fn test_config(cache_dir: PathBuf, scale_policy: &str) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:2692".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres { dsn: "postgres://unused".to_string(), pool_max_conns: 1 },
		},
		providers: ProviderConfigs {
			clip: embedding_cfg(4),
			sbert: Some(embedding_cfg(4)),
			objaverse: asset_cfg(),
			polyhaven: asset_cfg(),
		},
		search: Search { default_top_k: 5, overfetch_factor: 3, max_candidates: 100 },
		materialize: Materialize {
			cache_dir,
			download_workers: Some(2),
			max_thumbnail_batch: 20,
			max_preview_batch: 10,
			scale: Scale { max_edge_length: 100.0, policy: scale_policy.to_string() },
			thumbnail: Thumbnail { resolution: 64, overwrite: false },
		},
	}
}

fn temp_cache_dir(name: &str) -> PathBuf {
	use std::time::{SystemTime, UNIX_EPOCH};

	let nanos =
		SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock before epoch.").as_nanos();

	env::temp_dir().join(format!("gdb_service_{name}_{nanos}_{}", std::process::id()))
}

fn record(uid: &str, source: Source) -> AssetRecord {
	let asset_type =
		if source == Source::Objaverse { AssetType::Model } else { AssetType::Texture };

	AssetRecord {
		uid: uid.to_string(),
		url: format!("https://{source}.example/{uid}"),
		tags: Vec::new(),
		source,
		license: None,
		asset_type,
		asset_category: Some("furniture".to_string()),
		asset_subcategory: None,
		geometric_complexity: Some("moderate".to_string()),
		has_textures: Some(false),
		file_format: Some("glb".to_string()),
		surface_type: None,
		material_properties: None,
		resolution_available: None,
		categories: None,
	}
}

fn hit(uid: &str, source: Source, score: f32) -> ScoredAsset {
	ScoredAsset { asset: record(uid, source), similarity_score: score }
}

struct MockTable {
	source: Source,
	hits: Vec<ScoredAsset>,
	row_count: i64,
	search_calls: AtomicUsize,
	last_limit: Mutex<Option<u32>>,
}
impl MockTable {
	fn new(source: Source, hits: Vec<ScoredAsset>) -> Arc<Self> {
		let row_count = hits.len() as i64;

		Arc::new(Self {
			source,
			hits,
			row_count,
			search_calls: AtomicUsize::new(0),
			last_limit: Mutex::new(None),
		})
	}
}
impl AssetTable for MockTable {
	fn source(&self) -> Source {
		self.source
	}

	fn table_name(&self) -> &'static str {
		"mock_assets"
	}

	fn search<'a>(
		&'a self,
		query: &'a TableSearch,
	) -> BoxFuture<'a, gdb_storage::Result<Vec<ScoredAsset>>> {
		self.search_calls.fetch_add(1, Ordering::SeqCst);
		*self.last_limit.lock().unwrap() = Some(query.limit);

		let mut hits: Vec<ScoredAsset> = self
			.hits
			.iter()
			.filter(|hit| match query.category.as_deref() {
				Some(category) => hit.asset.asset_category.as_deref() == Some(category),
				None => true,
			})
			.cloned()
			.collect();

		hits.truncate(query.limit as usize);

		Box::pin(async move { Ok(hits) })
	}

	fn insert<'a>(&'a self, rows: &'a [NewAsset]) -> BoxFuture<'a, gdb_storage::Result<u64>> {
		let count = rows.len() as u64;

		Box::pin(async move { Ok(count) })
	}

	fn get_by_uid<'a>(
		&'a self,
		uid: &'a str,
	) -> BoxFuture<'a, gdb_storage::Result<Option<AssetRecord>>> {
		let found = self
			.hits
			.iter()
			.find(|hit| hit.asset.uid == uid)
			.map(|hit| hit.asset.clone());

		Box::pin(async move { Ok(found) })
	}

	fn count<'a>(&'a self) -> BoxFuture<'a, gdb_storage::Result<i64>> {
		let count = self.row_count;

		Box::pin(async move { Ok(count) })
	}

	fn get_by_category<'a>(
		&'a self,
		category: &'a str,
		limit: i64,
	) -> BoxFuture<'a, gdb_storage::Result<Vec<AssetRecord>>> {
		let records: Vec<AssetRecord> = self
			.hits
			.iter()
			.filter(|hit| hit.asset.asset_category.as_deref() == Some(category))
			.take(limit as usize)
			.map(|hit| hit.asset.clone())
			.collect();

		Box::pin(async move { Ok(records) })
	}

	fn categories<'a>(&'a self) -> BoxFuture<'a, gdb_storage::Result<Vec<CategoryCount>>> {
		Box::pin(async move { Ok(Vec::new()) })
	}
}

struct FixedEmbedding;
impl EmbeddingProvider for FixedEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let dim = cfg.dimensions as usize;
		let vectors = vec![vec![0.1; dim]; texts.len()];

		Box::pin(async move { Ok(vectors) })
	}
}

/// Per-uid download behavior for the model fetcher mock.
enum FetchBehavior {
	Bytes(Vec<u8>),
	Missing,
	Failing,
}

struct MockModels {
	behaviors: HashMap<String, FetchBehavior>,
	calls: AtomicUsize,
}
impl MockModels {
	fn new(behaviors: HashMap<String, FetchBehavior>) -> Arc<Self> {
		Arc::new(Self { behaviors, calls: AtomicUsize::new(0) })
	}
}
impl ModelFetcher for MockModels {
	fn fetch_glb<'a>(
		&'a self,
		_cfg: &'a AssetProviderConfig,
		uid: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Vec<u8>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let outcome = match self.behaviors.get(uid) {
			Some(FetchBehavior::Bytes(bytes)) => Ok(Some(bytes.clone())),
			Some(FetchBehavior::Missing) | None => Ok(None),
			Some(FetchBehavior::Failing) => Err(color_eyre::eyre::eyre!("upstream unreachable")),
		};

		Box::pin(async move { outcome })
	}
}

struct MockPreviews {
	bytes: Option<Vec<u8>>,
	calls: AtomicUsize,
}
impl MockPreviews {
	fn new(bytes: Option<Vec<u8>>) -> Arc<Self> {
		Arc::new(Self { bytes, calls: AtomicUsize::new(0) })
	}
}
impl PreviewFetcher for MockPreviews {
	fn fetch_diffuse_1k<'a>(
		&'a self,
		_cfg: &'a AssetProviderConfig,
		_uid: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Vec<u8>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let bytes = self.bytes.clone();

		Box::pin(async move { Ok(bytes) })
	}
}

struct Harness {
	service: GraphicsService,
	objaverse: Arc<MockTable>,
	models: Arc<MockModels>,
	previews: Arc<MockPreviews>,
	cache_dir: PathBuf,
}
impl Harness {
	fn build(
		name: &str,
		objaverse_hits: Vec<ScoredAsset>,
		polyhaven_hits: Vec<ScoredAsset>,
		behaviors: HashMap<String, FetchBehavior>,
	) -> Self {
		Self::build_with_policy(name, objaverse_hits, polyhaven_hits, behaviors, "reject")
	}

	fn build_with_policy(
		name: &str,
		objaverse_hits: Vec<ScoredAsset>,
		polyhaven_hits: Vec<ScoredAsset>,
		behaviors: HashMap<String, FetchBehavior>,
		scale_policy: &str,
	) -> Self {
		let cache_dir = temp_cache_dir(name);
		let cfg = test_config(cache_dir.clone(), scale_policy);
		let objaverse = MockTable::new(Source::Objaverse, objaverse_hits);
		let polyhaven = MockTable::new(Source::Polyhaven, polyhaven_hits);
		let models = MockModels::new(behaviors);
		let previews = MockPreviews::new(Some(vec![0xFF, 0xD8, 0xFF]));
		let providers = Providers::new(Arc::new(FixedEmbedding), models.clone(), previews.clone());
		let service =
			GraphicsService::with_parts(cfg, vec![objaverse.clone(), polyhaven.clone()], providers);

		Self { service, objaverse, models, previews, cache_dir }
	}
}
impl Drop for Harness {
	fn drop(&mut self) {
		let _ = fs::remove_dir_all(&self.cache_dir);
	}
}

/// One triangle as a valid binary glTF, enough to bound and render.
fn triangle_glb() -> Vec<u8> {
	let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
	let mut bin = Vec::new();

	for position in positions {
		for component in position {
			bin.extend_from_slice(&component.to_le_bytes());
		}
	}

	let json = serde_json::json!({
		"asset": { "version": "2.0" },
		"buffers": [{ "byteLength": bin.len() }],
		"bufferViews": [{
			"buffer": 0,
			"byteOffset": 0,
			"byteLength": bin.len(),
			"target": 34962
		}],
		"accessors": [{
			"bufferView": 0,
			"componentType": 5126,
			"count": 3,
			"type": "VEC3",
			"min": [0.0, 0.0, 0.0],
			"max": [1.0, 1.0, 0.0]
		}],
		"meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "mode": 4 }] }],
		"nodes": [{ "mesh": 0 }],
		"scenes": [{ "nodes": [0] }],
		"scene": 0
	});
	let mut json_bytes = serde_json::to_vec(&json).expect("Failed to encode glTF JSON.");

	while json_bytes.len() % 4 != 0 {
		json_bytes.push(b' ');
	}

	let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
	let mut glb = Vec::with_capacity(total);

	glb.extend_from_slice(b"glTF");
	glb.extend_from_slice(&2u32.to_le_bytes());
	glb.extend_from_slice(&(total as u32).to_le_bytes());
	glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
	glb.extend_from_slice(b"JSON");
	glb.extend_from_slice(&json_bytes);
	glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
	glb.extend_from_slice(&[0x42, 0x49, 0x4E, 0x00]);
	glb.extend_from_slice(&bin);

	glb
}

fn uid_list(uids: &[&str]) -> Vec<String> {
	uids.iter().map(|uid| uid.to_string()).collect()
}

#[tokio::test]
async fn blue_car_query_returns_mock_rows_in_order() {
	let harness = Harness::build(
		"blue_car",
		vec![
			hit("car-1", Source::Objaverse, 0.9),
			hit("car-2", Source::Objaverse, 0.7),
			hit("car-3", Source::Objaverse, 0.5),
		],
		Vec::new(),
		HashMap::new(),
	);
	let items =
		harness.service.search_assets("a blue car", Some(5), false).await.expect("Search failed.");

	assert_eq!(items.len(), 3);
	assert_eq!(items[0].asset.uid, "car-1");
	assert_eq!(items[1].asset.uid, "car-2");
	assert_eq!(items[2].asset.uid, "car-3");
	assert_eq!(items[0].similarity_score, 0.9);
}

#[tokio::test]
async fn fusion_is_deterministic_for_a_fixed_oracle() {
	let build = || {
		Harness::build(
			"determinism",
			vec![hit("a", Source::Objaverse, 0.8), hit("b", Source::Objaverse, 0.6)],
			vec![hit("c", Source::Polyhaven, 0.7)],
			HashMap::new(),
		)
	};
	let first = build()
		.service
		.search_assets("query", Some(10), false)
		.await
		.expect("Search failed.");
	let second = build()
		.service
		.search_assets("query", Some(10), false)
		.await
		.expect("Search failed.");
	let first_uids: Vec<&str> = first.iter().map(|item| item.asset.uid.as_str()).collect();
	let second_uids: Vec<&str> = second.iter().map(|item| item.asset.uid.as_str()).collect();

	assert_eq!(first_uids, vec!["a", "c", "b"]);
	assert_eq!(first_uids, second_uids);
}

#[tokio::test]
async fn fan_in_merge_truncates_to_top_k() {
	let harness = Harness::build(
		"truncation",
		vec![hit("o1", Source::Objaverse, 0.9), hit("o2", Source::Objaverse, 0.3)],
		vec![hit("p1", Source::Polyhaven, 0.8), hit("p2", Source::Polyhaven, 0.2)],
		HashMap::new(),
	);
	let items =
		harness.service.search_assets("anything", Some(3), false).await.expect("Search failed.");
	let uids: Vec<&str> = items.iter().map(|item| item.asset.uid.as_str()).collect();

	assert_eq!(uids, vec!["o1", "p1", "o2"]);
}

#[tokio::test]
async fn empty_corpus_yields_an_empty_response() {
	let harness = Harness::build("empty", Vec::new(), Vec::new(), HashMap::new());
	let items =
		harness.service.search_assets("anything", Some(5), false).await.expect("Search failed.");

	assert!(items.is_empty());
}

#[tokio::test]
async fn object_filters_are_monotonic() {
	let mut textured = hit("textured", Source::Objaverse, 0.9);

	textured.asset.has_textures = Some(true);

	let harness = Harness::build(
		"monotonic",
		vec![textured, hit("plain", Source::Objaverse, 0.8)],
		Vec::new(),
		HashMap::new(),
	);
	let unfiltered = harness
		.service
		.search_objects("chair", Some(10), &ObjectFilters::default())
		.await
		.expect("Search failed.");
	let filtered = harness
		.service
		.search_objects(
			"chair",
			Some(10),
			&ObjectFilters { has_textures: Some(true), ..Default::default() },
		)
		.await
		.expect("Search failed.");

	assert!(filtered.len() <= unfiltered.len());
	assert_eq!(filtered.len(), 1);
	assert_eq!(filtered[0].asset.uid, "textured");
	assert_eq!(filtered[0].usage.as_deref(), Some("place_in_scene"));
}

#[tokio::test]
async fn post_filters_overfetch_the_oracle_query() {
	let harness = Harness::build("overfetch", Vec::new(), Vec::new(), HashMap::new());

	harness
		.service
		.search_objects("chair", Some(10), &ObjectFilters::default())
		.await
		.expect("Search failed.");

	assert_eq!(*harness.objaverse.last_limit.lock().unwrap(), Some(10));

	harness
		.service
		.search_objects(
			"chair",
			Some(10),
			&ObjectFilters { complexity: Some("simple".to_string()), ..Default::default() },
		)
		.await
		.expect("Search failed.");

	assert_eq!(*harness.objaverse.last_limit.lock().unwrap(), Some(30));
}

#[tokio::test]
async fn material_search_attaches_read_time_fields() {
	let mut wood = hit("oak", Source::Polyhaven, 0.9);

	wood.asset.asset_category = Some("wood".to_string());
	wood.asset.surface_type = Some("rough".to_string());
	wood.asset.resolution_available = Some(vec!["1k".to_string(), "4k".to_string()]);

	let harness = Harness::build("materials", Vec::new(), vec![wood], HashMap::new());
	let items = harness
		.service
		.search_materials(
			"oak floor",
			Some(5),
			&MaterialFilters { resolution: Some("2k".to_string()), ..Default::default() },
		)
		.await
		.expect("Search failed.");

	assert_eq!(items.len(), 1);
	assert_eq!(items[0].usage.as_deref(), Some("apply_to_surface"));
	assert_eq!(
		items[0].suggested_surfaces.as_deref(),
		Some(&["floor".to_string(), "wall".to_string()][..])
	);
}

#[tokio::test]
async fn second_materialization_is_served_from_cache() {
	let mut behaviors = HashMap::new();

	behaviors.insert("model-1".to_string(), FetchBehavior::Bytes(triangle_glb()));

	let harness = Harness::build("cache", Vec::new(), Vec::new(), behaviors);
	let uids = uid_list(&["model-1"]);
	let first = harness.service.download_models(&uids).await;

	assert_eq!(first.len(), 1);
	assert_eq!(harness.models.calls.load(Ordering::SeqCst), 1);

	let second = harness.service.download_models(&uids).await;

	assert_eq!(second.len(), 1);
	// Exactly one network download across both calls.
	assert_eq!(harness.models.calls.load(Ordering::SeqCst), 1);
	assert_eq!(first.get("model-1"), second.get("model-1"));
}

#[tokio::test]
async fn partial_batch_failure_returns_the_good_subset() {
	let mut behaviors = HashMap::new();

	behaviors.insert("good-1".to_string(), FetchBehavior::Bytes(triangle_glb()));
	behaviors.insert("good-2".to_string(), FetchBehavior::Bytes(triangle_glb()));
	behaviors.insert("good-3".to_string(), FetchBehavior::Bytes(triangle_glb()));
	behaviors.insert("missing".to_string(), FetchBehavior::Missing);
	behaviors.insert("broken".to_string(), FetchBehavior::Failing);

	let harness = Harness::build("partial", Vec::new(), Vec::new(), behaviors);
	let uids = uid_list(&["good-1", "good-2", "missing", "broken", "good-3"]);
	let resolved = harness.service.download_models(&uids).await;

	assert_eq!(resolved.len(), 3);
	assert!(resolved.contains_key("good-1"));
	assert!(resolved.contains_key("good-2"));
	assert!(resolved.contains_key("good-3"));
	assert!(!resolved.contains_key("missing"));
	assert!(!resolved.contains_key("broken"));
}

#[tokio::test]
async fn rescale_policy_fails_loudly() {
	let harness = Harness::build_with_policy(
		"rescale",
		Vec::new(),
		Vec::new(),
		HashMap::new(),
		"rescale",
	);
	let err = harness
		.service
		.validate_scales(&HashMap::new())
		.await
		.expect_err("Rescale must not silently degrade.");

	assert!(matches!(err, ServiceError::Unimplemented { .. }));
}

#[tokio::test]
async fn unreadable_geometry_is_rejected_with_a_reason() {
	let harness = Harness::build("junk", Vec::new(), Vec::new(), HashMap::new());
	let junk_path = harness.cache_dir.join("junk.glb");

	fs::create_dir_all(&harness.cache_dir).expect("Failed to create cache dir.");
	fs::write(&junk_path, b"not a glb").expect("Failed to write junk file.");

	let mut paths = HashMap::new();

	paths.insert("junk".to_string(), junk_path);

	let checks = harness.service.validate_scales(&paths).await.expect("Validation failed.");
	let check = checks.get("junk").expect("Check must be present.");

	assert!(!check.passed);
	assert!(
		check
			.reason
			.as_deref()
			.expect("Rejection must carry a reason.")
			.contains("Error validating asset")
	);
}

#[tokio::test]
async fn thumbnail_batch_cap_rejects_before_any_work() {
	let harness = Harness::build("cap", Vec::new(), Vec::new(), HashMap::new());
	let oversized: Vec<String> = (0..21).map(|i| format!("uid-{i}")).collect();
	let err = harness
		.service
		.thumbnails_base64(&oversized)
		.await
		.expect_err("Oversized batch must be rejected.");

	assert!(matches!(err, ServiceError::InvalidRequest { .. }));
	// The guard fires before the provider is touched.
	assert_eq!(harness.models.calls.load(Ordering::SeqCst), 0);

	let empty: Vec<String> = Vec::new();

	assert!(harness.service.thumbnails_base64(&empty).await.is_err());
}

#[tokio::test]
async fn thumbnails_pipeline_produces_png_payloads() {
	let mut behaviors = HashMap::new();

	behaviors.insert("model-1".to_string(), FetchBehavior::Bytes(triangle_glb()));
	behaviors.insert("gone".to_string(), FetchBehavior::Missing);

	let harness = Harness::build("thumbs", Vec::new(), Vec::new(), behaviors);
	let encoded = harness
		.service
		.thumbnails_base64(&uid_list(&["model-1", "gone"]))
		.await
		.expect("Thumbnail pipeline failed.");

	assert_eq!(encoded.len(), 1);

	let png = BASE64.decode(encoded.get("model-1").expect("Thumbnail must be present."))
		.expect("Payload must be valid base64.");

	assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn preview_downloads_cache_and_skip_refetch() {
	let harness = Harness::build("previews", Vec::new(), Vec::new(), HashMap::new());
	let uids = uid_list(&["oak_veneer"]);
	let first = harness.service.download_previews(&uids).await.expect("Preview failed.");

	assert_eq!(first.len(), 1);
	assert_eq!(harness.previews.calls.load(Ordering::SeqCst), 1);

	let second = harness.service.download_previews(&uids).await.expect("Preview failed.");

	assert_eq!(second.len(), 1);
	assert_eq!(harness.previews.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn uid_collisions_resolve_by_table_priority() {
	let harness = Harness::build(
		"priority",
		vec![hit("dup", Source::Objaverse, 0.5)],
		vec![hit("dup", Source::Polyhaven, 0.5)],
		HashMap::new(),
	);
	let asset = harness.service.get_asset("dup").await.expect("Lookup failed.");

	assert_eq!(asset.source, Source::Objaverse);

	let missing = harness.service.get_asset("absent").await;

	assert!(matches!(missing, Err(ServiceError::NotFound { .. })));
}

#[tokio::test]
async fn healthcheck_reports_per_source_counts() {
	let harness = Harness::build(
		"health",
		vec![hit("a", Source::Objaverse, 0.5)],
		Vec::new(),
		HashMap::new(),
	);
	let health = harness.service.healthcheck().await.expect("Healthcheck failed.");

	assert_eq!(health.status, "ok");
	assert_eq!(health.db, "ok");
	assert!(health.data_exists);
	assert_eq!(health.counts.get("objaverse"), Some(&1));
	assert_eq!(health.counts.get("polyhaven"), Some(&0));
}

#[tokio::test]
async fn metadata_measures_the_materialized_model() {
	let mut behaviors = HashMap::new();

	behaviors.insert("model-1".to_string(), FetchBehavior::Bytes(triangle_glb()));

	let harness = Harness::build("metadata", Vec::new(), Vec::new(), behaviors);
	let metadata =
		harness.service.asset_metadata("model-1").await.expect("Metadata failed.");

	assert_eq!(metadata.uid, "model-1");
	assert_eq!(metadata.dimensions.x, 1.0);
	assert_eq!(metadata.dimensions.y, 1.0);
	assert_eq!(metadata.dimensions.z, 0.0);

	let missing = harness.service.asset_metadata("absent").await;

	assert!(matches!(missing, Err(ServiceError::NotFound { .. })));
}
