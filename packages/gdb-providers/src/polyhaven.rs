//! Poly Haven public API: asset listing, per-asset info, file trees, and
//! binary downloads.

use std::collections::HashMap;

use color_eyre::Result;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct AssetInfo {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub categories: Vec<String>,
	#[serde(default)]
	pub tags: Vec<String>,
}

/// Lists assets of one type ("textures", "hdris", "models"), keyed by id.
pub async fn list_assets(
	cfg: &gdb_config::AssetProviderConfig,
	asset_type: &str,
) -> Result<HashMap<String, Value>> {
	let client = crate::asset_client(cfg, cfg.timeout_ms)?;
	let url = format!("{}/assets?type={asset_type}", cfg.api_base);
	let response = client.get(url).send().await?;
	let assets = response.error_for_status()?.json().await?;

	Ok(assets)
}

/// Detailed metadata for one asset; `Ok(None)` for unknown ids.
pub async fn asset_info(
	cfg: &gdb_config::AssetProviderConfig,
	asset_id: &str,
) -> Result<Option<AssetInfo>> {
	let client = crate::asset_client(cfg, cfg.timeout_ms)?;
	let url = format!("{}/info/{asset_id}", cfg.api_base);
	let response = client.get(url).send().await?;

	if response.status() == reqwest::StatusCode::NOT_FOUND {
		return Ok(None);
	}

	Ok(Some(response.error_for_status()?.json().await?))
}

/// The per-asset file tree: resolution → format → file entry.
pub async fn asset_files(
	cfg: &gdb_config::AssetProviderConfig,
	asset_id: &str,
) -> Result<Option<Value>> {
	let client = crate::asset_client(cfg, cfg.timeout_ms)?;
	let url = format!("{}/files/{asset_id}", cfg.api_base);
	let response = client.get(url).send().await?;

	if response.status() == reqwest::StatusCode::NOT_FOUND {
		return Ok(None);
	}

	Ok(Some(response.error_for_status()?.json().await?))
}

/// Picks the 1k JPG diffuse map out of a file tree. The diffuse entry is
/// identified by "diff" in its map name, matching the provider's naming.
pub fn diffuse_url_1k(files: &Value) -> Option<String> {
	let jpg_files = files.get("1k")?.get("jpg")?.as_object()?;

	for (map_name, entry) in jpg_files {
		if map_name.to_lowercase().contains("diff") {
			if let Some(url) = entry.get("url").and_then(Value::as_str) {
				return Some(url.to_string());
			}
		}
	}

	None
}

pub async fn download(
	cfg: &gdb_config::AssetProviderConfig,
	url: &str,
) -> Result<Option<Vec<u8>>> {
	let client = crate::asset_client(cfg, cfg.download_timeout_ms)?;

	crate::download_bytes(&client, url).await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn finds_the_1k_jpg_diffuse_map() {
		let files = serde_json::json!({
			"1k": {
				"jpg": {
					"oak_veneer_01_diff_1k": { "url": "https://dl.example/oak_diff_1k.jpg" },
					"oak_veneer_01_nor_1k": { "url": "https://dl.example/oak_nor_1k.jpg" }
				}
			},
			"4k": { "jpg": { "oak_veneer_01_diff_4k": { "url": "https://dl.example/oak_diff_4k.jpg" } } }
		});

		assert_eq!(diffuse_url_1k(&files).as_deref(), Some("https://dl.example/oak_diff_1k.jpg"));
	}

	#[test]
	fn missing_diffuse_map_yields_none() {
		let files = serde_json::json!({
			"1k": { "jpg": { "oak_veneer_01_nor_1k": { "url": "https://dl.example/nor.jpg" } } }
		});

		assert_eq!(diffuse_url_1k(&files), None);

		let no_1k = serde_json::json!({ "2k": {} });

		assert_eq!(diffuse_url_1k(&no_1k), None);
	}

	#[test]
	fn asset_info_decodes_with_defaults() {
		let info: AssetInfo = serde_json::from_value(serde_json::json!({
			"name": "Oak Veneer",
			"categories": ["wood"],
			"extra_field": 42
		}))
		.expect("Failed to decode asset info.");

		assert_eq!(info.name.as_deref(), Some("Oak Veneer"));
		assert_eq!(info.categories, vec!["wood"]);
		assert!(info.tags.is_empty());
	}
}
