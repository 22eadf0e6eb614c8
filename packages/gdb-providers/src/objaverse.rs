//! Objaverse annotation and model endpoints.

use std::collections::HashMap;

use color_eyre::Result;
use serde::Deserialize;

/// A single annotation entry as served by the provider. Only the fields the
/// pipeline consumes are modeled; everything else is ignored on decode.
#[derive(Debug, Clone, Deserialize)]
pub struct Annotation {
	pub uid: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default, rename = "viewerUrl")]
	pub viewer_url: Option<String>,
	/// Direct download location of the GLB payload.
	#[serde(default)]
	pub uri: Option<String>,
	#[serde(default)]
	pub license: Option<String>,
	#[serde(default)]
	pub tags: Option<Vec<Tag>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
	pub name: String,
}

impl Annotation {
	/// An annotation is usable only when every field the corpus loader needs
	/// is present.
	pub fn is_complete(&self) -> bool {
		self.viewer_url.is_some() && self.uri.is_some() && self.license.is_some()
			&& self.tags.is_some()
	}

	pub fn tag_names(&self) -> Vec<String> {
		self.tags
			.as_deref()
			.unwrap_or_default()
			.iter()
			.map(|tag| tag.name.clone())
			.collect()
	}
}

/// Lists the full annotation map. The provider serves this as one large
/// document keyed by uid.
pub async fn list_annotations(
	cfg: &gdb_config::AssetProviderConfig,
) -> Result<HashMap<String, Annotation>> {
	let client = crate::asset_client(cfg, cfg.timeout_ms)?;
	let url = format!("{}/annotations", cfg.api_base);
	let response = client.get(url).send().await?;
	let annotations = response.error_for_status()?.json().await?;

	Ok(annotations)
}

/// Fetches the annotation for a single uid; `Ok(None)` when the uid is
/// unknown upstream.
pub async fn get_annotation(
	cfg: &gdb_config::AssetProviderConfig,
	uid: &str,
) -> Result<Option<Annotation>> {
	let client = crate::asset_client(cfg, cfg.timeout_ms)?;
	let url = format!("{}/annotations/{uid}", cfg.api_base);
	let response = client.get(url).send().await?;

	if response.status() == reqwest::StatusCode::NOT_FOUND {
		return Ok(None);
	}

	Ok(Some(response.error_for_status()?.json().await?))
}

/// Downloads the GLB payload behind an annotation's `uri`.
pub async fn download_glb(
	cfg: &gdb_config::AssetProviderConfig,
	url: &str,
) -> Result<Option<Vec<u8>>> {
	let client = crate::asset_client(cfg, cfg.download_timeout_ms)?;

	crate::download_bytes(&client, url).await
}
