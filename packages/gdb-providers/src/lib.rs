pub mod embedding;
pub mod objaverse;
pub mod polyhaven;

use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName, USER_AGENT},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};
		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}
	Ok(headers)
}

pub(crate) fn asset_client(
	cfg: &gdb_config::AssetProviderConfig,
	timeout_ms: u64,
) -> Result<Client> {
	let mut headers = HeaderMap::new();
	headers.insert(USER_AGENT, cfg.user_agent.parse()?);

	Ok(Client::builder()
		.timeout(Duration::from_millis(timeout_ms))
		.default_headers(headers)
		.build()?)
}

/// Fetches a binary payload. `Ok(None)` means the resource does not exist
/// upstream; transport failures and other non-2xx statuses are errors.
pub(crate) async fn download_bytes(client: &Client, url: &str) -> Result<Option<Vec<u8>>> {
	let response = client.get(url).send().await?;

	if response.status() == reqwest::StatusCode::NOT_FOUND {
		return Ok(None);
	}

	let bytes = response.error_for_status()?.bytes().await?;

	Ok(Some(bytes.to_vec()))
}
