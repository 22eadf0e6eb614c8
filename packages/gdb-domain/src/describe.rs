//! Embedding text construction for ingested assets.

/// Builds the text sent to the embedding gateway for an asset: the uid with
/// separators spaced out, followed by its categories and tags.
pub fn embedding_text(uid: &str, categories: &[String], tags: &[String]) -> String {
	let mut parts = vec![uid.replace(['_', '-'], " ")];

	parts.extend(categories.iter().cloned());
	parts.extend(tags.iter().cloned());

	parts.join(" ")
}
