//! Read-time and ingest-time attribute derivation.
//!
//! Categorization is a pure function of the raw attributes; callers invoke it
//! before constructing records, so construction stays side-effect free.

/// Derived attributes for an Objaverse model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjaverseDerived {
	pub asset_category: String,
	pub geometric_complexity: String,
	pub has_textures: bool,
	pub file_format: String,
}

/// Derived attributes for a Poly Haven surface asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyhavenDerived {
	pub asset_category: String,
	pub asset_subcategory: String,
	pub surface_type: String,
	pub material_properties: Vec<String>,
	pub resolution_available: Vec<String>,
}

pub fn categorize_objaverse(tags: &[String]) -> ObjaverseDerived {
	let text = tags.join(" ").to_lowercase();

	// Interior-design corpus, so furniture is the default bucket.
	let asset_category = if contains_any(&text, &["car", "vehicle", "transport"]) {
		"vehicle"
	} else if contains_any(&text, &["person", "character", "human"]) {
		"character"
	} else {
		"furniture"
	};
	let geometric_complexity = if contains_any(&text, &["simple", "basic"]) {
		"simple"
	} else if contains_any(&text, &["complex", "detailed"]) {
		"complex"
	} else {
		"moderate"
	};
	let has_textures = contains_any(&text, &["texture", "material"]);

	ObjaverseDerived {
		asset_category: asset_category.to_string(),
		geometric_complexity: geometric_complexity.to_string(),
		has_textures,
		file_format: "glb".to_string(),
	}
}

pub fn categorize_polyhaven(uid: &str, tags: &[String]) -> PolyhavenDerived {
	let text = format!("{uid} {}", tags.join(" ")).to_lowercase();

	let asset_category = if contains_any(&text, &["wood", "oak", "pine"]) {
		"wood"
	} else if contains_any(&text, &["metal", "steel", "iron"]) {
		"metal"
	} else if contains_any(&text, &["stone", "concrete", "marble", "brick"]) {
		"stone"
	} else if contains_any(&text, &["fabric", "leather", "cloth"]) {
		"fabric"
	} else {
		"material"
	};
	let surface_type = if contains_any(&text, &["rough", "bumpy"]) {
		"rough"
	} else if contains_any(&text, &["glossy", "shiny"]) {
		"glossy"
	} else {
		"smooth"
	};
	let asset_subcategory =
		uid.split_once('_').map(|(head, _)| head).unwrap_or(uid).to_string();

	PolyhavenDerived {
		asset_category: asset_category.to_string(),
		asset_subcategory,
		surface_type: surface_type.to_string(),
		material_properties: Vec::new(),
		resolution_available: vec![
			"1k".to_string(),
			"2k".to_string(),
			"4k".to_string(),
			"8k".to_string(),
		],
	}
}

/// Placement hints for a material category, attached to results at read time.
pub fn suggested_surfaces(asset_category: &str) -> &'static [&'static str] {
	match asset_category {
		"wood" | "tile" | "stone" => &["floor", "wall"],
		"fabric" | "leather" => &["furniture", "upholstery"],
		"metal" => &["fixtures", "appliances"],
		_ => &["any_surface"],
	}
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
	keywords.iter().any(|keyword| text.contains(keyword))
}
