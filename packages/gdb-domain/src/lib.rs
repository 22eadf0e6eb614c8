pub mod categorize;
pub mod describe;
pub mod resolution;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
	Objaverse,
	Polyhaven,
}
impl Source {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Objaverse => "objaverse",
			Self::Polyhaven => "polyhaven",
		}
	}
}
impl std::fmt::Display for Source {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
	Model,
	Texture,
	Hdri,
	Material,
}
impl AssetType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Model => "model",
			Self::Texture => "texture",
			Self::Hdri => "hdri",
			Self::Material => "material",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"model" => Some(Self::Model),
			"texture" => Some(Self::Texture),
			"hdri" => Some(Self::Hdri),
			"material" => Some(Self::Material),
			_ => None,
		}
	}
}
impl std::fmt::Display for AssetType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
