pub mod aabb;
pub mod thumbnail;

pub use aabb::{Aabb, ScaleCheck};
pub use thumbnail::{ThumbnailOptions, ThumbnailOutcome};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Gltf(#[from] gltf::Error),
	#[error(transparent)]
	Image(#[from] image::ImageError),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("Mesh contains no geometry.")]
	EmptyGeometry,
}
