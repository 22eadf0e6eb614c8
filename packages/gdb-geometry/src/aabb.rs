//! Axis-aligned bounding boxes for GLB scenes.
//!
//! Bounds are computed in world space: every primitive's positions are pushed
//! through the node transform chain before accumulation, so a model that is
//! small in local coordinates but scaled up by its scene graph is measured at
//! its rendered size.

use std::path::Path;

use glam::{Mat4, Vec3};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
	pub min: Vec3,
	pub max: Vec3,
}
impl Aabb {
	fn empty() -> Self {
		Self { min: Vec3::splat(f32::INFINITY), max: Vec3::splat(f32::NEG_INFINITY) }
	}

	fn insert(&mut self, point: Vec3) {
		self.min = self.min.min(point);
		self.max = self.max.max(point);
	}

	fn is_empty(&self) -> bool {
		self.min.x > self.max.x
	}

	/// Edge lengths along x, y, z.
	pub fn dimensions(&self) -> [f32; 3] {
		[
			(self.max.x - self.min.x).abs(),
			(self.max.y - self.min.y).abs(),
			(self.max.z - self.min.z).abs(),
		]
	}

	pub fn max_edge(&self) -> f32 {
		self.dimensions().into_iter().fold(0.0, f32::max)
	}

	pub fn center(&self) -> Vec3 {
		(self.min + self.max) * 0.5
	}
}

/// Outcome of checking a bounding box against the scale threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleCheck {
	pub passed: bool,
	pub max_edge: f32,
	pub reason: Option<String>,
}

pub fn bounds_from_file(path: &Path) -> Result<Aabb> {
	let (document, buffers, _) = gltf::import(path)?;

	bounds(&document, &buffers)
}

pub fn bounds_from_slice(bytes: &[u8]) -> Result<Aabb> {
	let (document, buffers, _) = gltf::import_slice(bytes)?;

	bounds(&document, &buffers)
}

pub fn bounds(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<Aabb> {
	let mut aabb = Aabb::empty();

	for_each_world_position(document, buffers, &mut |point| aabb.insert(point));

	if aabb.is_empty() {
		return Err(Error::EmptyGeometry);
	}

	Ok(aabb)
}

/// An edge exactly at the threshold passes; only strictly larger assets are
/// flagged, usually unit mismatches (centimeters stored as meters).
pub fn check_scale(aabb: &Aabb, max_edge_length: f32) -> ScaleCheck {
	let max_edge = aabb.max_edge();

	if max_edge > max_edge_length {
		ScaleCheck {
			passed: false,
			max_edge,
			reason: Some(format!(
				"Asset too large: max edge is {max_edge:.2}m (limit: {max_edge_length}m)."
			)),
		}
	} else {
		ScaleCheck { passed: true, max_edge, reason: None }
	}
}

pub(crate) fn for_each_world_position<F>(
	document: &gltf::Document,
	buffers: &[gltf::buffer::Data],
	visit: &mut F,
) where
	F: FnMut(Vec3),
{
	let scenes: Vec<gltf::Scene> = match document.default_scene() {
		Some(scene) => vec![scene],
		None => document.scenes().collect(),
	};

	for scene in scenes {
		for node in scene.nodes() {
			visit_node(&node, Mat4::IDENTITY, buffers, visit);
		}
	}
}

fn visit_node<F>(node: &gltf::Node, parent: Mat4, buffers: &[gltf::buffer::Data], visit: &mut F)
where
	F: FnMut(Vec3),
{
	let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

	if let Some(mesh) = node.mesh() {
		for primitive in mesh.primitives() {
			let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &*data.0));
			let Some(positions) = reader.read_positions() else {
				continue;
			};

			for position in positions {
				visit(transform.transform_point3(Vec3::from(position)));
			}
		}
	}

	for child in node.children() {
		visit_node(&child, transform, buffers, visit);
	}
}
