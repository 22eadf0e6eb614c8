//! Isometric preview rendering.
//!
//! A deliberately small software rasterizer: orthographic camera on the
//! (1, 1, 1) diagonal with a (0, 1, 0) up vector, flat shading, transparent
//! background. Previews only need to be recognizable and reproducible, so
//! there is no lighting model beyond a headlight term.

use std::path::Path;

use glam::{Mat4, Vec3};
use image::{Rgba, RgbaImage};

use crate::{Error, Result};

const FILL_RATIO: f32 = 0.9;
const AMBIENT: f32 = 0.25;
const BASE_GREY: f32 = 205.0;

#[derive(Debug, Clone)]
pub struct ThumbnailOptions {
	pub resolution: u32,
	pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOutcome {
	Rendered,
	/// The target file already existed and overwrite was not requested.
	Skipped,
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
	a: Vec3,
	b: Vec3,
	c: Vec3,
}

pub fn render_isometric(
	glb_path: &Path,
	output_path: &Path,
	options: &ThumbnailOptions,
) -> Result<ThumbnailOutcome> {
	if output_path.exists() && !options.overwrite {
		tracing::debug!(path = %output_path.display(), "Thumbnail exists, skipping render.");

		return Ok(ThumbnailOutcome::Skipped);
	}

	let (document, buffers, _) = gltf::import(glb_path)?;
	let triangles = collect_triangles(&document, &buffers);

	if triangles.is_empty() {
		return Err(Error::EmptyGeometry);
	}

	let img = rasterize(&triangles, options.resolution);

	img.save(output_path)?;

	Ok(ThumbnailOutcome::Rendered)
}

fn collect_triangles(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Vec<Triangle> {
	let mut triangles = Vec::new();
	let scenes: Vec<gltf::Scene> = match document.default_scene() {
		Some(scene) => vec![scene],
		None => document.scenes().collect(),
	};

	for scene in scenes {
		for node in scene.nodes() {
			collect_node(&node, Mat4::IDENTITY, buffers, &mut triangles);
		}
	}

	triangles
}

fn collect_node(
	node: &gltf::Node,
	parent: Mat4,
	buffers: &[gltf::buffer::Data],
	triangles: &mut Vec<Triangle>,
) {
	let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

	if let Some(mesh) = node.mesh() {
		for primitive in mesh.primitives() {
			if primitive.mode() != gltf::mesh::Mode::Triangles {
				continue;
			}

			let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &*data.0));
			let Some(positions) = reader.read_positions() else {
				continue;
			};
			let vertices: Vec<Vec3> = positions
				.map(|position| transform.transform_point3(Vec3::from(position)))
				.collect();

			match reader.read_indices() {
				Some(indices) => {
					let indices: Vec<u32> = indices.into_u32().collect();

					for face in indices.chunks_exact(3) {
						let (Some(&a), Some(&b), Some(&c)) = (
							vertices.get(face[0] as usize),
							vertices.get(face[1] as usize),
							vertices.get(face[2] as usize),
						) else {
							continue;
						};

						triangles.push(Triangle { a, b, c });
					}
				},
				None =>
					for face in vertices.chunks_exact(3) {
						triangles.push(Triangle { a: face[0], b: face[1], c: face[2] });
					},
			}
		}
	}

	for child in node.children() {
		collect_node(&child, transform, buffers, triangles);
	}
}

fn rasterize(triangles: &[Triangle], resolution: u32) -> RgbaImage {
	// Right-handed look-at basis for a camera on the (1, 1, 1) diagonal.
	let view = Vec3::new(1.0, 1.0, 1.0).normalize();
	let forward = -view;
	let right = forward.cross(Vec3::Y).normalize();
	let up = right.cross(forward).normalize();

	// First pass: projected extent, to scale the model into the frame.
	let mut min_x = f32::INFINITY;
	let mut max_x = f32::NEG_INFINITY;
	let mut min_y = f32::INFINITY;
	let mut max_y = f32::NEG_INFINITY;

	for triangle in triangles {
		for vertex in [triangle.a, triangle.b, triangle.c] {
			let x = vertex.dot(right);
			let y = vertex.dot(up);

			min_x = min_x.min(x);
			max_x = max_x.max(x);
			min_y = min_y.min(y);
			max_y = max_y.max(y);
		}
	}

	let size = resolution as f32;
	let extent = (max_x - min_x).max(max_y - min_y).max(f32::EPSILON);
	let scale = size * FILL_RATIO / extent;
	let center_x = (min_x + max_x) * 0.5;
	let center_y = (min_y + max_y) * 0.5;
	let project = |vertex: Vec3| -> Vec3 {
		// Image y grows downward.
		Vec3::new(
			(vertex.dot(right) - center_x) * scale + size * 0.5,
			size * 0.5 - (vertex.dot(up) - center_y) * scale,
			vertex.dot(forward),
		)
	};

	let mut img = RgbaImage::from_pixel(resolution, resolution, Rgba([0, 0, 0, 0]));
	let mut depth = vec![f32::INFINITY; (resolution * resolution) as usize];

	for triangle in triangles {
		let a = project(triangle.a);
		let b = project(triangle.b);
		let c = project(triangle.c);
		let area = edge(a, b, c);

		if area.abs() < f32::EPSILON {
			continue;
		}

		let normal = (triangle.b - triangle.a).cross(triangle.c - triangle.a);
		let shade = if normal.length_squared() > 0.0 {
			AMBIENT + (1.0 - AMBIENT) * normal.normalize().dot(view).abs()
		} else {
			AMBIENT
		};
		let grey = (BASE_GREY * shade).min(255.0) as u8;
		let pixel = Rgba([grey, grey, grey, 255]);

		let x0 = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
		let x1 = (a.x.max(b.x).max(c.x).ceil() as u32).min(resolution.saturating_sub(1));
		let y0 = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
		let y1 = (a.y.max(b.y).max(c.y).ceil() as u32).min(resolution.saturating_sub(1));

		for y in y0..=y1 {
			for x in x0..=x1 {
				let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
				let w0 = edge(b, c, p) / area;
				let w1 = edge(c, a, p) / area;
				let w2 = edge(a, b, p) / area;

				if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
					continue;
				}

				let z = w0 * a.z + w1 * b.z + w2 * c.z;
				let idx = (y * resolution + x) as usize;

				if z < depth[idx] {
					depth[idx] = z;

					img.put_pixel(x, y, pixel);
				}
			}
		}
	}

	img
}

fn edge(a: Vec3, b: Vec3, point: Vec3) -> f32 {
	(point.x - a.x) * (b.y - a.y) - (point.y - a.y) * (b.x - a.x)
}
