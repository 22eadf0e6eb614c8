pub mod db;
pub mod models;
pub mod schema;
pub mod tables;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Renders a vector as a pgvector literal; bound as text and cast with
/// `::text::vector` in queries.
pub fn vector_literal(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);
	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}
		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}
