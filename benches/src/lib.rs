//! Benchmark helper utilities for texcomp.
//!
//! Synthetic RGBA images generated here stand in for real texture assets:
//! a gradient (low-frequency, compresses well) and a checkerboard
//! (high-frequency, stresses the endpoint/shape search).

/// Generates a synthetic RGBA image whose channels are smooth linear
/// ramps of `x`/`y`, useful for exercising the low-error end of the
/// encoders' search space.
pub fn generate_gradient(width: u32, height: u32) -> Vec<u8> {
	let mut data = Vec::with_capacity((width * height * 4) as usize);
	for y in 0..height {
		for x in 0..width {
			data.push((x % 256) as u8);
			data.push((y % 256) as u8);
			data.push(((x + y) % 256) as u8);
			data.push(255);
		}
	}
	data
}

/// Generates a synthetic RGBA checkerboard image at `cell` pixels per
/// square, useful for exercising high-contrast 2-subset/endpoint search.
pub fn generate_checkerboard(width: u32, height: u32, cell: u32) -> Vec<u8> {
	let mut data = Vec::with_capacity((width * height * 4) as usize);
	for y in 0..height {
		for x in 0..width {
			let on = ((x / cell) + (y / cell)) % 2 == 0;
			let v = if on { 255 } else { 0 };
			data.extend_from_slice(&[v, v, v, 255]);
		}
	}
	data
}

/// Common benchmark image sizes, kept small since PVRTC requires square
/// power-of-two dimensions and BC7's simulated annealing is the slowest
/// path in the suite.
pub mod sizes {
	/// Tiny image: 32x32.
	pub const TINY: (u32, u32) = (32, 32);
	/// Small image: 64x64.
	pub const SMALL: (u32, u32) = (64, 64);
	/// Medium image: 128x128.
	pub const MEDIUM: (u32, u32) = (128, 128);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generate_gradient_has_expected_len() {
		let data = generate_gradient(8, 8);
		assert_eq!(data.len(), 8 * 8 * 4);
	}

	#[test]
	fn generate_checkerboard_alternates() {
		let data = generate_checkerboard(4, 4, 1);
		assert_eq!(data[0], 255);
		assert_eq!(data[4], 0);
	}
}
