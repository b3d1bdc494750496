//! DXT5: an 8-byte alpha block (2 endpoints + 16x 3-bit indices) followed by
//! a DXT1-style color block, 16 bytes per 4x4 block. Alpha endpoint/index
//! selection grounded in `DXTCompressor.cpp`'s `GetMinMaxColorsWithAlpha`/
//! `EmitAlphaIndices`.

use crate::pixel::{A, Pixel};
use crate::simple::dxt1;

/// Packed size of one DXT5 block.
pub const BLOCK_SIZE_BYTES: usize = 16;

fn pack_alpha_indices(indices: &[u8; 16]) -> [u8; 6] {
	let mut out = [0u8; 6];
	for (group, chunk) in out.chunks_mut(3).zip(indices.chunks(8)) {
		let mut bits = 0u32;
		for (i, &idx) in chunk.iter().enumerate() {
			bits |= u32::from(idx) << (i * 3);
		}
		group.copy_from_slice(&bits.to_le_bytes()[0..3]);
	}
	out
}

fn unpack_alpha_indices(bytes: &[u8]) -> [u8; 16] {
	let mut out = [0u8; 16];
	for (group, chunk) in bytes.chunks(3).zip(out.chunks_mut(8)) {
		let bits = u32::from(group[0]) | (u32::from(group[1]) << 8) | (u32::from(group[2]) << 16);
		for (i, slot) in chunk.iter_mut().enumerate() {
			*slot = ((bits >> (i * 3)) & 0x7) as u8;
		}
	}
	out
}

/// Encodes one 4x4 block, selecting alpha endpoints from the channel's
/// min/max inset by 1/16 of the range, same as the color endpoints.
pub fn compress_block(texels: &[Pixel; 16]) -> [u8; BLOCK_SIZE_BYTES] {
	let mut min_a = 255u8;
	let mut max_a = 0u8;
	for p in texels {
		min_a = min_a.min(p.channel(A));
		max_a = max_a.max(p.channel(A));
	}
	let inset = (max_a - min_a) >> 4;
	let min_a = min_a.saturating_add(inset);
	let max_a = max_a.saturating_sub(inset);

	// 8-value ramp between max_a (index 0) and min_a (index 1).
	let ramp: [u8; 8] = std::array::from_fn(|i| {
		let num = i as u16;
		((u16::from(max_a) * (7 - num) + u16::from(min_a) * num) / 7) as u8
	});

	let mut indices = [0u8; 16];
	for (i, p) in texels.iter().enumerate() {
		let a = p.channel(A);
		let mut best = 0usize;
		let mut best_d = u16::MAX;
		for (k, &r) in ramp.iter().enumerate() {
			let d = u16::from(a.abs_diff(r));
			if d < best_d {
				best_d = d;
				best = k;
			}
		}
		indices[i] = best as u8;
	}

	let mut out = [0u8; BLOCK_SIZE_BYTES];
	out[0] = max_a;
	out[1] = min_a;
	out[2..8].copy_from_slice(&pack_alpha_indices(&indices));

	let color_texels: [Pixel; 16] = std::array::from_fn(|i| texels[i]);
	out[8..16].copy_from_slice(&dxt1::compress_block(&color_texels));
	out
}

/// Decodes one packed DXT5 block into 16 RGBA8 texels, raster order.
pub fn decode_block(data: &[u8; BLOCK_SIZE_BYTES]) -> [Pixel; 16] {
	let a0 = data[0];
	let a1 = data[1];
	let indices = unpack_alpha_indices(&data[2..8]);

	// Standard DXT5 8-value / 6-value-plus-extremes alpha interpolation.
	let mut ramp = [0u8; 8];
	if a0 > a1 {
		for (i, slot) in ramp.iter_mut().enumerate() {
			let num = i as u16;
			*slot = ((u16::from(a0) * (7 - num) + u16::from(a1) * num) / 7) as u8;
		}
	} else {
		for (i, slot) in ramp.iter_mut().take(6).enumerate() {
			let num = i as u16;
			*slot = ((u16::from(a0) * (5 - num) + u16::from(a1) * num) / 5) as u8;
		}
		ramp[6] = 0;
		ramp[7] = 255;
	}

	let color_bytes: [u8; 8] = data[8..16].try_into().unwrap();
	let mut out = dxt1::decode_block(&color_bytes);
	for (i, p) in out.iter_mut().enumerate() {
		p.set_channel(A, ramp[indices[i] as usize]);
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pixel::R;

	#[test]
	fn uniform_alpha_roundtrips_exactly() {
		let texels = [Pixel::new(0x10, 0x20, 0x30, 0x80); 16];
		let bytes = compress_block(&texels);
		let decoded = decode_block(&bytes);
		for p in decoded {
			assert_eq!(p.channel(A), 0x80);
			assert_eq!(p.channel(R), 0x10);
		}
	}

	#[test]
	fn block_size_is_sixteen_bytes() {
		let texels = [Pixel::new(1, 2, 3, 4); 16];
		assert_eq!(compress_block(&texels).len(), 16);
	}
}
