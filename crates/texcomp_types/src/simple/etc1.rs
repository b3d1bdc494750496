//! ETC1: two 2x4 sub-blocks, each with its own 4-bit-per-channel base color
//! and 3-bit intensity-table selector, plus a 2-bit-per-texel modifier code.
//! 8 bytes per 4x4 block.
//!
//! The reference encoder treats ETC1 as a third-party library boundary
//! (`rg_etc1::pack_etc1_block`) rather than something to specify bit-exactly;
//! this follows the same two-subblock/intensity-table shape without chasing
//! hardware bit-for-bit layout.

use crate::pixel::{B, G, Pixel, R};

/// Packed size of one ETC1 block.
pub const BLOCK_SIZE_BYTES: usize = 8;

/// Standard ETC1 intensity modifier table, indexed `[table][code]`.
const INTENSITY_MODIFIERS: [[i16; 4]; 8] = [
	[2, 8, -2, -8],
	[5, 17, -5, -17],
	[9, 29, -9, -29],
	[13, 42, -13, -42],
	[18, 60, -18, -60],
	[24, 80, -24, -80],
	[33, 106, -33, -106],
	[47, 183, -47, -183],
];

/// Whether a block splits into left/right (vertical) or top/bottom
/// (horizontal) 2x4 sub-blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Split {
	Vertical,
	Horizontal,
}

fn subblock_texel_indices(split: Split, half: u8) -> [usize; 8] {
	match split {
		Split::Vertical => std::array::from_fn(|k| {
			let col = half as usize * 2 + k / 4;
			let row = k % 4;
			row * 4 + col
		}),
		Split::Horizontal => std::array::from_fn(|k| {
			let row = half as usize * 2 + k / 4;
			let col = k % 4;
			row * 4 + col
		}),
	}
}

fn average_color(texels: &[Pixel; 16], indices: &[usize; 8]) -> [u8; 3] {
	let mut sum = [0u32; 3];
	for &i in indices {
		sum[0] += u32::from(texels[i].channel(R));
		sum[1] += u32::from(texels[i].channel(G));
		sum[2] += u32::from(texels[i].channel(B));
	}
	std::array::from_fn(|c| (sum[c] / 8) as u8)
}

/// Picks the 3-bit intensity table and per-texel 2-bit codes minimizing
/// squared error for one sub-block against its (4-bit-quantized) base color.
fn best_table_and_codes(texels: &[Pixel; 16], indices: &[usize; 8], base: [u8; 3]) -> (u8, [u8; 8]) {
	let mut best_table = 0u8;
	let mut best_codes = [0u8; 8];
	let mut best_err = i64::MAX;

	for (table, modifiers) in INTENSITY_MODIFIERS.iter().enumerate() {
		let mut codes = [0u8; 8];
		let mut err = 0i64;
		for (k, &i) in indices.iter().enumerate() {
			let p = texels[i];
			let mut best_code = 0usize;
			let mut best_code_err = i64::MAX;
			for (code, &m) in modifiers.iter().enumerate() {
				let mut e = 0i64;
				for (c, chan) in [R, G, B].into_iter().enumerate() {
					let recon = (i32::from(base[c]) + i32::from(m)).clamp(0, 255);
					let d = i32::from(p.channel(chan)) - recon;
					e += i64::from(d * d);
				}
				if e < best_code_err {
					best_code_err = e;
					best_code = code;
				}
			}
			codes[k] = best_code as u8;
			err += best_code_err;
		}
		if err < best_err {
			best_err = err;
			best_table = table as u8;
			best_codes = codes;
		}
	}

	(best_table, best_codes)
}

fn quantize_to_4bit(c: [u8; 3]) -> [u8; 3] {
	std::array::from_fn(|i| {
		let nibble = (u32::from(c[i]) * 15 + 127) / 255;
		((nibble << 4) | nibble) as u8
	})
}

/// Encodes one 4x4 block, picking the vertical/horizontal split that yields
/// lower total squared error.
pub fn compress_block(texels: &[Pixel; 16]) -> [u8; BLOCK_SIZE_BYTES] {
	let try_split = |split: Split| -> (u64 /* packed */, i64 /* error */) {
		let mut packed = 0u64;
		let mut total_err = 0i64;
		for half in 0..2u8 {
			let idxs = subblock_texel_indices(split, half);
			let avg = average_color(texels, &idxs);
			let base4 = quantize_to_4bit(avg);
			let (table, codes) = best_table_and_codes(texels, &idxs, base4);

			for c in 0..3 {
				let nibble = u64::from(base4[c] >> 4);
				packed |= nibble << (c as u64 * 8 + u64::from(half) * 4);
			}
			packed |= u64::from(table) << (24 + u64::from(half) * 3);
			for (k, &code) in codes.iter().enumerate() {
				let texel_bit_pos = 32 + half as u64 * 16 + k as u64 * 2;
				packed |= u64::from(code) << texel_bit_pos;
			}

			for (k, &i) in idxs.iter().enumerate() {
				let modifier = i32::from(INTENSITY_MODIFIERS[table as usize][codes[k] as usize]);
				for (c, chan) in [R, G, B].into_iter().enumerate() {
					let recon = (i32::from(base4[c]) + modifier).clamp(0, 255);
					let d = i32::from(texels[i].channel(chan)) - recon;
					total_err += i64::from(d * d);
				}
			}
		}
		packed |= match split {
			Split::Vertical => 0,
			Split::Horizontal => 1,
		} << 30;
		(packed, total_err)
	};

	let (vert, vert_err) = try_split(Split::Vertical);
	let (horiz, horiz_err) = try_split(Split::Horizontal);
	let packed = if vert_err <= horiz_err { vert } else { horiz };

	packed.to_le_bytes()
}

/// Decodes one packed ETC1 block into 16 RGBA8 texels, raster order.
pub fn decode_block(data: &[u8; BLOCK_SIZE_BYTES]) -> [Pixel; 16] {
	let packed = u64::from_le_bytes(*data);
	let split = if (packed >> 30) & 1 != 0 { Split::Horizontal } else { Split::Vertical };

	let mut out = [Pixel::new(0, 0, 0, 0xFF); 16];
	for half in 0..2u8 {
		let base: [u8; 3] = std::array::from_fn(|c| {
			let nibble = ((packed >> (c as u64 * 8 + u64::from(half) * 4)) & 0xF) as u8;
			(nibble << 4) | nibble
		});
		let table = ((packed >> (24 + u64::from(half) * 3)) & 0x7) as usize;
		let idxs = subblock_texel_indices(split, half);
		for (k, &i) in idxs.iter().enumerate() {
			let texel_bit_pos = 32 + half as u64 * 16 + k as u64 * 2;
			let code = ((packed >> texel_bit_pos) & 0x3) as usize;
			let modifier = i32::from(INTENSITY_MODIFIERS[table][code]);
			let channels: [u8; 3] = std::array::from_fn(|c| (i32::from(base[c]) + modifier).clamp(0, 255) as u8);
			out[i] = Pixel::new(channels[0], channels[1], channels[2], 0xFF);
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn uniform_block_roundtrips_closely() {
		let texels = [Pixel::new(0x60, 0x60, 0x60, 0xFF); 16];
		let bytes = compress_block(&texels);
		let decoded = decode_block(&bytes);
		for p in decoded {
			assert!(p.channel(R).abs_diff(0x60) <= 4);
		}
	}

	#[test]
	fn block_size_is_eight_bytes() {
		let texels = [Pixel::new(10, 20, 30, 0xFF); 16];
		assert_eq!(compress_block(&texels).len(), 8);
	}
}
