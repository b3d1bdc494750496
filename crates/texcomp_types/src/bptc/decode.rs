//! BC7 block decode: unpack bits, expand endpoints, interpolate and apply
//! rotation (spec §4.6).

use crate::pixel::{A, Pixel};

use super::pack::unpack;
use super::tables::{self, subset_for_index};
use super::{BLOCK_SIZE_BYTES, NUM_TEXELS};

/// Decodes one packed BC7 block into 16 RGBA8 texels, raster order.
///
/// A block whose unary mode header never terminates (reserved mode 8)
/// degrades gracefully to a fully opaque black block rather than aborting
/// the job, per the core's error-handling policy for malformed input.
pub fn decode_block(data: &[u8; BLOCK_SIZE_BYTES]) -> [Pixel; NUM_TEXELS] {
	let fields = unpack(data);

	if fields.mode == 8 {
		return [Pixel::new(0, 0, 0, 0xFF); NUM_TEXELS];
	}

	let attrs = tables::MODE_ATTRIBUTES[fields.mode as usize];

	// Expand each endpoint to 8 bits: OR in the p-bit at the low bit of the
	// stored precision, then MSB-replicate.
	let expand_endpoint = |ep: Pixel, p_bit: Option<u8>| -> Pixel {
		let mut channels = [0u8; 4];
		let mut depths = [0u8; 4];
		for c in 0..4 {
			let prec = ep.depth(c);
			if prec == 0 {
				channels[c] = 0xFF;
				depths[c] = 0;
				continue;
			}
			let (val, eff_prec) = match p_bit {
				Some(p) if prec < 8 => (ep.channel(c) | (p << (8 - prec - 1)), prec + 1),
				_ => (ep.channel(c), prec),
			};
			channels[c] = val;
			depths[c] = eff_prec;
		}
		Pixel::with_depths(channels, depths).change_bit_depth([8, 8, 8, 8])
	};

	let expanded: Vec<[Pixel; 2]> = fields
		.endpoints
		.iter()
		.enumerate()
		.map(|(subset, ep)| {
			let pbits = fields.p_bits.get(subset).copied();
			[
				expand_endpoint(ep[0], pbits.map(|p| p[0])),
				expand_endpoint(ep[1], pbits.map(|p| p[1])),
			]
		})
		.collect();

	let mut out = [Pixel::new(0, 0, 0, 0xFF); NUM_TEXELS];

	let has_alpha_indices = attrs.alpha_index_bits > 0;
	let (color_index_bits, alpha_index_bits) = if fields.index_mode == 1 {
		(attrs.alpha_index_bits, attrs.color_index_bits)
	} else {
		(attrs.color_index_bits, attrs.alpha_index_bits)
	};

	for i in 0..NUM_TEXELS {
		let subset = if attrs.num_subsets == 1 {
			0
		} else {
			subset_for_index(i, fields.shape, attrs.num_subsets)
		} as usize;

		let [e0, e1] = expanded[subset];
		let cidx = fields.color_indices[i];
		let mut pixel = Pixel::new(
			tables::interpolate(e0.channel(crate::pixel::R), e1.channel(crate::pixel::R), cidx, color_index_bits),
			tables::interpolate(e0.channel(crate::pixel::G), e1.channel(crate::pixel::G), cidx, color_index_bits),
			tables::interpolate(e0.channel(crate::pixel::B), e1.channel(crate::pixel::B), cidx, color_index_bits),
			0xFF,
		);

		if has_alpha_indices {
			let aidx = fields.alpha_indices[i];
			pixel.set_channel(
				A,
				tables::interpolate(e0.channel(A), e1.channel(A), aidx, alpha_index_bits),
			);
		} else if attrs.alpha_precision > 0 {
			pixel.set_channel(A, tables::interpolate(e0.channel(A), e1.channel(A), cidx, color_index_bits));
		}

		if attrs.has_rotation && fields.rotation != 0 {
			let swap_channel = match fields.rotation {
				1 => crate::pixel::R,
				2 => crate::pixel::G,
				3 => crate::pixel::B,
				_ => unreachable!(),
			};
			let a = pixel.channel(A);
			let c = pixel.channel(swap_channel);
			pixel.set_channel(A, c);
			pixel.set_channel(swap_channel, a);
		}

		out[i] = pixel;
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bptc::LogicalBlock;
	use crate::bptc::pack::pack;
	use crate::pixel::Pixel;

	#[test]
	fn transparent_block_decodes_to_black_opaque() {
		let block = LogicalBlock {
			mode: 6,
			shape: 0,
			rotation: 0,
			index_mode: 0,
			endpoints: vec![[Pixel::new(0, 0, 0, 0), Pixel::new(0, 0, 0, 0)]],
			p_bits: vec![[0, 0]],
			color_indices: [0; NUM_TEXELS],
			alpha_indices: [0; NUM_TEXELS],
		};
		let bytes = pack(&block);
		let decoded = decode_block(&bytes);
		for p in decoded {
			assert_eq!(p.channel(crate::pixel::R), 0);
			assert_eq!(p.channel(A), 0);
		}
	}

	#[test]
	fn malformed_block_decodes_opaque_black() {
		let bytes = [0u8; BLOCK_SIZE_BYTES];
		let decoded = decode_block(&bytes);
		for p in decoded {
			assert_eq!(p.channel(crate::pixel::R), 0);
			assert_eq!(p.channel(A), 0xFF);
		}
	}
}
