//! Fixed lookup tables: partition shapes, anchor indices, interpolation
//! weights and per-mode attributes. Transcribed from the reference
//! partition-shape and anchor-index tables so that shape selection and
//! packing agree bit-for-bit with other BC7 encoders.

/// Number of 2-subset partition shapes.
pub const NUM_SHAPES_2: usize = 64;
/// Number of 3-subset partition shapes.
pub const NUM_SHAPES_3: usize = 64;

/// For each 2-subset shape, a 16-bit mask: bit `i` set means texel `i`
/// belongs to subset 1 (clear means subset 0).
pub const SHAPE_MASK_2: [u16; NUM_SHAPES_2] = [
	0xcccc, 0x8888, 0xeeee, 0xecc8, 0xc880, 0xfeec, 0xfec8, 0xec80, 0xc800, 0xffec, 0xfe80, 0xe800,
	0xffe8, 0xff00, 0xfff0, 0xf000, 0xf710, 0x008e, 0x7100, 0x08ce, 0x008c, 0x7310, 0x3100, 0x8cce,
	0x088c, 0x3110, 0x6666, 0x366c, 0x17e8, 0x0ff0, 0x718e, 0x399c, 0xaaaa, 0xf0f0, 0x5a5a, 0x33cc,
	0x3c3c, 0x55aa, 0x9696, 0xa55a, 0x73ce, 0x13c8, 0x324c, 0x3bdc, 0x6996, 0xc33c, 0x9966, 0x0660,
	0x0272, 0x04e4, 0x4e40, 0x2720, 0xc936, 0x936c, 0x39c6, 0x639c, 0x9336, 0x9cc6, 0x817e, 0xe718,
	0xccf0, 0x0fcc, 0x7744, 0xee22,
];

/// For each 3-subset shape, two 16-bit masks: bit `i` set in mask 0 means
/// texel `i` is in subset 1 or 2 (disambiguated by mask 1); clear means
/// subset 0.
pub const SHAPE_MASK_3: [[u16; 2]; NUM_SHAPES_3] = [
	[0xfecc, 0xf600], [0xffc8, 0x7300], [0xff90, 0x3310], [0xecce, 0x00ce],
	[0xff00, 0xcc00], [0xcccc, 0xcc00], [0xffcc, 0x00cc], [0xffcc, 0x3300],
	[0xff00, 0xf000], [0xfff0, 0xf000], [0xfff0, 0xff00], [0xcccc, 0x8888],
	[0xeeee, 0x8888], [0xeeee, 0xcccc], [0xffec, 0xec80], [0x739c, 0x7310],
	[0xfec8, 0xc800], [0x39ce, 0x3100], [0xfff0, 0xccc0], [0xfccc, 0x0ccc],
	[0xeeee, 0xee00], [0xff88, 0x7700], [0xeec0, 0xcc00], [0x7730, 0x3300],
	[0x0cee, 0x00cc], [0xffcc, 0xfc88], [0x6ff6, 0x0660], [0xff60, 0x6600],
	[0xcbbc, 0xc88c], [0xf966, 0xf900], [0xceec, 0x0cc0], [0xff10, 0x7310],
	[0xff80, 0xec80], [0xccce, 0x08ce], [0xeccc, 0xec80], [0x6666, 0x4444],
	[0x0ff0, 0x0f00], [0x6db6, 0x4924], [0x6bd6, 0x4294], [0xcf3c, 0x0c30],
	[0xc3fc, 0x03c0], [0xffaa, 0xff00], [0xff00, 0x5500], [0xfcfc, 0xcccc],
	[0xcccc, 0x0c0c], [0xf6f6, 0x6666], [0xaffa, 0x0ff0], [0xfff0, 0x5550],
	[0xfaaa, 0xf000], [0xeeee, 0x0e0e], [0xf8f8, 0x8888], [0xfff0, 0x9990],
	[0xeeee, 0xe00e], [0x8ff8, 0x8888], [0xf666, 0xf000], [0xff00, 0x9900],
	[0xff66, 0xff00], [0xcccc, 0xc00c], [0xcffc, 0xcccc], [0xf000, 0x9000],
	[0x8888, 0x0808], [0xfefe, 0xeeee], [0xfffa, 0xfff0], [0x7bde, 0x7310],
];

/// Anchor texel index for subset 1 of each 2-subset shape (subset 0's
/// anchor is always texel 0).
pub const ANCHOR_IDX_2: [u8; NUM_SHAPES_2] = [
	15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 2, 8, 2, 2, 8, 8, 15, 2, 8,
	2, 2, 8, 8, 2, 2, 15, 15, 6, 8, 2, 8, 15, 15, 2, 8, 2, 2, 2, 15, 15, 6, 6, 2, 6, 8, 15, 15, 2,
	2, 15, 15, 15, 15, 15, 2, 2, 15,
];

/// Anchor texel indices for subsets 1 and 2 of each 3-subset shape.
pub const ANCHOR_IDX_3: [[u8; NUM_SHAPES_3]; 2] = [
	[
		3, 3, 15, 15, 8, 3, 15, 15, 8, 8, 6, 6, 6, 5, 3, 3, 3, 3, 8, 15, 3, 3, 6, 10, 5, 8, 8, 6, 8,
		5, 15, 15, 8, 15, 3, 5, 6, 10, 8, 15, 15, 3, 15, 5, 15, 15, 15, 15, 3, 15, 5, 5, 5, 8, 5, 10,
		5, 10, 8, 13, 15, 12, 3, 3,
	],
	[
		15, 8, 8, 3, 15, 15, 3, 8, 15, 15, 15, 15, 15, 15, 15, 8, 15, 8, 15, 3, 15, 8, 15, 8, 3, 15,
		6, 10, 15, 15, 10, 8, 15, 3, 15, 10, 10, 8, 9, 10, 6, 15, 8, 15, 3, 6, 6, 8, 15, 3, 15, 15,
		15, 15, 15, 15, 15, 15, 15, 15, 3, 15, 15, 8,
	],
];

/// Returns the subset (0, 1 or 2) texel `idx` belongs to under `shape_idx`
/// of the given subset count.
pub fn subset_for_index(idx: usize, shape_idx: usize, num_subsets: u8) -> u8 {
	let bit = 1u16 << idx;
	match num_subsets {
		2 => u8::from(SHAPE_MASK_2[shape_idx] & bit != 0),
		3 => {
			let [m0, m1] = SHAPE_MASK_3[shape_idx];
			if m0 & bit != 0 { 1 + u8::from(m1 & bit != 0) } else { 0 }
		}
		_ => 0,
	}
}

/// Returns the anchor texel index for `subset` (1 or 2; subset 0's anchor
/// is always 0) of `shape_idx` with `num_subsets` total subsets.
pub fn anchor_index_for_subset(subset: u8, shape_idx: usize, num_subsets: u8) -> u8 {
	match subset {
		1 if num_subsets == 2 => ANCHOR_IDX_2[shape_idx],
		1 => ANCHOR_IDX_3[0][shape_idx],
		2 => ANCHOR_IDX_3[1][shape_idx],
		_ => 0,
	}
}

/// Interpolation weight pairs `(w0, w1)` with `w0 + w1 == 64`, indexed by
/// `[index_bits - 1][index]`.
pub const INTERPOLATION_VALUES: [[(u32, u32); 16]; 4] = [
	[
		(64, 0), (33, 31), (0, 64), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
		(0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
	],
	[
		(64, 0), (43, 21), (21, 43), (0, 64), (0, 0), (0, 0), (0, 0), (0, 0),
		(0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
	],
	[
		(64, 0), (55, 9), (46, 18), (37, 27), (27, 37), (18, 46), (9, 55), (0, 64),
		(0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
	],
	[
		(64, 0), (60, 4), (55, 9), (51, 13), (47, 17), (43, 21), (38, 26), (34, 30),
		(30, 34), (26, 38), (21, 43), (17, 47), (13, 51), (9, 55), (4, 60), (0, 64),
	],
];

/// Interpolates `e0`/`e1` at `index` with `index_bits` bits per index,
/// `result = (e0*w0 + e1*w1 + 32) >> 6`.
pub fn interpolate(e0: u8, e1: u8, index: u8, index_bits: u8) -> u8 {
	let (w0, w1) = INTERPOLATION_VALUES[index_bits as usize - 1][index as usize];
	(((u32::from(e0) * w0) + (u32::from(e1) * w1) + 32) >> 6) as u8
}

/// How p-bits are shared among a mode's endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PBitType {
	/// No p-bits.
	None,
	/// One p-bit per endpoint (2 per subset).
	NotShared,
	/// One p-bit shared by both endpoints of a subset.
	Shared,
}

/// Fixed per-mode attributes (spec §3's mode table).
#[derive(Debug, Clone, Copy)]
pub struct ModeAttributes {
	/// Mode index, 0..=7.
	pub mode: u8,
	/// Partition-index bit field width.
	pub partition_bits: u8,
	/// Number of subsets (1, 2 or 3).
	pub num_subsets: u8,
	/// Color index bit width.
	pub color_index_bits: u8,
	/// Alpha index bit width (0 if indices are shared with color).
	pub alpha_index_bits: u8,
	/// Color channel precision in bits.
	pub color_precision: u8,
	/// Alpha channel precision in bits (0 if alpha isn't separately stored).
	pub alpha_precision: u8,
	/// Whether the mode carries a 2-bit rotation field.
	pub has_rotation: bool,
	/// Whether the mode carries a 1-bit index-mode field.
	pub has_index_mode: bool,
	/// P-bit sharing scheme.
	pub p_bit_type: PBitType,
}

/// The eight BC7 mode attribute rows, indexed by mode.
pub const MODE_ATTRIBUTES: [ModeAttributes; 8] = [
	ModeAttributes { mode: 0, partition_bits: 4, num_subsets: 3, color_index_bits: 3, alpha_index_bits: 0, color_precision: 4, alpha_precision: 0, has_rotation: false, has_index_mode: false, p_bit_type: PBitType::NotShared },
	ModeAttributes { mode: 1, partition_bits: 6, num_subsets: 2, color_index_bits: 3, alpha_index_bits: 0, color_precision: 6, alpha_precision: 0, has_rotation: false, has_index_mode: false, p_bit_type: PBitType::Shared },
	ModeAttributes { mode: 2, partition_bits: 6, num_subsets: 3, color_index_bits: 2, alpha_index_bits: 0, color_precision: 5, alpha_precision: 0, has_rotation: false, has_index_mode: false, p_bit_type: PBitType::None },
	ModeAttributes { mode: 3, partition_bits: 6, num_subsets: 2, color_index_bits: 2, alpha_index_bits: 0, color_precision: 7, alpha_precision: 0, has_rotation: false, has_index_mode: false, p_bit_type: PBitType::NotShared },
	ModeAttributes { mode: 4, partition_bits: 0, num_subsets: 1, color_index_bits: 2, alpha_index_bits: 3, color_precision: 5, alpha_precision: 6, has_rotation: true, has_index_mode: true, p_bit_type: PBitType::None },
	ModeAttributes { mode: 5, partition_bits: 0, num_subsets: 1, color_index_bits: 2, alpha_index_bits: 2, color_precision: 7, alpha_precision: 8, has_rotation: true, has_index_mode: false, p_bit_type: PBitType::None },
	ModeAttributes { mode: 6, partition_bits: 0, num_subsets: 1, color_index_bits: 4, alpha_index_bits: 0, color_precision: 7, alpha_precision: 7, has_rotation: false, has_index_mode: false, p_bit_type: PBitType::NotShared },
	ModeAttributes { mode: 7, partition_bits: 6, num_subsets: 2, color_index_bits: 2, alpha_index_bits: 0, color_precision: 5, alpha_precision: 5, has_rotation: false, has_index_mode: false, p_bit_type: PBitType::NotShared },
];

/// Mode search order fixed by the encoder: `(0,2,1,3,7,4,5,6)`.
pub const MODE_SEARCH_ORDER: [u8; 8] = [0, 2, 1, 3, 7, 4, 5, 6];

/// P-bit combinations for modes with per-endpoint p-bits: `[p0, p1]`.
pub const PBITS_NOT_SHARED: [[u8; 2]; 4] = [[0, 0], [0, 1], [1, 0], [1, 1]];
/// P-bit combinations for modes with a shared p-bit: `[p, p]`.
pub const PBITS_SHARED: [[u8; 2]; 2] = [[0, 0], [1, 1]];

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shape_masks_partition_all_sixteen_texels() {
		for s in 0..NUM_SHAPES_2 {
			let mut counts = [0u32; 2];
			for i in 0..16 {
				counts[subset_for_index(i, s, 2) as usize] += 1;
			}
			assert_eq!(counts.iter().sum::<u32>(), 16);
		}
		for s in 0..NUM_SHAPES_3 {
			let mut counts = [0u32; 3];
			for i in 0..16 {
				counts[subset_for_index(i, s, 3) as usize] += 1;
			}
			assert_eq!(counts.iter().sum::<u32>(), 16);
		}
	}

	#[test]
	fn interpolation_weights_sum_to_64() {
		for bits in 1..=4u8 {
			let buckets = 1usize << bits;
			for idx in 0..buckets {
				let (w0, w1) = INTERPOLATION_VALUES[bits as usize - 1][idx];
				assert_eq!(w0 + w1, 64);
			}
		}
	}

	#[test]
	fn mode_attributes_match_mode_field() {
		for (i, m) in MODE_ATTRIBUTES.iter().enumerate() {
			assert_eq!(m.mode as usize, i);
		}
	}
}
