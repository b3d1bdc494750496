//! BPTC/BC7 block codec.
//!
//! A BC7 block is 128 bits encoding one of eight modes, each trading off
//! partition count, index precision and endpoint precision differently (see
//! [`tables::MODE_ATTRIBUTES`]). [`LogicalBlock`] is the mode-agnostic,
//! unpacked representation the encoder searches over and the decoder
//! produces; [`pack`]/[`unpack`] convert it to and from the 128-bit wire
//! format.

pub mod cluster;
pub mod decode;
pub mod encode;
pub mod pack;
pub mod tables;

use crate::pixel::Pixel;

/// Size in bytes of one packed BC7 block.
pub const BLOCK_SIZE_BYTES: usize = 16;
/// Number of texels in a BC7 block.
pub const NUM_TEXELS: usize = 16;

/// The unpacked contents of one BC7 block, independent of its wire encoding.
#[derive(Debug, Clone)]
pub struct LogicalBlock {
	/// BC7 mode, 0..=7. Mode 8 marks a malformed/reserved block produced by
	/// [`decode::decode_block`] when the unary header has no terminator.
	pub mode: u8,
	/// Partition shape index, meaningful only when the mode has multiple
	/// subsets.
	pub shape: usize,
	/// Rotation selector (0..=3), only meaningful for modes 4 and 5.
	pub rotation: u8,
	/// Index-mode bit (0 or 1), only meaningful for mode 4.
	pub index_mode: u8,
	/// Endpoint pairs, one per subset, in subset order.
	pub endpoints: Vec<[Pixel; 2]>,
	/// Per-subset p-bit pairs (`[p0, p1]`), empty if the mode has no p-bits.
	pub p_bits: Vec<[u8; 2]>,
	/// Per-texel color index, raster order.
	pub color_indices: [u8; NUM_TEXELS],
	/// Per-texel alpha index, raster order; unused (left at 0) unless the
	/// mode has a separate alpha index table.
	pub alpha_indices: [u8; NUM_TEXELS],
}

impl LogicalBlock {
	/// Number of subsets this block's mode uses.
	pub fn num_subsets(&self) -> u8 {
		tables::MODE_ATTRIBUTES
			.get(self.mode as usize)
			.map_or(1, |a| a.num_subsets)
	}
}

pub use pack::pack;
pub use pack::unpack;
