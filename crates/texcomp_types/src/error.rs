//! Error types surfaced by the codec core.

use thiserror::Error;

/// Errors a [`crate::job::CompressionJob`] or
/// [`crate::job::DecompressionJob`] can signal at dispatch time.
///
/// Per-block decode faults never reach this type: a malformed block decodes
/// to a defined fallback pixel pattern instead of aborting the job (see
/// [`crate::bptc::decode`]).
#[derive(Debug, Error)]
pub enum CodecError {
	/// Job width/height is not a multiple of the format's block dimension,
	/// or (PVRTC only) not a square power of two.
	#[error(
		"invalid dimensions {width}x{height} for format {format:?} (block size {block_w}x{block_h})"
	)]
	InvalidDimensions {
		/// Format the job was created for.
		format: crate::job::Format,
		/// Requested image width in pixels.
		width: u32,
		/// Requested image height in pixels.
		height: u32,
		/// Format's block width in pixels.
		block_w: u32,
		/// Format's block height in pixels.
		block_h: u32,
	},

	/// `block_modes` disables every BPTC mode capable of representing the
	/// block's alpha content.
	#[error("block_modes mask {mask:#04x} disables every mode that can encode this block")]
	InvalidBlockModes {
		/// The offending `block_modes` bitmask.
		mask: u8,
	},

	/// Output buffer is smaller than `block_count * block_size_bytes`.
	#[error("output buffer too small: need {needed} bytes, got {actual}")]
	BufferTooSmall {
		/// Bytes required to hold every block.
		needed: usize,
		/// Bytes actually available.
		actual: usize,
	},
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::job::Format;

	#[test]
	fn display_strings_are_stable() {
		let err = CodecError::BufferTooSmall { needed: 16, actual: 8 };
		assert_eq!(err.to_string(), "output buffer too small: need 16 bytes, got 8");

		let err = CodecError::InvalidDimensions {
			format: Format::Bc7,
			width: 5,
			height: 5,
			block_w: 4,
			block_h: 4,
		};
		assert!(err.to_string().contains("5x5"));
	}
}
