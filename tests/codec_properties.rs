//! Integration tests for the `texcomp` facade: cross-format roundtrips and
//! the concrete scenarios a texture block codec must satisfy (uniform
//! blocks, high-contrast blocks, gradient monotonicity, dispatcher
//! equivalence).

use texcomp::prelude::*;

fn channel_at(rgba: &[u8], width: u32, x: u32, y: u32, c: usize) -> u8 {
	rgba[((y * width + x) * 4) as usize + c]
}

fn max_abs_channel_diff(a: &[u8], b: &[u8]) -> i32 {
	a.iter().zip(b.iter()).map(|(&x, &y)| (i32::from(x) - i32::from(y)).abs()).max().unwrap_or(0)
}

#[test]
fn bc7_uniform_block_decodes_exactly() {
	let rgba = vec![128u8, 96, 200, 255].repeat(16);
	let config = BptcConfig::default();
	let encoded = compress(Format::Bc7, &rgba, 4, 4, &config, DispatchStrategy::Serial).unwrap();
	let decoded = decompress(Format::Bc7, &encoded, 4, 4, DispatchStrategy::Serial).unwrap();
	assert_eq!(decoded, rgba);
}

#[test]
fn bc7_all_zero_block_decodes_exactly() {
	let rgba = vec![0u8; 4 * 4 * 4];
	let config = BptcConfig::default();
	let encoded = compress(Format::Bc7, &rgba, 4, 4, &config, DispatchStrategy::Serial).unwrap();
	let decoded = decompress(Format::Bc7, &encoded, 4, 4, DispatchStrategy::Serial).unwrap();
	assert_eq!(decoded, rgba);
}

#[test]
fn bc7_checkerboard_roundtrips_within_tight_error() {
	let w = 8;
	let h = 8;
	let mut rgba = vec![0u8; (w * h * 4) as usize];
	for y in 0..h {
		for x in 0..w {
			let on = (x + y) % 2 == 0;
			let v = if on { 255 } else { 0 };
			let a = if on { 255 } else { 128 };
			let off = ((y * w + x) * 4) as usize;
			rgba[off] = v;
			rgba[off + 1] = v;
			rgba[off + 2] = v;
			rgba[off + 3] = a;
		}
	}
	let config = BptcConfig::default();
	let encoded = compress(Format::Bc7, &rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
	let decoded = decompress(Format::Bc7, &encoded, w, h, DispatchStrategy::Serial).unwrap();
	assert_eq!(max_abs_channel_diff(&rgba, &decoded), 0);
}

#[test]
fn pvrtc_4bpp_checkerboard_error_bounded() {
	let w = 8;
	let h = 8;
	let mut rgba = vec![0u8; (w * h * 4) as usize];
	for y in 0..h {
		for x in 0..w {
			let on = (x + y) % 2 == 0;
			let v = if on { 255 } else { 0 };
			let a = if on { 255 } else { 128 };
			let off = ((y * w + x) * 4) as usize;
			rgba[off] = v;
			rgba[off + 1] = v;
			rgba[off + 2] = v;
			rgba[off + 3] = a;
		}
	}
	let config = BptcConfig::default();
	let encoded = compress(Format::Pvrtc4Bpp, &rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
	let decoded = decompress(Format::Pvrtc4Bpp, &encoded, w, h, DispatchStrategy::Serial).unwrap();
	assert!(max_abs_channel_diff(&rgba, &decoded) <= 32);
}

#[test]
fn pvrtc_4bpp_gradient_preserves_monotonicity() {
	let w = 8;
	let h = 8;
	let mut rgba = vec![0u8; (w * h * 4) as usize];
	for y in 0..h {
		for x in 0..w {
			let off = ((y * w + x) * 4) as usize;
			rgba[off] = (x * 16) as u8;
			rgba[off + 1] = (y * 16) as u8;
			rgba[off + 2] = 0;
			rgba[off + 3] = 255;
		}
	}
	let config = BptcConfig::default();
	let encoded = compress(Format::Pvrtc4Bpp, &rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
	let decoded = decompress(Format::Pvrtc4Bpp, &encoded, w, h, DispatchStrategy::Serial).unwrap();

	for y in 0..h {
		for x in 1..w {
			let prev = channel_at(&decoded, w, x - 1, y, 0);
			let cur = channel_at(&decoded, w, x, y, 0);
			assert!(cur as i32 >= prev as i32 - 8, "red channel should not decrease sharply along x");
		}
	}
	for x in 0..w {
		for y in 1..h {
			let prev = channel_at(&decoded, w, x, y - 1, 1);
			let cur = channel_at(&decoded, w, x, y, 1);
			assert!(cur as i32 >= prev as i32 - 8, "green channel should not decrease sharply along y");
		}
	}
}

#[test_log::test]
fn dispatcher_strategies_agree_across_formats() {
	let w = 64;
	let h = 64;
	let rgba: Vec<u8> = (0..(w * h * 4)).map(|i| ((i * 13) % 256) as u8).collect();
	let config = BptcConfig::default();

	for format in [Format::Bc7, Format::Dxt1, Format::Dxt5, Format::Etc1] {
		let serial = compress(format, &rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
		let thread_group =
			compress(format, &rgba, w, h, &config, DispatchStrategy::ThreadGroup { num_threads: 8 }).unwrap();
		let atomic_queue = compress(
			format,
			&rgba,
			w,
			h,
			&config,
			DispatchStrategy::AtomicQueue { num_threads: 8, job_size: 4 },
		)
		.unwrap();

		assert_eq!(serial, thread_group, "{format:?}: thread-group strategy diverged from serial");
		assert_eq!(serial, atomic_queue, "{format:?}: atomic-queue strategy diverged from serial");
	}
}

#[test]
fn dxt1_and_etc1_roundtrip_preserves_dimensions() {
	let w = 16;
	let h = 16;
	let rgba: Vec<u8> = (0..(w * h * 4)).map(|i| ((i * 29) % 256) as u8).collect();
	let config = BptcConfig::default();

	for format in [Format::Dxt1, Format::Dxt5, Format::Etc1] {
		let encoded = compress(format, &rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
		assert_eq!(encoded.len(), (w / 4 * h / 4) as usize * format.block_size_bytes());
		let decoded = decompress(format, &encoded, w, h, DispatchStrategy::Serial).unwrap();
		assert_eq!(decoded.len(), rgba.len());
	}
}

#[test]
fn invalid_dimensions_are_rejected() {
	let rgba = vec![0u8; 6 * 6 * 4];
	let config = BptcConfig::default();
	let err = compress(Format::Bc7, &rgba, 6, 6, &config, DispatchStrategy::Serial).unwrap_err();
	assert!(matches!(err, CodecError::InvalidDimensions { .. }));

	let err = compress(Format::Pvrtc4Bpp, &rgba, 6, 6, &config, DispatchStrategy::Serial).unwrap_err();
	assert!(matches!(err, CodecError::InvalidDimensions { .. }));
}

#[test]
fn block_modes_mask_starving_non_opaque_blocks_is_rejected() {
	let rgba = vec![10u8, 20, 30, 128].repeat(16);
	let config = BptcConfig { block_modes: !((1 << 4) | (1 << 5) | (1 << 6) | (1 << 7)), ..Default::default() };
	let err = compress(Format::Bc7, &rgba, 4, 4, &config, DispatchStrategy::Serial).unwrap_err();
	assert!(matches!(err, CodecError::InvalidBlockModes { mask } if mask == config.block_modes));
}
