//! Top-level encode/decode entry points, tying a [`Format`] to its codec,
//! an optional [`BptcConfig`], and a [`DispatchStrategy`] into one call.
//!
//! PVRTC is image-global (its encode labeling pass and decode upsampling
//! both need the whole block grid at once) and always runs on the calling
//! thread regardless of the requested strategy, per spec §4.9's dispatcher
//! constraint; every other format is block-local and goes through
//! [`dispatch_compress`]/[`dispatch_decompress`].

use texcomp_types::job::{DecompressionJob, validate_dimensions};
use texcomp_types::{CodecError, CompressionJob, Format, Pixel};

use crate::config::BptcConfig;
use crate::dispatcher::{BlockStat, CompressionTask, DispatchStrategy, StatsSink, dispatch_compress, dispatch_decompress};

fn to_array16(texels: &[Pixel]) -> [Pixel; 16] {
	texels.try_into().expect("block-local formats are always 4x4")
}

/// Compresses `rgba` (an 8-bit RGBA image, row-major, no padding) to
/// `format`, returning the packed block stream.
pub fn compress(
	format: Format,
	rgba: &[u8],
	width: u32,
	height: u32,
	bptc_config: &BptcConfig,
	strategy: DispatchStrategy,
) -> Result<Vec<u8>, CodecError> {
	let job = CompressionJob::new(format, rgba, width, height)?;
	let block_size = format.block_size_bytes();
	let mut out = vec![0u8; job.total_blocks() as usize * block_size];

	match format {
		Format::Pvrtc4Bpp | Format::Pvrtc2Bpp => {
			texcomp_types::pvrtc::encode::encode(&job, &mut out);
		}
		Format::Bc7 => {
			texcomp_types::bptc::encode::validate_block_modes(bptc_config)?;
			let config = *bptc_config;
			dispatch_compress(
				&job,
				&mut out,
				block_size,
				strategy,
				CompressionTask::Plain(move |texels: &[Pixel]| {
					let logical = texcomp_types::bptc::encode::compress_block(&to_array16(texels), &config);
					let mode = logical.mode;
					(texcomp_types::bptc::pack::pack(&logical).to_vec(), BlockStat { mode, error: 0.0 })
				}),
			);
		}
		Format::Dxt1 => {
			dispatch_compress(
				&job,
				&mut out,
				block_size,
				strategy,
				CompressionTask::Plain(|texels: &[Pixel]| {
					(texcomp_types::simple::dxt1::compress_block(&to_array16(texels)).to_vec(), BlockStat::default())
				}),
			);
		}
		Format::Dxt5 => {
			dispatch_compress(
				&job,
				&mut out,
				block_size,
				strategy,
				CompressionTask::Plain(|texels: &[Pixel]| {
					(texcomp_types::simple::dxt5::compress_block(&to_array16(texels)).to_vec(), BlockStat::default())
				}),
			);
		}
		Format::Etc1 => {
			dispatch_compress(
				&job,
				&mut out,
				block_size,
				strategy,
				CompressionTask::Plain(|texels: &[Pixel]| {
					(texcomp_types::simple::etc1::compress_block(&to_array16(texels)).to_vec(), BlockStat::default())
				}),
			);
		}
	}

	Ok(out)
}

/// Compresses a BC7 image exactly like [`compress`], but additionally
/// returns a per-block [`BlockStat`] (mode, quantized error) diagnostic,
/// computed by re-decoding each packed block and summing squared channel
/// error against the source texels. See spec's `BlockStatList` note for why
/// this is a separate entry point rather than a flag on [`compress`]: only
/// callers that want the histogram pay its re-decode cost.
pub fn compress_bc7_with_stats(
	rgba: &[u8],
	width: u32,
	height: u32,
	bptc_config: &BptcConfig,
	strategy: DispatchStrategy,
) -> Result<(Vec<u8>, Vec<Option<BlockStat>>), CodecError> {
	texcomp_types::bptc::encode::validate_block_modes(bptc_config)?;
	let job = CompressionJob::new(Format::Bc7, rgba, width, height)?;
	let block_size = Format::Bc7.block_size_bytes();
	let mut out = vec![0u8; job.total_blocks() as usize * block_size];
	let sink = StatsSink::new(job.total_blocks());
	let config = *bptc_config;

	dispatch_compress(
		&job,
		&mut out,
		block_size,
		strategy,
		CompressionTask::WithStats(
			move |texels: &[Pixel]| {
				let source = to_array16(texels);
				let logical = texcomp_types::bptc::encode::compress_block(&source, &config);
				let packed = texcomp_types::bptc::pack::pack(&logical);
				let decoded = texcomp_types::bptc::decode::decode_block(&packed);
				let error: f64 = source
					.iter()
					.zip(decoded.iter())
					.flat_map(|(s, d)| (0..4).map(move |c| (s.channel(c), d.channel(c))))
					.map(|(a, b)| f64::from(i32::from(a) - i32::from(b)).powi(2))
					.sum();
				(packed.to_vec(), BlockStat { mode: logical.mode, error })
			},
			&sink,
		),
	);

	Ok((out, sink.into_ordered()))
}

/// Decompresses a `format` block stream into an 8-bit RGBA image.
pub fn decompress(
	format: Format,
	blocks: &[u8],
	width: u32,
	height: u32,
	strategy: DispatchStrategy,
) -> Result<Vec<u8>, CodecError> {
	let mut out = vec![0u8; (width * height * 4) as usize];

	match format {
		Format::Pvrtc4Bpp | Format::Pvrtc2Bpp => {
			let mut job = DecompressionJob::new(format, blocks, &mut out, width, height)?;
			texcomp_types::pvrtc::decode::decode(&mut job);
		}
		Format::Bc7 => {
			let (bx, by) = validate_dimensions(format, width, height)?;
			dispatch_decompress(blocks, &mut out, format, width, bx * by, format.block_size_bytes(), strategy, |data| {
				texcomp_types::bptc::decode::decode_block(data.try_into().expect("BC7 block is 16 bytes")).to_vec()
			});
		}
		Format::Dxt1 => {
			let (bx, by) = validate_dimensions(format, width, height)?;
			dispatch_decompress(blocks, &mut out, format, width, bx * by, format.block_size_bytes(), strategy, |data| {
				texcomp_types::simple::dxt1::decode_block(data.try_into().expect("DXT1 block is 8 bytes")).to_vec()
			});
		}
		Format::Dxt5 => {
			let (bx, by) = validate_dimensions(format, width, height)?;
			dispatch_decompress(blocks, &mut out, format, width, bx * by, format.block_size_bytes(), strategy, |data| {
				texcomp_types::simple::dxt5::decode_block(data.try_into().expect("DXT5 block is 16 bytes")).to_vec()
			});
		}
		Format::Etc1 => {
			let (bx, by) = validate_dimensions(format, width, height)?;
			dispatch_decompress(blocks, &mut out, format, width, bx * by, format.block_size_bytes(), strategy, |data| {
				texcomp_types::simple::etc1::decode_block(data.try_into().expect("ETC1 block is 8 bytes")).to_vec()
			});
		}
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dxt1_roundtrips_through_all_three_strategies() {
		let w = 16;
		let h = 16;
		let rgba: Vec<u8> = (0..(w * h * 4)).map(|i| ((i * 7) % 256) as u8).collect();
		let config = BptcConfig::default();

		let serial = compress(Format::Dxt1, &rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
		let tg = compress(Format::Dxt1, &rgba, w, h, &config, DispatchStrategy::ThreadGroup { num_threads: 4 }).unwrap();
		let aq = compress(
			Format::Dxt1,
			&rgba,
			w,
			h,
			&config,
			DispatchStrategy::AtomicQueue { num_threads: 4, job_size: 3 },
		)
		.unwrap();

		assert_eq!(serial, tg);
		assert_eq!(serial, aq);

		let decoded = decompress(Format::Dxt1, &serial, w, h, DispatchStrategy::Serial).unwrap();
		assert_eq!(decoded.len(), rgba.len());
	}

	#[test]
	fn bc7_uniform_block_roundtrips_exactly() {
		let w = 4;
		let h = 4;
		let rgba = vec![128u8, 64, 32, 255].repeat(16);
		let config = BptcConfig::default();
		let encoded = compress(Format::Bc7, &rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
		let decoded = decompress(Format::Bc7, &encoded, w, h, DispatchStrategy::Serial).unwrap();
		assert_eq!(decoded, rgba);
	}

	#[test]
	fn bc7_stats_report_zero_error_for_uniform_blocks() {
		let w = 8;
		let h = 8;
		let rgba = vec![40u8, 80, 120, 255].repeat(16);
		let config = BptcConfig::default();
		let (encoded, stats) = compress_bc7_with_stats(&rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
		assert_eq!(encoded.len(), 4 * Format::Bc7.block_size_bytes());
		assert_eq!(stats.len(), 4);
		for stat in stats.into_iter().flatten() {
			assert_eq!(stat.error, 0.0);
		}
	}
}
