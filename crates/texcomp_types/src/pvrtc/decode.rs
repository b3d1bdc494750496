//! PVRTC decode (spec §4.7): de-interleave Morton-ordered blocks, build the
//! two low-res endpoint images, bilinearly upsample with fractional residue,
//! expand to 8-bit, then blend per-texel by modulation. Grounded in
//! `Decompressor.cpp`'s `Decompress4BPP`/`Decompress2BPP` and `Image.cpp`'s
//! `BilinearUpscale`/`ExpandTo8888`.

use crate::job::{DecompressionJob, Format};
use crate::pixel::{A, B, G, Pixel, R};

use super::{BLOCK_SIZE_BYTES, RawEndpoint, color_a, color_b, get_2bpp_lerp_value, get_2bpp_submode, lerp_value, mode_bit, morton_index, msb_replicate, SubMode2Bpp};

/// A low-res image at a common 5-bit-per-channel precision, RGBA-ordered.
pub(crate) struct Common5Image {
	pub(crate) w: u32,
	pub(crate) h: u32,
	pub(crate) data: Vec<[u8; 4]>,
}

impl Common5Image {
	pub(crate) fn new(w: u32, h: u32) -> Self {
		Self { w, h, data: vec![[0u8; 4]; (w * h) as usize] }
	}

	pub(crate) fn get(&self, x: i64, y: i64) -> [u8; 4] {
		let wx = x.rem_euclid(i64::from(self.w)) as u32;
		let wy = y.rem_euclid(i64::from(self.h)) as u32;
		self.data[(wy * self.w + wx) as usize]
	}

	pub(crate) fn set(&mut self, x: u32, y: u32, v: [u8; 4]) {
		self.data[(y * self.w + x) as usize] = v;
	}
}

pub(crate) fn endpoint_to_common5(ep: RawEndpoint) -> [u8; 4] {
	let mut out = [0u8; 4];
	for &c in &[R, G, B] {
		out[c] = msb_replicate(ep.channels[c], ep.depths[c], 5);
	}
	out[A] = if ep.depths[A] == 0 {
		31
	} else {
		// Alpha doesn't MSB-replicate in hardware; the low bit is fixed at 0.
		msb_replicate(ep.channels[A], ep.depths[A], 5) & !1
	};
	out
}

/// Bilinearly upsamples `img` by `(1<<xtimes, 1<<ytimes)` with wraparound,
/// returning the integer-precision result and a fractional residue image at
/// `xtimes + ytimes` bits of depth. Grounded in `Image::BilinearUpscale`.
pub(crate) fn bilinear_upscale(img: &Common5Image, xtimes: u32, ytimes: u32) -> (Common5Image, Common5Image) {
	let scale_x = 1u32 << xtimes;
	let scale_y = 1u32 << ytimes;
	let offset_x = scale_x >> 1;
	let offset_y = scale_y >> 1;
	let new_w = img.w * scale_x;
	let new_h = img.h * scale_y;

	let mut out = Common5Image::new(new_w, new_h);
	let mut frac = Common5Image::new(new_w, new_h);
	let denom = scale_x * scale_y;

	for j in 0..new_h {
		for i in 0..new_w {
			let high_x = i64::from((i + offset_x) / scale_x);
			let low_x = high_x - 1;
			let high_y = i64::from((j + offset_y) / scale_y);
			let low_y = high_y - 1;

			let high_x_w = (i + offset_x) % scale_x;
			let low_x_w = scale_x - high_x_w;
			let high_y_w = (j + offset_y) % scale_y;
			let low_y_w = scale_y - high_y_w;

			let tl_w = low_x_w * low_y_w;
			let tr_w = high_x_w * low_y_w;
			let bl_w = low_x_w * high_y_w;
			let br_w = high_x_w * high_y_w;

			let tl = img.get(low_x, low_y);
			let tr = img.get(high_x, low_y);
			let bl = img.get(low_x, high_y);
			let br = img.get(high_x, high_y);

			let mut int_px = [0u8; 4];
			let mut frac_px = [0u8; 4];
			for c in 0..4 {
				let sum =
					u32::from(tl[c]) * tl_w + u32::from(tr[c]) * tr_w + u32::from(bl[c]) * bl_w + u32::from(br[c]) * br_w;
				int_px[c] = (sum / denom) as u8;
				frac_px[c] = (sum % denom) as u8;
			}
			out.set(i, j, int_px);
			frac.set(i, j, frac_px);
		}
	}
	(out, frac)
}

/// Expands a common-5-bit image plus its bilinear fractional residue to full
/// 8-bit RGBA, per `Image::ExpandTo8888`.
pub(crate) fn expand_to_8888(int_img: &Common5Image, frac_img: &Common5Image, frac_depth: u32) -> Vec<Pixel> {
	let denom = 1u32 << 5;
	let numer = denom + 1;
	let shift = frac_depth - 3; // fullDepth(8) - currentDepth(5)
	let mut out = Vec::with_capacity(int_img.data.len());
	for i in 0..int_img.data.len() {
		let int_px = int_img.data[i];
		let frac_px = frac_img.data[i];
		let mut channels = [0u8; 4];
		for c in 0..4 {
			let base = u32::from(msb_replicate(int_px[c], 5, 8));
			let frac_bits = u32::from(frac_px[c]) >> shift;
			channels[c] = (base + (frac_bits * numer) / denom).min(255) as u8;
		}
		out.push(Pixel::new(channels[R], channels[G], channels[B], channels[A]));
	}
	out
}

/// Decodes a whole PVRTC job (4bpp or 2bpp) into its output buffer.
pub fn decode(job: &mut DecompressionJob) {
	let format = job.format();
	let is_2bpp = matches!(format, Format::Pvrtc2Bpp);
	let (bw, bh) = format.block_dims();
	let blocks_w = job.width() / bw;
	let blocks_h = job.height() / bh;

	let mut blocks = vec![0u64; (blocks_w * blocks_h) as usize];
	for by in 0..blocks_h {
		for bx in 0..blocks_w {
			let stream_pos = morton_index(bx, by);
			let bytes = job.block_bytes(stream_pos);
			let arr: [u8; BLOCK_SIZE_BYTES] = bytes.try_into().expect("block slice is 8 bytes");
			blocks[(by * blocks_w + bx) as usize] = u64::from_le_bytes(arr);
		}
	}

	let mut img_a = Common5Image::new(blocks_w, blocks_h);
	let mut img_b = Common5Image::new(blocks_w, blocks_h);
	for (idx, &b) in blocks.iter().enumerate() {
		img_a.data[idx] = endpoint_to_common5(color_a(b));
		img_b.data[idx] = endpoint_to_common5(color_b(b));
	}

	let (xtimes, ytimes) = if is_2bpp { (3, 2) } else { (2, 2) };
	let (int_a, frac_a) = bilinear_upscale(&img_a, xtimes, ytimes);
	let (int_b, frac_b) = bilinear_upscale(&img_b, xtimes, ytimes);
	let full_a = expand_to_8888(&int_a, &frac_a, xtimes + ytimes);
	let full_b = expand_to_8888(&int_b, &frac_b, xtimes + ytimes);

	let w = job.width();
	let h = job.height();
	if is_2bpp {
		decode_2bpp(job, &blocks, w, h, &full_a, &full_b);
	} else {
		decode_4bpp(job, &blocks, w, &full_a, &full_b);
	}
}

fn decode_4bpp(job: &mut DecompressionJob, blocks: &[u64], w: u32, full_a: &[Pixel], full_b: &[Pixel]) {
	let blocks_w = w / 4;
	let total = job.total_blocks();
	for block_idx in 0..total {
		let (x0, y0) = crate::job::block_coord(Format::Pvrtc4Bpp, w, block_idx);
		let b = blocks[((y0 / 4) * blocks_w + (x0 / 4)) as usize];
		let mode = mode_bit(b);
		let mut out = [Pixel::default(); 16];

		for row in 0..4u32 {
			for col in 0..4u32 {
				let px = x0 + col;
				let py = y0 + row;
				let texel_idx = row * 4 + col;

				let mut punch_through = false;
				let lerp_val: i32 = if mode {
					let mut mv = i32::from(lerp_value(b, texel_idx));
					if mv >= 2 {
						if mv == 2 {
							punch_through = true;
						}
						mv -= 1;
					}
					[8, 4, 0][mv as usize]
				} else {
					[8, 5, 3, 0][lerp_value(b, texel_idx) as usize]
				};

				let pa = full_a[(py * w + px) as usize];
				let pb = full_b[(py * w + px) as usize];
				let mut channels = [0u8; 4];
				for c in 0..4 {
					let a_v = i32::from(pa.channel(c));
					let b_v = i32::from(pb.channel(c));
					channels[c] = ((a_v * (8 - lerp_val) + b_v * lerp_val) / 8) as u8;
				}
				if punch_through {
					channels[A] = 0;
				}
				out[texel_idx as usize] = Pixel::new(channels[R], channels[G], channels[B], channels[A]);
			}
		}
		job.write_block(block_idx, &out);
	}
}

fn decode_2bpp(job: &mut DecompressionJob, blocks: &[u64], w: u32, h: u32, full_a: &[Pixel], full_b: &[Pixel]) {
	const BW: u32 = 8;
	const BH: u32 = 4;
	let blocks_per_row = w / BW;

	let mut mod_values = vec![0u8; (w * h) as usize];
	for j in 0..h {
		for i in 0..w {
			let block_idx = (j / BH) * blocks_per_row + (i / BW);
			let b = blocks[block_idx as usize];
			let texel_idx = (j % BH) * BW + (i % BW);

			let lerp_val = if mode_bit(b) {
				let texel_x = texel_idx % BW;
				let texel_y = texel_idx / BW;
				if (texel_x ^ texel_y) & 1 == 0 {
					let lerp_idx = texel_y * (BW / 2) + (texel_x / 2);
					[8u8, 5, 3, 0][get_2bpp_lerp_value(b, lerp_idx) as usize]
				} else {
					0
				}
			} else {
				let v = get_2bpp_lerp_value(b, texel_idx);
				if v != 0 { 0 } else { 8 }
			};
			mod_values[(j * w + i) as usize] = lerp_val;
		}
	}

	let get = |vals: &[u8], ii: i64, jj: i64| -> u32 {
		let wi = ii.rem_euclid(i64::from(w)) as u32;
		let wj = jj.rem_euclid(i64::from(h)) as u32;
		u32::from(vals[(wj * w + wi) as usize])
	};

	let mut out_pixels = vec![Pixel::default(); (w * h) as usize];
	for j in 0..h {
		for i in 0..w {
			let block_idx = (j / BH) * blocks_per_row + (i / BW);
			let b = blocks[block_idx as usize];

			let lerp_val = if mode_bit(b) && ((i ^ j) & 1 != 0) {
				let v = match get_2bpp_submode(b) {
					SubMode2Bpp::Horizontal => {
						(get(&mod_values, i64::from(i) - 1, i64::from(j)) + get(&mod_values, i64::from(i) + 1, i64::from(j))) / 2
					}
					SubMode2Bpp::Vertical => {
						(get(&mod_values, i64::from(i), i64::from(j) - 1) + get(&mod_values, i64::from(i), i64::from(j) + 1)) / 2
					}
					SubMode2Bpp::All => {
						(get(&mod_values, i64::from(i), i64::from(j) - 1)
							+ get(&mod_values, i64::from(i), i64::from(j) + 1)
							+ get(&mod_values, i64::from(i) - 1, i64::from(j))
							+ get(&mod_values, i64::from(i) + 1, i64::from(j))
							+ 1) / 4
					}
				};
				mod_values[(j * w + i) as usize] = v as u8;
				v as u8
			} else {
				mod_values[(j * w + i) as usize]
			};

			let pa = full_a[(j * w + i) as usize];
			let pb = full_b[(j * w + i) as usize];
			let mut channels = [0u8; 4];
			for c in 0..4 {
				let a_v = i32::from(pa.channel(c));
				let b_v = i32::from(pb.channel(c));
				channels[c] = ((a_v * (8 - i32::from(lerp_val)) + b_v * i32::from(lerp_val)) / 8) as u8;
			}
			out_pixels[(j * w + i) as usize] = Pixel::new(channels[R], channels[G], channels[B], channels[A]);
		}
	}

	let total = job.total_blocks();
	for block_idx in 0..total {
		let (x0, y0) = crate::job::block_coord(Format::Pvrtc2Bpp, w, block_idx);
		let mut block_px = [Pixel::default(); 32];
		for row in 0..BH {
			for col in 0..BW {
				let px = x0 + col;
				let py = y0 + row;
				block_px[(row * BW + col) as usize] = out_pixels[(py * w + px) as usize];
			}
		}
		job.write_block(block_idx, &block_px);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::job::CompressionJob;

	#[test]
	fn uniform_opaque_image_decodes_to_uniform_color() {
		// Build a 4x4-block (one PVRTC block) image whose A and B endpoints
		// both encode the same gray, so decode must reproduce it regardless
		// of modulation weights.
		let ep = RawEndpoint { channels: [16, 16, 16, 0], depths: [5, 5, 5, 0] };
		let block = super::super::pack_block(ep, true, ep, true, false, 0);
		let bytes = block.to_le_bytes();

		let mut out = vec![0u8; 4 * 4 * 4];
		{
			let mut job = DecompressionJob::new(Format::Pvrtc4Bpp, &bytes, &mut out, 4, 4).unwrap();
			decode(&mut job);
		}
		let expected = msb_replicate(16, 5, 8);
		for px in out.chunks(4) {
			assert_eq!(px[0], expected);
		}
		// Exercise the CompressionJob side too, to keep the import used.
		let rgba = vec![expected; 4 * 4 * 4];
		let _job = CompressionJob::new(Format::Pvrtc4Bpp, &rgba, 4, 4).unwrap();
	}
}
