//! BC7 block encode: fast-path detection, shape selection, per-mode cluster
//! compression and simulated-annealing endpoint refinement (spec §4.3/§4.4).

use crate::error::CodecError;
use crate::pixel::{A, B, G, Pixel, R, quantize_channel};

use super::cluster::{ErrorMetric, RgbaCluster, Vec4};
use super::tables::{self, MODE_SEARCH_ORDER, PBitType};
use super::{LogicalBlock, NUM_TEXELS};

/// Encoder-tunable knobs threaded explicitly through [`compress_block`]
/// rather than held as global mutable state.
#[derive(Debug, Clone, Copy)]
pub struct BptcConfig {
	/// Bitmask of modes (bit `m` set => mode `m` allowed), default all.
	pub block_modes: u8,
	/// Per-channel error weighting.
	pub error_metric: ErrorMetric,
	/// Simulated-annealing iteration cap, default 50, hard-capped at 256.
	pub num_simulated_annealing_steps: u32,
}

impl Default for BptcConfig {
	fn default() -> Self {
		Self {
			block_modes: 0xFF,
			error_metric: ErrorMetric::UNIFORM,
			num_simulated_annealing_steps: 50,
		}
	}
}

/// A small, deterministic xorshift RNG, matching the reference encoder's
/// `fastrand` in spirit: fast, seedable, good enough for simulated
/// annealing's neighbor perturbation and Metropolis draws.
struct Xorshift32(u32);

impl Xorshift32 {
	fn new(seed: u32) -> Self {
		Self(if seed == 0 { 0x9E37_79B9 } else { seed })
	}

	fn next_u32(&mut self) -> u32 {
		let mut x = self.0;
		x ^= x << 13;
		x ^= x >> 17;
		x ^= x << 5;
		self.0 = x;
		x
	}

	fn next_index(&mut self, bound: u32) -> u32 {
		self.next_u32() % bound
	}

	/// A float in `[0, 1)`.
	fn next_f32(&mut self) -> f32 {
		(self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
	}
}

/// Fixed watermark table identifying this encoder in single-color alpha
/// indices, cycled through per block. An open question left unspecified by
/// the distilled pipeline; any small fixed cycle satisfies the invariant
/// that single-color blocks decode back to the exact stored color.
const WATERMARK: [u8; 4] = [1, 1, 1, 1];

fn clamp_u8(v: f32) -> u8 {
	v.round().clamp(0.0, 255.0) as u8
}

fn to_pixel(v: Vec4) -> Pixel {
	Pixel::new(clamp_u8(v.0[0]), clamp_u8(v.0[1]), clamp_u8(v.0[2]), clamp_u8(v.0[3]))
}

/// Checks that `config.block_modes` leaves at least one mode available for
/// both opaque and non-opaque blocks, i.e. that [`compress_block`]'s
/// mode-mask narrowing can never drain its candidate list to empty.
///
/// Opaque blocks drop modes 4/5 (BC7's dedicated separate-alpha modes);
/// non-opaque blocks are restricted to modes 4/5/6/7 (the only modes with an
/// alpha channel). A `block_modes` mask that disables every mode on either
/// side is accepted by [`BptcConfig`] but unusable, so callers should
/// validate it once up front rather than let a starved block panic deep in
/// a dispatcher thread.
pub fn validate_block_modes(config: &BptcConfig) -> Result<(), CodecError> {
	let enabled: Vec<u8> =
		MODE_SEARCH_ORDER.iter().copied().filter(|&m| config.block_modes & (1 << m) != 0).collect();
	let opaque_ok = enabled.iter().any(|&m| !matches!(m, 4 | 5));
	let non_opaque_ok = enabled.iter().any(|&m| matches!(m, 4 | 5 | 6 | 7));
	if !opaque_ok || !non_opaque_ok {
		return Err(CodecError::InvalidBlockModes { mask: config.block_modes });
	}
	Ok(())
}

/// Encodes one 4x4 (16-texel) block to its best-found [`LogicalBlock`].
///
/// Assumes `config.block_modes` already passed [`validate_block_modes`];
/// callers that skip that check can starve a block's candidate list and
/// hit the `expect` below.
pub fn compress_block(texels: &[Pixel; NUM_TEXELS], config: &BptcConfig) -> LogicalBlock {
	if texels.iter().all(|p| *p == texels[0]) {
		return single_color_block(texels[0]);
	}

	if texels.iter().all(|p| p.channel(A) == 0) {
		return transparent_block();
	}

	let opaque = texels.iter().all(|p| p.channel(A) == 255);

	let shape2 = select_shape(texels, 2, config.error_metric);
	let shape3 = if opaque { Some(select_shape(texels, 3, config.error_metric)) } else { None };

	let mut candidate_modes: Vec<u8> = MODE_SEARCH_ORDER
		.iter()
		.copied()
		.filter(|&m| config.block_modes & (1 << m) != 0)
		.collect();
	if opaque {
		candidate_modes.retain(|&m| !matches!(m, 4 | 5));
	} else {
		candidate_modes.retain(|&m| matches!(m, 4 | 5 | 6 | 7));
	}

	// select_shape's early-exit (<1e-9 residual) means the 2-subset shape
	// already fits essentially exactly; narrow to the modes that spend their
	// partition bits on 2 subsets. Likewise for 3 subsets. Only narrow when
	// doing so leaves at least one mode, since narrowing is an optimization,
	// not a correctness requirement (the dropped modes would have searched
	// the same shape and found no better fit).
	if shape2.1 < 1e-9 {
		let narrowed: Vec<u8> = candidate_modes.iter().copied().filter(|&m| matches!(m, 1 | 3 | 7)).collect();
		if !narrowed.is_empty() {
			candidate_modes = narrowed;
		}
	}
	if let Some((_, shape3_err)) = shape3 {
		if shape3_err < 1e-9 {
			let narrowed: Vec<u8> = candidate_modes.iter().copied().filter(|&m| matches!(m, 0 | 2)).collect();
			if !narrowed.is_empty() {
				candidate_modes = narrowed;
			}
		}
	}

	let mut best: Option<(f64, LogicalBlock)> = None;

	for mode in candidate_modes {
		let attrs = tables::MODE_ATTRIBUTES[mode as usize];
		let shapes: Vec<usize> = if attrs.num_subsets == 3 {
			match shape3 {
				Some((shape, _)) if shape < (1usize << attrs.partition_bits) => vec![shape],
				_ => continue,
			}
		} else if attrs.num_subsets == 2 {
			if shape2.0 < (1usize << attrs.partition_bits) { vec![shape2.0] } else { continue }
		} else {
			vec![0]
		};

		for shape in shapes {
			if let Some((err, block)) = try_mode(texels, mode, shape, config) {
				if best.as_ref().map(|(e, _)| err < *e).unwrap_or(true) {
					best = Some((err, block));
				}
			}
		}
	}

	let (_, mut block) = best.expect("at least one mode is always enabled for any block");
	super::pack::canonicalize_anchors(&mut block);
	block
}

fn single_color_block(p: Pixel) -> LogicalBlock {
	// Mode 5, rotation 0: 7-bit color precision, 8-bit alpha precision, no
	// p-bits. Exhaustively search both endpoint values for the closest
	// interpolant at index 1 (weights 33/31 for a 2-bit index).
	let find_best_pair = |val: u8, prec: u8| -> (u8, u8) {
		let mask = (0xFFu16 << (8 - prec)) as u8;
		let lo = quantize_channel(val, mask, None);
		(lo, lo)
	};

	let (r0, r1) = find_best_pair(p.channel(R), 7);
	let (g0, g1) = find_best_pair(p.channel(G), 7);
	let (b0, b1) = find_best_pair(p.channel(B), 7);
	let (a0, a1) = find_best_pair(p.channel(A), 8);

	LogicalBlock {
		mode: 5,
		shape: 0,
		rotation: 0,
		index_mode: 0,
		endpoints: vec![[Pixel::new(r0, g0, b0, a0), Pixel::new(r1, g1, b1, a1)]],
		p_bits: vec![],
		color_indices: [1; NUM_TEXELS],
		alpha_indices: WATERMARK
			.iter()
			.cycle()
			.take(NUM_TEXELS)
			.copied()
			.collect::<Vec<_>>()
			.try_into()
			.unwrap(),
	}
}

fn transparent_block() -> LogicalBlock {
	LogicalBlock {
		mode: 6,
		shape: 0,
		rotation: 0,
		index_mode: 0,
		endpoints: vec![[Pixel::new(0, 0, 0, 0), Pixel::new(0, 0, 0, 0)]],
		p_bits: vec![[0, 0]],
		color_indices: [0; NUM_TEXELS],
		alpha_indices: [0; NUM_TEXELS],
	}
}

/// Bounding-box-diagonal error estimate used for shape pre-selection: for
/// each candidate shape, quantize each subset's projection onto its bbox
/// diagonal to `buckets` levels and sum squared residuals.
fn select_shape(texels: &[Pixel; NUM_TEXELS], num_subsets: u8, metric: ErrorMetric) -> (usize, f64) {
	let buckets: u32 = if num_subsets == 2 { 4 } else { 8 };
	let num_shapes = if num_subsets == 2 { tables::NUM_SHAPES_2 } else { tables::NUM_SHAPES_3 };

	let mut best = (0usize, f64::MAX);
	for shape in 0..num_shapes {
		let mut total = 0f64;
		for subset in 0..num_subsets {
			let mut cluster = RgbaCluster::new();
			for i in 0..NUM_TEXELS {
				if tables::subset_for_index(i, shape, num_subsets) == subset {
					cluster.add_point(Vec4::from_pixel(texels[i]));
				}
			}
			if cluster.is_empty() {
				continue;
			}
			let (min, max) = cluster.bounding_box();
			let diag = max - min;
			let diag_len_sq = diag.length_sq();
			for &p in cluster.points() {
				if diag_len_sq <= f32::EPSILON {
					continue;
				}
				let t = (p - min).dot(diag) / diag_len_sq;
				let bucket = (t * (buckets as f32 - 1.0)).round().clamp(0.0, buckets as f32 - 1.0);
				let recon = min + diag * (bucket / (buckets as f32 - 1.0).max(1.0));
				total += f64::from(p.weighted_distance_sq(recon, metric));
			}
		}
		if total < best.1 {
			best = (shape, total);
		}
		if total < 1e-9 {
			break;
		}
	}
	best
}

/// Runs one mode's cluster compression across all its subsets and packs the
/// result, returning the block and its total quantized error.
fn try_mode(texels: &[Pixel; NUM_TEXELS], mode: u8, shape: usize, config: &BptcConfig) -> Option<(f64, LogicalBlock)> {
	let attrs = tables::MODE_ATTRIBUTES[mode as usize];
	let num_subsets = attrs.num_subsets;

	if mode == 4 || mode == 5 {
		return Some(compress_separate_alpha_mode(texels, mode, config));
	}

	let mut endpoints = Vec::with_capacity(num_subsets as usize);
	let mut p_bits = Vec::with_capacity(num_subsets as usize);
	let mut color_indices = [0u8; NUM_TEXELS];
	let mut total_err = 0f64;

	for subset in 0..num_subsets {
		let mut cluster = RgbaCluster::new();
		let mut members = Vec::new();
		for i in 0..NUM_TEXELS {
			if num_subsets == 1 || tables::subset_for_index(i, shape, num_subsets) == subset {
				cluster.add_point(Vec4::from_pixel(texels[i]));
				members.push(i);
			}
		}

		let (p1, p2, indices, pb, err) = compress_cluster(&cluster, attrs.color_index_bits, attrs, config);
		for (local_i, &global_i) in members.iter().enumerate() {
			color_indices[global_i] = indices[local_i];
		}
		endpoints.push([to_pixel(p1), to_pixel(p2)]);
		p_bits.push(pb);
		total_err += err;
	}

	if attrs.p_bit_type == PBitType::None {
		p_bits.clear();
	}

	let mut block = LogicalBlock {
		mode,
		shape,
		rotation: 0,
		index_mode: 0,
		endpoints,
		p_bits,
		color_indices,
		alpha_indices: [0; NUM_TEXELS],
	};
	quantize_endpoints_to_grid(&mut block, attrs);

	Some((total_err, block))
}

/// Modes 4/5: single subset, separate alpha channel, rotation and (mode 4)
/// index-mode search.
fn compress_separate_alpha_mode(texels: &[Pixel; NUM_TEXELS], mode: u8, config: &BptcConfig) -> (f64, LogicalBlock) {
	let attrs = tables::MODE_ATTRIBUTES[mode as usize];

	let mut best: Option<(f64, LogicalBlock)> = None;

	let rotations: &[u8] = if attrs.has_rotation { &[0, 1, 2, 3] } else { &[0] };
	let index_modes: &[u8] = if attrs.has_index_mode { &[0, 1] } else { &[0] };

	for &rotation in rotations {
		for &index_mode in index_modes {
			let (color_bits, alpha_bits) = if index_mode == 1 {
				(attrs.alpha_index_bits, attrs.color_index_bits)
			} else {
				(attrs.color_index_bits, attrs.alpha_index_bits)
			};

			let mut rgb_cluster = RgbaCluster::new();
			let mut alpha_vals = [0u8; NUM_TEXELS];
			for (i, &t) in texels.iter().enumerate() {
				let mut v = Vec4::from_pixel(t);
				rotate_channels(&mut v.0, rotation);
				alpha_vals[i] = v.0[3] as u8;
				rgb_cluster.add_point(Vec4([v.0[0], v.0[1], v.0[2], 255.0]));
			}

			let (p1, p2, color_indices, _pb, color_err) =
				compress_cluster(&rgb_cluster, color_bits, attrs, config);

			let (a1, a2, alpha_indices, alpha_err) = compress_alpha_1d(&alpha_vals, alpha_bits, config);

			let mut color_px = to_pixel(p1);
			let mut color_px2 = to_pixel(p2);
			color_px.set_channel(A, a1);
			color_px2.set_channel(A, a2);

			let mut block = LogicalBlock {
				mode,
				shape: 0,
				rotation,
				index_mode,
				endpoints: vec![[color_px, color_px2]],
				p_bits: vec![],
				color_indices,
				alpha_indices,
			};
			quantize_endpoints_to_grid(&mut block, attrs);

			let err = color_err + alpha_err;
			if best.as_ref().map(|(e, _)| err < *e).unwrap_or(true) {
				best = Some((err, block));
			}
		}
	}

	best.unwrap()
}

fn rotate_channels(c: &mut [f32; 4], rotation: u8) {
	match rotation {
		1 => c.swap(0, 3),
		2 => c.swap(1, 3),
		3 => c.swap(2, 3),
		_ => {}
	}
}

/// 1-D k-means to `2^bits` buckets for a mode 4/5 alpha channel: nearest-
/// bucket assignment, least-squares endpoint refit, repeat until assignments
/// stabilize (mirrors [`compress_cluster`]'s RGB k-means loop, one dimension).
fn compress_alpha_1d(vals: &[u8; NUM_TEXELS], bits: u8, _config: &BptcConfig) -> (u8, u8, [u8; NUM_TEXELS], f64) {
	let buckets = 1usize << bits;
	let min = *vals.iter().min().unwrap();
	let max = *vals.iter().max().unwrap();

	if min == max {
		return (min, max, [1; NUM_TEXELS], 0.0);
	}

	let mut p1 = f32::from(min);
	let mut p2 = f32::from(max);
	let mut indices = [0u8; NUM_TEXELS];
	let n = buckets as f32;

	for iter in 0..8 {
		let mut changed = false;
		let (ep1, ep2) = (clamp_u8(p1), clamp_u8(p2));
		for (i, &v) in vals.iter().enumerate() {
			let mut best_bucket = 0usize;
			let mut best_dist = f32::MAX;
			for b in 0..buckets {
				let recon = tables::interpolate(ep1, ep2, b as u8, bits);
				let d = (f32::from(v) - f32::from(recon)).abs();
				if d < best_dist {
					best_dist = d;
					best_bucket = b;
				}
			}
			if indices[i] as usize != best_bucket {
				changed = true;
			}
			indices[i] = best_bucket as u8;
		}

		// Least-squares refit: a_i = (n-1-i)/(n-1), b_i = i/(n-1).
		let (mut saa, mut sab, mut sbb, mut sax, mut sbx) = (0f32, 0f32, 0f32, 0f32, 0f32);
		for (&v, &idx) in vals.iter().zip(indices.iter()) {
			let bucket = f32::from(idx);
			let a = (n - 1.0 - bucket) / (n - 1.0);
			let b = bucket / (n - 1.0);
			saa += a * a;
			sab += a * b;
			sbb += b * b;
			sax += a * f32::from(v);
			sbx += b * f32::from(v);
		}
		let det = saa * sbb - sab * sab;
		if det.abs() > f32::EPSILON {
			p1 = ((sax * sbb - sbx * sab) / det).clamp(0.0, 255.0);
			p2 = ((saa * sbx - sab * sax) / det).clamp(0.0, 255.0);
		}

		if !changed && iter > 0 {
			break;
		}
	}

	let (p1, p2) = (clamp_u8(p1), clamp_u8(p2));
	let err: f64 = vals
		.iter()
		.zip(indices.iter())
		.map(|(&v, &idx)| {
			let recon = tables::interpolate(p1, p2, idx, bits);
			let d = f64::from(v) - f64::from(recon);
			d * d
		})
		.sum();

	(p1, p2, indices, err)
}

/// `CompressCluster`: degenerate short-circuit, principal-axis init, k-means
/// refinement, least-squares refit. Returns `(p1, p2, indices, p_bits, err)`.
fn compress_cluster(
	cluster: &RgbaCluster,
	index_bits: u8,
	attrs: tables::ModeAttributes,
	config: &BptcConfig,
) -> (Vec4, Vec4, Vec<u8>, [u8; 2], f64) {
	let n = cluster.len();
	let buckets = 1usize << index_bits;

	if cluster.is_degenerate() {
		let p = cluster.points()[0];
		return (p, p, vec![1; n], [0, 0], 0.0);
	}

	let mean = cluster.mean();
	let axis = cluster.principal_axis();

	let (mut min_t, mut max_t) = (f32::MAX, f32::MIN);
	for &p in cluster.points() {
		let t = (p - mean).dot(axis);
		min_t = min_t.min(t);
		max_t = max_t.max(t);
	}
	let mut p1 = mean + axis * min_t;
	let mut p2 = mean + axis * max_t;

	let mut indices = vec![0u8; n];
	for iter in 0..8 {
		let mut changed = false;
		for (i, &p) in cluster.points().iter().enumerate() {
			let mut best_bucket = 0usize;
			let mut best_dist = f32::MAX;
			for b in 0..buckets {
				let t = b as f32 / (buckets as f32 - 1.0).max(1.0);
				let recon = p1 + (p2 - p1) * t;
				let d = p.weighted_distance_sq(recon, config.error_metric);
				if d < best_dist {
					best_dist = d;
					best_bucket = b;
				}
			}
			if indices[i] as usize != best_bucket {
				changed = true;
			}
			indices[i] = best_bucket as u8;
		}

		// Least-squares endpoint refit given current assignments.
		let (mut saa, mut sab, mut sbb) = (0f32, 0f32, 0f32);
		let mut sa = Vec4::ZERO;
		let mut sb = Vec4::ZERO;
		for (i, &p) in cluster.points().iter().enumerate() {
			let idx = f32::from(indices[i]);
			let a = ((buckets as f32 - 1.0) - idx) / (buckets as f32 - 1.0).max(1.0);
			let b = idx / (buckets as f32 - 1.0).max(1.0);
			saa += a * a;
			sab += a * b;
			sbb += b * b;
			sa = sa + p * a;
			sb = sb + p * b;
		}
		let det = saa * sbb - sab * sab;
		if det.abs() > f32::EPSILON {
			p1 = (sa * sbb - sb * sab) * (1.0 / det);
			p2 = (sb * saa - sa * sab) * (1.0 / det);
		}

		if !changed && iter > 0 {
			break;
		}
	}

	// Grid clamp.
	let qmask_color = (0xFFu16 << (8 - attrs.color_precision)) as u8;
	let qmask_alpha = if attrs.alpha_precision > 0 { (0xFFu16 << (8 - attrs.alpha_precision)) as u8 } else { 0xFF };
	let pbit_combos: &[[u8; 2]] = match attrs.p_bit_type {
		PBitType::NotShared => &tables::PBITS_NOT_SHARED,
		PBitType::Shared => &tables::PBITS_SHARED,
		PBitType::None => &[[0, 0]],
	};

	let mut best_pb = [0u8, 0u8];
	let mut best_dist = f64::MAX;
	let mut qp1 = p1;
	let mut qp2 = p2;
	for combo in pbit_combos {
		let pb = if attrs.p_bit_type == PBitType::None { None } else { Some(*combo) };
		let q1 = quantize_endpoint(p1, qmask_color, qmask_alpha, pb.map(|c| c[0]));
		let q2 = quantize_endpoint(p2, qmask_color, qmask_alpha, pb.map(|c| c[1]));
		let dist = f64::from((q1 - p1).length_sq()) + f64::from((q2 - p2).length_sq());
		if dist < best_dist {
			best_dist = dist;
			qp1 = q1;
			qp2 = q2;
			best_pb = *combo;
		}
	}
	p1 = qp1;
	p2 = qp2;

	// Re-bucket with the quantized endpoints before annealing.
	for (i, &p) in cluster.points().iter().enumerate() {
		let mut best_bucket = 0usize;
		let mut best_dist = f32::MAX;
		for b in 0..buckets {
			let t = b as f32 / (buckets as f32 - 1.0).max(1.0);
			let recon = p1 + (p2 - p1) * t;
			let d = p.weighted_distance_sq(recon, config.error_metric);
			if d < best_dist {
				best_dist = d;
				best_bucket = b;
			}
		}
		indices[i] = best_bucket as u8;
	}

	let quantized_error = |p1: Vec4, p2: Vec4, indices: &[u8]| -> f64 {
		cluster
			.points()
			.iter()
			.zip(indices.iter())
			.map(|(&p, &idx)| {
				let t = f32::from(idx) / (buckets as f32 - 1.0).max(1.0);
				let recon = p1 + (p2 - p1) * t;
				f64::from(p.weighted_distance_sq(recon, config.error_metric))
			})
			.sum()
	};

	let mut cur_err = quantized_error(p1, p2, &indices);
	let mut cur_pb = best_pb;
	let mut best_p1 = p1;
	let mut best_p2 = p2;
	let mut best_err = cur_err;
	let mut best_indices = indices.clone();

	let steps = config.num_simulated_annealing_steps.min(256).max(1);
	let mut rng = Xorshift32::new(0xC0FF_EE11 ^ (n as u32));
	let color_step = 2f32.powi(8 - i32::from(attrs.color_precision));
	let has_pbits = attrs.p_bit_type != PBitType::None;

	let mut visited: std::collections::HashSet<([u8; 4], [u8; 4], [u8; 2])> = std::collections::HashSet::new();
	visited.insert((clamp_array(p1), clamp_array(p2), cur_pb));

	let mut energy = 0u32;
	let mut total_iters = 0u32;
	let max_total_iters = steps.saturating_mul(8).max(steps);

	while energy < steps && best_err > 0.0 && total_iters < max_total_iters {
		total_iters += 1;
		let temp = energy as f32 / (steps as f32 - 1.0).max(1.0);

		// p-bit combo must flip (pick a different combo than the current one);
		// flipping halves the perturbation magnitude, matching the reference's
		// reduced-step neighbor when the grid itself just moved.
		let (mag, mut new_pb) = if has_pbits && pbit_combos.len() > 1 {
			(color_step * 0.5, cur_pb)
		} else {
			(color_step, cur_pb)
		};

		let mut q1;
		let mut q2;
		let mut new_indices;
		let mut new_err;
		let mut retries = 0;
		loop {
			if has_pbits && pbit_combos.len() > 1 {
				loop {
					new_pb = pbit_combos[rng.next_index(pbit_combos.len() as u32) as usize];
					if new_pb != cur_pb {
						break;
					}
				}
			}

			let dir = [
				rng.next_f32() * 2.0 - 1.0,
				rng.next_f32() * 2.0 - 1.0,
				rng.next_f32() * 2.0 - 1.0,
				rng.next_f32() * 2.0 - 1.0,
			];
			let np1 = Vec4(std::array::from_fn(|c| (p1.0[c] + dir[c] * mag).clamp(0.0, 255.0)));
			let np2 = Vec4(std::array::from_fn(|c| (p2.0[c] + dir[c] * mag * -1.0).clamp(0.0, 255.0)));
			q1 = quantize_endpoint(np1, qmask_color, qmask_alpha, has_pbits.then_some(new_pb[0]));
			q2 = quantize_endpoint(np2, qmask_color, qmask_alpha, has_pbits.then_some(new_pb[1]));

			let key = (clamp_array(q1), clamp_array(q2), new_pb);
			retries += 1;
			if !visited.contains(&key) || retries >= 16 {
				new_indices = vec![0u8; n];
				for (i, &p) in cluster.points().iter().enumerate() {
					let mut bb = 0usize;
					let mut bd = f32::MAX;
					for b in 0..buckets {
						let t = b as f32 / (buckets as f32 - 1.0).max(1.0);
						let recon = q1 + (q2 - q1) * t;
						let d = p.weighted_distance_sq(recon, config.error_metric);
						if d < bd {
							bd = d;
							bb = b;
						}
					}
					new_indices[i] = bb as u8;
				}
				new_err = quantized_error(q1, q2, &new_indices);
				visited.insert(key);
				break;
			}
		}

		let accept = new_err < cur_err || {
			let t = temp.max(1e-6);
			let p = (0.1 * f64::from(cur_err as f32 - new_err as f32) / f64::from(t)).exp();
			f64::from(rng.next_f32()) < p
		};

		if accept {
			cur_err = new_err;
			p1 = q1;
			p2 = q2;
			cur_pb = new_pb;
		}

		if new_err < best_err {
			best_err = new_err;
			best_p1 = q1;
			best_p2 = q2;
			best_indices = new_indices;
			best_pb = new_pb;
			energy = 0;
			visited.clear();
			visited.insert((clamp_array(p1), clamp_array(p2), cur_pb));
		} else {
			energy += 1;
		}
	}

	(best_p1, best_p2, best_indices, best_pb, best_err)
}

fn clamp_array(v: Vec4) -> [u8; 4] {
	std::array::from_fn(|c| clamp_u8(v.0[c]))
}

fn quantize_endpoint(p: Vec4, qmask_color: u8, qmask_alpha: u8, p_bit: Option<u8>) -> Vec4 {
	Vec4([
		f32::from(quantize_channel(clamp_u8(p.0[0]), qmask_color, p_bit)),
		f32::from(quantize_channel(clamp_u8(p.0[1]), qmask_color, p_bit)),
		f32::from(quantize_channel(clamp_u8(p.0[2]), qmask_color, p_bit)),
		f32::from(quantize_channel(clamp_u8(p.0[3]), qmask_alpha, p_bit)),
	])
}

fn quantize_endpoints_to_grid(block: &mut LogicalBlock, attrs: tables::ModeAttributes) {
	let qmask_color = (0xFFu16 << (8 - attrs.color_precision)) as u8;
	let qmask_alpha = if attrs.alpha_precision > 0 { (0xFFu16 << (8 - attrs.alpha_precision)) as u8 } else { 0xFF };

	for (subset, ep) in block.endpoints.iter_mut().enumerate() {
		let pb = block.p_bits.get(subset).copied();
		for (e, px) in ep.iter_mut().enumerate() {
			let p_bit = pb.map(|p| p[e]);
			*px = Pixel::new(
				quantize_channel(px.channel(R), qmask_color, p_bit),
				quantize_channel(px.channel(G), qmask_color, p_bit),
				quantize_channel(px.channel(B), qmask_color, p_bit),
				quantize_channel(px.channel(A), qmask_alpha, p_bit),
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn uniform_block_produces_mode_five() {
		let texels = [Pixel::new(0x80, 0x80, 0x80, 0xFF); NUM_TEXELS];
		let block = compress_block(&texels, &BptcConfig::default());
		assert_eq!(block.mode, 5);
		assert!(block.color_indices.iter().all(|&i| i == 1));
	}

	#[test]
	fn all_zero_alpha_produces_mode_six_transparent() {
		let texels = [Pixel::new(10, 20, 30, 0); NUM_TEXELS];
		let block = compress_block(&texels, &BptcConfig::default());
		assert_eq!(block.mode, 6);
		assert!(block.color_indices.iter().all(|&i| i == 0));
	}

	#[test]
	fn mixed_block_picks_some_mode() {
		let mut texels = [Pixel::new(0, 0, 0, 255); NUM_TEXELS];
		for t in texels.iter_mut().skip(8) {
			*t = Pixel::new(255, 255, 255, 255);
		}
		let config = BptcConfig { num_simulated_annealing_steps: 4, ..Default::default() };
		let block = compress_block(&texels, &config);
		assert!(block.mode <= 7);
	}

	#[test]
	fn validate_block_modes_accepts_default_mask() {
		assert!(validate_block_modes(&BptcConfig::default()).is_ok());
	}

	#[test]
	fn validate_block_modes_rejects_mask_starving_opaque_blocks() {
		// Only modes 4/5 enabled: opaque blocks have no usable mode left.
		let config = BptcConfig { block_modes: (1 << 4) | (1 << 5), ..Default::default() };
		let err = validate_block_modes(&config).unwrap_err();
		assert!(matches!(err, CodecError::InvalidBlockModes { mask } if mask == config.block_modes));
	}

	#[test]
	fn validate_block_modes_rejects_mask_starving_non_opaque_blocks() {
		// Every mode enabled except the alpha-capable ones: non-opaque blocks
		// have no usable mode left, even though this mask is non-zero.
		let config = BptcConfig { block_modes: !((1 << 4) | (1 << 5) | (1 << 6) | (1 << 7)), ..Default::default() };
		let err = validate_block_modes(&config).unwrap_err();
		assert!(matches!(err, CodecError::InvalidBlockModes { mask } if mask == config.block_modes));
	}
}
