//! Work dispatch strategies for spreading per-block codec work across
//! threads (spec §4.9/§5). Grounded in `Core/src/WorkerQueue.cpp` (atomic
//! work-stealing queue) and `Core/src/ThreadGroup.cpp` (static per-thread
//! partition) from the original reference implementation; expressed here
//! with `std::thread::scope` rather than hand-rolled barriers/condvars,
//! since scoped threads give the same "workers join before the job
//! returns" guarantee without unsafe lifetime extension.
//!
//! PVRTC encode never goes through here — its labeling pass has no
//! block-local decomposition, so [`texcomp_types::pvrtc::encode::encode`] is
//! always called directly, single-threaded (see [`crate::codec`]).

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use texcomp_types::Pixel;
use texcomp_types::job::{CompressionJob, Format};

/// One block's diagnostic record: which mode the encoder picked and the
/// quantized error it settled for. Grounded in `Core/src/BlockStats.cpp`'s
/// per-block histogram rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockStat {
	/// Encoder-specific mode index (BC7 mode 0..=8; unused formats report 0).
	pub mode: u8,
	/// Quantized error the encoder settled for.
	pub error: f64,
}

/// Per-block diagnostic slots, one per block in the job. Each block owns its
/// slot, so concurrent workers recording stats never contend on the same
/// lock; records become visible to the caller only after every worker has
/// joined, matching the original's "merge after join" rule for `BlockStatList`.
pub struct StatsSink {
	slots: Vec<Mutex<Option<BlockStat>>>,
}

impl StatsSink {
	/// Creates a sink with one empty slot per block.
	pub fn new(total_blocks: u32) -> Self {
		Self { slots: (0..total_blocks).map(|_| Mutex::new(None)).collect() }
	}

	/// Records `stat` for `block_idx`. Safe to call concurrently from
	/// different workers as long as each worker only ever claims its own
	/// `block_idx`, which every [`DispatchStrategy`] here guarantees.
	pub fn record(&self, block_idx: u32, stat: BlockStat) {
		*self.slots[block_idx as usize].lock().expect("stats mutex poisoned") = Some(stat);
	}

	/// Consumes the sink into its ordered per-block records, `None` for any
	/// block a `CompressionTask::Plain` job never populated.
	pub fn into_ordered(self) -> Vec<Option<BlockStat>> {
		self.slots.into_iter().map(|m| m.into_inner().expect("stats mutex poisoned")).collect()
	}
}

/// A block-compression function, optionally paired with a [`StatsSink`] it
/// should report per-block diagnostics into. Mirrors the original's
/// duck-typed `CompressionFunc` vs `CompressionFuncWithStats` split as a
/// single sum type the dispatcher drives uniformly, rather than two parallel
/// code paths.
pub enum CompressionTask<'a, F> {
	/// Plain per-block compression, no diagnostics collected.
	Plain(F),
	/// Per-block compression that also reports a [`BlockStat`] per block.
	WithStats(F, &'a StatsSink),
}

/// How block-level compression/decompression work is spread across threads.
#[derive(Debug, Clone, Copy, Default)]
pub enum DispatchStrategy {
	/// No threading; one thread does every block in row-major order.
	#[default]
	Serial,
	/// `num_threads` threads, each owning a fixed contiguous block range
	/// decided up front. Grounded in `ThreadGroup`'s static partition.
	ThreadGroup {
		/// Worker count.
		num_threads: u32,
	},
	/// `num_threads` threads pulling `job_size`-block chunks from a shared
	/// atomic counter until the job is drained. Grounded in `WorkerQueue`'s
	/// `m_NextBlock` claiming scheme.
	AtomicQueue {
		/// Worker count.
		num_threads: u32,
		/// Blocks claimed per fetch-add.
		job_size: u32,
	},
}

fn block_texel_count(format: Format) -> usize {
	let (bw, bh) = format.block_dims();
	(bw * bh) as usize
}

/// Encodes every block of `job` into `out` (row-major block order, `out`
/// must hold `total_blocks * block_size_bytes` bytes). `task` supplies the
/// per-block compress function and, for [`CompressionTask::WithStats`], the
/// sink each worker reports its block's [`BlockStat`] into.
pub fn dispatch_compress<F>(job: &CompressionJob, out: &mut [u8], block_size_bytes: usize, strategy: DispatchStrategy, task: CompressionTask<'_, F>)
where
	F: Fn(&[Pixel]) -> (Vec<u8>, BlockStat) + Sync,
{
	let total_blocks = job.total_blocks();
	let block_texels = block_texel_count(job.format());
	log::trace!("dispatch_compress: {total_blocks} blocks, strategy {strategy:?}");

	let (compress_block, stats_sink): (&F, Option<&StatsSink>) = match &task {
		CompressionTask::Plain(f) => (f, None),
		CompressionTask::WithStats(f, sink) => (f, Some(*sink)),
	};

	let run_one = |job: &CompressionJob, texels: &mut [Pixel], block_idx: u32, dest: &mut [u8]| {
		job.read_block(block_idx, texels);
		let (bytes, stat) = compress_block(texels);
		dest.copy_from_slice(&bytes);
		if let Some(sink) = stats_sink {
			sink.record(block_idx, stat);
		}
	};

	match strategy {
		DispatchStrategy::Serial => {
			let mut texels = vec![Pixel::default(); block_texels];
			for (local, block_idx) in (0..total_blocks).enumerate() {
				let off = local * block_size_bytes;
				run_one(job, &mut texels, block_idx, &mut out[off..off + block_size_bytes]);
			}
		}

		DispatchStrategy::ThreadGroup { num_threads } => {
			let num_threads = num_threads.max(1) as usize;
			let chunk_blocks = (total_blocks as usize).div_ceil(num_threads).max(1);
			let chunk_bytes = chunk_blocks * block_size_bytes;

			std::thread::scope(|scope| {
				for (i, out_chunk) in out.chunks_mut(chunk_bytes).enumerate() {
					let start_block = (i * chunk_blocks) as u32;
					let blocks_here = (out_chunk.len() / block_size_bytes) as u32;
					scope.spawn(move || {
						let mut texels = vec![Pixel::default(); block_texels];
						for local in 0..blocks_here {
							let block_idx = start_block + local;
							let off = local as usize * block_size_bytes;
							run_one(job, &mut texels, block_idx, &mut out_chunk[off..off + block_size_bytes]);
						}
					});
				}
			});
		}

		DispatchStrategy::AtomicQueue { num_threads, job_size } => {
			let num_threads = num_threads.max(1);
			let job_size = job_size.max(1) as usize;
			let chunk_bytes = job_size * block_size_bytes;

			let tasks: Vec<&mut [u8]> = out.chunks_mut(chunk_bytes).collect();
			let num_tasks = tasks.len();
			let slots: Mutex<Vec<Option<&mut [u8]>>> = Mutex::new(tasks.into_iter().map(Some).collect());
			let next_task = AtomicU32::new(0);

			std::thread::scope(|scope| {
				for _ in 0..num_threads {
					let slots = &slots;
					let next_task = &next_task;
					scope.spawn(move || {
						let mut texels = vec![Pixel::default(); block_texels];
						loop {
							let task_idx = next_task.fetch_add(1, Ordering::Relaxed) as usize;
							if task_idx >= num_tasks {
								break;
							}
							let mut chunk = {
								let mut guard = slots.lock().expect("dispatcher mutex poisoned");
								guard[task_idx].take().expect("task claimed twice")
							};
							let start_block = (task_idx * job_size) as u32;
							let blocks_here = (chunk.len() / block_size_bytes) as u32;
							for local in 0..blocks_here {
								let block_idx = start_block + local;
								let off = local as usize * block_size_bytes;
								run_one(job, &mut texels, block_idx, &mut chunk[off..off + block_size_bytes]);
							}
						}
					});
				}
			});
		}
	}
}

/// Decodes `total_blocks` blocks of `in_buf` into `out_buf` (both row-major
/// block order; `format`'s own block size/dims apply), using
/// `decompress_block` for the per-block work.
#[allow(clippy::too_many_arguments)]
pub fn dispatch_decompress(
	in_buf: &[u8],
	out_buf: &mut [u8],
	format: Format,
	width: u32,
	total_blocks: u32,
	block_size_bytes: usize,
	strategy: DispatchStrategy,
	decompress_block: impl Fn(&[u8]) -> Vec<Pixel> + Sync,
) {
	let block_texels = block_texel_count(format);
	log::trace!("dispatch_decompress: {total_blocks} blocks, strategy {strategy:?}");

	let write_block = |out_buf: &mut [u8], block_idx: u32, pixels: &[Pixel]| {
		let (bw, bh) = format.block_dims();
		let (x0, y0) = texcomp_types::job::block_coord(format, width, block_idx);
		for row in 0..bh {
			for col in 0..bw {
				let px = x0 + col;
				let py = y0 + row;
				let offset = ((py * width + px) * 4) as usize;
				let p = pixels[(row * bw + col) as usize];
				out_buf[offset] = p.channel(texcomp_types::pixel::R);
				out_buf[offset + 1] = p.channel(texcomp_types::pixel::G);
				out_buf[offset + 2] = p.channel(texcomp_types::pixel::B);
				out_buf[offset + 3] = p.channel(texcomp_types::pixel::A);
			}
		}
	};

	let run_range = |range: std::ops::Range<u32>, out_buf: &mut [u8]| {
		for block_idx in range {
			let off = block_idx as usize * block_size_bytes;
			let pixels = decompress_block(&in_buf[off..off + block_size_bytes]);
			write_block(out_buf, block_idx, &pixels);
		}
	};

	match strategy {
		DispatchStrategy::Serial => run_range(0..total_blocks, out_buf),

		// A block's output footprint isn't a contiguous byte range (rows are
		// `width * 4` bytes apart), so unlike dispatch_compress we can't
		// pre-split `out_buf` into disjoint per-worker slices. Each worker
		// decodes its claimed blocks independently and only holds the mutex
		// for the cheap scatter-write into the shared image buffer.
		DispatchStrategy::ThreadGroup { num_threads } => {
			let num_threads = num_threads.max(1);
			let chunk_blocks = total_blocks.div_ceil(num_threads).max(1);
			let out_buf = Mutex::new(out_buf);

			std::thread::scope(|scope| {
				for worker in 0..num_threads {
					let out_buf = &out_buf;
					let decompress_block = &decompress_block;
					let start = (worker * chunk_blocks).min(total_blocks);
					let end = (start + chunk_blocks).min(total_blocks);
					scope.spawn(move || {
						for block_idx in start..end {
							let off = block_idx as usize * block_size_bytes;
							let pixels = decompress_block(&in_buf[off..off + block_size_bytes]);
							let mut guard = out_buf.lock().expect("dispatcher mutex poisoned");
							write_block(&mut guard, block_idx, &pixels);
						}
					});
				}
			});
		}

		DispatchStrategy::AtomicQueue { num_threads, job_size } => {
			let num_threads = num_threads.max(1);
			let job_size = job_size.max(1);
			let next_block = AtomicU32::new(0);
			let out_buf = Mutex::new(out_buf);

			std::thread::scope(|scope| {
				for _ in 0..num_threads {
					let next_block = &next_block;
					let out_buf = &out_buf;
					let decompress_block = &decompress_block;
					scope.spawn(move || {
						loop {
							let start = next_block.fetch_add(job_size, Ordering::Relaxed);
							if start >= total_blocks {
								break;
							}
							let end = (start + job_size).min(total_blocks);
							for block_idx in start..end {
								let off = block_idx as usize * block_size_bytes;
								let pixels = decompress_block(&in_buf[off..off + block_size_bytes]);
								let mut guard = out_buf.lock().expect("dispatcher mutex poisoned");
								write_block(&mut guard, block_idx, &pixels);
							}
						}
					});
				}
			});
		}
	}

	let _ = block_texels;
}

#[cfg(test)]
mod tests {
	use super::*;
	use texcomp_types::job::Format;
	use texcomp_types::pixel::R;

	#[test]
	fn serial_and_thread_group_agree() {
		let w = 16;
		let h = 16;
		let rgba: Vec<u8> = (0..(w * h * 4)).map(|i| (i % 256) as u8).collect();
		let job = CompressionJob::new(Format::Dxt1, &rgba, w, h).unwrap();
		let compress = |texels: &[Pixel]| (vec![texels[0].channel(R); 8], BlockStat::default());

		let mut serial_out = vec![0u8; 16 * 8];
		dispatch_compress(&job, &mut serial_out, 8, DispatchStrategy::Serial, CompressionTask::Plain(compress));

		let mut tg_out = vec![0u8; 16 * 8];
		dispatch_compress(
			&job,
			&mut tg_out,
			8,
			DispatchStrategy::ThreadGroup { num_threads: 4 },
			CompressionTask::Plain(compress),
		);

		assert_eq!(serial_out, tg_out);

		let mut aq_out = vec![0u8; 16 * 8];
		dispatch_compress(
			&job,
			&mut aq_out,
			8,
			DispatchStrategy::AtomicQueue { num_threads: 4, job_size: 2 },
			CompressionTask::Plain(compress),
		);
		assert_eq!(serial_out, aq_out);
	}

	#[test]
	fn stats_sink_collects_one_record_per_block() {
		let w = 8;
		let h = 8;
		let rgba: Vec<u8> = (0..(w * h * 4)).map(|i| (i % 256) as u8).collect();
		let job = CompressionJob::new(Format::Dxt1, &rgba, w, h).unwrap();
		let sink = StatsSink::new(job.total_blocks());

		let mut out = vec![0u8; job.total_blocks() as usize * 8];
		dispatch_compress(
			&job,
			&mut out,
			8,
			DispatchStrategy::AtomicQueue { num_threads: 3, job_size: 1 },
			CompressionTask::WithStats(
				|texels: &[Pixel]| {
					let mode = texels[0].channel(R) % 8;
					(vec![0u8; 8], BlockStat { mode, error: f64::from(mode) })
				},
				&sink,
			),
		);

		let records = sink.into_ordered();
		assert_eq!(records.len(), job.total_blocks() as usize);
		assert!(records.iter().all(Option::is_some));
	}
}
