//! Benchmark suite for texture block encode/decode.
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use texcomp_benches::{generate_checkerboard, generate_gradient, sizes};
use texcomp_internal::{BptcConfig, DispatchStrategy, compress, decompress};
use texcomp_types::Format;
use std::hint::black_box;

const FORMATS: [Format; 6] =
	[Format::Bc7, Format::Dxt1, Format::Dxt5, Format::Etc1, Format::Pvrtc4Bpp, Format::Pvrtc2Bpp];

fn bench_compress_gradient(c: &mut Criterion) {
	let mut group = c.benchmark_group("compress_gradient");
	let config = BptcConfig::default();

	for format in FORMATS {
		let (w, h) = sizes::SMALL;
		let rgba = generate_gradient(w, h);
		group.throughput(Throughput::Elements((w * h) as u64));
		group.bench_with_input(BenchmarkId::new("serial", format!("{format:?}")), &rgba, |b, rgba| {
			b.iter(|| {
				let out = compress(format, black_box(rgba), w, h, &config, DispatchStrategy::Serial);
				black_box(out)
			});
		});
	}

	group.finish();
}

fn bench_compress_checkerboard(c: &mut Criterion) {
	let mut group = c.benchmark_group("compress_checkerboard");
	let config = BptcConfig::default();

	for format in FORMATS {
		let (w, h) = sizes::SMALL;
		let rgba = generate_checkerboard(w, h, 4);
		group.throughput(Throughput::Elements((w * h) as u64));
		group.bench_with_input(BenchmarkId::new("serial", format!("{format:?}")), &rgba, |b, rgba| {
			b.iter(|| {
				let out = compress(format, black_box(rgba), w, h, &config, DispatchStrategy::Serial);
				black_box(out)
			});
		});
	}

	group.finish();
}

fn bench_dispatch_strategies(c: &mut Criterion) {
	let mut group = c.benchmark_group("dispatch_strategies");
	let config = BptcConfig::default();
	let (w, h) = sizes::MEDIUM;
	let rgba = generate_gradient(w, h);

	let strategies = [
		("serial", DispatchStrategy::Serial),
		("thread_group_4", DispatchStrategy::ThreadGroup { num_threads: 4 }),
		("atomic_queue_4x8", DispatchStrategy::AtomicQueue { num_threads: 4, job_size: 8 }),
	];

	for (name, strategy) in strategies {
		group.bench_function(name, |b| {
			b.iter(|| {
				let out = compress(Format::Dxt1, black_box(&rgba), w, h, &config, strategy);
				black_box(out)
			});
		});
	}

	group.finish();
}

fn bench_decompress(c: &mut Criterion) {
	let mut group = c.benchmark_group("decompress");
	let config = BptcConfig::default();

	for format in FORMATS {
		let (w, h) = sizes::SMALL;
		let rgba = generate_gradient(w, h);
		let encoded = compress(format, &rgba, w, h, &config, DispatchStrategy::Serial).unwrap();
		group.throughput(Throughput::Elements((w * h) as u64));
		group.bench_with_input(BenchmarkId::new("serial", format!("{format:?}")), &encoded, |b, encoded| {
			b.iter(|| {
				let out = decompress(format, black_box(encoded), w, h, DispatchStrategy::Serial);
				black_box(out)
			});
		});
	}

	group.finish();
}

criterion_group!(
	benches,
	bench_compress_gradient,
	bench_compress_checkerboard,
	bench_dispatch_strategies,
	bench_decompress,
);

criterion_main!(benches);
