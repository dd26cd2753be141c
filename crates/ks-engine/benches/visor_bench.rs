//! ChannelVisor per-frame cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ks_engine::ChannelVisor;
use ks_host::{HostEngine, Sound};
use ks_ir::{FrameSlice, TrackInfo};

/// Mixing block sizes the host advances by between frames.
const BLOCKS: &[u64] = &[256, 512, 1024];

fn bench_process_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_update");

    for &block in BLOCKS {
        let mut host = HostEngine::new(48000);
        let master = host.master();
        let music = host.add_bus(master).unwrap();
        let sound = Sound::new(48000, 48000 * 60).looping(4800, 48000 * 10);
        let channel = host.play(sound, music).unwrap();
        let track = TrackInfo::new("bench", 44100, 44100 * 60);

        let mut visor = ChannelVisor::with_reserve(16);
        visor.init(&host, &track, channel);
        let mut sink = |_: &str, start: i32, end: i32, _: FrameSlice| {
            black_box((start, end));
        };

        group.bench_with_input(BenchmarkId::new("block", block), &block, |b, &block| {
            b.iter(|| {
                host.advance(block);
                let status = visor.process_update(&host, Some(master), 1.0, 1.0 / 60.0, &mut sink);
                black_box(status)
            })
        });
    }

    group.finish();
}

fn bench_hierarchy_walk(c: &mut Criterion) {
    let mut host = HostEngine::new(48000);
    let mut bus = host.master();
    for _ in 0..16 {
        bus = host.add_bus(bus).unwrap();
        host.set_bus_pitch(bus, 1.01).unwrap();
    }
    let channel = host.play(Sound::new(48000, 48000), bus).unwrap();

    c.bench_function("resolve_speed_depth_16", |b| {
        b.iter(|| black_box(ks_engine::resolve_speed(&host, black_box(channel), None)))
    });
}

criterion_group!(benches, bench_process_update, bench_hierarchy_walk);
criterion_main!(benches);
