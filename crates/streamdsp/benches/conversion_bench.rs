use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use streamdsp::{
    ChannelRouter, ChannelRouterConfig, Convention, DitherMode, FormatConverter, FormatConverterConfig,
    MixingMode, SampleFormat, Source, StandardChannelMaps,
};

const BLOCK_SIZES: [usize; 3] = [64, 512, 4096];

fn interleaved_source(bytes: Vec<u8>, bytes_per_frame: usize) -> Box<dyn FnMut(usize, &mut [u8]) -> usize + Send> {
    let mut pos = 0usize;
    Box::new(move |frame_count, out| {
        let want = frame_count * bytes_per_frame;
        let take = want.min(bytes.len() - pos);
        out[..take].copy_from_slice(&bytes[pos..pos + take]);
        pos += take;
        if take < want {
            pos = 0; // loop the fixture so every benchmark iteration has input
        }
        take / bytes_per_frame
    })
}

fn deinterleaved_source(channels: usize) -> Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send> {
    Box::new(move |frame_count, out| {
        for ch in 0..channels {
            for f in 0..frame_count {
                out[ch][f] = (f as f32 * 0.001).sin();
            }
        }
        frame_count
    })
}

fn bench_format_converter(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_converter_s16_to_f32");
    for &block in &BLOCK_SIZES {
        group.throughput(Throughput::Elements(block as u64));
        group.bench_with_input(BenchmarkId::from_parameter(block), &block, |b, &block| {
            let bytes = vec![0u8; block * 16 * 4]; // plenty of stereo s16 frames to loop over
            let source = interleaved_source(bytes, 4);
            let mut conv = FormatConverter::new(
                FormatConverterConfig {
                    format_in: SampleFormat::S16,
                    format_out: SampleFormat::F32,
                    channels: 2,
                    dither_mode: DitherMode::None,
                },
                Source::Interleaved(source),
                1,
            )
            .unwrap();
            let mut out = vec![0u8; block * 8];
            b.iter(|| {
                black_box(conv.read(block, &mut out));
            });
        });
    }
    group.finish();
}

fn bench_channel_router_planar_blend(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_router_stereo_to_51");
    for &block in &BLOCK_SIZES {
        group.throughput(Throughput::Elements(block as u64));
        group.bench_with_input(BenchmarkId::from_parameter(block), &block, |b, &block| {
            let stereo = StandardChannelMaps::for_channel_count(Convention::Microsoft, 2).unwrap();
            let surround = StandardChannelMaps::for_channel_count(Convention::Microsoft, 6).unwrap();
            let cfg = ChannelRouterConfig {
                channels_in: 2,
                channel_map_in: stereo,
                channels_out: 6,
                channel_map_out: surround,
                mixing_mode: MixingMode::PlanarBlend,
            };
            let mut router = ChannelRouter::new(cfg, deinterleaved_source(2)).unwrap();
            let mut outs: Vec<Vec<f32>> = (0..6).map(|_| vec![0.0f32; block]).collect();
            b.iter(|| {
                let mut ptrs: Vec<&mut [f32]> = outs.iter_mut().map(|v| v.as_mut_slice()).collect();
                black_box(router.read(block, &mut ptrs));
            });
        });
    }
    group.finish();
}

fn bench_channel_router_passthrough(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_router_stereo_passthrough");
    for &block in &BLOCK_SIZES {
        group.throughput(Throughput::Elements(block as u64));
        group.bench_with_input(BenchmarkId::from_parameter(block), &block, |b, &block| {
            let map = StandardChannelMaps::for_channel_count(Convention::Microsoft, 2).unwrap();
            let cfg = ChannelRouterConfig {
                channels_in: 2,
                channel_map_in: map.clone(),
                channels_out: 2,
                channel_map_out: map,
                mixing_mode: MixingMode::PlanarBlend,
            };
            let mut router = ChannelRouter::new(cfg, deinterleaved_source(2)).unwrap();
            let mut outs: Vec<Vec<f32>> = (0..2).map(|_| vec![0.0f32; block]).collect();
            b.iter(|| {
                let mut ptrs: Vec<&mut [f32]> = outs.iter_mut().map(|v| v.as_mut_slice()).collect();
                black_box(router.read(block, &mut ptrs));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_format_converter, bench_channel_router_planar_blend, bench_channel_router_passthrough);
criterion_main!(benches);
