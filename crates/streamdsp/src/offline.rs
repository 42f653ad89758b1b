//! A trivial buffered wrapper over the streaming core, for callers that have
//! a whole buffer in memory rather than a live pull source. Not a first-class
//! API: it exists only as the "trivial wrapper" spec.md's non-goals permit.

use crate::supervisor::{Dsp, DspConfig};

/// Converts `input` (interleaved bytes in `cfg.format_in`) to a `Vec<u8>` of
/// interleaved bytes in `cfg.format_out`, driving a [`Dsp`] instance with a
/// read callback that serves slices of `input` until exhausted.
pub fn convert_buffer(cfg: DspConfig, input: &[u8]) -> crate::error::Result<Vec<u8>> {
    let bytes_per_frame_in = cfg.format_in.bytes_per_frame(cfg.channels_in);
    let bytes_per_frame_out = cfg.format_out.bytes_per_frame(cfg.channels_out);
    let total_frames_in = input.len() / bytes_per_frame_in;

    let input_owned = input.to_vec();
    let mut pos = 0usize;
    let source: Box<dyn FnMut(usize, &mut [u8]) -> usize + Send> = Box::new(move |frame_count, out| {
        let want = frame_count * bytes_per_frame_in;
        let take = want.min(input_owned.len() - pos);
        out[..take].copy_from_slice(&input_owned[pos..pos + take]);
        pos += take;
        take / bytes_per_frame_in
    });

    let mut dsp = Dsp::new(cfg, source)?;

    // Output frame count is bounded by the rate ratio (and, for upsampling,
    // grows roughly by sampleRateOut/sampleRateIn); read in bounded chunks
    // and grow the output buffer until the source is exhausted.
    const CHUNK_FRAMES: usize = 4096;
    let mut out = Vec::with_capacity(total_frames_in * bytes_per_frame_out);
    let mut chunk = vec![0u8; CHUNK_FRAMES * bytes_per_frame_out];
    loop {
        let frames = dsp.read(CHUNK_FRAMES, &mut chunk);
        out.extend_from_slice(&chunk[..frames * bytes_per_frame_out]);
        if frames < CHUNK_FRAMES {
            break;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_map::{Convention, StandardChannelMaps};
    use crate::channel_router::MixingMode;
    use crate::format::{DitherMode, SampleFormat};
    use crate::resample::{Algorithm, SincConfig};

    fn stereo_config(format_in: SampleFormat, format_out: SampleFormat) -> DspConfig {
        let map = StandardChannelMaps::for_channel_count(Convention::Microsoft, 2).unwrap();
        DspConfig {
            format_in,
            format_out,
            channels_in: 2,
            channels_out: 2,
            channel_map_in: map.clone(),
            channel_map_out: map,
            sample_rate_in: 44100,
            sample_rate_out: 44100,
            dither_mode: DitherMode::None,
            mixing_mode: MixingMode::PlanarBlend,
            src_algorithm: Algorithm::Linear,
            src_never_consume_end_of_input: false,
            src_sinc: SincConfig::default(),
            allow_dynamic_sample_rate: false,
            dither_seed: 1,
        }
    }

    #[test]
    fn converts_whole_buffer_in_passthrough() {
        let cfg = stereo_config(SampleFormat::S16, SampleFormat::S16);
        let input: Vec<u8> = (0..64u8).collect();
        let out = convert_buffer(cfg, &input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn converts_across_formats() {
        let cfg = stereo_config(SampleFormat::U8, SampleFormat::S16);
        let input = vec![0u8, 64, 128, 192, 255, 1, 2, 3];
        let out = convert_buffer(cfg, &input).unwrap();
        assert_eq!(out.len(), input.len() * 2);
    }
}
