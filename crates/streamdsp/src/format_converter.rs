//! The pre/post-format converter stage: quantization, interleave/deinterleave,
//! and dither between any pair of supported PCM formats.

use streamdsp_core::{StackVec, XorShiftRng};

use crate::channel_map::MAX_CHANNELS;
use crate::error::{DspError, Result};
use crate::format::{dither_offset, ConversionKernel, DitherMode, SampleFormat};

/// Frames pulled from the upstream source per inner loop iteration. A few
/// kilobytes of scratch per spec.md §4.1 ("a fixed-size scratch block, SIMD-
/// aligned"); kept small enough to stay off the heap.
const SCRATCH_FRAMES: usize = 256;

/// Where a [`FormatConverter`] pulls its input samples from.
pub enum Source {
    /// Raw interleaved bytes in `format_in`. Used for the pre-format stage
    /// (client callback) and for single-stage direct format conversion.
    Interleaved(Box<dyn FnMut(usize, &mut [u8]) -> usize + Send>),
    /// Deinterleaved 32-bit float, one slice per channel. Used for the
    /// post-format stage, pulling from the router/SRC core.
    Deinterleaved(Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send>),
}

#[derive(Debug, Clone, Copy)]
pub struct FormatConverterConfig {
    pub format_in: SampleFormat,
    pub format_out: SampleFormat,
    pub channels: usize,
    pub dither_mode: DitherMode,
}

impl FormatConverterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(DspError::invalid_argument(format!(
                "channels {} out of range 1..={MAX_CHANNELS}",
                self.channels
            )));
        }
        Ok(())
    }
}

pub struct FormatConverter {
    format_in: SampleFormat,
    format_out: SampleFormat,
    channels: usize,
    kernel: ConversionKernel,
    dither_mode: DitherMode,
    rng: XorShiftRng,
    source: Source,
    raw_scratch: Vec<u8>,
    f32_scratch: [[f32; SCRATCH_FRAMES]; MAX_CHANNELS],
}

impl FormatConverter {
    pub fn new(config: FormatConverterConfig, source: Source, seed: u64) -> Result<Self> {
        config.validate()?;
        let kernel = ConversionKernel::select(config.format_in, config.format_out);
        let max_bytes_per_sample = config.format_in.bytes_per_sample().max(config.format_out.bytes_per_sample());
        Ok(Self {
            format_in: config.format_in,
            format_out: config.format_out,
            channels: config.channels,
            kernel,
            dither_mode: config.dither_mode,
            rng: XorShiftRng::new(seed),
            source,
            raw_scratch: vec![0u8; SCRATCH_FRAMES * config.channels * max_bytes_per_sample],
            f32_scratch: [[0.0f32; SCRATCH_FRAMES]; MAX_CHANNELS],
        })
    }

    fn dither_for(&mut self) -> f64 {
        if self.kernel.dither_applies() {
            let (min, max) = self.kernel.dither_range();
            dither_offset(&mut self.rng, self.dither_mode, min, max)
        } else {
            0.0
        }
    }

    /// `format_converter.read(frame_count, out_interleaved) -> frames_written`.
    ///
    /// Writes interleaved `format_out` bytes. Loops over scratch-sized chunks;
    /// a short upstream read ends the loop and is returned as-is (propagated,
    /// never masked).
    pub fn read(&mut self, frame_count: usize, out_interleaved: &mut [u8]) -> usize {
        let bpf_in = self.format_in.bytes_per_sample();
        let bpf_out = self.format_out.bytes_per_sample();
        debug_assert!(out_interleaved.len() >= frame_count * self.channels * bpf_out);

        let mut frames_done = 0;
        while frames_done < frame_count {
            let chunk = (frame_count - frames_done).min(SCRATCH_FRAMES);
            let got = match &mut self.source {
                Source::Interleaved(pull) => {
                    let bytes_needed = chunk * self.channels * bpf_in;
                    let got = pull(chunk, &mut self.raw_scratch[..bytes_needed]);
                    for f in 0..got {
                        for c in 0..self.channels {
                            let src_off = (f * self.channels + c) * bpf_in;
                            let dst_off = ((frames_done + f) * self.channels + c) * bpf_out;
                            let dither = self.dither_for();
                            self.kernel.convert_one(
                                &self.raw_scratch[src_off..src_off + bpf_in],
                                &mut out_interleaved[dst_off..dst_off + bpf_out],
                                dither,
                            );
                        }
                    }
                    got
                }
                Source::Deinterleaved(pull) => {
                    let mut ptrs: StackVec<&mut [f32], MAX_CHANNELS> = StackVec::new();
                    for row in self.f32_scratch[..self.channels].iter_mut() {
                        ptrs.push(&mut row[..chunk]).ok().expect("channels bounded by MAX_CHANNELS");
                    }
                    let got = pull(chunk, ptrs.as_mut_slice());
                    for f in 0..got {
                        for c in 0..self.channels {
                            let x = self.f32_scratch[c][f];
                            let dither = self.dither_for();
                            let dst_off = ((frames_done + f) * self.channels + c) * bpf_out;
                            self.kernel.convert_one(
                                &x.to_ne_bytes(),
                                &mut out_interleaved[dst_off..dst_off + bpf_out],
                                dither,
                            );
                        }
                    }
                    got
                }
            };
            frames_done += got;
            if got < chunk {
                break;
            }
        }
        frames_done
    }

    /// `format_converter.read_deinterleaved(frame_count, out_channel_ptrs) -> frames_written`.
    ///
    /// Used by the pre-format stage: pulls interleaved `format_in` bytes from
    /// the client and scatters converted samples into `channels` separate
    /// `f32` buffers.
    pub fn read_deinterleaved(&mut self, frame_count: usize, out_channel_ptrs: &mut [&mut [f32]]) -> usize {
        debug_assert_eq!(out_channel_ptrs.len(), self.channels);
        let bpf_in = self.format_in.bytes_per_sample();

        let mut frames_done = 0;
        while frames_done < frame_count {
            let chunk = (frame_count - frames_done).min(SCRATCH_FRAMES);
            let got = match &mut self.source {
                Source::Interleaved(pull) => {
                    let bytes_needed = chunk * self.channels * bpf_in;
                    let got = pull(chunk, &mut self.raw_scratch[..bytes_needed]);
                    for f in 0..got {
                        for c in 0..self.channels {
                            let src_off = (f * self.channels + c) * bpf_in;
                            let mut dst = [0u8; 4];
                            self.kernel.convert_one(&self.raw_scratch[src_off..src_off + bpf_in], &mut dst, 0.0);
                            out_channel_ptrs[c][frames_done + f] = f32::from_ne_bytes(dst);
                        }
                    }
                    got
                }
                Source::Deinterleaved(_) => {
                    unreachable!("read_deinterleaved is only used by the pre-format stage, whose source is always Interleaved")
                }
            };
            frames_done += got;
            if got < chunk {
                break;
            }
        }
        frames_done
    }
}
