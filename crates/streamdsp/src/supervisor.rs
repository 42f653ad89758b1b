//! The DSP supervisor: composes the format converter, channel router, and
//! sample-rate converter into one pull pipeline, applying passthrough and
//! stage-elimination/reordering optimizations once at construction.
//!
//! Stages are wired by move-capturing boxed closures, owned outside-in by
//! the supervisor (`dsp.read` ultimately calls into the innermost stage's
//! `read`, which calls the one before it, and so on) rather than by giving
//! stages a reference back to the supervisor. There is no cycle to manage.

use std::sync::Arc;

use crate::channel_map::ChannelMap;
use crate::channel_router::{ChannelRouter, ChannelRouterConfig, MixingMode};
use crate::error::{DspError, Result};
use crate::format::{DitherMode, SampleFormat};
use crate::format_converter::{FormatConverter, FormatConverterConfig, Source};
use crate::resample::{Algorithm, RateState, SampleRateConverter, SampleRateConverterConfig, SincConfig};

#[derive(Clone)]
pub struct DspConfig {
    pub format_in: SampleFormat,
    pub format_out: SampleFormat,
    pub channels_in: usize,
    pub channels_out: usize,
    pub channel_map_in: ChannelMap,
    pub channel_map_out: ChannelMap,
    pub sample_rate_in: u32,
    pub sample_rate_out: u32,
    pub dither_mode: DitherMode,
    pub mixing_mode: MixingMode,
    pub src_algorithm: Algorithm,
    pub src_never_consume_end_of_input: bool,
    pub src_sinc: SincConfig,
    pub allow_dynamic_sample_rate: bool,
    pub dither_seed: u64,
}

impl DspConfig {
    fn rates_match(&self) -> bool {
        self.sample_rate_in == self.sample_rate_out
    }

    fn channels_match(&self) -> bool {
        self.channels_in == self.channels_out
            && (self.channel_map_in.positions() == self.channel_map_out.positions()
                || self.channel_map_in.is_blank()
                || self.channel_map_out.is_blank())
    }

    fn formats_match(&self) -> bool {
        self.format_in == self.format_out
    }
}

enum Pipeline {
    /// Formats, channel layout, and rates all match, and dynamic rate
    /// changes are disabled: reads go straight to the client.
    Passthrough(Box<dyn FnMut(usize, &mut [u8]) -> usize + Send>),
    /// Either a direct format-only conversion (router and SRC both
    /// unneeded) or a full f32 deinterleaved pipeline terminating in the
    /// post-format converter. Both shapes reduce to one `FormatConverter`.
    Single(FormatConverter),
}

pub struct Dsp {
    pipeline: Pipeline,
    rate_state: Option<Arc<RateState>>,
    allow_dynamic_sample_rate: bool,
}

impl Dsp {
    pub fn new(config: DspConfig, client_source: Box<dyn FnMut(usize, &mut [u8]) -> usize + Send>) -> Result<Self> {
        if config.channel_map_in.channel_count() != config.channels_in {
            return Err(DspError::invalid_argument("channel_map_in does not match channels_in"));
        }
        if config.channel_map_out.channel_count() != config.channels_out {
            return Err(DspError::invalid_argument("channel_map_out does not match channels_out"));
        }
        if config.allow_dynamic_sample_rate && config.src_algorithm == Algorithm::None {
            return Err(DspError::unsupported_configuration(
                "dynamic sample-rate changes require a resampling algorithm other than None",
            ));
        }

        let is_passthrough =
            config.formats_match() && config.channels_match() && config.rates_match() && !config.allow_dynamic_sample_rate;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            is_passthrough,
            formats_match = config.formats_match(),
            channels_match = config.channels_match(),
            rates_match = config.rates_match(),
            allow_dynamic_sample_rate = config.allow_dynamic_sample_rate,
            "dsp supervisor stage-elimination decision"
        );

        if is_passthrough {
            return Ok(Self { pipeline: Pipeline::Passthrough(client_source), rate_state: None, allow_dynamic_sample_rate: false });
        }

        let router_needed = !config.channels_match();
        let src_needed = !config.rates_match() || config.allow_dynamic_sample_rate;

        #[cfg(feature = "tracing")]
        tracing::debug!(router_needed, src_needed, "dsp supervisor stage requirements");

        let (pipeline, rate_state) = if !router_needed && !src_needed {
            let conv = FormatConverter::new(
                FormatConverterConfig {
                    format_in: config.format_in,
                    format_out: config.format_out,
                    channels: config.channels_in,
                    dither_mode: config.dither_mode,
                },
                Source::Interleaved(client_source),
                config.dither_seed,
            )?;
            (Pipeline::Single(conv), None)
        } else {
            let rate_state = Arc::new(RateState::new(config.sample_rate_in, config.sample_rate_out));

            let pre_fmt = FormatConverter::new(
                FormatConverterConfig {
                    format_in: config.format_in,
                    format_out: SampleFormat::F32,
                    channels: config.channels_in,
                    dither_mode: DitherMode::None,
                },
                Source::Interleaved(client_source),
                config.dither_seed,
            )?;
            let mut pre_fmt = pre_fmt;
            let pre_source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send> =
                Box::new(move |fc, out| pre_fmt.read_deinterleaved(fc, out));

            // Channel-reduction rule: router runs before SRC when it narrows
            // the channel count, so SRC works on fewer channels.
            let channel_reduction = config.channels_out < config.channels_in;

            let router_cfg = ChannelRouterConfig {
                channels_in: config.channels_in,
                channel_map_in: config.channel_map_in.clone(),
                channels_out: config.channels_out,
                channel_map_out: config.channel_map_out.clone(),
                mixing_mode: config.mixing_mode,
            };

            let final_source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send> = match (
                router_needed,
                src_needed,
                channel_reduction,
            ) {
                (true, true, true) => {
                    let mut router = ChannelRouter::new(router_cfg, pre_source)?;
                    let router_source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send> =
                        Box::new(move |fc, out| router.read(fc, out));
                    let src_cfg = SampleRateConverterConfig {
                        sample_rate_in: config.sample_rate_in,
                        sample_rate_out: config.sample_rate_out,
                        channels: config.channels_out,
                        algorithm: config.src_algorithm,
                        never_consume_end_of_input: config.src_never_consume_end_of_input,
                        sinc: config.src_sinc,
                    };
                    let mut src = SampleRateConverter::with_rate_state(src_cfg, router_source, rate_state.clone())?;
                    Box::new(move |fc, out| src.read(fc, out))
                }
                (true, true, false) => {
                    let src_cfg = SampleRateConverterConfig {
                        sample_rate_in: config.sample_rate_in,
                        sample_rate_out: config.sample_rate_out,
                        channels: config.channels_in,
                        algorithm: config.src_algorithm,
                        never_consume_end_of_input: config.src_never_consume_end_of_input,
                        sinc: config.src_sinc,
                    };
                    let mut src = SampleRateConverter::with_rate_state(src_cfg, pre_source, rate_state.clone())?;
                    let src_source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send> =
                        Box::new(move |fc, out| src.read(fc, out));
                    let mut router = ChannelRouter::new(router_cfg, src_source)?;
                    Box::new(move |fc, out| router.read(fc, out))
                }
                (true, false, _) => {
                    let mut router = ChannelRouter::new(router_cfg, pre_source)?;
                    Box::new(move |fc, out| router.read(fc, out))
                }
                (false, true, _) => {
                    let src_cfg = SampleRateConverterConfig {
                        sample_rate_in: config.sample_rate_in,
                        sample_rate_out: config.sample_rate_out,
                        channels: config.channels_in,
                        algorithm: config.src_algorithm,
                        never_consume_end_of_input: config.src_never_consume_end_of_input,
                        sinc: config.src_sinc,
                    };
                    let mut src = SampleRateConverter::with_rate_state(src_cfg, pre_source, rate_state.clone())?;
                    Box::new(move |fc, out| src.read(fc, out))
                }
                (false, false, _) => unreachable!("router_needed or src_needed must hold here"),
            };

            let post_fmt = FormatConverter::new(
                FormatConverterConfig {
                    format_in: SampleFormat::F32,
                    format_out: config.format_out,
                    channels: config.channels_out,
                    dither_mode: config.dither_mode,
                },
                Source::Deinterleaved(final_source),
                config.dither_seed.wrapping_add(1),
            )?;

            (Pipeline::Single(post_fmt), Some(rate_state))
        };

        Ok(Self { pipeline, rate_state, allow_dynamic_sample_rate: config.allow_dynamic_sample_rate })
    }

    /// `dsp.read(frame_count, out) -> frames_written`.
    pub fn read(&mut self, frame_count: usize, out: &mut [u8]) -> usize {
        match &mut self.pipeline {
            Pipeline::Passthrough(source) => source(frame_count, out),
            Pipeline::Single(conv) => conv.read(frame_count, out),
        }
    }

    fn require_dynamic(&self) -> Result<&Arc<RateState>> {
        if !self.allow_dynamic_sample_rate {
            return Err(DspError::invalid_operation("dynamic sample-rate changes are not enabled for this DSP instance"));
        }
        self.rate_state.as_ref().ok_or_else(|| {
            DspError::invalid_operation("dynamic sample-rate changes are not enabled for this DSP instance")
        })
    }

    pub fn set_input_sample_rate(&self, rate: u32) -> Result<()> {
        self.require_dynamic()?.set_input_rate(rate)
    }

    pub fn set_output_sample_rate(&self, rate: u32) -> Result<()> {
        self.require_dynamic()?.set_output_rate(rate)
    }

    pub fn set_sample_rate(&self, rate_in: u32, rate_out: u32) -> Result<()> {
        self.require_dynamic()?.store(rate_in, rate_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_map::{ChannelPosition, Convention, StandardChannelMaps};

    fn client_source_from(data: Vec<u8>, bytes_per_frame: usize) -> Box<dyn FnMut(usize, &mut [u8]) -> usize + Send> {
        let mut pos = 0usize;
        Box::new(move |frame_count, out| {
            let want = frame_count * bytes_per_frame;
            let take = want.min(data.len() - pos);
            out[..take].copy_from_slice(&data[pos..pos + take]);
            pos += take;
            take / bytes_per_frame
        })
    }

    fn stereo_map() -> ChannelMap {
        StandardChannelMaps::for_channel_count(Convention::Microsoft, 2).unwrap()
    }

    fn base_config() -> DspConfig {
        DspConfig {
            format_in: SampleFormat::S16,
            format_out: SampleFormat::S16,
            channels_in: 2,
            channels_out: 2,
            channel_map_in: stereo_map(),
            channel_map_out: stereo_map(),
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
    fn full_match_is_passthrough() {
        let cfg = base_config();
        let input: Vec<u8> = (0..16u8).collect();
        let src = client_source_from(input.clone(), 4);
        let mut dsp = Dsp::new(cfg, src).unwrap();
        let mut out = vec![0u8; 16];
        let frames = dsp.read(4, &mut out);
        assert_eq!(frames, 4);
        assert_eq!(out, input);
    }

    #[test]
    fn format_only_difference_uses_direct_conversion() {
        let mut cfg = base_config();
        cfg.format_out = SampleFormat::F32;
        let input: Vec<u8> = vec![0, 0, 0x80, 0x3f, 0, 0, 0, 0]; // one stereo frame of s16 zeros
        let src = client_source_from(input, 4);
        let mut dsp = Dsp::new(cfg, src).unwrap();
        let mut out = vec![0u8; 8];
        let frames = dsp.read(1, &mut out);
        assert_eq!(frames, 1);
    }

    #[test]
    fn rate_change_requires_dynamic_flag() {
        let cfg = base_config();
        let src = client_source_from(vec![0u8; 64], 4);
        let dsp = Dsp::new(cfg, src).unwrap();
        assert!(dsp.set_sample_rate(48000, 44100).is_err());
    }

    #[test]
    fn dynamic_rate_change_is_applied() {
        let mut cfg = base_config();
        cfg.allow_dynamic_sample_rate = true;
        let src = client_source_from(vec![0u8; 256], 4);
        let dsp = Dsp::new(cfg, src).unwrap();
        assert!(dsp.set_sample_rate(48000, 44100).is_ok());
    }

    #[test]
    fn dynamic_rate_change_with_none_algorithm_is_rejected() {
        let mut cfg = base_config();
        cfg.allow_dynamic_sample_rate = true;
        cfg.src_algorithm = Algorithm::None;
        let src = client_source_from(vec![0u8; 256], 4);
        assert!(Dsp::new(cfg, src).is_err());
    }

    #[test]
    fn mono_to_stereo_routes_without_src() {
        let mut cfg = base_config();
        cfg.channels_in = 1;
        cfg.channel_map_in = ChannelMap::new(&[ChannelPosition::Mono]).unwrap();
        let src = client_source_from(vec![0, 0, 0, 0], 2);
        let mut dsp = Dsp::new(cfg, src).unwrap();
        let mut out = vec![0u8; 8];
        let frames = dsp.read(2, &mut out);
        assert_eq!(frames, 2);
    }
}
