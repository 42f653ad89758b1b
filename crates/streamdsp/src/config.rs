//! Declarative loading of a [`DspConfig`] from JSON, behind the `serde`
//! feature. Additive convenience on top of the programmatic config API;
//! every stage config is still built and validated the normal way.

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::channel_map::{ChannelMap, Convention, StandardChannelMaps};
use crate::channel_router::MixingMode;
use crate::error::{DspError, Result};
use crate::format::{DitherMode, SampleFormat};
use crate::resample::{Algorithm, SincConfig, WindowFunction};
use crate::supervisor::DspConfig;

/// JSON-friendly mirror of [`DspConfig`], following the same
/// deserialize-then-validate pattern as the teacher's graph config loader.
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct DspConfigSpec {
    pub format_in: String,
    pub format_out: String,
    pub channels_in: usize,
    pub channels_out: usize,
    /// Standard channel-map convention used for both sides unless
    /// `channel_map_in`/`channel_map_out` are given explicitly.
    #[cfg_attr(feature = "serde", serde(default = "default_convention"))]
    pub convention: String,
    pub sample_rate_in: u32,
    pub sample_rate_out: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub dither_mode: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mixing_mode: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub src_algorithm: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub src_never_consume_end_of_input: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_window_function"))]
    pub src_window_function: String,
    #[cfg_attr(feature = "serde", serde(default = "default_window_width"))]
    pub src_window_width: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_dynamic_sample_rate: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_seed"))]
    pub dither_seed: u64,
}

fn default_convention() -> String {
    "microsoft".to_string()
}

fn default_window_function() -> String {
    "hann".to_string()
}

fn default_window_width() -> usize {
    16
}

fn default_seed() -> u64 {
    1
}

#[cfg(feature = "serde")]
pub fn from_json(json: &str) -> Result<DspConfig> {
    let spec: DspConfigSpec =
        serde_json::from_str(json).map_err(|e| DspError::invalid_argument(format!("invalid dsp config json: {e}")))?;
    spec.build()
}

impl DspConfigSpec {
    pub fn build(self) -> Result<DspConfig> {
        let format_in = parse_format(&self.format_in)?;
        let format_out = parse_format(&self.format_out)?;
        let convention = parse_convention(&self.convention)?;

        let channel_map_in: ChannelMap = StandardChannelMaps::for_channel_count(convention, self.channels_in)?;
        let channel_map_out: ChannelMap = StandardChannelMaps::for_channel_count(convention, self.channels_out)?;

        let dither_mode = match self.dither_mode.as_str() {
            "" | "none" => DitherMode::None,
            "rectangle" => DitherMode::Rectangle,
            "triangle" => DitherMode::Triangle,
            other => return Err(DspError::invalid_argument(format!("unknown dither_mode '{other}'"))),
        };

        let mixing_mode = match self.mixing_mode.as_str() {
            "" | "planar_blend" => MixingMode::PlanarBlend,
            "simple" => MixingMode::Simple,
            other => return Err(DspError::invalid_argument(format!("unknown mixing_mode '{other}'"))),
        };

        let src_algorithm = match self.src_algorithm.as_str() {
            "" | "none" => Algorithm::None,
            "linear" => Algorithm::Linear,
            "sinc" => Algorithm::Sinc,
            other => return Err(DspError::invalid_argument(format!("unknown src_algorithm '{other}'"))),
        };

        let src_window_function = match self.src_window_function.as_str() {
            "hann" => WindowFunction::Hann,
            "rectangular" => WindowFunction::Rectangular,
            other => return Err(DspError::invalid_argument(format!("unknown src_window_function '{other}'"))),
        };

        Ok(DspConfig {
            format_in,
            format_out,
            channels_in: self.channels_in,
            channels_out: self.channels_out,
            channel_map_in,
            channel_map_out,
            sample_rate_in: self.sample_rate_in,
            sample_rate_out: self.sample_rate_out,
            dither_mode,
            mixing_mode,
            src_algorithm,
            src_never_consume_end_of_input: self.src_never_consume_end_of_input,
            src_sinc: SincConfig { window_function: src_window_function, window_width: self.src_window_width },
            allow_dynamic_sample_rate: self.allow_dynamic_sample_rate,
            dither_seed: self.dither_seed,
        })
    }
}

fn parse_format(s: &str) -> Result<SampleFormat> {
    match s {
        "u8" => Ok(SampleFormat::U8),
        "s16" => Ok(SampleFormat::S16),
        "s24" => Ok(SampleFormat::S24),
        "s32" => Ok(SampleFormat::S32),
        "f32" => Ok(SampleFormat::F32),
        other => Err(DspError::invalid_argument(format!("unknown sample format '{other}'"))),
    }
}

fn parse_convention(s: &str) -> Result<Convention> {
    match s {
        "microsoft" => Ok(Convention::Microsoft),
        "alsa" => Ok(Convention::Alsa),
        "flac" => Ok(Convention::Flac),
        other => Err(DspError::invalid_argument(format!("unknown channel map convention '{other}'"))),
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_builds_a_passthrough_config() {
        let json = r#"{
            "format_in": "s16",
            "format_out": "s16",
            "channels_in": 2,
            "channels_out": 2,
            "sample_rate_in": 44100,
            "sample_rate_out": 44100
        }"#;
        let cfg = from_json(json).unwrap();
        assert_eq!(cfg.channels_in, 2);
        assert_eq!(cfg.sample_rate_out, 44100);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let json = r#"{
            "format_in": "bogus",
            "format_out": "s16",
            "channels_in": 2,
            "channels_out": 2,
            "sample_rate_in": 44100,
            "sample_rate_out": 44100
        }"#;
        assert!(from_json(json).is_err());
    }
}
