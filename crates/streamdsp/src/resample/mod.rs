//! The sample-rate converter stage: `none` (passthrough), `linear`, and
//! windowed-`sinc` resampling of deinterleaved f32, with support for a
//! dynamic in/out rate change applied between calls.

mod linear;
mod rate_state;
mod sinc;

use std::sync::Arc;

use streamdsp_core::StackVec;

pub use rate_state::RateState;

use crate::channel_map::MAX_CHANNELS;
use crate::error::{DspError, Result};
use linear::LinearState;
use sinc::{SincState, SincTable};

pub const MAX_WINDOW_WIDTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowFunction {
    #[default]
    Hann,
    Rectangular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    None,
    Linear,
    Sinc,
}

#[derive(Debug, Clone, Copy)]
pub struct SincConfig {
    pub window_function: WindowFunction,
    pub window_width: usize,
}

impl Default for SincConfig {
    fn default() -> Self {
        Self { window_function: WindowFunction::Hann, window_width: 16 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SampleRateConverterConfig {
    pub sample_rate_in: u32,
    pub sample_rate_out: u32,
    pub channels: usize,
    pub algorithm: Algorithm,
    pub never_consume_end_of_input: bool,
    pub sinc: SincConfig,
}

impl SampleRateConverterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate_in == 0 || self.sample_rate_out == 0 {
            return Err(DspError::unsupported_configuration("sample rates must be non-zero"));
        }
        if self.channels == 0 || self.channels > crate::channel_map::MAX_CHANNELS {
            return Err(DspError::invalid_argument(format!(
                "channels {} out of range 1..={}",
                self.channels,
                crate::channel_map::MAX_CHANNELS
            )));
        }
        if self.algorithm == Algorithm::Sinc
            && !(2..=MAX_WINDOW_WIDTH).contains(&self.sinc.window_width)
        {
            return Err(DspError::unsupported_configuration(format!(
                "sinc window_width {} out of range 2..={MAX_WINDOW_WIDTH}",
                self.sinc.window_width
            )));
        }
        Ok(())
    }
}

const SCRATCH_FRAMES: usize = 256;

enum Engine {
    None,
    Linear(LinearState),
    Sinc { table: SincTable, state: SincState },
}

/// `sample_rate_converter.read(frame_count, out_channel_ptrs) -> frames_written`.
pub struct SampleRateConverter {
    channels: usize,
    never_consume_end_of_input: bool,
    rate_state: Arc<RateState>,
    engine: Engine,
    source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send>,
}

impl SampleRateConverter {
    pub fn new(
        config: SampleRateConverterConfig,
        source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send>,
    ) -> Result<Self> {
        Self::with_rate_state(config, source, Arc::new(RateState::new(config.sample_rate_in, config.sample_rate_out)))
    }

    /// Builds a converter sharing `rate_state` with its owning supervisor, so
    /// `Dsp::set_sample_rate` can reach a converter buried behind closures.
    pub fn with_rate_state(
        config: SampleRateConverterConfig,
        source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send>,
        rate_state: Arc<RateState>,
    ) -> Result<Self> {
        config.validate()?;

        let engine = match config.algorithm {
            Algorithm::None => Engine::None,
            Algorithm::Linear => Engine::Linear(LinearState::new(config.channels)),
            Algorithm::Sinc => {
                let table = SincTable::new(config.sinc.window_width, config.sinc.window_function);
                let state = SincState::new(config.channels, config.sinc.window_width);
                Engine::Sinc { table, state }
            }
        };

        Ok(Self {
            channels: config.channels,
            never_consume_end_of_input: config.never_consume_end_of_input,
            rate_state,
            engine,
            source,
        })
    }

    pub fn rate_state(&self) -> Arc<RateState> {
        self.rate_state.clone()
    }

    pub fn read(&mut self, frame_count: usize, out_channel_ptrs: &mut [&mut [f32]]) -> usize {
        debug_assert_eq!(out_channel_ptrs.len(), self.channels);
        let (rate_in, rate_out) = self.rate_state.load();
        let factor = rate_in as f64 / rate_out as f64;

        match &mut self.engine {
            Engine::None => {
                let mut frames_done = 0;
                while frames_done < frame_count {
                    let chunk = (frame_count - frames_done).min(SCRATCH_FRAMES);
                    let mut dst: StackVec<&mut [f32], MAX_CHANNELS> = StackVec::new();
                    for c in out_channel_ptrs.iter_mut() {
                        dst.push(&mut c[frames_done..frames_done + chunk]).ok().expect("channels bounded by MAX_CHANNELS");
                    }
                    let got = (self.source)(chunk, dst.as_mut_slice());
                    frames_done += got;
                    if got < chunk {
                        break;
                    }
                }
                frames_done
            }
            Engine::Linear(state) => {
                linear::read(state, factor, frame_count, out_channel_ptrs, &mut self.source)
            }
            Engine::Sinc { table, state } => sinc::read(
                table,
                state,
                factor,
                self.never_consume_end_of_input,
                frame_count,
                out_channel_ptrs,
                &mut self.source,
            ),
        }
    }
}
