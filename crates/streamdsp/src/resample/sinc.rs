//! Windowed-sinc resampling: a precomputed lookup table of `sinc(x)` shaped
//! by a window function, convolved against a sliding per-channel cache.

use std::f64::consts::PI;

use streamdsp_core::flush_denormal_f32;
use streamdsp_core::math::Real;
use streamdsp_core::StackVec;

use crate::channel_map::MAX_CHANNELS;

use super::{WindowFunction, MAX_WINDOW_WIDTH};

const RESOLUTION: usize = 8;
const INPUT_CHUNK: usize = 256;

/// Largest per-channel cache a `SincState` can need, at the widest allowed
/// window: `2 * MAX_WINDOW_WIDTH` samples of window span plus one input
/// chunk's worth of headroom.
const MAX_CACHE_CAP: usize = 2 * MAX_WINDOW_WIDTH + INPUT_CHUNK;

/// `sinc(x) = sin(pi*x)/(pi*x)` shaped by a window, sampled on a uniform grid
/// with step `1/RESOLUTION` out to `windowWidth`. Indexed by `|distance| *
/// RESOLUTION`, rounded.
pub(super) struct SincTable {
    window_width: usize,
    table: Vec<f32>,
}

impl SincTable {
    pub(super) fn new(window_width: usize, window_function: WindowFunction) -> Self {
        let len = window_width * RESOLUTION + 1;
        let n = (2 * window_width) as f64;
        let mut table = vec![0.0f32; len];
        for (k, slot) in table.iter_mut().enumerate() {
            let x = k as f64 / RESOLUTION as f64;
            let sinc = if x.abs() < 1e-12 {
                1.0
            } else {
                let px = PI * x;
                Real::sin(px) / px
            };
            let window = match window_function {
                WindowFunction::Rectangular => 1.0,
                WindowFunction::Hann => 0.5 * (1.0 - Real::cos(2.0 * PI * (x + window_width as f64) / n)),
            };
            *slot = (sinc * window) as f32;
        }
        Self { window_width, table }
    }

    #[inline]
    fn tap(&self, distance: f64) -> f32 {
        let idx = (distance.abs() * RESOLUTION as f64).round() as usize;
        self.table.get(idx).copied().unwrap_or(0.0)
    }
}

pub(super) struct SincState {
    window_width: usize,
    cache_cap: usize,
    channels: usize,
    caches: [[f32; MAX_CACHE_CAP]; MAX_CHANNELS],
    pull_scratch: [[f32; INPUT_CHUNK]; MAX_CHANNELS],
    /// Continuous input-time position of the next output sample, as a float
    /// offset into `caches`.
    pos: f64,
    /// Samples currently valid at the front of each channel's cache.
    valid_len: usize,
    end_of_input: bool,
}

impl SincState {
    pub(super) fn new(channels: usize, window_width: usize) -> Self {
        let cache_cap = 2 * window_width + INPUT_CHUNK;
        Self {
            window_width,
            cache_cap,
            channels,
            caches: [[0.0f32; MAX_CACHE_CAP]; MAX_CHANNELS],
            pull_scratch: [[0.0f32; INPUT_CHUNK]; MAX_CHANNELS],
            pos: window_width as f64,
            valid_len: 0,
            end_of_input: false,
        }
    }
}

pub(super) fn read(
    table: &SincTable,
    state: &mut SincState,
    factor: f64,
    never_consume_end_of_input: bool,
    frame_count: usize,
    out_channel_ptrs: &mut [&mut [f32]],
    source: &mut (dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send),
) -> usize {
    let channels = state.channels;
    let window_width = state.window_width;
    let mut frames_done = 0;

    while frames_done < frame_count {
        // Compact: drop samples the window has fully passed.
        let drop = (state.pos as usize).saturating_sub(window_width);
        if drop > 0 {
            for cache in &mut state.caches[..channels] {
                cache.copy_within(drop..state.valid_len, 0);
            }
            state.valid_len -= drop;
            state.pos -= drop as f64;
        }

        let mut pulled = 0usize;
        if !state.end_of_input {
            let space = state.cache_cap - state.valid_len;
            let to_pull = space.min(INPUT_CHUNK);
            if to_pull > 0 {
                let mut ptrs: StackVec<&mut [f32], MAX_CHANNELS> = StackVec::new();
                for row in state.pull_scratch[..channels].iter_mut() {
                    ptrs.push(&mut row[..to_pull]).ok().expect("channels bounded by MAX_CHANNELS");
                }
                let got = source(to_pull, ptrs.as_mut_slice());
                for (c, cache) in state.caches[..channels].iter_mut().enumerate() {
                    cache[state.valid_len..state.valid_len + got].copy_from_slice(&state.pull_scratch[c][..got]);
                }
                state.valid_len += got;
                pulled = got;
                if got < to_pull {
                    state.end_of_input = true;
                    for cache in &mut state.caches[..channels] {
                        for sample in &mut cache[state.valid_len..] {
                            *sample = 0.0;
                        }
                    }
                }
            }
        }

        // After end-of-input, the zero-filled tail counts as usable data
        // unless the caller wants at least one window width of real input
        // held back.
        let effective_valid = if state.end_of_input {
            if never_consume_end_of_input {
                state.valid_len + 1
            } else {
                state.cache_cap
            }
        } else {
            state.valid_len
        };

        let max_pos = effective_valid as f64 - window_width as f64 - 1.0;
        let remaining = frame_count - frames_done;
        let producible = if max_pos > state.pos {
            (((max_pos - state.pos) / factor).floor() as i64 + 1).max(0) as usize
        } else {
            0
        };
        let producible = producible.min(remaining);

        for k in 0..producible {
            let p = state.pos + k as f64 * factor;
            let center = p.floor() as i64;
            let frac = p - center as f64;
            for (c, out) in out_channel_ptrs.iter_mut().enumerate() {
                let mut acc = 0.0f64;
                // 2*window_width taps; the leftmost is zero-padded for
                // alignment, matching the windowed-sinc reference behavior.
                for j in 1..2 * window_width {
                    let rel = j as i64 - window_width as i64;
                    let idx = center + rel;
                    let sample = if idx >= 0 && (idx as usize) < state.cache_cap {
                        state.caches[c][idx as usize]
                    } else {
                        0.0
                    };
                    let dist = rel as f64 - frac;
                    acc += sample as f64 * table.tap(dist) as f64;
                }
                out[frames_done + k] = flush_denormal_f32(acc as f32);
            }
        }

        state.pos += producible as f64 * factor;
        frames_done += producible;

        if producible == 0 {
            if state.end_of_input || pulled == 0 {
                break;
            }
        }
    }
    frames_done
}
