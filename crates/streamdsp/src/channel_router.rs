//! The channel router stage: remaps between input and output channel counts
//! and layouts via passthrough, simple shuffle, or a weighted mixing matrix.
//!
//! Grounded on the fixed-size gain-matrix pattern used by matrix mixing
//! blocks: a `[[f32; MAX_IN]; MAX_OUT]` weight table built once at
//! construction and applied as a per-frame weighted sum at read time.

use streamdsp_core::{flush_denormal_f32, StackVec};

use crate::channel_map::{ChannelMap, ChannelPosition, MAX_CHANNELS};
use crate::error::{DspError, Result};

/// How the router builds its weight matrix when channel counts or layouts
/// differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixingMode {
    /// Identity pairs, then mono fan-out/fan-in, then spatial-plane blending
    /// for anything left over.
    #[default]
    PlanarBlend,
    /// Identity pairs and mono fan-out/fan-in only; unmapped output channels
    /// are left silent rather than blended from unrelated inputs.
    Simple,
}

#[derive(Clone)]
pub struct ChannelRouterConfig {
    pub channels_in: usize,
    pub channel_map_in: ChannelMap,
    pub channels_out: usize,
    pub channel_map_out: ChannelMap,
    pub mixing_mode: MixingMode,
}

impl ChannelRouterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channels_in == 0 || self.channels_in > MAX_CHANNELS {
            return Err(DspError::invalid_argument(format!(
                "channels_in {} out of range 1..={MAX_CHANNELS}",
                self.channels_in
            )));
        }
        if self.channels_out == 0 || self.channels_out > MAX_CHANNELS {
            return Err(DspError::invalid_argument(format!(
                "channels_out {} out of range 1..={MAX_CHANNELS}",
                self.channels_out
            )));
        }
        if self.channel_map_in.channel_count() != self.channels_in {
            return Err(DspError::invalid_argument("channel_map_in does not match channels_in"));
        }
        if self.channel_map_out.channel_count() != self.channels_out {
            return Err(DspError::invalid_argument("channel_map_out does not match channels_out"));
        }
        Ok(())
    }
}

/// Frames pulled from the upstream source per inner loop iteration.
const SCRATCH_FRAMES: usize = 256;

pub struct ChannelRouter {
    channels_in: usize,
    channels_out: usize,
    is_passthrough: bool,
    /// `shuffle[out_ch] = Some(in_ch)` when every output channel has exactly
    /// one source channel with unit weight (including straight fan-out/in).
    shuffle: Option<Vec<usize>>,
    /// `weights[out_ch][in_ch]`, used only when neither fast path applies.
    weights: Vec<Vec<f32>>,
    source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send>,
    in_scratch: [[f32; SCRATCH_FRAMES]; MAX_CHANNELS],
}

impl ChannelRouter {
    pub fn new(
        config: ChannelRouterConfig,
        source: Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send>,
    ) -> Result<Self> {
        config.validate()?;

        let channels_in = config.channels_in;
        let channels_out = config.channels_out;
        let is_passthrough = channels_in == channels_out
            && (config.channel_map_in.positions() == config.channel_map_out.positions()
                || config.channel_map_in.is_blank()
                || config.channel_map_out.is_blank());

        let weights = build_weight_matrix(&config);
        let shuffle = as_shuffle(&weights, channels_in, channels_out);

        Ok(Self {
            channels_in,
            channels_out,
            is_passthrough,
            shuffle,
            weights,
            source,
            in_scratch: [[0.0f32; SCRATCH_FRAMES]; MAX_CHANNELS],
        })
    }

    /// `channel_router.read(frame_count, out_channel_ptrs) -> frames_written`.
    pub fn read(&mut self, frame_count: usize, out_channel_ptrs: &mut [&mut [f32]]) -> usize {
        debug_assert_eq!(out_channel_ptrs.len(), self.channels_out);

        let mut frames_done = 0;
        while frames_done < frame_count {
            let chunk = (frame_count - frames_done).min(SCRATCH_FRAMES);

            if self.is_passthrough {
                let mut dst: StackVec<&mut [f32], MAX_CHANNELS> = StackVec::new();
                for c in out_channel_ptrs.iter_mut() {
                    dst.push(&mut c[frames_done..frames_done + chunk]).ok().expect("channels bounded by MAX_CHANNELS");
                }
                let got = (self.source)(chunk, dst.as_mut_slice());
                frames_done += got;
                if got < chunk {
                    break;
                }
                continue;
            }

            let mut src: StackVec<&mut [f32], MAX_CHANNELS> = StackVec::new();
            for row in self.in_scratch[..self.channels_in].iter_mut() {
                src.push(&mut row[..chunk]).ok().expect("channels bounded by MAX_CHANNELS");
            }
            let got = (self.source)(chunk, src.as_mut_slice());

            if let Some(shuffle) = &self.shuffle {
                for (out_ch, &in_ch_opt) in shuffle.iter().enumerate() {
                    for f in 0..got {
                        out_channel_ptrs[out_ch][frames_done + f] = self.in_scratch[in_ch_opt][f];
                    }
                }
            } else {
                for out_ch in 0..self.channels_out {
                    for f in 0..got {
                        let mut acc = 0.0f32;
                        for in_ch in 0..self.channels_in {
                            acc += self.in_scratch[in_ch][f] * self.weights[out_ch][in_ch];
                        }
                        out_channel_ptrs[out_ch][frames_done + f] = flush_denormal_f32(acc);
                    }
                }
            }

            frames_done += got;
            if got < chunk {
                break;
            }
        }
        frames_done
    }
}

/// `shuffle[out] = Some(in)` iff every output row has exactly one non-zero
/// weight and that weight is exactly 1.0 — lets `read` skip the weighted sum
/// entirely for the common renumbering/passthrough-like cases.
fn as_shuffle(weights: &[Vec<f32>], channels_in: usize, channels_out: usize) -> Option<Vec<usize>> {
    let mut shuffle = Vec::with_capacity(channels_out);
    for out_ch in 0..channels_out {
        let mut found = None;
        for in_ch in 0..channels_in {
            let w = weights[out_ch][in_ch];
            if w == 0.0 {
                continue;
            }
            if w != 1.0 || found.is_some() {
                return None;
            }
            found = Some(in_ch);
        }
        shuffle.push(found?);
    }
    Some(shuffle)
}

/// Builds the `[channels_out][channels_in]` weight matrix via four layered
/// rules, applied in this exact order: identity pairs, mono fan-out, mono
/// fan-in, then (in [`MixingMode::PlanarBlend`] only) spatial blending.
fn build_weight_matrix(config: &ChannelRouterConfig) -> Vec<Vec<f32>> {
    use ChannelPosition::*;

    let channels_in = config.channels_in;
    let channels_out = config.channels_out;
    let mut w = vec![vec![0.0f32; channels_in]; channels_out];

    let positions_in = config.channel_map_in.positions();
    let positions_out = config.channel_map_out.positions();

    // Rule (i): identical named positions map 1:1 with unit weight.
    for (in_ch, &pos_in) in positions_in.iter().enumerate() {
        if pos_in == None {
            continue;
        }
        for (out_ch, &pos_out) in positions_out.iter().enumerate() {
            if pos_out == pos_in {
                w[out_ch][in_ch] = 1.0;
            }
        }
    }

    // Rule (ii): mono input fans out to every output position that is
    // neither NONE, MONO, nor LFE.
    for (in_ch, &pos_in) in positions_in.iter().enumerate() {
        if pos_in != Mono {
            continue;
        }
        for (out_ch, &pos_out) in positions_out.iter().enumerate() {
            if !matches!(pos_out, None | Mono | Lfe) {
                w[out_ch][in_ch] = 1.0;
            }
        }
    }

    // Rule (iii): mono fan-in. S = count of input channels that are
    // neither NONE, MONO, nor LFE; each contributes 1/S to every MONO output.
    let fan_in_channels: Vec<usize> = positions_in
        .iter()
        .enumerate()
        .filter(|(_, &p)| !matches!(p, None | Mono | Lfe))
        .map(|(i, _)| i)
        .collect();
    if !fan_in_channels.is_empty() {
        let weight = 1.0 / fan_in_channels.len() as f32;
        for (out_ch, &pos_out) in positions_out.iter().enumerate() {
            if pos_out == Mono {
                for &in_ch in &fan_in_channels {
                    w[out_ch][in_ch] += weight;
                }
            }
        }
    }

    // Rule (iv): spatial blend, only filling still-zero entries so identity
    // and mono rules are never overwritten.
    if config.mixing_mode == MixingMode::PlanarBlend {
        for (in_ch, &pos_in) in positions_in.iter().enumerate() {
            if !pos_in.is_spatial() || positions_out.contains(&pos_in) {
                continue;
            }
            for (out_ch, &pos_out) in positions_out.iter().enumerate() {
                if !pos_out.is_spatial() {
                    continue;
                }
                if w[out_ch][in_ch] == 0.0 {
                    w[out_ch][in_ch] = crate::channel_map::planar_contribution(pos_in, pos_out);
                }
            }
        }
        for (out_ch, &pos_out) in positions_out.iter().enumerate() {
            if !pos_out.is_spatial() || positions_in.contains(&pos_out) {
                continue;
            }
            for (in_ch, &pos_in) in positions_in.iter().enumerate() {
                if !pos_in.is_spatial() {
                    continue;
                }
                if w[out_ch][in_ch] == 0.0 {
                    w[out_ch][in_ch] = crate::channel_map::planar_contribution(pos_in, pos_out);
                }
            }
        }
    }

    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_map::{Convention, StandardChannelMaps};

    fn source_from(frames: Vec<Vec<f32>>) -> Box<dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send> {
        let mut pos = 0usize;
        let total = frames[0].len();
        Box::new(move |frame_count, out| {
            let take = frame_count.min(total - pos);
            for (ch, data) in frames.iter().enumerate() {
                out[ch][..take].copy_from_slice(&data[pos..pos + take]);
            }
            pos += take;
            take
        })
    }

    #[test]
    fn stereo_passthrough_is_identity() {
        let map = StandardChannelMaps::for_channel_count(Convention::Microsoft, 2).unwrap();
        let cfg = ChannelRouterConfig {
            channels_in: 2,
            channel_map_in: map.clone(),
            channels_out: 2,
            channel_map_out: map,
            mixing_mode: MixingMode::PlanarBlend,
        };
        let src = source_from(vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]]);
        let mut router = ChannelRouter::new(cfg, src).unwrap();
        let mut l = vec![0.0f32; 3];
        let mut r = vec![0.0f32; 3];
        let frames = {
            let mut ptrs: Vec<&mut [f32]> = vec![&mut l, &mut r];
            router.read(3, &mut ptrs)
        };
        assert_eq!(frames, 3);
        assert_eq!(l, vec![1.0, 2.0, 3.0]);
        assert_eq!(r, vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn mono_fans_out_to_stereo() {
        let mono = ChannelMap::new(&[ChannelPosition::Mono]).unwrap();
        let stereo = StandardChannelMaps::for_channel_count(Convention::Microsoft, 2).unwrap();
        let cfg = ChannelRouterConfig {
            channels_in: 1,
            channel_map_in: mono,
            channels_out: 2,
            channel_map_out: stereo,
            mixing_mode: MixingMode::PlanarBlend,
        };
        let src = source_from(vec![vec![0.5, 0.25]]);
        let mut router = ChannelRouter::new(cfg, src).unwrap();
        let mut l = vec![0.0f32; 2];
        let mut r = vec![0.0f32; 2];
        let frames = {
            let mut ptrs: Vec<&mut [f32]> = vec![&mut l, &mut r];
            router.read(2, &mut ptrs)
        };
        assert_eq!(frames, 2);
        assert_eq!(l, vec![0.5, 0.25]);
        assert_eq!(r, vec![0.5, 0.25]);
    }

    #[test]
    fn stereo_fans_into_mono_averaged() {
        let stereo = StandardChannelMaps::for_channel_count(Convention::Microsoft, 2).unwrap();
        let mono = ChannelMap::new(&[ChannelPosition::Mono]).unwrap();
        let cfg = ChannelRouterConfig {
            channels_in: 2,
            channel_map_in: stereo,
            channels_out: 1,
            channel_map_out: mono,
            mixing_mode: MixingMode::PlanarBlend,
        };
        let src = source_from(vec![vec![1.0], vec![0.0]]);
        let mut router = ChannelRouter::new(cfg, src).unwrap();
        let mut m = vec![0.0f32; 1];
        let frames = {
            let mut ptrs: Vec<&mut [f32]> = vec![&mut m];
            router.read(1, &mut ptrs)
        };
        assert_eq!(frames, 1);
        assert!((m[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stereo_to_51_planar_blend_matches_scenario() {
        use ChannelPosition::*;
        let stereo = ChannelMap::new(&[FrontLeft, FrontRight]).unwrap();
        let surround = StandardChannelMaps::for_channel_count(Convention::Microsoft, 6).unwrap();
        let cfg = ChannelRouterConfig {
            channels_in: 2,
            channel_map_in: stereo,
            channels_out: 6,
            channel_map_out: surround,
            mixing_mode: MixingMode::PlanarBlend,
        };
        let src = source_from(vec![vec![1.0], vec![0.0]]);
        let mut router = ChannelRouter::new(cfg, src).unwrap();
        let mut outs: Vec<Vec<f32>> = (0..6).map(|_| vec![0.0f32; 1]).collect();
        let frames = {
            let mut ptrs: Vec<&mut [f32]> = outs.iter_mut().map(|v| v.as_mut_slice()).collect();
            router.read(1, &mut ptrs)
        };
        assert_eq!(frames, 1);
        // Order: FL, FR, FC, LFE, SL, SR
        assert!((outs[0][0] - 1.0).abs() < 1e-6); // FL identity
        assert!(outs[1][0].abs() < 1e-6); // FR gets nothing from FL
        assert!((outs[2][0] - 0.5).abs() < 1e-6); // FC
        assert!(outs[3][0].abs() < 1e-6); // LFE never blended
        assert!((outs[4][0] - 0.5).abs() < 1e-6); // SL
        assert!(outs[5][0].abs() < 1e-6); // SR
    }

    #[test]
    fn short_upstream_read_is_propagated() {
        let map = StandardChannelMaps::for_channel_count(Convention::Microsoft, 2).unwrap();
        let cfg = ChannelRouterConfig {
            channels_in: 2,
            channel_map_in: map.clone(),
            channels_out: 2,
            channel_map_out: map,
            mixing_mode: MixingMode::PlanarBlend,
        };
        let src = source_from(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let mut router = ChannelRouter::new(cfg, src).unwrap();
        let mut l = vec![0.0f32; 5];
        let mut r = vec![0.0f32; 5];
        let frames = {
            let mut ptrs: Vec<&mut [f32]> = vec![&mut l, &mut r];
            router.read(5, &mut ptrs)
        };
        assert_eq!(frames, 2);
    }

    #[test]
    fn mismatched_channel_map_length_is_rejected() {
        let mono = ChannelMap::new(&[ChannelPosition::Mono]).unwrap();
        let cfg = ChannelRouterConfig {
            channels_in: 2,
            channel_map_in: mono,
            channels_out: 1,
            channel_map_out: ChannelMap::new(&[ChannelPosition::Mono]).unwrap(),
            mixing_mode: MixingMode::PlanarBlend,
        };
        let src = source_from(vec![vec![0.0], vec![0.0]]);
        assert!(ChannelRouter::new(cfg, src).is_err());
    }
}
