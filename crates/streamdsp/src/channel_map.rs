//! Channel positions, channel maps, and the spatial plane-weight table used
//! by the channel router's planar-blend mixing mode.

use std::fmt;

use streamdsp_core::StackVec;

use crate::error::{DspError, Result};

/// Maximum channels per stream, a hard limit of the core (spec.md §9).
pub const MAX_CHANNELS: usize = 32;

/// A semantic channel position.
///
/// 52 distinct positions: `None`, `Mono`, 18 named spatial positions, and 32
/// numbered auxiliary channels (collapsed into one `Aux(u8)` variant rather
/// than 32 separate enum cases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelPosition {
    None,
    Mono,
    FrontLeft,
    FrontRight,
    FrontCenter,
    Lfe,
    BackLeft,
    BackRight,
    FrontLeftCenter,
    FrontRightCenter,
    BackCenter,
    SideLeft,
    SideRight,
    TopCenter,
    TopFrontLeft,
    TopFrontCenter,
    TopFrontRight,
    TopBackLeft,
    TopBackCenter,
    TopBackRight,
    /// One of 32 numbered auxiliary channels, `0..32`.
    Aux(u8),
}

impl ChannelPosition {
    /// `true` for the 18 named spatial positions (excludes `None`, `Mono`,
    /// `Lfe`, and `Aux`, per the router's definition of "spatial").
    #[inline]
    pub const fn is_spatial(&self) -> bool {
        !matches!(
            self,
            ChannelPosition::None | ChannelPosition::Mono | ChannelPosition::Lfe | ChannelPosition::Aux(_)
        )
    }
}

impl fmt::Display for ChannelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelPosition::None => write!(f, "NONE"),
            ChannelPosition::Mono => write!(f, "MONO"),
            ChannelPosition::FrontLeft => write!(f, "FL"),
            ChannelPosition::FrontRight => write!(f, "FR"),
            ChannelPosition::FrontCenter => write!(f, "FC"),
            ChannelPosition::Lfe => write!(f, "LFE"),
            ChannelPosition::BackLeft => write!(f, "BL"),
            ChannelPosition::BackRight => write!(f, "BR"),
            ChannelPosition::FrontLeftCenter => write!(f, "FLC"),
            ChannelPosition::FrontRightCenter => write!(f, "FRC"),
            ChannelPosition::BackCenter => write!(f, "BC"),
            ChannelPosition::SideLeft => write!(f, "SL"),
            ChannelPosition::SideRight => write!(f, "SR"),
            ChannelPosition::TopCenter => write!(f, "TC"),
            ChannelPosition::TopFrontLeft => write!(f, "TFL"),
            ChannelPosition::TopFrontCenter => write!(f, "TFC"),
            ChannelPosition::TopFrontRight => write!(f, "TFR"),
            ChannelPosition::TopBackLeft => write!(f, "TBL"),
            ChannelPosition::TopBackCenter => write!(f, "TBC"),
            ChannelPosition::TopBackRight => write!(f, "TBR"),
            ChannelPosition::Aux(k) => write!(f, "AUX{k}"),
        }
    }
}

/// The six planes the router's spatial blend distributes power over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Left,
    Right,
    Front,
    Back,
    Bottom,
    Top,
}

const PLANE_COUNT: usize = 6;

/// Each position's fractional emission over the six planes, each row
/// summing to at most 1. `None`/`Mono`/`Lfe`/`Aux` rows are all-zero: they
/// are handled by the mono fan-in/out and identity rules instead.
fn plane_weights(pos: ChannelPosition) -> [f32; PLANE_COUNT] {
    // Index order matches `Plane`: [Left, Right, Front, Back, Bottom, Top]
    use ChannelPosition::*;
    match pos {
        FrontLeft => [0.5, 0.0, 0.5, 0.0, 0.0, 0.0],
        FrontRight => [0.0, 0.5, 0.5, 0.0, 0.0, 0.0],
        FrontCenter => [0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        BackLeft => [0.5, 0.0, 0.0, 0.5, 0.0, 0.0],
        BackRight => [0.0, 0.5, 0.0, 0.5, 0.0, 0.0],
        FrontLeftCenter => [0.25, 0.0, 0.75, 0.0, 0.0, 0.0],
        FrontRightCenter => [0.0, 0.25, 0.75, 0.0, 0.0, 0.0],
        BackCenter => [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        SideLeft => [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        SideRight => [0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        TopCenter => [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        TopFrontLeft => [0.25, 0.0, 0.25, 0.0, 0.0, 0.5],
        TopFrontCenter => [0.0, 0.0, 0.5, 0.0, 0.0, 0.5],
        TopFrontRight => [0.0, 0.25, 0.25, 0.0, 0.0, 0.5],
        TopBackLeft => [0.25, 0.0, 0.0, 0.25, 0.0, 0.5],
        TopBackCenter => [0.0, 0.0, 0.0, 0.5, 0.0, 0.5],
        TopBackRight => [0.0, 0.25, 0.0, 0.25, 0.0, 0.5],
        None | Mono | Lfe | Aux(_) => [0.0; PLANE_COUNT],
    }
}

/// The planar dot product used by the router's spatial-blend rule: the
/// shared fraction of power between two positions' plane emissions.
pub(crate) fn planar_contribution(a: ChannelPosition, b: ChannelPosition) -> f32 {
    let wa = plane_weights(a);
    let wb = plane_weights(b);
    wa.iter().zip(wb.iter()).map(|(x, y)| x * y).sum()
}

/// A fixed-length sequence of up to [`MAX_CHANNELS`] channel positions.
#[derive(Clone)]
pub struct ChannelMap {
    positions: StackVec<ChannelPosition, MAX_CHANNELS>,
}

impl ChannelMap {
    /// Builds a channel map from an explicit position list.
    ///
    /// Valid iff `positions` is non-empty, at most [`MAX_CHANNELS`] long, has
    /// no duplicate position (other than repeated `None` slots, which are not
    /// a semantically meaningful position), and does not mix `Mono` with any
    /// other position when there is more than one channel.
    pub fn new(positions: &[ChannelPosition]) -> Result<Self> {
        if positions.is_empty() {
            return Err(DspError::invalid_argument("channel map must have at least one channel"));
        }
        if positions.len() > MAX_CHANNELS {
            return Err(DspError::invalid_argument(format!(
                "channel map has {} channels, exceeds MAX_CHANNELS={MAX_CHANNELS}",
                positions.len()
            )));
        }
        if positions.len() > 1 && positions.contains(&ChannelPosition::Mono) {
            return Err(DspError::invalid_argument("MONO cannot appear alongside other channels"));
        }
        let mut seen_named = StackVec::<ChannelPosition, MAX_CHANNELS>::new();
        for &p in positions {
            if p != ChannelPosition::None && seen_named.as_slice().contains(&p) {
                return Err(DspError::invalid_argument(format!("duplicate channel position {p}")));
            }
            if p != ChannelPosition::None {
                let _ = seen_named.push(p);
            }
        }
        let mut stack = StackVec::new();
        for &p in positions {
            // Length already checked above.
            stack.push(p).ok().expect("length bounded by MAX_CHANNELS check above");
        }
        Ok(Self { positions: stack })
    }

    /// Number of channels described by this map.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn positions(&self) -> &[ChannelPosition] {
        self.positions.as_slice()
    }

    /// `true` iff every position is `None` — treated as a passthrough of
    /// physical channel order.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.positions.as_slice().iter().all(|&p| p == ChannelPosition::None)
    }

    /// Index of the channel carrying `pos`, if present.
    pub fn index_of(&self, pos: ChannelPosition) -> Option<usize> {
        self.positions.as_slice().iter().position(|&p| p == pos)
    }
}

impl fmt::Debug for ChannelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChannelMap").field(&self.positions.as_slice()).finish()
    }
}

impl fmt::Display for ChannelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for p in self.positions.as_slice() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{p}")?;
            first = false;
        }
        Ok(())
    }
}

/// A standard channel-map convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Microsoft,
    Alsa,
    Flac,
}

/// Registry of the standard channel maps for 1..=8 channels (spec.md §6's
/// table); beyond 8 channels the remaining slots are `Aux(0)..Aux(n-9)`.
pub struct StandardChannelMaps;

impl StandardChannelMaps {
    /// Returns the standard map for `convention` at `channel_count`.
    pub fn for_channel_count(convention: Convention, channel_count: usize) -> Result<ChannelMap> {
        use ChannelPosition::*;

        if channel_count == 0 || channel_count > MAX_CHANNELS {
            return Err(DspError::invalid_argument(format!(
                "channel_count {channel_count} out of range 1..={MAX_CHANNELS}"
            )));
        }

        let mut base: Vec<ChannelPosition> = match (convention, channel_count) {
            (_, 1) => vec![Mono],
            (Convention::Microsoft, 2) => vec![FrontLeft, FrontRight],
            (Convention::Microsoft, 3) => vec![FrontLeft, FrontRight, FrontCenter],
            (Convention::Microsoft, 4) => vec![FrontLeft, FrontRight, FrontCenter, BackCenter],
            (Convention::Microsoft, 5) => vec![FrontLeft, FrontRight, FrontCenter, BackLeft, BackRight],
            (Convention::Microsoft, 6) => {
                vec![FrontLeft, FrontRight, FrontCenter, Lfe, SideLeft, SideRight]
            }
            (Convention::Microsoft, 7) => {
                vec![FrontLeft, FrontRight, FrontCenter, Lfe, BackCenter, SideLeft, SideRight]
            }
            (Convention::Microsoft, 8) => {
                vec![FrontLeft, FrontRight, FrontCenter, Lfe, BackLeft, BackRight, SideLeft, SideRight]
            }
            (Convention::Alsa, 2) => vec![FrontLeft, FrontRight],
            (Convention::Alsa, 3) => vec![FrontLeft, FrontRight, FrontCenter],
            (Convention::Alsa, 4) => vec![FrontLeft, FrontRight, BackLeft, BackRight],
            (Convention::Alsa, 5) => vec![FrontLeft, FrontRight, BackLeft, BackRight, FrontCenter],
            (Convention::Alsa, 6) => vec![FrontLeft, FrontRight, BackLeft, BackRight, FrontCenter, Lfe],
            (Convention::Alsa, 7) => {
                vec![FrontLeft, FrontRight, BackLeft, BackRight, FrontCenter, Lfe, BackCenter]
            }
            (Convention::Alsa, 8) => {
                vec![FrontLeft, FrontRight, BackLeft, BackRight, FrontCenter, Lfe, SideLeft, SideRight]
            }
            (Convention::Flac, 2) => vec![FrontLeft, FrontRight],
            (Convention::Flac, 3) => vec![FrontLeft, FrontRight, FrontCenter],
            (Convention::Flac, 4) => vec![FrontLeft, FrontRight, BackLeft, BackRight],
            (Convention::Flac, 5) => vec![FrontLeft, FrontRight, FrontCenter, BackLeft, BackRight],
            (Convention::Flac, 6) => {
                vec![FrontLeft, FrontRight, FrontCenter, Lfe, BackLeft, BackRight]
            }
            (Convention::Flac, 7) => {
                vec![FrontLeft, FrontRight, FrontCenter, Lfe, BackCenter, SideLeft, SideRight]
            }
            (Convention::Flac, 8) => {
                vec![FrontLeft, FrontRight, FrontCenter, Lfe, BackLeft, BackRight, SideLeft, SideRight]
            }
            (_, n) => {
                // Beyond the table's reach for this convention/count: fall
                // back to the Microsoft 8-channel base, extended with Aux.
                Self::for_channel_count(Convention::Microsoft, 8.min(n))?.positions().to_vec()
            }
        };

        for k in base.len()..channel_count {
            base.push(Aux((k - 8).min(u8::MAX as usize) as u8));
        }
        base.truncate(channel_count);

        ChannelMap::new(&base)
    }
}
