//! Streaming PCM format conversion, channel routing, and sample-rate
//! conversion for realtime audio I/O: a pull-based, four-stage graph with a
//! passthrough fast path and stage elimination/reordering decided once at
//! construction.

pub mod channel_map;
pub mod channel_router;
pub mod config;
pub mod error;
pub mod format;
pub mod format_converter;
pub mod offline;
pub mod resample;
pub mod supervisor;

pub use channel_map::{ChannelMap, ChannelPosition, Convention, StandardChannelMaps, MAX_CHANNELS};
pub use channel_router::{ChannelRouter, ChannelRouterConfig, MixingMode};
pub use error::{DspError, Result};
pub use format::{DitherMode, SampleFormat};
pub use format_converter::{FormatConverter, FormatConverterConfig, Source};
pub use resample::{Algorithm, SampleRateConverter, SampleRateConverterConfig, SincConfig, WindowFunction};
pub use supervisor::{Dsp, DspConfig};
