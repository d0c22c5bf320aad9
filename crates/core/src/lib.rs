//! Core library of the visualisation host.
//!
//! The crate feeds an externally supplied visualisation plugin: it converts
//! the player's PCM into 16-bit analysis windows, holds them back by the
//! plugin's sync delay, optionally runs a stereo FFT over them, and makes sure
//! only one plugin instance is alive in the process. Each module owns one
//! piece of that pipeline; [`render::RenderCoordinator`] ties them together
//! once per frame.

pub mod action;
pub mod analysis;
pub mod audio;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod plugin;
pub mod queue;
pub mod render;
pub mod slot;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{HostAction, VisAction};
pub use analysis::{FrequencyAnalyzer, Spectrum};
pub use audio::{AudioFormat, SampleBuffer, ANALYSIS_WINDOW, BUFFER_LEN, MAX_BUFFERS};
pub use config::{AppConfig, ConfigSource, SharedConfig, SurfaceConfig, VisualisationConfig};
pub use descriptor::{TrackInfo, VisualisationDescriptor, VisualisationId};
pub use error::{Result, VisError};
pub use host::{
    AudioSink, DrawingSurface, Host, HostEvents, MetadataSource, NoEvents, PlaybackSource,
};
pub use lifecycle::{
    project_viewport, AudioOutcome, LifecycleStatus, LoadOutcome, ReloadOutcome, RenderOutcome,
    VisualisationLifecycle, DEFAULT_ALBUM_COVER,
};
pub use plugin::{Rect, SurfaceMode, Viewport, VisInfo, Visualisation, VisualisationFactory};
pub use queue::DelayQueue;
pub use render::{isolate, HostMessage, MessageReply, RenderCoordinator, TickOutcome};
pub use slot::VisualisationSlot;
