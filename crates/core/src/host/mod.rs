//! Collaborators the visualisation core talks to but does not own.

use std::sync::Arc;

use crate::{ConfigSource, Rect, TrackInfo, VisualisationFactory};

/// Receives converted-to-be audio from the media engine.
///
/// Implementations may be called from the engine's own thread.
pub trait AudioSink: Send + Sync {
    fn on_format(&self, channels: u16, sample_rate: u32, bits_per_sample: u16);

    /// `length` is the byte count the engine claims is valid in `data`.
    fn on_audio(&self, data: &[u8], length: isize);
}

/// The player whose output is being visualised.
pub trait PlaybackSource: Send + Sync {
    fn is_playing_audio(&self) -> bool;

    fn current_file_name(&self) -> String;

    fn register_audio_sink(&self, sink: Arc<dyn AudioSink>);

    fn unregister_audio_sink(&self);
}

/// Tags and artwork of the current track.
pub trait MetadataSource: Send + Sync {
    fn current_track(&self) -> Option<TrackInfo>;

    fn album_art(&self) -> Option<String>;
}

/// Scaled drawing surface shared with the rest of the GUI.
///
/// Only used for plugins that draw into the host's surface.
pub trait DrawingSurface: Send + Sync {
    fn scale_final_x(&self, x: f32, y: f32) -> f32;

    fn scale_final_y(&self, x: f32, y: f32) -> f32;

    fn width(&self) -> f32;

    fn height(&self) -> f32;

    fn capture_state(&self);

    fn apply_state(&self);

    fn set_viewport(&self, rect: Rect);

    fn restore_viewport(&self);
}

/// Notifications the rest of the application listens for.
pub trait HostEvents: Send + Sync {
    fn visualisation_unloading(&self) {}

    fn visualisation_loaded(&self, _loaded: bool) {}

    /// The host should present its own now-playing visualisation.
    fn activate_now_playing(&self) {}

    fn karaoke_background(&self, _transparent: bool) {}
}

/// Event sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl HostEvents for NoEvents {}

/// Bundle of collaborators handed to lifecycles and coordinators.
#[derive(Clone)]
pub struct Host {
    pub factory: Arc<dyn VisualisationFactory>,
    pub playback: Arc<dyn PlaybackSource>,
    pub metadata: Arc<dyn MetadataSource>,
    pub surface: Arc<dyn DrawingSurface>,
    pub config: Arc<dyn ConfigSource>,
    pub events: Arc<dyn HostEvents>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
