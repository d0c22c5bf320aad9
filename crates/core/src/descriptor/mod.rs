use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AudioFormat, ConfigSource, MetadataSource};

/// Identifier of a visualisation inside the plugin factory's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualisationId(String);

impl VisualisationId {
    /// Selection meaning "show nothing".
    pub const NONE: &'static str = "None";
    /// Selection handed over to the host's own now-playing screen.
    pub const NOW_PLAYING: &'static str = "Now Playing.vis";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn none() -> Self {
        Self::new(Self::NONE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == Self::NONE
    }

    pub fn is_now_playing(&self) -> bool {
        self.0 == Self::NOW_PLAYING
    }
}

impl Default for VisualisationId {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for VisualisationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VisualisationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Tags of the track currently playing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track_number: u32,
    pub disc_number: u32,
    pub year: u32,
    pub duration_seconds: u32,
}

/// Configuration snapshot a visualisation is loaded with.
///
/// A descriptor belongs to one load cycle; reloading replaces it wholesale.
/// The audio format is filled in once the media engine reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualisationDescriptor {
    pub identifier: VisualisationId,
    pub karaoke_enabled: bool,
    pub format: Option<AudioFormat>,
    pub track: Option<TrackInfo>,
    pub album_art: Option<String>,
}

impl VisualisationDescriptor {
    pub fn new(identifier: impl Into<VisualisationId>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    /// Captures what the host currently asks for.
    pub fn snapshot(config: &dyn ConfigSource, metadata: &dyn MetadataSource) -> Self {
        Self {
            identifier: config.selected_visualisation(),
            karaoke_enabled: config.karaoke_enabled(),
            format: None,
            track: metadata.current_track(),
            album_art: metadata.album_art(),
        }
    }

    /// True when the host now selects a different visualisation.
    pub fn differs_from(&self, selected: &VisualisationId) -> bool {
        &self.identifier != selected
    }
}

impl From<&str> for VisualisationDescriptor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
