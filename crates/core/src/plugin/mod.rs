//! Capability set a visualisation plugin exposes to the host.
//!
//! Loading and discovery belong to the [`VisualisationFactory`]; everything
//! behind the [`Visualisation`] trait is third-party code and is only ever
//! invoked through [`crate::render::isolate`].

use serde::{Deserialize, Serialize};

use crate::{
    AudioFormat, DrawingSurface, Result, Spectrum, TrackInfo, VisAction, VisualisationId,
};

/// Buffering requirements reported by a plugin after creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisInfo {
    /// Analysis windows of look-ahead the plugin needs. May be out of range.
    pub sync_delay: i32,
    pub wants_freq: bool,
}

/// Physical pixel rectangle the plugin draws into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Logical rectangle of the hosting control, before scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Who owns the pixels the plugin draws to, decided once at load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// The plugin draws into the host's surface; render state is saved and
    /// restored around every call.
    HostManaged,
    /// The plugin brings its own display and the host surface is left alone.
    SelfManaged,
}

impl SurfaceMode {
    pub fn of(plugin: &dyn Visualisation) -> Self {
        if plugin.handles_own_display() {
            Self::SelfManaged
        } else {
            Self::HostManaged
        }
    }

    /// Runs `f` with the surface's render state captured before and restored
    /// after, when the host owns the surface.
    pub fn preserving_state<T>(self, surface: &dyn DrawingSurface, f: impl FnOnce() -> T) -> T {
        match self {
            Self::SelfManaged => f(),
            Self::HostManaged => {
                surface.capture_state();
                let value = f();
                surface.apply_state();
                value
            }
        }
    }
}

/// One live plugin instance.
pub trait Visualisation: Send {
    fn create(&mut self, viewport: Viewport) -> Result<()>;

    fn start(&mut self, format: AudioFormat, file_name: &str) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn render(&mut self) -> Result<()>;

    /// Receives one delayed window of interleaved samples. `spectrum` is only
    /// present when [`VisInfo::wants_freq`] was set.
    fn audio_data(&mut self, samples: &[i16], spectrum: Option<&Spectrum>) -> Result<()>;

    fn info(&self) -> VisInfo;

    /// Returns whether the plugin handled the action.
    fn on_action(&mut self, action: VisAction, payload: Option<&str>) -> bool;

    fn set_track_info(&mut self, _track: &TrackInfo) {}

    fn handles_own_display(&self) -> bool {
        false
    }
}

/// Resolves identifiers to fresh plugin instances.
pub trait VisualisationFactory: Send + Sync {
    /// Returns `None` for unknown or broken visualisations.
    fn load(&self, identifier: &VisualisationId) -> Option<Box<dyn Visualisation>>;
}

impl<F> VisualisationFactory for F
where
    F: Fn(&VisualisationId) -> Option<Box<dyn Visualisation>> + Send + Sync,
{
    fn load(&self, identifier: &VisualisationId) -> Option<Box<dyn Visualisation>> {
        self(identifier)
    }
}
