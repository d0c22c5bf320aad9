//! Load, start, feed and tear down the one plugin instance of a control.
//!
//! State moves `Unloaded -> Active(uninitialized) -> Active(initialized) ->
//! Unloaded`. A mutex per lifecycle covers the plugin handle and the audio
//! pipeline, so audio delivery blocks while a plugin is created or stopped.
//! A second mutex serializes whole load, free and reload sequences, including
//! the host notifications and sink registration around them; audio callbacks
//! never take it. The process-wide [`VisualisationSlot`] decides which
//! lifecycle may hold a plugin at all.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tracing::{debug, error, info, warn};

use crate::{
    render::isolate, AudioFormat, AudioSink, DelayQueue, DrawingSurface, FrequencyAnalyzer,
    Host, MetadataSource, Rect, Result, Spectrum, SurfaceMode, VisAction, VisError, VisInfo,
    Visualisation, VisualisationDescriptor, VisualisationId, VisualisationSlot, Viewport,
};

/// Album-art reference the host reports when a track has no cover.
pub const DEFAULT_ALBUM_COVER: &str = "defaultAlbumCover.png";

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    Unloaded,
    /// A plugin is loaded; `initialized` once the audio format has started it.
    Active { initialized: bool },
}

impl LifecycleStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn is_initialized(self) -> bool {
        matches!(self, Self::Active { initialized: true })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Another lifecycle in the process holds the slot.
    SlotOccupied,
    /// The selection is "None".
    NoVisualisation,
    FactoryFailed,
    CreateFailed,
}

impl LoadOutcome {
    pub fn is_loaded(self) -> bool {
        self == Self::Loaded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded(LoadOutcome),
    /// Freed so the host's now-playing screen can take over.
    HandedOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOutcome {
    /// Not initialized, or a malformed delivery.
    Dropped,
    /// Held back in the delay window.
    Buffered,
    Delivered,
    /// The plugin failed while receiving audio.
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    NotReady,
    Rendered,
    Faulted,
}

struct ActivePlugin {
    plugin: Box<dyn Visualisation>,
    surface_mode: SurfaceMode,
    info: VisInfo,
    format: Option<AudioFormat>,
    initialized: bool,
}

enum State {
    Unloaded,
    Active(ActivePlugin),
}

struct Inner {
    state: State,
    descriptor: Option<VisualisationDescriptor>,
    queue: DelayQueue,
    analyzer: FrequencyAnalyzer,
    spectrum: Spectrum,
}

struct Shared {
    inner: Mutex<Inner>,
    transition: Mutex<()>,
    slot: VisualisationSlot,
    host: Host,
    bounds: Rect,
}

/// Owns the plugin instance of one visualisation control.
///
/// Cloning yields another handle to the same lifecycle. Dropping the last
/// handle frees a loaded plugin on whichever thread let go of it. While audio
/// is flowing that can be the player's callback thread, so a
/// [`PlaybackSource`](crate::PlaybackSource) must accept
/// `unregister_audio_sink` from inside its own callback.
#[derive(Clone)]
pub struct VisualisationLifecycle {
    shared: Arc<Shared>,
}

impl VisualisationLifecycle {
    /// `bounds` is the control's logical rectangle; `slot` must be the one
    /// shared by every control in the process.
    pub fn new(slot: VisualisationSlot, host: Host, bounds: Rect) -> Self {
        let analyzer = FrequencyAnalyzer::new();
        let spectrum = Spectrum::new(analyzer.bins());
        let inner = Inner {
            state: State::Unloaded,
            descriptor: None,
            queue: DelayQueue::default(),
            analyzer,
            spectrum,
        };

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                transition: Mutex::new(()),
                slot,
                host,
                bounds,
            }),
        }
    }

    pub fn host(&self) -> &Host {
        &self.shared.host
    }

    pub fn bounds(&self) -> Rect {
        self.shared.bounds
    }

    pub fn status(&self) -> Result<LifecycleStatus> {
        let inner = self.lock()?;
        Ok(match &inner.state {
            State::Unloaded => LifecycleStatus::Unloaded,
            State::Active(active) => LifecycleStatus::Active {
                initialized: active.initialized,
            },
        })
    }

    pub fn is_active(&self) -> Result<bool> {
        Ok(self.status()?.is_active())
    }

    /// Descriptor of the loaded plugin, `None` while unloaded.
    pub fn descriptor(&self) -> Result<Option<VisualisationDescriptor>> {
        Ok(self.lock()?.descriptor.clone())
    }

    pub fn active_identifier(&self) -> Result<Option<VisualisationId>> {
        Ok(self.lock()?.descriptor.as_ref().map(|d| d.identifier.clone()))
    }

    pub fn delay_depth(&self) -> Result<usize> {
        Ok(self.lock()?.queue.depth())
    }

    pub fn queued_buffers(&self) -> Result<usize> {
        Ok(self.lock()?.queue.len())
    }

    pub fn spectrum(&self) -> Result<Spectrum> {
        Ok(self.lock()?.spectrum.clone())
    }

    /// Loads the visualisation `descriptor` selects, freeing any current one
    /// first. Every soft failure leaves the lifecycle unloaded.
    pub fn load(&self, descriptor: VisualisationDescriptor) -> Result<LoadOutcome> {
        let _transition = self.begin_transition()?;
        self.load_serialized(descriptor)
    }

    fn load_serialized(&self, descriptor: VisualisationDescriptor) -> Result<LoadOutcome> {
        if self.is_active()? {
            self.free_serialized()?;
        }

        let outcome = {
            let mut inner = self.lock()?;
            if !self.shared.slot.try_acquire() {
                warn!(
                    visualisation = %descriptor.identifier,
                    "another visualisation is active, not loading"
                );
                return Ok(LoadOutcome::SlotOccupied);
            }
            self.load_locked(&mut inner, descriptor)
        };

        if outcome.is_loaded() {
            self.shared
                .host
                .playback
                .register_audio_sink(Arc::new(LifecycleSink(Arc::downgrade(&self.shared))));
        }
        if outcome != LoadOutcome::NoVisualisation {
            self.shared.host.events.visualisation_loaded(outcome.is_loaded());
        }
        Ok(outcome)
    }

    fn load_locked(&self, inner: &mut Inner, descriptor: VisualisationDescriptor) -> LoadOutcome {
        let host = &self.shared.host;
        let identifier = descriptor.identifier.clone();

        if descriptor.karaoke_enabled {
            host.events.karaoke_background(!identifier.is_none());
        }

        let outcome = if identifier.is_none() {
            LoadOutcome::NoVisualisation
        } else {
            match isolate("load", || Ok(host.factory.load(&identifier))).flatten() {
                None => {
                    warn!(visualisation = %identifier, "visualisation failed to load");
                    LoadOutcome::FactoryFailed
                }
                Some(plugin) => match self.create(plugin) {
                    None => LoadOutcome::CreateFailed,
                    Some(active) => {
                        inner.queue.set_depth(i64::from(active.info.sync_delay) + 1);
                        inner.spectrum.clear();
                        info!(
                            visualisation = %identifier,
                            depth = inner.queue.depth(),
                            wants_freq = active.info.wants_freq,
                            "visualisation loaded"
                        );
                        inner.state = State::Active(active);
                        inner.descriptor = Some(descriptor);
                        return LoadOutcome::Loaded;
                    }
                },
            }
        };

        inner.state = State::Unloaded;
        self.shared.slot.release();
        outcome
    }

    fn create(&self, mut plugin: Box<dyn Visualisation>) -> Option<ActivePlugin> {
        let surface = self.shared.host.surface.as_ref();
        let surface_mode = SurfaceMode::of(plugin.as_ref());
        let viewport = project_viewport(self.shared.bounds, surface);
        debug!(?viewport, ?surface_mode, "creating visualisation");

        surface_mode.preserving_state(surface, || {
            isolate("create", || plugin.create(viewport))
        })?;
        let info = isolate("info", || Ok(plugin.info()))?;

        Some(ActivePlugin {
            plugin,
            surface_mode,
            info,
            format: None,
            initialized: false,
        })
    }

    /// Stops and destroys the plugin and releases the slot. Calling it while
    /// unloaded does nothing and returns `false`.
    pub fn free(&self) -> Result<bool> {
        let _transition = self.begin_transition()?;
        self.free_serialized()
    }

    fn free_serialized(&self) -> Result<bool> {
        if !self.is_active()? {
            return Ok(false);
        }

        self.shared.host.events.visualisation_unloading();
        self.shared.host.playback.unregister_audio_sink();

        let mut inner = self.lock()?;
        debug!("freeing visualisation");
        Ok(teardown(
            &mut inner,
            &self.shared.slot,
            self.shared.host.surface.as_ref(),
        ))
    }

    /// Replaces the running visualisation with the one `descriptor` selects.
    pub fn reload(&self, descriptor: VisualisationDescriptor) -> Result<ReloadOutcome> {
        let _transition = self.begin_transition()?;
        if descriptor.identifier.is_now_playing() {
            self.free_serialized()?;
            self.shared.host.events.activate_now_playing();
            return Ok(ReloadOutcome::HandedOff);
        }

        info!(visualisation = %descriptor.identifier, "visualisation changed, reloading");
        self.free_serialized()?;
        Ok(ReloadOutcome::Reloaded(self.load_serialized(descriptor)?))
    }

    /// Starts the plugin with the stream format. The first successful start
    /// after a load also pushes track tags and album art.
    pub fn on_format_notified(
        &self,
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
    ) -> Result<bool> {
        let file_name = self.file_name_hint();
        let mut guard = self.lock()?;
        let Inner {
            state, descriptor, ..
        } = &mut *guard;
        let State::Active(active) = state else {
            return Ok(false);
        };

        let format = AudioFormat::new(channels, sample_rate, bits_per_sample);
        debug!(?format, %file_name, "starting visualisation");
        if isolate("start", || active.plugin.start(format, &file_name)).is_none() {
            return Ok(false);
        }

        active.format = Some(format);
        if let Some(descriptor) = descriptor.as_mut() {
            descriptor.format = Some(format);
        }
        if !active.initialized {
            push_track_info(active, descriptor.as_mut(), self.shared.host.metadata.as_ref());
        }
        active.initialized = true;
        Ok(true)
    }

    /// Converts, delays and forwards one delivery of raw PCM.
    pub fn on_audio_delivered(&self, data: &[u8], length: isize) -> Result<AudioOutcome> {
        let mut guard = self.lock()?;
        let Inner {
            state,
            queue,
            analyzer,
            spectrum,
            ..
        } = &mut *guard;
        let State::Active(active) = state else {
            return Ok(AudioOutcome::Dropped);
        };
        if !active.initialized || length < 0 {
            return Ok(AudioOutcome::Dropped);
        }

        let bits = active.format.map_or(16, |format| format.bits_per_sample);
        let mut buffer = queue.take_spare();
        buffer.convert(data, length, bits);
        let Some(ready) = queue.push(buffer) else {
            return Ok(AudioOutcome::Buffered);
        };

        let freq = if active.info.wants_freq {
            match analyzer.perform_stereo(ready.samples(), spectrum) {
                Ok(()) => Some(&*spectrum),
                Err(err) => {
                    warn!(%err, "frequency analysis failed");
                    None
                }
            }
        } else {
            None
        };

        let delivered = isolate("audio_data", || active.plugin.audio_data(ready.samples(), freq));
        queue.recycle(ready);
        Ok(match delivered {
            Some(()) => AudioOutcome::Delivered,
            None => AudioOutcome::Faulted,
        })
    }

    /// Renders one frame of an initialized plugin. Host-managed plugins are
    /// scoped to the control's viewport with render state preserved.
    pub fn render(&self) -> Result<RenderOutcome> {
        let mut inner = self.lock()?;
        let State::Active(active) = &mut inner.state else {
            return Ok(RenderOutcome::NotReady);
        };
        if !active.initialized {
            return Ok(RenderOutcome::NotReady);
        }

        let surface = self.shared.host.surface.as_ref();
        let mode = active.surface_mode;
        if mode == SurfaceMode::HostManaged {
            surface.set_viewport(self.shared.bounds);
        }
        let rendered =
            mode.preserving_state(surface, || isolate("render", || active.plugin.render()));
        if mode == SurfaceMode::HostManaged {
            surface.restore_viewport();
        }

        Ok(match rendered {
            Some(()) => RenderOutcome::Rendered,
            None => RenderOutcome::Faulted,
        })
    }

    /// Forwards an action to the plugin; `false` when nothing is loaded.
    pub fn on_action(&self, action: VisAction, payload: Option<&str>) -> Result<bool> {
        let mut inner = self.lock()?;
        let State::Active(active) = &mut inner.state else {
            return Ok(false);
        };
        Ok(isolate("on_action", || Ok(active.plugin.on_action(action, payload))).unwrap_or(false))
    }

    /// Pushes the current track tags and album art to a loaded plugin.
    pub fn update_album_art(&self) -> Result<bool> {
        let mut guard = self.lock()?;
        let Inner {
            state, descriptor, ..
        } = &mut *guard;
        let State::Active(active) = state else {
            return Ok(false);
        };
        Ok(push_track_info(
            active,
            descriptor.as_mut(),
            self.shared.host.metadata.as_ref(),
        ))
    }

    fn file_name_hint(&self) -> String {
        let current = self.shared.host.playback.current_file_name();
        Path::new(&current)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(current)
    }

    /// Held for a whole load, free or reload. Host callbacks made while it is
    /// held must not load or free this lifecycle again.
    fn begin_transition(&self) -> Result<MutexGuard<'_, ()>> {
        self.shared
            .transition
            .lock()
            .map_err(|_| VisError::Poisoned("visualisation transition"))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.shared
            .inner
            .lock()
            .map_err(|_| VisError::Poisoned("visualisation state"))
    }
}

impl AudioSink for VisualisationLifecycle {
    fn on_format(&self, channels: u16, sample_rate: u32, bits_per_sample: u16) {
        if let Err(err) = self.on_format_notified(channels, sample_rate, bits_per_sample) {
            error!(%err, "dropping format notification");
        }
    }

    fn on_audio(&self, data: &[u8], length: isize) {
        if let Err(err) = self.on_audio_delivered(data, length) {
            error!(%err, "dropping audio delivery");
        }
    }
}

impl std::fmt::Debug for VisualisationLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualisationLifecycle")
            .field("bounds", &self.shared.bounds)
            .field("status", &self.status().ok())
            .finish()
    }
}

/// Registered with the playback source in place of the lifecycle itself so
/// the player never keeps a freed control alive.
struct LifecycleSink(Weak<Shared>);

impl LifecycleSink {
    fn lifecycle(&self) -> Option<VisualisationLifecycle> {
        self.0
            .upgrade()
            .map(|shared| VisualisationLifecycle { shared })
    }
}

impl AudioSink for LifecycleSink {
    fn on_format(&self, channels: u16, sample_rate: u32, bits_per_sample: u16) {
        if let Some(lifecycle) = self.lifecycle() {
            lifecycle.on_format(channels, sample_rate, bits_per_sample);
        }
    }

    fn on_audio(&self, data: &[u8], length: isize) {
        if let Some(lifecycle) = self.lifecycle() {
            lifecycle.on_audio(data, length);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let Self {
            inner, slot, host, ..
        } = self;
        let inner = inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if matches!(inner.state, State::Active(_)) {
            host.events.visualisation_unloading();
            host.playback.unregister_audio_sink();
            teardown(inner, slot, host.surface.as_ref());
        }
    }
}

fn teardown(inner: &mut Inner, slot: &VisualisationSlot, surface: &dyn DrawingSurface) -> bool {
    let State::Active(mut active) = std::mem::replace(&mut inner.state, State::Unloaded) else {
        return false;
    };

    let mode = active.surface_mode;
    mode.preserving_state(surface, || isolate("stop", || active.plugin.stop()));
    drop(active);

    slot.release();
    inner.queue.reset();
    inner.spectrum.clear();
    inner.descriptor = None;
    debug!("visualisation freed");
    true
}

fn push_track_info(
    active: &mut ActivePlugin,
    descriptor: Option<&mut VisualisationDescriptor>,
    metadata: &dyn MetadataSource,
) -> bool {
    let track = metadata.current_track();
    if let Some(track) = &track {
        isolate("set_track_info", || {
            active.plugin.set_track_info(track);
            Ok(())
        });
    }

    let album_art = metadata
        .album_art()
        .filter(|art| art != DEFAULT_ALBUM_COVER)
        .unwrap_or_default();
    debug!(%album_art, "updating visualisation album art");
    let accepted = isolate("on_action", || {
        Ok(active
            .plugin
            .on_action(VisAction::UpdateAlbumArt, Some(&album_art)))
    })
    .unwrap_or(false);

    if let Some(descriptor) = descriptor {
        descriptor.track = track;
        descriptor.album_art = (!album_art.is_empty()).then_some(album_art);
    }
    accepted
}

/// Projects the control's logical rectangle onto the surface, clamped so the
/// origin is never negative and the extent never leaves the surface.
pub fn project_viewport(bounds: Rect, surface: &dyn DrawingSurface) -> Viewport {
    let right = bounds.x + bounds.width;
    let bottom = bounds.y + bounds.height;

    let mut x = surface.scale_final_x(bounds.x, bounds.y);
    let mut y = surface.scale_final_y(bounds.x, bounds.y);
    let mut width = surface.scale_final_x(right, bottom) - x;
    let mut height = surface.scale_final_y(right, bottom) - y;

    x = x.max(0.0);
    y = y.max(0.0);
    if x + width > surface.width() {
        width = surface.width() - x;
    }
    if y + height > surface.height() {
        height = surface.height() - y;
    }

    Viewport {
        x: (x + 0.5) as i32,
        y: (y + 0.5) as i32,
        width: (width.max(0.0) + 0.5) as i32,
        height: (height.max(0.0) + 0.5) as i32,
    }
}
