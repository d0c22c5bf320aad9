//! Recording doubles for every collaborator of the lifecycle.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use crate::{
    AudioFormat, AudioSink, ConfigSource, DrawingSurface, Host, HostEvents, MetadataSource,
    PlaybackSource, Rect, Result, Spectrum, TrackInfo, VisAction, VisError, VisInfo,
    Visualisation, VisualisationFactory, VisualisationId, VisualisationLifecycle,
    VisualisationSlot, Viewport, BUFFER_LEN,
};

pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CallLog, entry: String) {
    log.lock().unwrap().push(entry);
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PluginScript {
    pub name: String,
    pub sync_delay: i32,
    pub wants_freq: bool,
    pub own_display: bool,
    pub fail_create: bool,
    pub fail_start: bool,
    pub panic_render: bool,
    pub panic_audio: bool,
    pub accept_actions: bool,
    pub log: CallLog,
}

impl PluginScript {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            accept_actions: true,
            ..Default::default()
        }
    }
}

pub(crate) struct MockPlugin {
    script: PluginScript,
}

impl MockPlugin {
    pub fn new(script: PluginScript) -> Self {
        Self { script }
    }

    fn record(&self, entry: impl AsRef<str>) {
        record(
            &self.script.log,
            format!("{} {}", self.script.name, entry.as_ref()),
        );
    }
}

impl Visualisation for MockPlugin {
    fn create(&mut self, viewport: Viewport) -> Result<()> {
        self.record(format!(
            "create {},{},{},{}",
            viewport.x, viewport.y, viewport.width, viewport.height
        ));
        if self.script.fail_create {
            return Err(VisError::plugin("no device"));
        }
        Ok(())
    }

    fn start(&mut self, format: AudioFormat, file_name: &str) -> Result<()> {
        self.record(format!(
            "start {}/{}/{} {file_name}",
            format.channels, format.sample_rate, format.bits_per_sample
        ));
        if self.script.fail_start {
            return Err(VisError::plugin("bad format"));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.record("stop");
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        self.record("render");
        if self.script.panic_render {
            panic!("render exploded");
        }
        Ok(())
    }

    fn audio_data(&mut self, samples: &[i16], spectrum: Option<&Spectrum>) -> Result<()> {
        self.record(format!("audio {} freq={}", samples[0], spectrum.is_some()));
        if self.script.panic_audio {
            panic!("audio exploded");
        }
        Ok(())
    }

    fn info(&self) -> VisInfo {
        VisInfo {
            sync_delay: self.script.sync_delay,
            wants_freq: self.script.wants_freq,
        }
    }

    fn on_action(&mut self, action: VisAction, payload: Option<&str>) -> bool {
        self.record(format!("action {action:?} {}", payload.unwrap_or("-")));
        self.script.accept_actions
    }

    fn set_track_info(&mut self, track: &TrackInfo) {
        self.record(format!("track {}", track.artist));
    }

    fn handles_own_display(&self) -> bool {
        self.script.own_display
    }
}

impl Drop for MockPlugin {
    fn drop(&mut self) {
        self.record("drop");
    }
}

#[derive(Default)]
pub(crate) struct MockFactory {
    scripts: HashMap<String, PluginScript>,
}

impl MockFactory {
    pub fn new(scripts: impl IntoIterator<Item = PluginScript>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|script| (script.name.clone(), script))
                .collect(),
        }
    }
}

impl VisualisationFactory for MockFactory {
    fn load(&self, identifier: &VisualisationId) -> Option<Box<dyn Visualisation>> {
        self.scripts
            .get(identifier.as_str())
            .map(|script| Box::new(MockPlugin::new(script.clone())) as Box<dyn Visualisation>)
    }
}

#[derive(Default)]
pub(crate) struct MockPlayback {
    playing: AtomicBool,
    file_name: Mutex<String>,
    sink: Mutex<Option<Arc<dyn AudioSink>>>,
    registrations: AtomicUsize,
}

impl MockPlayback {
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    pub fn set_file_name(&self, name: &str) {
        *self.file_name.lock().unwrap() = name.to_string();
    }

    pub fn is_registered(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn deliver_format(&self, channels: u16, sample_rate: u32, bits: u16) {
        let sink = self.sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink.on_format(channels, sample_rate, bits);
        }
    }

    pub fn deliver(&self, data: &[u8]) {
        let sink = self.sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink.on_audio(data, data.len() as isize);
        }
    }
}

impl PlaybackSource for MockPlayback {
    fn is_playing_audio(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn current_file_name(&self) -> String {
        self.file_name.lock().unwrap().clone()
    }

    fn register_audio_sink(&self, sink: Arc<dyn AudioSink>) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn unregister_audio_sink(&self) {
        *self.sink.lock().unwrap() = None;
    }
}

#[derive(Default)]
pub(crate) struct MockMetadata {
    track: Option<TrackInfo>,
    album_art: Option<String>,
}

impl MockMetadata {
    pub fn with_track(artist: &str, album_art: &str) -> Self {
        Self {
            track: Some(TrackInfo {
                artist: artist.to_string(),
                title: "Song".to_string(),
                ..Default::default()
            }),
            album_art: Some(album_art.to_string()),
        }
    }
}

impl MetadataSource for MockMetadata {
    fn current_track(&self) -> Option<TrackInfo> {
        self.track.clone()
    }

    fn album_art(&self) -> Option<String> {
        self.album_art.clone()
    }
}

pub(crate) struct MockSurface {
    width: f32,
    height: f32,
    scale: f32,
    calls: Mutex<Vec<&'static str>>,
}

impl MockSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self::scaled(width, height, 1.0)
    }

    pub fn scaled(width: f32, height: f32, scale: f32) -> Self {
        Self {
            width,
            height,
            scale,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DrawingSurface for MockSurface {
    fn scale_final_x(&self, x: f32, _y: f32) -> f32 {
        x * self.scale
    }

    fn scale_final_y(&self, _x: f32, y: f32) -> f32 {
        y * self.scale
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn capture_state(&self) {
        self.record("capture");
    }

    fn apply_state(&self) {
        self.record("apply");
    }

    fn set_viewport(&self, _rect: Rect) {
        self.record("set_viewport");
    }

    fn restore_viewport(&self) {
        self.record("restore_viewport");
    }
}

#[derive(Default)]
pub(crate) struct MockConfig {
    selected: Mutex<String>,
    karaoke: AtomicBool,
}

impl MockConfig {
    pub fn new(selected: &str) -> Self {
        let config = Self::default();
        config.select(selected);
        config
    }

    pub fn select(&self, selected: &str) {
        *self.selected.lock().unwrap() = selected.to_string();
    }

    pub fn set_karaoke(&self, enabled: bool) {
        self.karaoke.store(enabled, Ordering::SeqCst);
    }
}

impl ConfigSource for MockConfig {
    fn selected_visualisation(&self) -> VisualisationId {
        VisualisationId::new(self.selected.lock().unwrap().clone())
    }

    fn karaoke_enabled(&self) -> bool {
        self.karaoke.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct RecordingEvents {
    events: Mutex<Vec<String>>,
    slow_unloading: AtomicBool,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    /// Makes every unloading notification linger, widening race windows.
    pub fn set_slow_unloading(&self) {
        self.slow_unloading.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl HostEvents for RecordingEvents {
    fn visualisation_unloading(&self) {
        if self.slow_unloading.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        self.record("unloading".to_string());
    }

    fn visualisation_loaded(&self, loaded: bool) {
        self.record(format!("loaded {loaded}"));
    }

    fn activate_now_playing(&self) {
        self.record("now playing".to_string());
    }

    fn karaoke_background(&self, transparent: bool) {
        self.record(format!("karaoke transparent={transparent}"));
    }
}

/// A host wired entirely from doubles, sharing one plugin call log.
pub(crate) struct Fixture {
    pub log: CallLog,
    pub playback: Arc<MockPlayback>,
    pub surface: Arc<MockSurface>,
    pub config: Arc<MockConfig>,
    pub events: Arc<RecordingEvents>,
    pub slot: VisualisationSlot,
    factory: Arc<MockFactory>,
    metadata: Arc<MockMetadata>,
}

impl Fixture {
    /// Registers `Spectrum.vis` (delay 3, wants spectra), `Scope.vis`
    /// (delay 0, own display), `Broken.vis` (create fails) and
    /// `Crashy.vis` (panics in render and audio).
    pub fn new() -> Self {
        Self::with_scripts(|log| {
            vec![
                PluginScript {
                    sync_delay: 3,
                    wants_freq: true,
                    ..script("Spectrum.vis", log)
                },
                PluginScript {
                    own_display: true,
                    ..script("Scope.vis", log)
                },
                PluginScript {
                    fail_create: true,
                    ..script("Broken.vis", log)
                },
                PluginScript {
                    panic_render: true,
                    panic_audio: true,
                    ..script("Crashy.vis", log)
                },
            ]
        })
    }

    pub fn with_scripts(scripts: impl FnOnce(&CallLog) -> Vec<PluginScript>) -> Self {
        let log = CallLog::default();
        let playback = Arc::new(MockPlayback::default());
        playback.set_file_name("/music/album/song.flac");

        Self {
            factory: Arc::new(MockFactory::new(scripts(&log))),
            log,
            playback,
            surface: Arc::new(MockSurface::new(1280.0, 720.0)),
            config: Arc::new(MockConfig::new("Spectrum.vis")),
            events: Arc::new(RecordingEvents::default()),
            slot: VisualisationSlot::new(),
            metadata: Arc::new(MockMetadata::with_track("Artist", "cover.png")),
        }
    }

    pub fn with_metadata(mut self, metadata: MockMetadata) -> Self {
        self.metadata = Arc::new(metadata);
        self
    }

    pub fn with_surface(mut self, surface: MockSurface) -> Self {
        self.surface = Arc::new(surface);
        self
    }

    pub fn host(&self) -> Host {
        Host {
            factory: self.factory.clone(),
            playback: self.playback.clone(),
            metadata: self.metadata.clone(),
            surface: self.surface.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
        }
    }

    pub fn lifecycle(&self) -> VisualisationLifecycle {
        VisualisationLifecycle::new(
            self.slot.clone(),
            self.host(),
            Rect::new(10.0, 20.0, 300.0, 200.0),
        )
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == entry).count()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }
}

pub(crate) fn script(name: &str, log: &CallLog) -> PluginScript {
    PluginScript {
        log: log.clone(),
        ..PluginScript::named(name)
    }
}

/// One full window of 16-bit PCM whose every sample is `tag`.
pub(crate) fn pcm16(tag: i16) -> Vec<u8> {
    std::iter::repeat(tag.to_le_bytes())
        .take(BUFFER_LEN)
        .flatten()
        .collect()
}
