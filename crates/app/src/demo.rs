//! Built-in visualisations and a synthetic player for driving the core
//! without a media engine or a GPU.

use std::{
    f32::consts::PI,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use visbridge_core::{
    AudioFormat, AudioSink, DrawingSurface, HostEvents, MetadataSource, PlaybackSource, Rect,
    Result, Spectrum, TrackInfo, VisAction, VisInfo, Visualisation, VisualisationFactory,
    VisualisationId, Viewport, ANALYSIS_WINDOW,
};

/// Resolves `Spectrum.vis` and `Scope.vis`.
#[derive(Debug, Default)]
pub struct DemoFactory;

impl VisualisationFactory for DemoFactory {
    fn load(&self, identifier: &VisualisationId) -> Option<Box<dyn Visualisation>> {
        match identifier.as_str() {
            "Spectrum.vis" => Some(Box::new(SpectrumVis::default())),
            "Scope.vis" => Some(Box::new(ScopeVis::default())),
            _ => None,
        }
    }
}

/// Tracks the loudest bin of each channel.
#[derive(Debug, Default)]
struct SpectrumVis {
    viewport: Viewport,
    frames: u64,
    windows: u64,
    peak_bin: usize,
    preset: i32,
}

impl Visualisation for SpectrumVis {
    fn create(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport = viewport;
        tracing::info!(?viewport, "spectrum created");
        Ok(())
    }

    fn start(&mut self, format: AudioFormat, file_name: &str) -> Result<()> {
        tracing::info!(?format, file_name, "spectrum started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        tracing::info!(
            frames = self.frames,
            windows = self.windows,
            peak_bin = self.peak_bin,
            "spectrum stopped"
        );
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn audio_data(&mut self, _samples: &[i16], spectrum: Option<&Spectrum>) -> Result<()> {
        self.windows += 1;
        if let Some(spectrum) = spectrum {
            self.peak_bin = spectrum
                .left
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map_or(0, |(bin, _)| bin);
            tracing::trace!(peak_bin = self.peak_bin, "spectrum window");
        }
        Ok(())
    }

    fn info(&self) -> VisInfo {
        VisInfo {
            sync_delay: 3,
            wants_freq: true,
        }
    }

    fn on_action(&mut self, action: VisAction, payload: Option<&str>) -> bool {
        match action {
            VisAction::NextPreset => self.preset += 1,
            VisAction::PrevPreset => self.preset -= 1,
            VisAction::UpdateAlbumArt => {
                tracing::info!(album_art = payload.unwrap_or_default(), "spectrum album art");
            }
            _ => return false,
        }
        true
    }

    fn set_track_info(&mut self, track: &TrackInfo) {
        tracing::info!(artist = %track.artist, title = %track.title, "spectrum track");
    }
}

/// Oscilloscope that would draw into its own window.
#[derive(Debug, Default)]
struct ScopeVis {
    rms: f32,
    windows: u64,
}

impl Visualisation for ScopeVis {
    fn create(&mut self, viewport: Viewport) -> Result<()> {
        tracing::info!(?viewport, "scope created");
        Ok(())
    }

    fn start(&mut self, format: AudioFormat, _file_name: &str) -> Result<()> {
        tracing::info!(?format, "scope started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        tracing::info!(windows = self.windows, rms = self.rms, "scope stopped");
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        Ok(())
    }

    fn audio_data(&mut self, samples: &[i16], _spectrum: Option<&Spectrum>) -> Result<()> {
        let sum: f32 = samples
            .iter()
            .map(|&s| {
                let v = f32::from(s) / 32768.0;
                v * v
            })
            .sum();
        self.rms = (sum / samples.len().max(1) as f32).sqrt();
        self.windows += 1;
        Ok(())
    }

    fn info(&self) -> VisInfo {
        VisInfo {
            sync_delay: 0,
            wants_freq: false,
        }
    }

    fn on_action(&mut self, _action: VisAction, _payload: Option<&str>) -> bool {
        false
    }

    fn handles_own_display(&self) -> bool {
        true
    }
}

/// Player that produces a stereo sine one analysis window per pump.
pub struct SyntheticPlayback {
    format: AudioFormat,
    frequency: f32,
    playing: AtomicBool,
    format_sent: AtomicBool,
    position: AtomicU64,
    sink: Mutex<Option<Arc<dyn AudioSink>>>,
}

impl SyntheticPlayback {
    pub fn new(format: AudioFormat, frequency: f32) -> Self {
        Self {
            format,
            frequency,
            playing: AtomicBool::new(false),
            format_sent: AtomicBool::new(false),
            position: AtomicU64::new(0),
            sink: Mutex::new(None),
        }
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// Delivers the format once per registration, then one window of audio.
    pub fn pump(&self) {
        if !self.is_playing_audio() {
            return;
        }
        let sink = match self.sink.lock() {
            Ok(sink) => sink.clone(),
            Err(_) => return,
        };
        let Some(sink) = sink else {
            return;
        };

        if !self.format_sent.swap(true, Ordering::SeqCst) {
            sink.on_format(
                self.format.channels,
                self.format.sample_rate,
                self.format.bits_per_sample,
            );
        }

        let bytes = self.next_window();
        sink.on_audio(&bytes, bytes.len() as isize);
    }

    fn next_window(&self) -> Vec<u8> {
        let start = self
            .position
            .fetch_add(ANALYSIS_WINDOW as u64, Ordering::SeqCst);
        let rate = self.format.sample_rate.max(1) as f32;
        let mut bytes = Vec::new();
        for frame in 0..ANALYSIS_WINDOW as u64 {
            let t = (start + frame) as f32 / rate;
            let value = (2.0 * PI * self.frequency * t).sin() * 0.8;
            for _ in 0..2 {
                encode(value, self.format.bits_per_sample, &mut bytes);
            }
        }
        bytes
    }
}

fn encode(value: f32, bits: u16, out: &mut Vec<u8>) {
    match bits {
        8 => out.push((value * 127.0) as i8 as u8),
        16 => out.extend_from_slice(&((value * 32767.0) as i16).to_le_bytes()),
        24 => out.extend_from_slice(&((value * 8_388_607.0) as i32).to_le_bytes()[..3]),
        _ => out.extend_from_slice(&value.to_le_bytes()),
    }
}

impl PlaybackSource for SyntheticPlayback {
    fn is_playing_audio(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn current_file_name(&self) -> String {
        format!("/synthetic/sine-{}hz.wav", self.frequency)
    }

    fn register_audio_sink(&self, sink: Arc<dyn AudioSink>) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = Some(sink);
            self.format_sent.store(false, Ordering::SeqCst);
        }
    }

    fn unregister_audio_sink(&self) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = None;
        }
    }
}

/// Fixed track tags for the synthetic stream.
#[derive(Debug, Default)]
pub struct DemoMetadata;

impl MetadataSource for DemoMetadata {
    fn current_track(&self) -> Option<TrackInfo> {
        Some(TrackInfo {
            artist: "Test Tone".to_string(),
            title: "Sine".to_string(),
            ..Default::default()
        })
    }

    fn album_art(&self) -> Option<String> {
        Some(visbridge_core::DEFAULT_ALBUM_COVER.to_string())
    }
}

/// Surface with no pixels behind it; logs what the host asks of it.
#[derive(Debug)]
pub struct LogSurface {
    width: f32,
    height: f32,
}

impl LogSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl DrawingSurface for LogSurface {
    fn scale_final_x(&self, x: f32, _y: f32) -> f32 {
        x
    }

    fn scale_final_y(&self, _x: f32, y: f32) -> f32 {
        y
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn capture_state(&self) {
        tracing::trace!("capture render state");
    }

    fn apply_state(&self) {
        tracing::trace!("apply render state");
    }

    fn set_viewport(&self, rect: Rect) {
        tracing::trace!(?rect, "set viewport");
    }

    fn restore_viewport(&self) {
        tracing::trace!("restore viewport");
    }
}

/// Logs the notifications a GUI would react to.
#[derive(Debug, Default)]
pub struct LogEvents;

impl HostEvents for LogEvents {
    fn visualisation_unloading(&self) {
        tracing::info!("visualisation unloading");
    }

    fn visualisation_loaded(&self, loaded: bool) {
        tracing::info!(loaded, "visualisation load finished");
    }

    fn activate_now_playing(&self) {
        tracing::info!("switching to the now playing screen");
    }
}
