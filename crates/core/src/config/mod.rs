use std::{
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{Result, VisualisationId};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub visualisation: VisualisationConfig,
    pub surface: SurfaceConfig,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Settings the visualisation control polls every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualisationConfig {
    pub selected: VisualisationId,
    pub karaoke_enabled: bool,
}

impl Default for VisualisationConfig {
    fn default() -> Self {
        Self {
            selected: VisualisationId::none(),
            karaoke_enabled: false,
        }
    }
}

/// Size of the drawing surface in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Read-only view of the settings, polled once per render tick.
pub trait ConfigSource: Send + Sync {
    fn selected_visualisation(&self) -> VisualisationId;

    fn karaoke_enabled(&self) -> bool;
}

/// Cloneable, live-editable configuration shared between the settings UI and
/// the render loop.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<AppConfig>>,
}

impl SharedConfig {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn snapshot(&self) -> AppConfig {
        self.read().clone()
    }

    pub fn select(&self, identifier: impl Into<VisualisationId>) {
        self.write().visualisation.selected = identifier.into();
    }

    pub fn set_karaoke_enabled(&self, enabled: bool) {
        self.write().visualisation.karaoke_enabled = enabled;
    }

    // Writers only ever replace whole fields, so a poisoned lock holds valid data.
    fn read(&self) -> RwLockReadGuard<'_, AppConfig> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigSource for SharedConfig {
    fn selected_visualisation(&self) -> VisualisationId {
        self.read().visualisation.selected.clone()
    }

    fn karaoke_enabled(&self) -> bool {
        self.read().visualisation.karaoke_enabled
    }
}
