use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    gesture::GestureSettings,
    interaction::Mode,
    mapping::{GridProjector, Viewport},
    persistence::WORLD_STORAGE_KEY,
    sampler::{Color, DEFAULT_HISTORY_CAPACITY},
    tracking::ReducerOptions,
    Result, SculptError,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gesture: GestureSettings,
    pub interaction: InteractionConfig,
    pub sampling: SamplingConfig,
    pub tracking: TrackingConfig,
    pub grid: GridConfig,
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    /// Reads a JSON config file. Missing sections take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let config: AppConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let gesture = &self.gesture;
        if !(gesture.pinch_threshold > 0.0) || !(gesture.grab_threshold > 0.0) {
            return Err(SculptError::InvalidInput("gesture thresholds must be positive"));
        }
        if !(0.0..=1.0).contains(&gesture.min_confidence) {
            return Err(SculptError::InvalidInput("min_confidence must lie in [0, 1]"));
        }
        if !(self.tracking.cursor_smoothing > 0.0 && self.tracking.cursor_smoothing <= 1.0) {
            return Err(SculptError::InvalidInput("cursor_smoothing must lie in (0, 1]"));
        }
        if self.grid.columns == 0 || self.grid.rows == 0 {
            return Err(SculptError::InvalidInput("grid must have at least one cell"));
        }
        if self.sampling.history_capacity == 0 {
            return Err(SculptError::InvalidInput("sampling history needs capacity"));
        }
        Ok(())
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub cooldown_ms: u64,
    pub initial_mode: Mode,
    pub initial_color: Color,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 150,
            initial_mode: Mode::Build,
            initial_color: Color::rgb(0x06, 0xb6, 0xd4),
        }
    }
}

impl InteractionConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Color sampler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Whether sampling starts enabled.
    pub enabled: bool,
    pub history_capacity: usize,
    /// Window radius while grabbing an object.
    pub object_radius_px: u32,
    /// Window radius for every other gesture.
    pub point_radius_px: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            object_radius_px: 30,
            point_radius_px: 8,
        }
    }
}

/// Reducer and projection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub cursor_smoothing: f32,
    pub video_width: u32,
    pub video_height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            cursor_smoothing: 0.6,
            video_width: 640,
            video_height: 480,
            screen_width: 1280,
            screen_height: 720,
        }
    }
}

impl TrackingConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            self.video_width as f32,
            self.video_height as f32,
            self.screen_width as f32,
            self.screen_height as f32,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub columns: u32,
    pub rows: u32,
    pub layer: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        let projector = GridProjector::default();
        Self {
            columns: projector.columns,
            rows: projector.rows,
            layer: projector.layer,
        }
    }
}

impl GridConfig {
    pub fn projector(&self) -> GridProjector {
        GridProjector {
            columns: self.columns,
            rows: self.rows,
            layer: self.layer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub snapshot_path: PathBuf,
    pub world_id: String,
    pub save_debounce_ms: u64,
    /// Undo depth; unbounded when absent.
    pub history_capacity: Option<usize>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(format!("{WORLD_STORAGE_KEY}.json")),
            world_id: "default".to_string(),
            save_debounce_ms: 1000,
            history_capacity: None,
        }
    }
}

impl PersistenceConfig {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

impl From<&AppConfig> for ReducerOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            cursor_smoothing: config.tracking.cursor_smoothing,
            object_radius_px: config.sampling.object_radius_px,
            point_radius_px: config.sampling.point_radius_px,
        }
    }
}
