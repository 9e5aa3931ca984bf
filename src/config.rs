// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CapturePreset, DeviceSelection, Framerate, PixelFormat};
use crate::constants::{photo, render};
use crate::errors::{AppError, AppResult};
use crate::storage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application configuration
///
/// Stored as JSON at `<config_dir>/camera-photo/config.json`. Missing fields
/// take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which capture device to use
    pub device: DeviceSelection,
    /// Streaming resolution preset
    pub preset: CapturePreset,
    /// Frame rate of the test pattern (frames per second)
    pub framerate: Option<u32>,
    /// Pixel format of streamed frames
    pub pixel_format: PixelFormat,
    /// Directory of the photo file (`None` = Documents)
    pub photo_dir: Option<PathBuf>,
    /// File name of the photo file
    pub photo_file_name: String,
    /// Photo library directory (`None` = `<Pictures>/camera-photo`)
    pub library_dir: Option<PathBuf>,
    /// Screen scale used to size the drawable surface
    pub display_scale: f64,
    /// Rasterize on the GPU when available
    pub use_gpu: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceSelection::default(),
            preset: CapturePreset::default(),
            framerate: None,
            pixel_format: PixelFormat::NV12,
            photo_dir: None,
            photo_file_name: photo::FILE_NAME.to_string(),
            library_dir: None,
            display_scale: render::DEFAULT_DISPLAY_SCALE,
            use_gpu: false,
        }
    }
}

impl Config {
    /// `<config_dir>/camera-photo/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(photo::LIBRARY_DIR_NAME).join("config.json"))
    }

    /// Load the configuration, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            debug!("No config directory, using default configuration");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        if !(self.display_scale.is_finite() && self.display_scale > 0.0) {
            return Err(AppError::Config(format!(
                "display_scale must be positive, got {}",
                self.display_scale
            )));
        }
        if self.photo_file_name.is_empty() {
            return Err(AppError::Config("photo_file_name is empty".to_string()));
        }
        if self.framerate == Some(0) {
            return Err(AppError::Config("framerate must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn framerate(&self) -> Option<Framerate> {
        self.framerate.map(Framerate::from_int)
    }

    /// Full path of the photo file
    pub fn photo_path(&self) -> PathBuf {
        self.photo_dir
            .clone()
            .unwrap_or_else(storage::default_photo_dir)
            .join(&self.photo_file_name)
    }

    pub fn library_dir(&self) -> PathBuf {
        self.library_dir
            .clone()
            .unwrap_or_else(storage::default_library_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{ "use_gpu": true }"#).unwrap();
        assert!(config.use_gpu);
        assert_eq!(config.pixel_format, PixelFormat::NV12);
        assert_eq!(config.photo_file_name, photo::FILE_NAME);
    }

    #[test]
    fn test_device_selection_round_trips_through_json() {
        let config = Config {
            device: DeviceSelection::ImageFile("/tmp/a.png".into()),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_scale_is_rejected() {
        let path = std::env::temp_dir().join(format!(
            "camera-photo-config-{}.json",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(&path, r#"{ "display_scale": 0.0 }"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
        let _ = std::fs::remove_file(path);
    }
}
