// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera application

use crate::backends::camera::BackendError;
use crate::imaging::FilterError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture device or session errors
    Camera(BackendError),
    /// Transform or rendering errors
    Filter(FilterError),
    /// Still capture and save errors
    Photo(PhotoError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Still capture and save errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    /// The still request failed on the device
    CaptureFailed(String),
    /// The still could not be decoded, rotated or rasterized
    ProcessingFailed(String),
    /// Encoding failed
    EncodingFailed(String),
    /// Writing the photo file failed
    SaveFailed(String),
    /// The photo library rejected the import
    ImportFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Filter(e) => write!(f, "Image error: {}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            PhotoError::ProcessingFailed(msg) => write!(f, "Processing failed: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
            PhotoError::ImportFailed(msg) => write!(f, "Import failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for PhotoError {}

// Conversions from sub-errors to AppError
impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err)
    }
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError::Filter(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<BackendError> for PhotoError {
    fn from(err: BackendError) -> Self {
        PhotoError::CaptureFailed(err.to_string())
    }
}

impl From<FilterError> for PhotoError {
    fn from(err: FilterError) -> Self {
        PhotoError::ProcessingFailed(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}
