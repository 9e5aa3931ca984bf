// SPDX-License-Identifier: GPL-3.0-only

//! Persistence of captured stills
//!
//! - [`file_system`]: the photo file (delete, atomic write)
//! - [`library`]: photo library authorization and import
//! - [`gateway`]: the save flow tying both together

pub mod file_system;
pub mod gateway;
pub mod library;

pub use file_system::{LocalFileSystem, PhotoFileSystem};
pub use gateway::{PersistenceGateway, SaveOutcome};
pub use library::{AuthorizationStatus, DirectoryPhotoLibrary, ImportResult, PhotoLibrary};

use crate::constants::photo;
use std::path::PathBuf;

/// Default directory of the photo file (`<Documents>`)
pub fn default_photo_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
}

/// Default photo library: `<Pictures>/camera-photo`
pub fn default_library_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(photo::LIBRARY_DIR_NAME)
}
