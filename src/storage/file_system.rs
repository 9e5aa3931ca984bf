// SPDX-License-Identifier: GPL-3.0-only

//! File system access for the photo file

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The file operations the persistence gateway needs
pub trait PhotoFileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Write `data` so that readers see either the old file or the complete new one
    fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// The local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = uuid::Uuid::new_v4().simple().to_string();
        path.with_file_name(format!(".{}.{}.tmp", name, &id[..8]))
    }
}

impl PhotoFileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp = Self::temp_path(path);
        if let Err(e) = fs::write(&temp, data).and_then(|_| fs::rename(&temp, path)) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        debug!(path = %path.display(), size = data.len(), "File written");
        Ok(())
    }
}
