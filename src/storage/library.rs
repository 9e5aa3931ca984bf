// SPDX-License-Identifier: GPL-3.0-only

//! Photo library: authorization and import

use crate::constants::photo::LIBRARY_FILE_PREFIX;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether the application may add photos to the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet
    NotDetermined,
    /// Access is blocked and the user cannot change it
    Restricted,
    /// The user refused access
    Denied,
    Authorized,
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationStatus::NotDetermined => write!(f, "not determined"),
            AuthorizationStatus::Restricted => write!(f, "restricted"),
            AuthorizationStatus::Denied => write!(f, "denied"),
            AuthorizationStatus::Authorized => write!(f, "authorized"),
        }
    }
}

/// Completion of a library import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub completed: bool,
    pub error: Option<String>,
}

impl ImportResult {
    pub fn success() -> Self {
        Self {
            completed: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            completed: false,
            error: Some(error.into()),
        }
    }
}

/// A photo library the application can import into
pub trait PhotoLibrary: Send + Sync {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask for access; resolves to the resulting status
    fn request_authorization(&self) -> BoxFuture<'static, AuthorizationStatus>;

    /// Import a copy of the file at `path` as a new photo
    fn import_file(&self, path: &Path) -> BoxFuture<'static, ImportResult>;
}

/// Photo library backed by a directory
///
/// | Directory state          | Status          |
/// |--------------------------|-----------------|
/// | missing                  | `NotDetermined` |
/// | not writable             | `Denied`        |
/// | exists, not a directory  | `Restricted`    |
/// | writable directory       | `Authorized`    |
///
/// Requesting authorization creates a missing directory.
#[derive(Debug, Clone)]
pub struct DirectoryPhotoLibrary {
    dir: PathBuf,
}

impl DirectoryPhotoLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn status_of(dir: &Path) -> AuthorizationStatus {
        match std::fs::metadata(dir) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                AuthorizationStatus::NotDetermined
            }
            Err(_) => AuthorizationStatus::Restricted,
            Ok(meta) if !meta.is_dir() => AuthorizationStatus::Restricted,
            Ok(_) if !Self::is_writable(dir) => AuthorizationStatus::Denied,
            Ok(_) => AuthorizationStatus::Authorized,
        }
    }

    /// Whether a file can actually be created in `dir`
    ///
    /// Mode bits alone miss ACLs and privileged users.
    fn is_writable(dir: &Path) -> bool {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let probe = dir.join(format!(".access-{}", &id[..8]));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&probe)
        {
            Ok(_) => {
                if let Err(e) = std::fs::remove_file(&probe) {
                    debug!(path = %probe.display(), error = %e, "Could not remove access check file");
                }
                true
            }
            Err(_) => false,
        }
    }

    /// `IMG_<timestamp>_<id>.<ext>`
    fn library_file_name(source: &Path) -> String {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let id = uuid::Uuid::new_v4().simple().to_string();
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        format!(
            "{}_{}_{}.{}",
            LIBRARY_FILE_PREFIX,
            timestamp,
            &id[..8],
            extension
        )
    }
}

impl PhotoLibrary for DirectoryPhotoLibrary {
    fn authorization_status(&self) -> AuthorizationStatus {
        Self::status_of(&self.dir)
    }

    fn request_authorization(&self) -> BoxFuture<'static, AuthorizationStatus> {
        let dir = self.dir.clone();
        Box::pin(async move {
            let status = Self::status_of(&dir);
            if status != AuthorizationStatus::NotDetermined {
                return status;
            }

            match tokio::fs::create_dir_all(&dir).await {
                Ok(()) => {
                    debug!(dir = %dir.display(), "Photo library created");
                    Self::status_of(&dir)
                }
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Could not create photo library");
                    AuthorizationStatus::Denied
                }
            }
        })
    }

    fn import_file(&self, path: &Path) -> BoxFuture<'static, ImportResult> {
        let source = path.to_path_buf();
        let target = self.dir.join(Self::library_file_name(path));
        Box::pin(async move {
            match tokio::fs::copy(&source, &target).await {
                Ok(bytes) => {
                    debug!(target = %target.display(), bytes, "Photo imported");
                    ImportResult::success()
                }
                Err(e) => ImportResult::failure(format!(
                    "Failed to copy {} into the library: {}",
                    source.display(),
                    e
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "camera-photo-library-{}-{}",
            name,
            uuid::Uuid::new_v4().simple()
        ))
    }

    #[tokio::test]
    async fn test_missing_dir_is_created_on_request() {
        let dir = scratch("missing");
        let library = DirectoryPhotoLibrary::new(&dir);
        assert_eq!(
            library.authorization_status(),
            AuthorizationStatus::NotDetermined
        );

        assert_eq!(
            library.request_authorization().await,
            AuthorizationStatus::Authorized
        );
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_file_in_place_of_dir_is_restricted() {
        let path = scratch("file");
        std::fs::write(&path, b"x").unwrap();
        let library = DirectoryPhotoLibrary::new(&path);

        assert_eq!(
            library.authorization_status(),
            AuthorizationStatus::Restricted
        );
        assert_eq!(
            library.request_authorization().await,
            AuthorizationStatus::Restricted
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_writable_dir_is_authorized_and_left_clean() {
        let dir = scratch("writable");
        std::fs::create_dir_all(&dir).unwrap();
        let library = DirectoryPhotoLibrary::new(&dir);

        assert_eq!(
            library.authorization_status(),
            AuthorizationStatus::Authorized
        );
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_status_follows_actual_writability() {
        use std::os::unix::fs::PermissionsExt;

        let dir = scratch("read-only");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users can still write behind the mode bits
        let writable = std::fs::write(dir.join("check"), b"x").is_ok();
        let _ = std::fs::remove_file(dir.join("check"));

        let expected = if writable {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        assert_eq!(DirectoryPhotoLibrary::new(&dir).authorization_status(), expected);

        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_import_copies_with_library_name() {
        let dir = scratch("import");
        std::fs::create_dir_all(&dir).unwrap();
        let source = dir.with_extension("png");
        std::fs::write(&source, b"png bytes").unwrap();

        let library = DirectoryPhotoLibrary::new(&dir);
        let result = library.import_file(&source).await;
        assert_eq!(result, ImportResult::success());

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("IMG_"));
        assert!(names[0].ends_with(".png"));

        let _ = std::fs::remove_dir_all(dir);
        let _ = std::fs::remove_file(source);
    }

    #[tokio::test]
    async fn test_import_of_missing_file_reports_error() {
        let dir = scratch("import-missing");
        std::fs::create_dir_all(&dir).unwrap();
        let library = DirectoryPhotoLibrary::new(&dir);

        let result = library.import_file(&dir.join("nope.png")).await;
        assert!(!result.completed);
        assert!(result.error.is_some());
        let _ = std::fs::remove_dir_all(dir);
    }
}
