// SPDX-License-Identifier: GPL-3.0-only

//! Persistence gateway: captured still → photo file → photo library
//!
//! ```text
//! save(still)
//!   ├─ no still ───────────────────────────────▶ NothingToSave
//!   ├─ status Authorized ──────────────┐
//!   └─ request authorization           │
//!        ├─ Authorized ────────────────┴─▶ remove stale file → PNG → write → import
//!        └─ Denied / NotDetermined / Restricted ─▶ NotAuthorized
//! ```
//!
//! Each call ends with exactly one info or warn event, emitted on the calling
//! task. Nothing is retried. Saves that reach the write share one file path, so
//! they run one at a time from the write until the import completes.

use super::file_system::PhotoFileSystem;
use super::library::{AuthorizationStatus, PhotoLibrary};
use crate::errors::PhotoError;
use crate::pipelines::photo::{CapturedStill, encode_png};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How a save ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// There was no captured still
    NothingToSave,
    /// The library did not grant access; nothing was written
    NotAuthorized(AuthorizationStatus),
    /// Encoding or writing the photo file failed
    WriteFailed(String),
    /// The photo file was written but the library import failed
    ImportFailed { path: PathBuf, error: String },
    /// Written and imported
    Saved(PathBuf),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

impl std::fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveOutcome::NothingToSave => write!(f, "No photo to save"),
            SaveOutcome::NotAuthorized(status) => {
                write!(f, "Photo library access {}", status)
            }
            SaveOutcome::WriteFailed(e) => write!(f, "Could not write photo: {}", e),
            SaveOutcome::ImportFailed { error, .. } => write!(f, "Import failed: {}", error),
            SaveOutcome::Saved(path) => write!(f, "Saved {}", path.display()),
        }
    }
}

/// Saves captured stills to the photo library
pub struct PersistenceGateway {
    library: Arc<dyn PhotoLibrary>,
    fs: Arc<dyn PhotoFileSystem>,
    configured_path: PathBuf,
    resolved_path: OnceLock<PathBuf>,
    write_lock: Mutex<()>,
}

impl PersistenceGateway {
    pub fn new(
        library: Arc<dyn PhotoLibrary>,
        fs: Arc<dyn PhotoFileSystem>,
        photo_path: PathBuf,
    ) -> Self {
        Self {
            library,
            fs,
            configured_path: photo_path,
            resolved_path: OnceLock::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// The photo file path
    ///
    /// A file left over from an earlier run is removed the first time the path
    /// is resolved.
    pub fn photo_path(&self) -> &Path {
        self.resolved_path.get_or_init(|| {
            let path = self.configured_path.clone();
            if self.fs.exists(&path) {
                match self.fs.remove(&path) {
                    Ok(()) => debug!(path = %path.display(), "Removed stale photo file"),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Could not remove stale photo file")
                    }
                }
            }
            path
        })
    }

    /// Save `still` to the photo library
    pub async fn save(&self, still: Option<CapturedStill>) -> SaveOutcome {
        let Some(still) = still else {
            warn!("No captured photo to save");
            return SaveOutcome::NothingToSave;
        };

        let status = match self.library.authorization_status() {
            AuthorizationStatus::Authorized => AuthorizationStatus::Authorized,
            current => {
                debug!(status = %current, "Requesting photo library authorization");
                self.library.request_authorization().await
            }
        };

        if status != AuthorizationStatus::Authorized {
            warn!(status = %status, "Photo library access not granted, photo not saved");
            return SaveOutcome::NotAuthorized(status);
        }

        let _write = self.write_lock.lock().await;
        let path = self.photo_path().to_path_buf();
        if let Err(e) = self.write_photo(&still, &path).await {
            warn!(path = %path.display(), error = %e, "Failed to write photo");
            return SaveOutcome::WriteFailed(e.to_string());
        }

        let result = self.library.import_file(&path).await;
        match (result.completed, result.error) {
            (true, None) => {
                info!(path = %path.display(), "Photo saved to library");
                SaveOutcome::Saved(path)
            }
            (_, error) => {
                let error = error.unwrap_or_else(|| "import did not complete".to_string());
                warn!(path = %path.display(), error = %error, "Photo library import failed");
                SaveOutcome::ImportFailed { path, error }
            }
        }
    }

    /// Delete any existing file, then PNG-encode and write atomically
    async fn write_photo(&self, still: &CapturedStill, path: &Path) -> Result<(), PhotoError> {
        if self.fs.exists(path) {
            self.fs.remove(path)?;
            debug!(path = %path.display(), "Removed previous photo file");
        }

        let image = Arc::clone(&still.image);
        let fs = Arc::clone(&self.fs);
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let png = encode_png(&image)?;
            fs.write_atomic(&path, &png)?;
            debug!(path = %path.display(), size = png.len(), "Photo file written");
            Ok(())
        })
        .await
        .map_err(|e| PhotoError::SaveFailed(format!("Write task panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::library::ImportResult;
    use futures::future::BoxFuture;
    use image::RgbaImage;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    #[derive(Default)]
    struct MemoryFs {
        files: Mutex<HashMap<PathBuf, Vec<u8>>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl PhotoFileSystem for MemoryFs {
        fn exists(&self, path: &Path) -> bool {
            self.calls.lock().unwrap().push("exists");
            self.files.lock().unwrap().contains_key(path)
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            self.calls.lock().unwrap().push("remove");
            self.files.lock().unwrap().remove(path);
            Ok(())
        }

        fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()> {
            self.calls.lock().unwrap().push("write");
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), data.to_vec());
            Ok(())
        }
    }

    struct FakeLibrary {
        status: AuthorizationStatus,
        grant: AuthorizationStatus,
        import: ImportResult,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeLibrary {
        fn new(status: AuthorizationStatus, grant: AuthorizationStatus) -> Self {
            Self {
                status,
                grant,
                import: ImportResult::success(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl PhotoLibrary for FakeLibrary {
        fn authorization_status(&self) -> AuthorizationStatus {
            self.calls.lock().unwrap().push("status");
            self.status
        }

        fn request_authorization(&self) -> BoxFuture<'static, AuthorizationStatus> {
            self.calls.lock().unwrap().push("request");
            let grant = self.grant;
            Box::pin(async move { grant })
        }

        fn import_file(&self, _path: &Path) -> BoxFuture<'static, ImportResult> {
            self.calls.lock().unwrap().push("import");
            let result = self.import.clone();
            Box::pin(async move { result })
        }
    }

    fn still() -> Option<CapturedStill> {
        Some(CapturedStill::new(RgbaImage::new(2, 3)))
    }

    fn gateway(library: Arc<FakeLibrary>, fs: Arc<MemoryFs>) -> PersistenceGateway {
        PersistenceGateway::new(library, fs, PathBuf::from("/photos/camera_capture_photo.png"))
    }

    #[tokio::test]
    async fn test_nothing_to_save_touches_nothing() {
        let library = Arc::new(FakeLibrary::new(
            AuthorizationStatus::Authorized,
            AuthorizationStatus::Authorized,
        ));
        let fs = Arc::new(MemoryFs::default());

        let outcome = gateway(library.clone(), fs.clone()).save(None).await;

        assert_eq!(outcome, SaveOutcome::NothingToSave);
        assert!(library.calls.lock().unwrap().is_empty());
        assert!(fs.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authorized_saves_without_request() {
        let library = Arc::new(FakeLibrary::new(
            AuthorizationStatus::Authorized,
            AuthorizationStatus::Denied,
        ));
        let fs = Arc::new(MemoryFs::default());
        let gateway = gateway(library.clone(), fs.clone());

        let outcome = gateway.save(still()).await;

        assert!(outcome.is_saved());
        assert_eq!(*library.calls.lock().unwrap(), vec!["status", "import"]);
        let files = fs.files.lock().unwrap();
        let png = files.get(gateway.photo_path()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[tokio::test]
    async fn test_stale_file_removed_before_write() {
        let library = Arc::new(FakeLibrary::new(
            AuthorizationStatus::NotDetermined,
            AuthorizationStatus::Authorized,
        ));
        let fs = Arc::new(MemoryFs::default());
        fs.files
            .lock()
            .unwrap()
            .insert(PathBuf::from("/photos/camera_capture_photo.png"), b"old".to_vec());
        let gateway = gateway(library.clone(), fs.clone());

        assert!(gateway.save(still()).await.is_saved());

        let calls = fs.calls.lock().unwrap();
        let remove = calls.iter().position(|c| *c == "remove").unwrap();
        let write = calls.iter().position(|c| *c == "write").unwrap();
        assert!(remove < write);
        assert_ne!(
            fs.files.lock().unwrap().values().next().unwrap().as_slice(),
            b"old"
        );
    }

    #[tokio::test]
    async fn test_refused_access_writes_nothing() {
        for grant in [
            AuthorizationStatus::Denied,
            AuthorizationStatus::NotDetermined,
            AuthorizationStatus::Restricted,
        ] {
            let library = Arc::new(FakeLibrary::new(AuthorizationStatus::NotDetermined, grant));
            let fs = Arc::new(MemoryFs::default());

            let outcome = gateway(library.clone(), fs.clone()).save(still()).await;

            assert_eq!(outcome, SaveOutcome::NotAuthorized(grant));
            assert!(fs.calls.lock().unwrap().is_empty());
            assert!(!library.calls.lock().unwrap().contains(&"import"));
        }
    }

    #[tokio::test]
    async fn test_import_failure_keeps_file() {
        let mut library = FakeLibrary::new(
            AuthorizationStatus::Authorized,
            AuthorizationStatus::Authorized,
        );
        library.import = ImportResult::failure("library full");
        let library = Arc::new(library);
        let fs = Arc::new(MemoryFs::default());

        let outcome = gateway(library, fs.clone()).save(still()).await;

        assert_eq!(
            outcome,
            SaveOutcome::ImportFailed {
                path: PathBuf::from("/photos/camera_capture_photo.png"),
                error: "library full".to_string(),
            }
        );
        assert_eq!(fs.files.lock().unwrap().len(), 1);
    }

    /// Library whose imports wait until the test releases them
    struct GatedLibrary {
        import_started: Notify,
        release: Arc<Semaphore>,
    }

    impl PhotoLibrary for GatedLibrary {
        fn authorization_status(&self) -> AuthorizationStatus {
            AuthorizationStatus::Authorized
        }

        fn request_authorization(&self) -> BoxFuture<'static, AuthorizationStatus> {
            Box::pin(async { AuthorizationStatus::Authorized })
        }

        fn import_file(&self, _path: &Path) -> BoxFuture<'static, ImportResult> {
            self.import_started.notify_one();
            let release = Arc::clone(&self.release);
            Box::pin(async move {
                match release.acquire().await {
                    Ok(permit) => {
                        permit.forget();
                        ImportResult::success()
                    }
                    Err(e) => ImportResult::failure(e.to_string()),
                }
            })
        }
    }

    #[tokio::test]
    async fn test_overlapping_saves_wait_for_pending_import() {
        let library = Arc::new(GatedLibrary {
            import_started: Notify::new(),
            release: Arc::new(Semaphore::new(0)),
        });
        let fs = Arc::new(MemoryFs::default());
        let gateway = Arc::new(PersistenceGateway::new(
            library.clone(),
            fs.clone(),
            PathBuf::from("/photos/camera_capture_photo.png"),
        ));
        let writes = || fs.calls.lock().unwrap().iter().filter(|c| **c == "write").count();

        let first = tokio::spawn({
            let gateway = Arc::clone(&gateway);
            async move { gateway.save(still()).await }
        });
        library.import_started.notified().await;

        let second = tokio::spawn({
            let gateway = Arc::clone(&gateway);
            async move { gateway.save(still()).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The second save must not touch the file while the first import runs
        assert_eq!(writes(), 1);
        assert!(!fs.calls.lock().unwrap().contains(&"remove"));

        library.release.add_permits(2);
        assert!(first.await.unwrap().is_saved());
        assert!(second.await.unwrap().is_saved());
        assert_eq!(writes(), 2);
    }
}
