// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for saving captured stills

use camera_photo::app::CameraController;
use camera_photo::backends::camera::test_pattern::TestPatternDevice;
use camera_photo::backends::camera::CapturePreset;
use camera_photo::config::Config;
use camera_photo::imaging::ImageContext;
use camera_photo::pipelines::CapturedStill;
use camera_photo::render::RenderingSession;
use camera_photo::storage::{
    AuthorizationStatus, DirectoryPhotoLibrary, ImportResult, LocalFileSystem, PersistenceGateway,
    PhotoLibrary, SaveOutcome,
};
use futures::future::BoxFuture;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Counts info and warn events emitted on the current thread
#[derive(Clone, Default)]
struct EventCounter {
    levels: Arc<Mutex<Vec<Level>>>,
}

impl<S: Subscriber> Layer<S> for EventCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level == Level::INFO || level == Level::WARN || level == Level::ERROR {
            self.levels.lock().unwrap().push(level);
        }
    }
}

impl EventCounter {
    fn take(&self) -> Vec<Level> {
        std::mem::take(&mut *self.levels.lock().unwrap())
    }
}

/// Library with a fixed status and a fixed answer to the request
struct ScriptedLibrary {
    status: AuthorizationStatus,
    grant: AuthorizationStatus,
    requests: Mutex<u32>,
    imports: Mutex<Vec<PathBuf>>,
}

impl ScriptedLibrary {
    fn new(status: AuthorizationStatus, grant: AuthorizationStatus) -> Arc<Self> {
        Arc::new(Self {
            status,
            grant,
            requests: Mutex::new(0),
            imports: Mutex::new(Vec::new()),
        })
    }
}

impl PhotoLibrary for ScriptedLibrary {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    fn request_authorization(&self) -> BoxFuture<'static, AuthorizationStatus> {
        *self.requests.lock().unwrap() += 1;
        let grant = self.grant;
        Box::pin(async move { grant })
    }

    fn import_file(&self, path: &Path) -> BoxFuture<'static, ImportResult> {
        self.imports.lock().unwrap().push(path.to_path_buf());
        Box::pin(async { ImportResult::success() })
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "camera-photo-it-{}-{}",
        name,
        uuid::Uuid::new_v4().simple()
    ))
}

fn still() -> Option<CapturedStill> {
    Some(CapturedStill::new(RgbaImage::new(4, 2)))
}

async fn save_counting(
    gateway: &PersistenceGateway,
    still: Option<CapturedStill>,
) -> (SaveOutcome, Vec<Level>) {
    let counter = EventCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let _guard = tracing::subscriber::set_default(subscriber);
    let outcome = gateway.save(still).await;
    (outcome, counter.take())
}

#[tokio::test]
async fn test_no_still_emits_one_warning() {
    let dir = scratch_dir("nothing");
    let library = ScriptedLibrary::new(
        AuthorizationStatus::Authorized,
        AuthorizationStatus::Authorized,
    );
    let gateway = PersistenceGateway::new(
        library.clone(),
        Arc::new(LocalFileSystem),
        dir.join("photo.png"),
    );

    let (outcome, levels) = save_counting(&gateway, None).await;

    assert_eq!(outcome, SaveOutcome::NothingToSave);
    assert_eq!(levels, vec![Level::WARN]);
    assert_eq!(*library.requests.lock().unwrap(), 0);
    assert!(library.imports.lock().unwrap().is_empty());
    assert!(!dir.exists());
}

#[tokio::test]
async fn test_already_authorized_saves_with_one_info() {
    let dir = scratch_dir("authorized");
    let library = ScriptedLibrary::new(
        AuthorizationStatus::Authorized,
        AuthorizationStatus::Denied,
    );
    let path = dir.join("photo.png");
    let gateway = PersistenceGateway::new(library.clone(), Arc::new(LocalFileSystem), path.clone());

    let (outcome, levels) = save_counting(&gateway, still()).await;

    assert_eq!(outcome, SaveOutcome::Saved(path.clone()));
    assert_eq!(levels, vec![Level::INFO]);
    assert_eq!(*library.requests.lock().unwrap(), 0);
    assert_eq!(*library.imports.lock().unwrap(), vec![path.clone()]);
    assert_eq!(image::open(&path).unwrap().to_rgba8().dimensions(), (4, 2));
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_granted_request_saves_with_one_info() {
    let dir = scratch_dir("granted");
    let library = ScriptedLibrary::new(
        AuthorizationStatus::NotDetermined,
        AuthorizationStatus::Authorized,
    );
    let path = dir.join("photo.png");
    let gateway = PersistenceGateway::new(library.clone(), Arc::new(LocalFileSystem), path.clone());

    let (outcome, levels) = save_counting(&gateway, still()).await;

    assert!(outcome.is_saved());
    assert_eq!(levels, vec![Level::INFO]);
    assert_eq!(*library.requests.lock().unwrap(), 1);
    assert!(path.exists());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_refused_request_saves_nothing_with_one_warning() {
    for grant in [
        AuthorizationStatus::Denied,
        AuthorizationStatus::Restricted,
        AuthorizationStatus::NotDetermined,
    ] {
        let dir = scratch_dir("refused");
        let library = ScriptedLibrary::new(AuthorizationStatus::NotDetermined, grant);
        let gateway = PersistenceGateway::new(
            library.clone(),
            Arc::new(LocalFileSystem),
            dir.join("photo.png"),
        );

        let (outcome, levels) = save_counting(&gateway, still()).await;

        assert_eq!(outcome, SaveOutcome::NotAuthorized(grant));
        assert_eq!(levels, vec![Level::WARN]);
        assert!(library.imports.lock().unwrap().is_empty());
        assert!(!dir.exists());
    }
}

#[tokio::test]
async fn test_stale_photo_file_is_replaced() {
    let dir = scratch_dir("stale");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("photo.png");
    std::fs::write(&path, b"left over").unwrap();

    let library = ScriptedLibrary::new(
        AuthorizationStatus::Authorized,
        AuthorizationStatus::Authorized,
    );
    let gateway = PersistenceGateway::new(library, Arc::new(LocalFileSystem), path.clone());

    assert!(gateway.save(still()).await.is_saved());
    assert!(image::open(&path).is_ok());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_directory_library_end_to_end() {
    let dir = scratch_dir("library");
    let library = Arc::new(DirectoryPhotoLibrary::new(dir.join("library")));
    let gateway = PersistenceGateway::new(
        library,
        Arc::new(LocalFileSystem),
        dir.join("docs").join("photo.png"),
    );

    let (outcome, levels) = save_counting(&gateway, still()).await;

    assert!(outcome.is_saved());
    assert_eq!(levels, vec![Level::INFO]);
    let imported: Vec<_> = std::fs::read_dir(dir.join("library")).unwrap().collect();
    assert_eq!(imported.len(), 1);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_save_right_after_capture_sees_previous_still() {
    let dir = scratch_dir("ordering");
    let config = Config {
        preset: CapturePreset::Low,
        photo_dir: Some(dir.join("docs")),
        library_dir: Some(dir.join("library")),
        ..Config::default()
    };
    let rendering = Arc::new(RenderingSession::new(
        (32, 24),
        1.0,
        Arc::new(ImageContext::software()),
    ));
    let library = Arc::new(DirectoryPhotoLibrary::new(config.library_dir()));
    let controller = CameraController::new(
        config,
        Arc::new(TestPatternDevice::new()),
        rendering,
        library,
        Arc::new(LocalFileSystem),
    );

    // The capture task cannot run before this task yields, so the save reads
    // the slot as it was before the capture
    let capture = controller.take_photo();
    let save = controller.save_photo();

    assert_eq!(save.await.unwrap(), SaveOutcome::NothingToSave);
    capture.await.unwrap();
    assert!(!controller.captured_still().is_empty());

    let outcome = controller.save_photo().await.unwrap();
    assert!(outcome.is_saved());
    let _ = std::fs::remove_dir_all(dir);
}
