// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available capture devices
//! - Taking a photo without the terminal viewer

use camera_photo::app::{CameraController, ControllerEvent};
use camera_photo::backends::camera::{CaptureDevice, default_device, enumerate_devices};
use camera_photo::config::Config;
use camera_photo::constants::{get_resolution_label, photo, render};
use camera_photo::imaging::ImageContext;
use camera_photo::pipelines::photo::{EncodingFormat, encode};
use camera_photo::render::{RenderingSession, select_rasterizer};
use camera_photo::storage::{
    DirectoryPhotoLibrary, LocalFileSystem, PhotoFileSystem, SaveOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;

/// List all selectable capture devices
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let devices = enumerate_devices();

    if devices.is_empty() {
        println!("No capture devices found.");
        return Ok(());
    }

    println!("Available devices:");
    println!();
    for (selection, info, formats) in &devices {
        println!("  [{}] {} ({})", selection, info.name, info.backend);

        let mut formats = formats.clone();
        formats.sort_by_key(|f| std::cmp::Reverse(f.pixel_count()));
        formats.dedup_by_key(|f| (f.width, f.height));

        let res_strs: Vec<String> = formats
            .iter()
            .take(3)
            .map(|f| match get_resolution_label(f.width) {
                Some(label) => format!("{}x{}@{}fps ({})", f.width, f.height, f.framerate, label),
                None => format!("{}x{}@{}fps", f.width, f.height, f.framerate),
            })
            .collect();

        if !res_strs.is_empty() {
            println!("      Formats: {}", res_strs.join(", "));
        }
        println!();
    }
    println!("  [file:<path>] stream an image file");

    Ok(())
}

/// Capture one rotated still and save it
///
/// Without `output` the still goes through the photo library like the `s` key
/// in the viewer; with `output` it is written to that file (PNG or JPEG by
/// extension).
pub fn take_photo(config: Config, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let device = default_device(&config.device, config.framerate())?;
    println!("Using device: {}", device.info().name);

    let rendering = Arc::new(RenderingSession::new(
        render::HEADLESS_VIEW_BOUNDS,
        config.display_scale,
        Arc::new(ImageContext::new(select_rasterizer(config.use_gpu))),
    ));
    let library = Arc::new(DirectoryPhotoLibrary::new(config.library_dir()));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(capture_and_save(config, device, rendering, library, output))
}

async fn capture_and_save(
    config: Config,
    device: Arc<dyn CaptureDevice>,
    rendering: Arc<RenderingSession>,
    library: Arc<DirectoryPhotoLibrary>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut controller =
        CameraController::new(config, device, rendering, library, Arc::new(LocalFileSystem));
    let mut events = controller
        .take_events()
        .ok_or("controller events already taken")?;

    if let Some(format) = controller.active_format() {
        println!("Capture format: {}", format);
    }

    println!("Capturing...");
    controller.take_photo().await?;
    match events.recv().await {
        Some(ControllerEvent::PhotoCaptured { width, height }) => {
            println!("Captured {}x{}", width, height);
        }
        Some(ControllerEvent::PhotoCaptureFailed(e)) => return Err(e.into()),
        _ => return Err("Capture did not complete".into()),
    }

    if let Some(path) = output {
        let still = controller
            .captured_still()
            .snapshot()
            .ok_or("No photo was captured")?;
        let format = EncodingFormat::from_path(&path);
        let data = encode(&still.image, format, photo::JPEG_QUALITY)?;
        LocalFileSystem.write_atomic(&path, &data)?;
        println!("Photo saved: {}", path.display());
        return Ok(());
    }

    match controller.save_photo().await? {
        SaveOutcome::Saved(path) => {
            println!("Photo saved: {}", path.display());
            Ok(())
        }
        other => Err(other.to_string().into()),
    }
}
