// SPDX-License-Identifier: GPL-3.0-only

//! Still capture from the session's still output
//!
//! The device call, JPEG decode, rotation and rasterization all run on the
//! blocking pool so neither the caller nor the preview is held up.

use super::{CapturedStill, CapturedStillSlot};
use crate::backends::camera::CaptureSession;
use crate::errors::PhotoError;
use crate::imaging::{GpuImage, TransformStage};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Captures one still, rotates it and stores it in the slot
#[derive(Clone)]
pub struct StillCapturePath {
    session: Arc<CaptureSession>,
    stage: TransformStage,
    slot: Arc<CapturedStillSlot>,
}

impl StillCapturePath {
    pub fn new(
        session: Arc<CaptureSession>,
        stage: TransformStage,
        slot: Arc<CapturedStillSlot>,
    ) -> Self {
        Self {
            session,
            stage,
            slot,
        }
    }

    pub fn slot(&self) -> &Arc<CapturedStillSlot> {
        &self.slot
    }

    /// Capture a still and store it
    ///
    /// Errors are logged and returned; the slot keeps its previous value.
    pub async fn capture(&self) -> Result<(u32, u32), PhotoError> {
        match self.capture_still().await {
            Ok(still) => {
                let dimensions = still.dimensions();
                self.slot.store(still);
                info!(width = dimensions.0, height = dimensions.1, "Still captured");
                Ok(dimensions)
            }
            Err(e) => {
                error!(error = %e, "Still capture failed");
                Err(e)
            }
        }
    }

    async fn capture_still(&self) -> Result<CapturedStill, PhotoError> {
        let (input, output) = self.session.still_connection()?;
        let stage = self.stage.clone();

        debug!(quality = output.jpeg_quality, "Requesting still image");

        tokio::task::spawn_blocking(move || {
            let jpeg = input.capture_still_jpeg(output.jpeg_quality)?;
            debug!(size = jpeg.len(), "Still image data received");

            let image = GpuImage::from_encoded(&jpeg)?;
            let rotated = stage.rotate(image)?;
            let bitmap = stage.context().create_bitmap(&rotated, rotated.extent())?;
            Ok(CapturedStill::new(bitmap))
        })
        .await
        .map_err(|e| PhotoError::ProcessingFailed(format!("Capture task panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::test_pattern::TestPatternDevice;
    use crate::backends::camera::{BackendError, CapturePreset, PixelFormat};
    use crate::imaging::ImageContext;

    fn path(session: Arc<CaptureSession>) -> StillCapturePath {
        StillCapturePath::new(
            session,
            TransformStage::new(Arc::new(ImageContext::software())),
            Arc::new(CapturedStillSlot::new()),
        )
    }

    #[tokio::test]
    async fn test_still_is_rotated_into_slot() {
        let session = Arc::new(CaptureSession::new());
        session
            .configure(&TestPatternDevice::new(), CapturePreset::Low, PixelFormat::NV12)
            .unwrap();
        let path = path(session);

        let dimensions = path.capture().await.unwrap();

        assert_eq!(dimensions, (480, 640));
        assert_eq!(path.slot().snapshot().unwrap().dimensions(), (480, 640));
    }

    #[tokio::test]
    async fn test_unconfigured_session_leaves_slot_unchanged() {
        let path = path(Arc::new(CaptureSession::new()));

        let result = path.capture().await;

        assert_eq!(
            result,
            Err(PhotoError::CaptureFailed(
                BackendError::NoVideoConnection.to_string()
            ))
        );
        assert!(path.slot().is_empty());
    }
}
