// SPDX-License-Identifier: GPL-3.0-only

//! Hardware camera through GStreamer
//!
//! `autovideosrc ! tee` feeding two appsinks: a scaled preview sink read by the
//! capture thread and a full-resolution still sink read on demand. Each appsink
//! keeps only the newest buffer (`drop=true`, `max-buffers=1`), so a slow reader
//! always gets the latest frame. The pipeline is built on the first read, once
//! the requested pixel format is known.

use super::types::{
    BackendError, BackendResult, CameraFormat, CameraFrame, DeviceInfo, Framerate, PixelFormat,
};
use super::{CaptureDevice, DeviceInput};
use crate::constants::{pipeline, timing};
use crate::media::{frame_to_rgba, rgba_to_jpeg};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pixel format of the still branch
const STILL_FORMAT: PixelFormat = PixelFormat::RGBA;

const STREAM_FORMATS: [PixelFormat; 5] = [
    PixelFormat::NV12,
    PixelFormat::RGBA,
    PixelFormat::BGRA,
    PixelFormat::YUYV,
    PixelFormat::Gray8,
];

/// The system's default camera
pub struct GstCameraDevice {
    info: DeviceInfo,
}

impl GstCameraDevice {
    pub fn default_camera() -> BackendResult<Self> {
        gstreamer::init().map_err(|e| BackendError::NotAvailable(e.to_string()))?;

        if gstreamer::ElementFactory::find("autovideosrc").is_none() {
            return Err(BackendError::DeviceNotFound(
                "GStreamer has no autovideosrc element".to_string(),
            ));
        }

        Ok(Self {
            info: DeviceInfo {
                name: "Default Camera".to_string(),
                path: "autovideosrc".to_string(),
                backend: "gstreamer".to_string(),
            },
        })
    }
}

impl CaptureDevice for GstCameraDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn has_video(&self) -> bool {
        true
    }

    fn formats(&self) -> Vec<CameraFormat> {
        [(640, 480), (1280, 720), (1920, 1080)]
            .into_iter()
            .map(|(width, height)| CameraFormat {
                width,
                height,
                framerate: Framerate::from_int(30),
                pixel_formats: STREAM_FORMATS.to_vec(),
            })
            .collect()
    }

    fn open(&self, format: &CameraFormat) -> BackendResult<Arc<dyn DeviceInput>> {
        info!(device = %self.info.name, format = %format, "Opening GStreamer camera input");
        Ok(Arc::new(GstCameraInput {
            format: format.clone(),
            stream: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }))
    }
}

struct Stream {
    pixel_format: PixelFormat,
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    still_sink: AppSink,
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to stop camera pipeline");
            return;
        }
        let (result, state, _) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::STOP_TIMEOUT_SECS));
        debug!(result = ?result, state = ?state, "Camera pipeline stopped");
    }
}

struct GstCameraInput {
    format: CameraFormat,
    stream: Mutex<Option<Stream>>,
    sequence: AtomicU64,
}

/// Camera pipeline with a scaled preview branch and a full-resolution still branch
///
/// The still branch has no `videoscale`, so it carries whatever resolution the
/// source negotiated. Both branches sit behind leaky queues so neither can
/// stall the other.
fn pipeline_description(format: &CameraFormat, pixel_format: PixelFormat) -> String {
    format!(
        "autovideosrc ! tee name=split \
         split. ! queue leaky=downstream max-size-buffers=1 ! \
         videoconvert n-threads={threads} ! videoscale ! \
         video/x-raw,format={pixel},width={width},height={height} ! appsink name=sink \
         split. ! queue leaky=downstream max-size-buffers=1 ! \
         videoconvert n-threads={threads} ! video/x-raw,format={still} ! appsink name=still",
        threads = pipeline::videoconvert_threads(),
        pixel = pixel_format.to_gst_format_string(),
        width = format.width,
        height = format.height,
        still = STILL_FORMAT.to_gst_format_string(),
    )
}

fn appsink_by_name(gst_pipeline: &gstreamer::Pipeline, name: &str) -> BackendResult<AppSink> {
    let appsink = gst_pipeline
        .by_name(name)
        .ok_or_else(|| BackendError::InputRejected(format!("Failed to get appsink {}", name)))?
        .dynamic_cast::<AppSink>()
        .map_err(|_| BackendError::InputRejected(format!("Failed to cast appsink {}", name)))?;

    appsink.set_property("sync", false);
    appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
    appsink.set_property("drop", true);
    Ok(appsink)
}

/// Turn a pulled sample into a tightly packed frame
fn sample_to_frame(
    sample: &gstreamer::Sample,
    pixel_format: PixelFormat,
    sequence: u64,
) -> BackendResult<CameraFrame> {
    let buffer = sample
        .buffer()
        .ok_or_else(|| BackendError::InvalidFrame("No buffer in sample".to_string()))?;
    let caps = sample
        .caps()
        .ok_or_else(|| BackendError::InvalidFrame("No caps in sample".to_string()))?;
    let video_info = VideoInfo::from_caps(caps)
        .map_err(|e| BackendError::InvalidFrame(format!("Bad caps: {}", e)))?;
    let map = buffer
        .map_readable()
        .map_err(|e| BackendError::InvalidFrame(format!("Failed to map buffer: {}", e)))?;

    let data = pack_planes(map.as_slice(), &video_info, pixel_format)?;
    CameraFrame::packed(
        video_info.width(),
        video_info.height(),
        pixel_format,
        data,
        sequence,
    )
}

impl GstCameraInput {
    fn build_stream(&self, pixel_format: PixelFormat) -> BackendResult<Stream> {
        let description = pipeline_description(&self.format, pixel_format);
        debug!(pipeline = %description, "Creating camera pipeline");

        let gst_pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::InputRejected(format!("Failed to create pipeline: {}", e)))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InputRejected("Failed to downcast to Pipeline".into()))?;

        let appsink = appsink_by_name(&gst_pipeline, "sink")?;
        appsink.set_property("enable-last-sample", false);
        let still_sink = appsink_by_name(&gst_pipeline, "still")?;
        still_sink.set_property("enable-last-sample", true);

        gst_pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| BackendError::InputRejected(format!("Failed to start pipeline: {}", e)))?;

        let (result, state, _) = gst_pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, "Camera pipeline state");
        if state != gstreamer::State::Playing {
            warn!("Camera pipeline is not in PLAYING state");
        }

        Ok(Stream {
            pixel_format,
            pipeline: gst_pipeline,
            appsink,
            still_sink,
        })
    }

    /// Appsinks of the running pipeline, building it first if needed
    ///
    /// `pixel_format` of `None` keeps whatever stream is running. The lock is
    /// released before the caller waits on a sink.
    fn sinks(&self, pixel_format: Option<PixelFormat>) -> BackendResult<(AppSink, AppSink)> {
        let mut stream = self.stream.lock().unwrap_or_else(|e| e.into_inner());

        let running = stream.as_ref().map(|s| s.pixel_format);
        let wanted = pixel_format.or(running).unwrap_or(STILL_FORMAT);
        if running != Some(wanted) {
            // Drop the old pipeline first so the device is free again
            *stream = None;
            *stream = Some(self.build_stream(wanted)?);
        }
        let stream = stream
            .as_ref()
            .ok_or_else(|| BackendError::Other("Camera pipeline missing".to_string()))?;
        Ok((stream.appsink.clone(), stream.still_sink.clone()))
    }
}

/// Copy the planes of a mapped buffer into a tightly packed layout
fn pack_planes(
    bytes: &[u8],
    video_info: &VideoInfo,
    pixel_format: PixelFormat,
) -> BackendResult<Vec<u8>> {
    let width = video_info.width();
    let height = video_info.height();
    let row_bytes = pixel_format.packed_stride(width) as usize;
    let mut packed = Vec::with_capacity(pixel_format.frame_size(width, height));

    let plane_rows: &[u32] = match pixel_format {
        PixelFormat::NV12 => &[height, height.div_ceil(2)],
        _ => &[height],
    };

    for (plane, rows) in plane_rows.iter().enumerate() {
        let offset = video_info.offset()[plane];
        let stride = video_info.stride()[plane] as usize;
        for row in 0..*rows as usize {
            let start = offset + row * stride;
            let src = bytes.get(start..start + row_bytes).ok_or_else(|| {
                BackendError::InvalidFrame(format!("plane {} row {} out of bounds", plane, row))
            })?;
            packed.extend_from_slice(src);
        }
    }

    Ok(packed)
}

impl DeviceInput for GstCameraInput {
    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn read_frame(
        &self,
        pixel_format: PixelFormat,
        timeout: Duration,
    ) -> BackendResult<Option<CameraFrame>> {
        let (appsink, _) = self.sinks(Some(pixel_format))?;

        let clock_timeout = gstreamer::ClockTime::from_mseconds(timeout.as_millis() as u64);
        let Some(sample) = appsink.try_pull_sample(clock_timeout) else {
            if appsink.is_eos() {
                return Err(BackendError::Disconnected);
            }
            return Ok(None);
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        sample_to_frame(&sample, pixel_format, sequence).map(Some)
    }

    fn capture_still_jpeg(&self, quality: u8) -> BackendResult<Vec<u8>> {
        let (_, still_sink) = self.sinks(None)?;

        // Newest queued still, else the last one the sink saw
        let timeout = gstreamer::ClockTime::from_seconds(timing::START_TIMEOUT_SECS);
        let sample = still_sink
            .try_pull_sample(timeout)
            .or_else(|| still_sink.property::<Option<gstreamer::Sample>>("last-sample"))
            .ok_or_else(|| BackendError::Other("Timed out waiting for a still frame".into()))?;

        let frame = sample_to_frame(&sample, STILL_FORMAT, 0)?;
        debug!(width = frame.width, height = frame.height, "Still frame pulled");
        let rgba = frame_to_rgba(&frame)?;
        rgba_to_jpeg(&rgba, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hd() -> CameraFormat {
        CameraFormat {
            width: 1280,
            height: 720,
            framerate: Framerate::from_int(30),
            pixel_formats: STREAM_FORMATS.to_vec(),
        }
    }

    #[test]
    fn test_still_branch_is_separate_and_unscaled() {
        let description = pipeline_description(&hd(), PixelFormat::NV12);
        let (preview, still) = description
            .split_once("appsink name=sink")
            .expect("preview branch");

        assert!(preview.contains("tee name=split"));
        assert!(preview.contains("format=NV12,width=1280,height=720"));
        assert!(still.contains("appsink name=still"));
        assert!(still.contains("leaky=downstream"));
        assert!(!still.contains("videoscale"));
        assert!(!still.contains("width="));
    }
}
