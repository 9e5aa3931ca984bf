// SPDX-License-Identifier: GPL-3.0-only

//! Render sink
//!
//! ```text
//! GpuImage ──▶ RenderSink::present ──▶ make context current ──▶ draw into back buffer
//!                                                                     │
//!                                 terminal widget ◀── front buffer ◀──┘ display()
//! ```

pub mod context;
pub mod session;
pub mod sink;
pub mod surface;

pub use context::RenderContext;
pub use session::RenderingSession;
pub use sink::RenderSink;
pub use surface::DrawableSurface;

use crate::imaging::{Rasterizer, SoftwareRasterizer};
use std::sync::Arc;
use tracing::{info, warn};

/// Pick the rasterizer for the image context
///
/// The GPU rasterizer is used when requested and available; any failure falls
/// back to the software rasterizer.
pub fn select_rasterizer(use_gpu: bool) -> Arc<dyn Rasterizer> {
    if use_gpu {
        match gpu_rasterizer() {
            Ok(rasterizer) => {
                info!(rasterizer = rasterizer.name(), "Using GPU rasterizer");
                return rasterizer;
            }
            Err(e) => warn!(error = %e, "GPU rasterizer unavailable, using software"),
        }
    }
    Arc::new(SoftwareRasterizer)
}

#[cfg(feature = "gpu")]
fn gpu_rasterizer() -> Result<Arc<dyn Rasterizer>, String> {
    Ok(Arc::new(crate::gpu::GpuRasterizer::new()?))
}

#[cfg(not(feature = "gpu"))]
fn gpu_rasterizer() -> Result<Arc<dyn Rasterizer>, String> {
    Err("built without the 'gpu' feature".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_software_rasterizer_by_default() {
        assert_eq!(select_rasterizer(false).name(), "software");
    }
}
