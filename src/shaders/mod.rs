// SPDX-License-Identifier: GPL-3.0-only
//! Compute shader sources and dispatch helpers
//!
//! The WGSL source is always compiled into the crate so it can be validated
//! in tests; it is only loaded onto a device with the `gpu` feature.

/// Nearest-neighbour affine resampling (packed RGBA8 storage buffers)
pub const AFFINE_RESAMPLE_SHADER: &str = include_str!("affine_resample.wgsl");

/// Workgroup edge length used by [`AFFINE_RESAMPLE_SHADER`]
pub const WORKGROUP_SIZE: u32 = 16;

/// Cached resource dimensions - avoids reallocation when dimensions match
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct CachedDimensions {
    pub width: u32,
    pub height: u32,
}

impl CachedDimensions {
    /// Check if dimensions have changed and need update
    pub fn needs_update(&self, width: u32, height: u32) -> bool {
        self.width != width || self.height != height
    }

    /// Update cached dimensions
    pub fn update(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Check if dimensions are initialized (non-zero)
    pub fn is_initialized(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Number of workgroups needed to cover `dimension`
#[inline]
pub fn compute_dispatch_size(dimension: u32, workgroup_size: u32) -> u32 {
    dimension.div_ceil(workgroup_size)
}
