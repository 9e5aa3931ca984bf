// SPDX-License-Identifier: GPL-3.0-only

//! wgpu rasterizer for the image context
//!
//! Resamples transformed images with the affine compute shader. Source and
//! destination pixels live in storage buffers as packed RGBA8.

use crate::imaging::{AffineTransform, FilterError, Rasterizer};
use crate::shaders::{AFFINE_RESAMPLE_SHADER, CachedDimensions, WORKGROUP_SIZE, compute_dispatch_size};
use image::RgbaImage;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub use wgpu;

/// Information about the created GPU device
#[derive(Debug)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, ...)
    pub backend: wgpu::Backend,
}

/// Create a wgpu device and queue for compute work
pub async fn create_compute_device(
    label: &str,
) -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo), String> {
    info!(label = label, "Creating GPU device for compute");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN | wgpu::Backends::METAL,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| format!("Failed to find suitable GPU adapter: {}", e))?;

    let adapter_info = adapter.get_info();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for compute"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| format!("Failed to create GPU device: {}", e))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}

/// Map a buffer, copy its contents out and unmap it
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, String> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let _ = device.poll(wgpu::PollType::wait_indefinitely());

    receiver
        .await
        .map_err(|_| "Failed to receive buffer mapping".to_string())?
        .map_err(|e| format!("Failed to map buffer: {:?}", e))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

/// Uniform buffer for shader parameters
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ResampleParams {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    tx: f32,
    ty: f32,
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    _pad0: u32,
    _pad1: u32,
}

/// Buffers reused while the source and destination sizes stay the same
#[derive(Default)]
struct Buffers {
    source_dims: CachedDimensions,
    dest_dims: CachedDimensions,
    source: Option<wgpu::Buffer>,
    dest: Option<wgpu::Buffer>,
    staging: Option<wgpu::Buffer>,
}

/// Rasterizer running the resampling shader on the GPU
pub struct GpuRasterizer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    buffers: Mutex<Buffers>,
}

impl GpuRasterizer {
    /// Create the device and pipeline, blocking the calling thread
    pub fn new() -> Result<Self, String> {
        pollster::block_on(Self::new_async())
    }

    pub async fn new_async() -> Result<Self, String> {
        let (device, queue, info) = create_compute_device("Affine Resample").await?;

        info!(adapter_name = %info.adapter_name, "GPU device created for resampling");

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Affine Resample Shader"),
            source: wgpu::ShaderSource::Wgsl(AFFINE_RESAMPLE_SHADER.into()),
        });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Affine Resample Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Affine Resample Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Affine Resample Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Resample Params Buffer"),
            size: std::mem::size_of::<ResampleParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            buffers: Mutex::new(Buffers::default()),
        })
    }

    fn ensure_buffers(&self, buffers: &mut Buffers, src: (u32, u32), dst: (u32, u32)) {
        if buffers.source_dims.needs_update(src.0, src.1) || buffers.source.is_none() {
            debug!(width = src.0, height = src.1, "Allocating resample source buffer");
            buffers.source = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Resample Source Buffer"),
                size: src.0 as u64 * src.1 as u64 * 4,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            buffers.source_dims.update(src.0, src.1);
        }

        if buffers.dest_dims.needs_update(dst.0, dst.1) || buffers.dest.is_none() {
            debug!(width = dst.0, height = dst.1, "Allocating resample output buffers");
            let size = dst.0 as u64 * dst.1 as u64 * 4;
            buffers.dest = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Resample Output Buffer"),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            }));
            buffers.staging = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Resample Staging Buffer"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            }));
            buffers.dest_dims.update(dst.0, dst.1);
        }
    }
}

impl Rasterizer for GpuRasterizer {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn resample(
        &self,
        source: &RgbaImage,
        dest_to_source: &AffineTransform,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, FilterError> {
        if width == 0 || height == 0 || source.width() == 0 || source.height() == 0 {
            return Err(FilterError::EmptyImage);
        }

        let mut buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_buffers(
            &mut buffers,
            (source.width(), source.height()),
            (width, height),
        );

        let (Some(source_buffer), Some(dest_buffer), Some(staging_buffer)) =
            (&buffers.source, &buffers.dest, &buffers.staging)
        else {
            return Err(FilterError::Backend("resample buffers missing".to_string()));
        };

        let params = ResampleParams {
            a: dest_to_source.a as f32,
            b: dest_to_source.b as f32,
            c: dest_to_source.c as f32,
            d: dest_to_source.d as f32,
            tx: dest_to_source.tx as f32,
            ty: dest_to_source.ty as f32,
            src_width: source.width(),
            src_height: source.height(),
            dst_width: width,
            dst_height: height,
            _pad0: 0,
            _pad1: 0,
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&params));
        self.queue.write_buffer(source_buffer, 0, source.as_raw());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Affine Resample Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: source_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: dest_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Affine Resample Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Affine Resample Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, Some(&bind_group), &[]);
            compute_pass.dispatch_workgroups(
                compute_dispatch_size(width, WORKGROUP_SIZE),
                compute_dispatch_size(height, WORKGROUP_SIZE),
                1,
            );
        }

        encoder.copy_buffer_to_buffer(
            dest_buffer,
            0,
            staging_buffer,
            0,
            width as u64 * height as u64 * 4,
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let data = pollster::block_on(read_buffer_async(&self.device, staging_buffer))
            .map_err(FilterError::Backend)?;

        RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| FilterError::Backend("output size mismatch".to_string()))
    }
}
