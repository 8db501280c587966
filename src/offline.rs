//! Headless rendering of a loop to numbered PNG frames.
//!
//! Frame `i` is rendered at the exact elapsed time `i / fps`, so a job that
//! covers whole loops ends on the frame right before the loop repeats and the
//! frame sequence can be played back seamlessly.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;

use crate::gpu::renderer::Renderer;
use crate::loops::{LemniscateRings, Loop, LoopClock};
use crate::render_job::{RenderError, RenderJobSpec, RenderMetadata, RenderPhase, RenderProgress};
use crate::video_encode::{self, FfmpegStatus, VideoEncodingOptions};

/// Offscreen colour format. Shader output is written as-is, without an sRGB encode.
pub const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a readback buffer, padded to wgpu's copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded + (align - unpadded % align) % align
}

/// Strip the per-row padding from a mapped readback buffer.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_bytes_per_row: u32) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    let mut pixels = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * padded_bytes_per_row as usize;
        pixels.extend_from_slice(&data[start..start + row]);
    }
    pixels
}

/// Offscreen target plus the buffer it is copied into.
struct FrameTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    padded_bytes_per_row: u32,
    width: u32,
    height: u32,
}

impl FrameTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Target Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FRAME_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_bytes_per_row = padded_bytes_per_row(width);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            texture,
            view,
            readback,
            padded_bytes_per_row,
            width,
            height,
        }
    }

    /// Copy the rendered texture back to the CPU as tightly packed RGBA8.
    fn read_pixels(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<u8>, RenderError> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            self.texture.size(),
        );
        queue.submit(Some(encoder.finish()));

        let slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::with_source(RenderPhase::FrameRender, "Readback callback dropped", e))?
            .map_err(|e| RenderError::with_source(RenderPhase::FrameRender, "Failed to map readback buffer", e))?;

        let pixels = {
            let data = slice.get_mapped_range();
            unpad_rows(&data, self.width, self.height, self.padded_bytes_per_row)
        };
        self.readback.unmap();
        Ok(pixels)
    }
}

/// Render a job to disk, reporting progress to `on_progress` after every frame.
pub fn render_job(
    spec: &RenderJobSpec,
    on_progress: Option<&mut dyn FnMut(&RenderProgress)>,
) -> Result<RenderMetadata, RenderError> {
    pollster::block_on(render_job_async(spec, on_progress))
}

async fn render_job_async(
    spec: &RenderJobSpec,
    mut on_progress: Option<&mut dyn FnMut(&RenderProgress)>,
) -> Result<RenderMetadata, RenderError> {
    let started_at = Utc::now();
    let start = Instant::now();
    let mut warnings = Vec::new();

    spec.validate()
        .map_err(|e| RenderError::new(RenderPhase::Initialization, e))?;
    std::fs::create_dir_all(&spec.output_dir).map_err(|e| {
        RenderError::with_source(
            RenderPhase::Initialization,
            format!("Failed to create output directory {:?}", spec.output_dir),
            e,
        )
    })?;

    // === Loop ===

    let mut rings = LemniscateRings::new(spec.effective_loop_config())
        .map_err(|e| RenderError::with_source(RenderPhase::LoopSetup, "Failed to build loop", e))?;
    rings.update(0.0);
    let instance_fingerprint = RenderMetadata::fingerprint_instances(rings.instances());
    let loop_name = rings.name().to_string();
    let phase_offsets = rings.phase_offsets().to_vec();

    // === GPU ===

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| RenderError::new(RenderPhase::GpuSetup, "No adapter found"))?;
    let info = adapter.get_info();
    let gpu_adapter = format!("{} ({:?})", info.name, info.backend);
    log::info!("Using adapter {}", gpu_adapter);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await
        .map_err(|e| RenderError::with_source(RenderPhase::GpuSetup, "Failed to create device", e))?;

    let target = FrameTarget::new(&device, spec.width, spec.height);
    let camera = rings.setup().camera.clone();
    let mut renderer = Renderer::new(
        device,
        queue,
        FRAME_FORMAT,
        spec.width,
        spec.height,
        rings.setup(),
        rings.instances().count(),
    );
    let camera_uniforms = camera.to_uniforms(renderer.aspect());

    // === Frames ===

    let total_frames = spec.frame_count();
    log::info!(
        "Rendering {} frames of '{}' ({} loop(s) at {} fps) to {:?}",
        total_frames,
        loop_name,
        spec.loops,
        spec.fps,
        spec.output_dir
    );

    for index in 0..total_frames {
        rings.draw(LoopClock::frame_time(index, spec.fps));
        renderer.upload_instances(rings.instances_mut());
        renderer.render(&target.view, &camera_uniforms);

        let pixels = target.read_pixels(renderer.device(), renderer.queue())?;
        let frame_path = spec.frame_path(index);
        image::save_buffer(
            &frame_path,
            &pixels,
            spec.width,
            spec.height,
            image::ColorType::Rgba8,
        )
        .map_err(|e| {
            RenderError::with_source(
                RenderPhase::FrameSave,
                format!("Failed to save frame {:?}", frame_path),
                e,
            )
        })?;

        let progress = RenderProgress::new(index + 1, total_frames, start.elapsed().as_secs_f64());
        if index % 60 == 0 || index + 1 == total_frames {
            log::info!(
                "Frame {}/{} ({:.1}%)",
                progress.current_frame,
                progress.total_frames,
                progress.percentage()
            );
        }
        if let Some(callback) = on_progress.as_deref_mut() {
            callback(&progress);
        }
    }

    // === Video ===

    let mut video_path = None;
    if spec.output_video {
        let path = spec.effective_video_path();
        match video_encode::check_ffmpeg() {
            FfmpegStatus::NotFound => {
                let warning = "FFmpeg not found; frames were written without a video".to_string();
                log::warn!("{}", warning);
                warnings.push(warning);
            }
            _ => {
                video_encode::encode_video(
                    &spec.output_dir,
                    &path,
                    spec.fps,
                    &VideoEncodingOptions::default(),
                )
                .map_err(|e| RenderError::new(RenderPhase::VideoEncode, e))?;
                video_path = Some(path);
            }
        }
    }

    // === Metadata ===

    let render_duration_secs = start.elapsed().as_secs_f64();
    let metadata = RenderMetadata {
        job: spec.clone(),
        loop_name,
        phase_offsets,
        started_at,
        completed_at: Utc::now(),
        render_duration_secs,
        frame_count: total_frames,
        average_render_fps: if render_duration_secs > 0.0 {
            total_frames as f64 / render_duration_secs
        } else {
            0.0
        },
        instance_fingerprint,
        loops_version: env!("CARGO_PKG_VERSION").to_string(),
        gpu_adapter,
        video_path,
        warnings,
    };
    save_metadata(&metadata, &spec.output_dir)?;

    log::info!(
        "Rendered {} frames in {:.2}s ({:.1} fps)",
        total_frames,
        render_duration_secs,
        metadata.average_render_fps
    );
    Ok(metadata)
}

fn save_metadata(metadata: &RenderMetadata, output_dir: &Path) -> Result<(), RenderError> {
    metadata
        .save(&output_dir.join("metadata.json"))
        .map_err(|e| RenderError::new(RenderPhase::MetadataSave, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1080), 4352);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn test_unpad_rows() {
        let width = 2;
        let height = 3;
        let pitch = padded_bytes_per_row(width);
        let mut data = vec![0xAAu8; (pitch * height) as usize];
        for y in 0..height {
            let start = (y * pitch) as usize;
            for x in 0..(width * 4) as usize {
                data[start + x] = (y * 10) as u8 + x as u8;
            }
        }

        let pixels = unpad_rows(&data, width, height, pitch);
        assert_eq!(pixels.len(), (width * height * 4) as usize);
        assert_eq!(&pixels[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(&pixels[8..16], &[10, 11, 12, 13, 14, 15, 16, 17]);
        assert!(!pixels.contains(&0xAA));
    }
}
