//! Live playback of a loop in a window.
//!
//! Controls: drag to orbit, scroll to zoom, `Space` pauses, `R` restarts the
//! loop from `t = 0`, `Escape` quits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::camera::{OrbitControls, OrthoCamera};
use crate::gpu::renderer::Renderer;
use crate::loops::{LemniscateRings, Loop, LoopConfig};

/// Pixels of trackpad scroll counted as one wheel step.
const PIXELS_PER_SCROLL_STEP: f32 = 50.0;

/// Playback time that can be paused and restarted.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    start: Instant,
    paused_at: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(now: Instant) -> Self {
        Self {
            start: now,
            paused_at: None,
        }
    }

    /// Time played since start, excluding paused spans.
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.paused_at.unwrap_or(now).saturating_duration_since(self.start)
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.paused_at.take() {
            // Shift the start forward by the paused span.
            Some(paused_at) => self.start += now.saturating_duration_since(paused_at),
            None => self.paused_at = Some(now),
        }
    }

    /// Back to zero, keeping the pause state.
    pub fn restart(&mut self, now: Instant) {
        self.start = now;
        if self.paused_at.is_some() {
            self.paused_at = Some(now);
        }
    }
}

/// Window-side state: surface, renderer, camera, input.
struct PlayerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    renderer: Renderer,
    camera: OrthoCamera,
    controls: OrbitControls,
    clock: PlaybackClock,
    dragging: bool,
    cursor: Option<(f64, f64)>,
}

impl PlayerState {
    async fn new(window: Arc<Window>, rings: &LemniscateRings) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("No adapter found"))?;
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await?;

        let caps = surface.get_capabilities(&adapter);
        // Colours are display-referred, so skip the sRGB encode when the surface allows it.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        log::debug!("Surface configured: {}x{} {:?}", config.width, config.height, format);

        let renderer = Renderer::new(
            device,
            queue,
            format,
            config.width,
            config.height,
            rings.setup(),
            rings.instances().count(),
        );
        let camera = rings.setup().camera.clone();
        let controls = OrbitControls::from_camera(&camera);

        Ok(Self {
            window,
            surface,
            config,
            renderer,
            camera,
            controls,
            clock: PlaybackClock::new(Instant::now()),
            dragging: false,
            cursor: None,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(self.renderer.device(), &self.config);
        self.renderer.resize(size.width, size.height);
    }

    fn cursor_moved(&mut self, x: f64, y: f64) {
        if let (true, Some((px, py))) = (self.dragging, self.cursor) {
            self.controls
                .rotate((x - px) as f32, (y - py) as f32, self.config.height as f32);
            self.controls.apply(&mut self.camera);
        }
        self.cursor = Some((x, y));
    }

    fn render(&mut self, rings: &mut LemniscateRings) -> Result<()> {
        rings.draw(self.clock.elapsed(Instant::now()));
        self.renderer.upload_instances(rings.instances_mut());

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(self.renderer.device(), &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniforms = self.camera.to_uniforms(self.renderer.aspect());
        self.renderer.render(&view, &uniforms);
        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }
}

/// Open a window and play the loop until it is closed.
pub fn run(config: LoopConfig, width: u32, height: u32) -> Result<()> {
    config.validate().map_err(|e| anyhow!(e))?;
    let mut rings = LemniscateRings::new(config)?;
    log::info!(
        "Playing '{}' ({} instances, {:?} loop)",
        rings.name(),
        rings.instances().count(),
        rings.loop_duration()
    );

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(rings.name())
            .with_inner_size(PhysicalSize::new(width, height))
            .build(&event_loop)?,
    );
    let mut state = pollster::block_on(PlayerState::new(window.clone(), &rings))?;

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, window_id } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => state.resize(size),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match logical_key {
                Key::Named(NamedKey::Escape) => elwt.exit(),
                Key::Named(NamedKey::Space) => {
                    state.clock.toggle_pause(Instant::now());
                    log::info!("{}", if state.clock.is_paused() { "Paused" } else { "Playing" });
                }
                Key::Character(c) if c.eq_ignore_ascii_case("r") => {
                    state.clock.restart(Instant::now());
                    log::info!("Restarted loop");
                }
                _ => {}
            },
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => state.dragging = button_state == ElementState::Pressed,
            WindowEvent::CursorMoved { position, .. } => state.cursor_moved(position.x, position.y),
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_SCROLL_STEP,
                };
                state.controls.zoom(&mut state.camera, steps);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.render(&mut rings) {
                    log::error!("Render failed: {}", e);
                    elwt.exit();
                }
            }
            _ => {}
        },
        Event::AboutToWait => state.window.request_redraw(),
        _ => {}
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_runs_from_start() {
        let t0 = Instant::now();
        let clock = PlaybackClock::new(t0);
        assert_eq!(clock.elapsed(t0), Duration::ZERO);
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(2)), Duration::from_secs(2));
    }

    #[test]
    fn test_pause_freezes_and_resume_continues() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(t0);

        clock.toggle_pause(t0 + Duration::from_secs(1));
        assert!(clock.is_paused());
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(5)), Duration::from_secs(1));

        clock.toggle_pause(t0 + Duration::from_secs(5));
        assert!(!clock.is_paused());
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(6)), Duration::from_secs(2));
    }

    #[test]
    fn test_restart_keeps_pause_state() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(t0);
        clock.restart(t0 + Duration::from_secs(3));
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(4)), Duration::from_secs(1));

        clock.toggle_pause(t0 + Duration::from_secs(4));
        clock.restart(t0 + Duration::from_secs(10));
        assert!(clock.is_paused());
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(20)), Duration::ZERO);
    }
}
