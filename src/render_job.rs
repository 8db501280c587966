//! Render job specification and metadata.
//!
//! A job describes one deterministic offline render of a loop: where frames go,
//! at what size and rate, how many loop repetitions, and the loop's own
//! configuration. Completed renders write a `RenderMetadata` next to the frames.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::instanced::InstancedGeometry;
use crate::loops::LoopConfig;

/// Default FPS for rendering.
fn default_fps() -> f64 {
    60.0
}

/// Default number of loop repetitions.
fn default_loops() -> u32 {
    1
}

/// Default output width.
fn default_width() -> u32 {
    1080
}

/// Default output height.
fn default_height() -> u32 {
    1080
}

/// Specification for a single render job.
/// Contains all information needed to deterministically render a sequence of frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJobSpec {
    /// Output directory for frames.
    pub output_dir: PathBuf,

    /// Frames per second.
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// How many times to play the loop through.
    #[serde(default = "default_loops")]
    pub loops: u32,

    /// Output width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Seed for the loop's phase offsets. Overrides `loopConfig.seed` when set.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Loop parameters.
    #[serde(default)]
    pub loop_config: LoopConfig,

    /// Whether to generate video output via FFmpeg.
    #[serde(default)]
    pub output_video: bool,

    /// Video output path. If None and output_video is true, defaults to {output_dir}/render.mp4.
    #[serde(default)]
    pub video_path: Option<PathBuf>,
}

impl RenderJobSpec {
    /// Create a new render job spec with required fields only.
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            fps: default_fps(),
            loops: default_loops(),
            width: default_width(),
            height: default_height(),
            seed: None,
            loop_config: LoopConfig::default(),
            output_video: false,
            video_path: None,
        }
    }

    /// Load a job spec from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read job file {:?}: {}", path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse job file {:?}: {}", path, e))
    }

    /// Validate the job specification.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.fps > 0.0) || !self.fps.is_finite() {
            return Err("FPS must be positive".to_string());
        }
        if self.loops == 0 {
            return Err("Loop count must be at least 1".to_string());
        }
        if self.width == 0 || self.height == 0 {
            return Err("Width and height must be positive".to_string());
        }
        self.loop_config
            .validate()
            .map_err(|e| format!("Loop config: {}", e))
    }

    /// Loop configuration with the job-level seed applied.
    pub fn effective_loop_config(&self) -> LoopConfig {
        let mut config = self.loop_config.clone();
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config
    }

    /// Number of frames covering `loops` full repetitions.
    pub fn frame_count(&self) -> u64 {
        (self.loops as f64 * self.loop_config.loop_duration * self.fps).ceil() as u64
    }

    /// Get the effective video output path.
    pub fn effective_video_path(&self) -> PathBuf {
        self.video_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join("render.mp4"))
    }

    /// Path of frame `index` inside the output directory.
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.output_dir.join(format!("frame_{:05}.png", index))
    }
}

/// Metadata for a completed render.
/// Written as metadata.json alongside rendered frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    /// The job specification used.
    pub job: RenderJobSpec,

    /// Name of the rendered loop.
    pub loop_name: String,

    /// Phase offsets the loop was built with.
    pub phase_offsets: Vec<f32>,

    /// Timestamp when render started (ISO 8601).
    pub started_at: DateTime<Utc>,

    /// Timestamp when render completed (ISO 8601).
    pub completed_at: DateTime<Utc>,

    /// Total render duration in seconds.
    pub render_duration_secs: f64,

    /// Total frames rendered.
    pub frame_count: u64,

    /// Average rendering FPS (frames / render_duration).
    pub average_render_fps: f64,

    /// SHA-256 of the instance buffers at t = 0.
    pub instance_fingerprint: String,

    /// Crate version.
    pub loops_version: String,

    /// GPU adapter info.
    pub gpu_adapter: String,

    /// Output video path if video was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,

    /// Any warnings or issues during render.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RenderMetadata {
    /// SHA-256 over the little-endian bytes of every attribute buffer, in slot order.
    pub fn fingerprint_instances(geometry: &InstancedGeometry) -> String {
        let mut hasher = Sha256::new();
        for attr in geometry.attributes() {
            for v in &attr.values {
                hasher.update(v.to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }

    /// Save metadata to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize metadata: {}", e))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write metadata: {}", e))
    }
}

/// Render phase for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Initialization,
    LoopSetup,
    GpuSetup,
    FrameRender,
    FrameSave,
    VideoEncode,
    MetadataSave,
}

impl std::fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderPhase::Initialization => write!(f, "Initialization"),
            RenderPhase::LoopSetup => write!(f, "Loop Setup"),
            RenderPhase::GpuSetup => write!(f, "GPU Setup"),
            RenderPhase::FrameRender => write!(f, "Frame Render"),
            RenderPhase::FrameSave => write!(f, "Frame Save"),
            RenderPhase::VideoEncode => write!(f, "Video Encode"),
            RenderPhase::MetadataSave => write!(f, "Metadata Save"),
        }
    }
}

/// Structured error for render failures.
#[derive(Debug)]
pub struct RenderError {
    pub phase: RenderPhase,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl RenderError {
    pub fn new(phase: RenderPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        phase: RenderPhase,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            phase,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Progress information for render callbacks.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current frame number (1-indexed).
    pub current_frame: u64,
    /// Total frames to render.
    pub total_frames: u64,
    /// Elapsed time in seconds.
    pub elapsed_secs: f64,
    /// Estimated time remaining in seconds.
    pub eta_secs: Option<f64>,
}

impl RenderProgress {
    /// Progress after `current_frame` frames, with a linear ETA.
    pub fn new(current_frame: u64, total_frames: u64, elapsed_secs: f64) -> Self {
        let eta_secs = (current_frame > 0).then(|| {
            let per_frame = elapsed_secs / current_frame as f64;
            per_frame * total_frames.saturating_sub(current_frame) as f64
        });
        Self {
            current_frame,
            total_frames,
            elapsed_secs,
            eta_secs,
        }
    }

    /// Get progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total_frames == 0 {
            100.0
        } else {
            (self.current_frame as f64 / self.total_frames as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_job_spec_defaults() {
        let spec = RenderJobSpec::new(PathBuf::from("output"));

        assert_eq!(spec.fps, 60.0);
        assert_eq!(spec.loops, 1);
        assert_eq!(spec.width, 1080);
        assert_eq!(spec.height, 1080);
        assert_eq!(spec.seed, None);
        assert_eq!(spec.loop_config, LoopConfig::default());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_render_job_spec_validation() {
        let mut spec = RenderJobSpec::new(PathBuf::from("output"));
        spec.fps = 0.0;
        assert!(spec.validate().is_err());

        let mut spec = RenderJobSpec::new(PathBuf::from("output"));
        spec.loops = 0;
        assert!(spec.validate().is_err());

        let mut spec = RenderJobSpec::new(PathBuf::from("output"));
        spec.loop_config.rings = 0;
        let err = spec.validate().unwrap_err();
        assert!(err.starts_with("Loop config"));
    }

    #[test]
    fn test_rejects_unrepresentable_loop_duration() {
        let spec: RenderJobSpec = serde_json::from_str(
            r#"{ "outputDir": "out", "loopConfig": { "loopDuration": 1e20 } }"#,
        )
        .unwrap();
        let err = spec.validate().unwrap_err();
        assert!(err.starts_with("Loop config"));
    }

    #[test]
    fn test_json_defaults_and_camel_case() {
        let spec: RenderJobSpec = serde_json::from_str(
            r#"{ "outputDir": "out", "loops": 2, "loopConfig": { "rings": 20 }, "outputVideo": true }"#,
        )
        .unwrap();

        assert_eq!(spec.fps, 60.0);
        assert_eq!(spec.loops, 2);
        assert_eq!(spec.loop_config.rings, 20);
        assert_eq!(spec.loop_config.parts, 10);
        assert!(spec.output_video);
        assert_eq!(spec.effective_video_path(), PathBuf::from("out").join("render.mp4"));
    }

    #[test]
    fn test_frame_count() {
        let mut spec = RenderJobSpec::new(PathBuf::from("output"));
        assert_eq!(spec.frame_count(), 180);

        spec.loops = 3;
        assert_eq!(spec.frame_count(), 540);

        spec.loops = 1;
        spec.fps = 25.0;
        spec.loop_config.loop_duration = 0.5;
        assert_eq!(spec.frame_count(), 13);
    }

    #[test]
    fn test_seed_override() {
        let mut spec = RenderJobSpec::new(PathBuf::from("output"));
        spec.loop_config.seed = Some(1);
        assert_eq!(spec.effective_loop_config().seed, Some(1));

        spec.seed = Some(9);
        assert_eq!(spec.effective_loop_config().seed, Some(9));
    }

    #[test]
    fn test_frame_path() {
        let spec = RenderJobSpec::new(PathBuf::from("out"));
        assert_eq!(spec.frame_path(7), PathBuf::from("out").join("frame_00007.png"));
    }

    #[test]
    fn test_fingerprint_tracks_buffer_contents() {
        let mut geometry = InstancedGeometry::new(4);
        let before = RenderMetadata::fingerprint_instances(&geometry);
        assert_eq!(before.len(), 64);
        assert_eq!(before, RenderMetadata::fingerprint_instances(&geometry.clone()));

        geometry.positions.set(2, &[1.0, 2.0, 3.0]);
        assert_ne!(before, RenderMetadata::fingerprint_instances(&geometry));
    }

    #[test]
    fn test_render_progress() {
        let progress = RenderProgress::new(50, 100, 5.0);
        assert_eq!(progress.percentage(), 50.0);
        assert!((progress.eta_secs.unwrap() - 5.0).abs() < 1e-9);

        assert!(RenderProgress::new(0, 100, 0.0).eta_secs.is_none());
        assert_eq!(RenderProgress::new(0, 0, 0.0).percentage(), 100.0);
    }

    #[test]
    fn test_render_error_display() {
        let err = RenderError::with_source(
            RenderPhase::FrameSave,
            "Failed to save frame 3",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(
            err.to_string(),
            "[Frame Save] Failed to save frame 3 (caused by: disk full)"
        );
    }
}
