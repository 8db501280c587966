//! Seamless animation loops.
//!
//! A loop owns its instance buffers and scene description. The host calls
//! `draw` once per displayed frame with the time elapsed since playback
//! started; the loop folds that into a normalized `t` in `[0, 1)` and
//! rewrites every instance attribute from closed-form math.

pub mod lemniscate_rings;

use std::time::Duration;

use crate::instanced::InstancedGeometry;
use crate::scene::SceneSetup;

pub use lemniscate_rings::{LemniscateRings, LoopConfig};

/// Maps elapsed playback time onto the loop phase.
///
/// Works on integer nanoseconds, so `elapsed` and `elapsed + k * duration`
/// produce the exact same `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopClock {
    duration: Duration,
}

impl LoopClock {
    /// A zero duration is treated as one nanosecond.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration: duration.max(Duration::from_nanos(1)),
        }
    }

    /// Negative and NaN inputs clamp to zero; durations past `Duration::MAX` saturate.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Phase within the loop, in `[0, 1)`.
    pub fn normalized_time(&self, elapsed: Duration) -> f32 {
        let period = self.duration.as_nanos();
        let within = elapsed.as_nanos() % period;
        let t = (within as f64 / period as f64) as f32;
        // Rounding to f32 can land exactly on 1.0 for the last nanoseconds.
        if t >= 1.0 {
            1.0 - f32::EPSILON / 2.0
        } else {
            t
        }
    }

    /// Elapsed time of frame `index` at `fps`, rounded to the nanosecond.
    pub fn frame_time(index: u64, fps: f64) -> Duration {
        if fps <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((index as f64 * 1e9 / fps).round() as u64)
    }
}

/// A procedurally animated scene that repeats every `loop_duration`.
pub trait Loop {
    fn name(&self) -> &str;

    fn loop_duration(&self) -> Duration;

    fn setup(&self) -> &SceneSetup;

    fn instances(&self) -> &InstancedGeometry;

    fn instances_mut(&mut self) -> &mut InstancedGeometry;

    /// Recompute every instance for phase `t` in `[0, 1)` and flag the buffers for upload.
    fn update(&mut self, t: f32);

    /// Per-frame entry point: `elapsed` is the time since playback started.
    fn draw(&mut self, elapsed: Duration) {
        let t = LoopClock::new(self.loop_duration()).normalized_time(elapsed);
        self.update(t);
    }
}
