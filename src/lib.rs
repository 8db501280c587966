pub mod maf;
pub mod easing;
pub mod gradient;
pub mod palette;
pub mod lemniscate;
pub mod instanced;

pub mod camera;
pub mod lighting;
pub mod scene;
pub mod gpu;

// Loop modules
pub mod loops;

// Offline rendering and playback
pub mod render_job;
pub mod video_encode;
pub mod offline;
pub mod player;
pub mod cli;
