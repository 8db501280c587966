use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::loops::LoopConfig;
use crate::offline;
use crate::player;
use crate::render_job::{RenderJobSpec, RenderProgress};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Loop parameters shared by both subcommands.
#[derive(Args, Debug, Clone)]
struct LoopArgs {
    /// Rings along the curve
    #[arg(long)]
    rings: Option<usize>,

    /// Cylinders per ring
    #[arg(long)]
    parts: Option<usize>,

    /// Loop length in seconds
    #[arg(long)]
    loop_duration: Option<f64>,

    /// Seed for the per-part phase offsets
    #[arg(long)]
    seed: Option<u64>,
}

impl LoopArgs {
    fn apply(&self, config: &mut LoopConfig) {
        if let Some(rings) = self.rings {
            config.rings = rings;
        }
        if let Some(parts) = self.parts {
            config.parts = parts;
        }
        if let Some(duration) = self.loop_duration {
            config.loop_duration = duration;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render frames to disk
    Render {
        /// JSON job file; flags given alongside it override its fields
        #[arg(long)]
        job: Option<PathBuf>,

        /// Output directory for frames
        #[arg(long)]
        out: Option<PathBuf>,

        /// Frames per second
        #[arg(long)]
        fps: Option<f64>,

        /// Number of loop repetitions
        #[arg(long)]
        loops: Option<u32>,

        /// Output width
        #[arg(long)]
        width: Option<u32>,

        /// Output height
        #[arg(long)]
        height: Option<u32>,

        /// Also encode the frames to a video with FFmpeg
        #[arg(long)]
        video: bool,

        /// Video output path (defaults to {out}/render.mp4)
        #[arg(long)]
        video_path: Option<PathBuf>,

        #[command(flatten)]
        loop_args: LoopArgs,
    },
    /// Play the loop in a window
    Play {
        /// Window width
        #[arg(long, default_value_t = 1080)]
        width: u32,

        /// Window height
        #[arg(long, default_value_t = 1080)]
        height: u32,

        #[command(flatten)]
        loop_args: LoopArgs,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            job,
            out,
            fps,
            loops,
            width,
            height,
            video,
            video_path,
            loop_args,
        } => {
            let mut spec = match job {
                Some(path) => RenderJobSpec::from_file(&path).map_err(|e| anyhow!(e))?,
                None => RenderJobSpec::new(
                    out.clone()
                        .ok_or_else(|| anyhow!("Either --job or --out is required"))?,
                ),
            };
            if let Some(out) = out {
                spec.output_dir = out;
            }
            if let Some(fps) = fps {
                spec.fps = fps;
            }
            if let Some(loops) = loops {
                spec.loops = loops;
            }
            if let Some(width) = width {
                spec.width = width;
            }
            if let Some(height) = height {
                spec.height = height;
            }
            if video {
                spec.output_video = true;
            }
            if video_path.is_some() {
                spec.video_path = video_path;
            }
            loop_args.apply(&mut spec.loop_config);
            if loop_args.seed.is_some() {
                spec.seed = loop_args.seed;
            }
            spec.validate().map_err(|e| anyhow!(e))?;

            let report: &mut dyn FnMut(&RenderProgress) = &mut |progress: &RenderProgress| {
                if let Some(eta) = progress.eta_secs {
                    log::debug!(
                        "{:.1}% ({:.1}s elapsed, ~{:.1}s left)",
                        progress.percentage(),
                        progress.elapsed_secs,
                        eta
                    );
                }
            };
            let metadata = offline::render_job(&spec, Some(report))?;

            println!(
                "Rendered {} frames to {:?} in {:.2}s",
                metadata.frame_count, spec.output_dir, metadata.render_duration_secs
            );
            if let Some(path) = metadata.video_path {
                println!("Video: {:?}", path);
            }
            for warning in &metadata.warnings {
                println!("Warning: {}", warning);
            }
        }
        Commands::Play {
            width,
            height,
            loop_args,
        } => {
            let mut config = LoopConfig::default();
            loop_args.apply(&mut config);
            player::run(config, width, height)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_loop_args_override_only_given_fields() {
        let cli = Cli::parse_from(["loops", "play", "--rings", "20", "--seed", "7"]);
        let Commands::Play { loop_args, width, .. } = cli.command else {
            panic!("expected play");
        };
        assert_eq!(width, 1080);

        let mut config = LoopConfig::default();
        loop_args.apply(&mut config);
        assert_eq!(config.rings, 20);
        assert_eq!(config.parts, 10);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_render_flags_parse() {
        let cli = Cli::parse_from([
            "loops", "render", "--out", "frames", "--fps", "30", "--loops", "2", "--video",
        ]);
        let Commands::Render { out, fps, loops, video, job, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(out, Some(PathBuf::from("frames")));
        assert_eq!(fps, Some(30.0));
        assert_eq!(loops, Some(2));
        assert!(video);
        assert!(job.is_none());
    }
}
