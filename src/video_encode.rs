//! Optional video encoding through an external FFmpeg.
//!
//! Frames are always written as PNGs first; encoding them into a video is a
//! best-effort step. When FFmpeg is missing the caller records a warning and
//! keeps the frames.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Name pattern of the frames the offline renderer writes.
pub const FRAME_PATTERN: &str = "frame_%05d.png";

/// Result of probing for FFmpeg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfmpegStatus {
    /// Found, with the first line of `ffmpeg -version`.
    Available(String),
    NotFound,
    /// Found but the version line could not be read.
    Unknown,
}

impl FfmpegStatus {
    pub fn is_usable(&self) -> bool {
        !matches!(self, FfmpegStatus::NotFound)
    }
}

/// Probe the PATH for FFmpeg.
pub fn check_ffmpeg() -> FfmpegStatus {
    match Command::new("ffmpeg").arg("-version").output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            match stdout.lines().next() {
                Some(first_line) => FfmpegStatus::Available(first_line.to_string()),
                None => FfmpegStatus::Unknown,
            }
        }
        _ => FfmpegStatus::NotFound,
    }
}

/// Encoder settings.
#[derive(Debug, Clone)]
pub struct VideoEncodingOptions {
    /// Video codec (default: libx264)
    pub codec: String,
    /// Pixel format (default: yuv420p)
    pub pixel_format: String,
    /// Constant Rate Factor, lower is better (default: 18)
    pub crf: u32,
    /// Encoder preset such as "slow" or "medium"
    pub preset: Option<String>,
    /// Extra arguments placed before the output path
    pub extra_args: Vec<String>,
}

impl Default for VideoEncodingOptions {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            crf: 18,
            preset: None,
            extra_args: Vec::new(),
        }
    }
}

/// Full FFmpeg argument list for encoding `frames_dir` into `output_path`.
pub fn ffmpeg_args(
    frames_dir: &Path,
    output_path: &Path,
    fps: f64,
    options: &VideoEncodingOptions,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-y".into(),
        "-framerate".into(),
        fps.to_string().into(),
        "-i".into(),
        frames_dir.join(FRAME_PATTERN).into_os_string(),
        "-c:v".into(),
        options.codec.clone().into(),
        "-pix_fmt".into(),
        options.pixel_format.clone().into(),
    ];

    match options.codec.as_str() {
        "libx264" | "libx265" => {
            args.push("-crf".into());
            args.push(options.crf.to_string().into());
        }
        "libvpx-vp9" => {
            args.push("-crf".into());
            args.push(options.crf.to_string().into());
            // Constant quality mode
            args.push("-b:v".into());
            args.push("0".into());
        }
        _ => {}
    }

    if let Some(ref preset) = options.preset {
        args.push("-preset".into());
        args.push(preset.into());
    }
    args.extend(options.extra_args.iter().map(OsString::from));
    args.push(output_path.as_os_str().to_owned());
    args
}

/// Encode `frame_XXXXX.png` frames in `frames_dir` into a video.
pub fn encode_video(
    frames_dir: &Path,
    output_path: &Path,
    fps: f64,
    options: &VideoEncodingOptions,
) -> Result<(), String> {
    match check_ffmpeg() {
        FfmpegStatus::Available(version) => log::info!("Using {}", version),
        FfmpegStatus::Unknown => log::warn!("FFmpeg found but version unknown, proceeding anyway"),
        FfmpegStatus::NotFound => {
            return Err(
                "FFmpeg not found. Install FFmpeg and ensure it's in your PATH.".to_string(),
            );
        }
    }

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create output directory: {}", e))?;
    }

    let output = Command::new("ffmpeg")
        .args(ffmpeg_args(frames_dir, output_path, fps, options))
        .output()
        .map_err(|e| format!("Failed to run FFmpeg: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("FFmpeg encoding failed:\n{}", stderr));
    }

    log::info!("Video encoded to {:?}", output_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_check_ffmpeg_does_not_panic() {
        let status = check_ffmpeg();
        if let FfmpegStatus::Available(ref v) = status {
            assert!(!v.is_empty());
        }
    }

    #[test]
    fn test_default_args() {
        let args = strings(&ffmpeg_args(
            Path::new("frames"),
            Path::new("out.mp4"),
            60.0,
            &VideoEncodingOptions::default(),
        ));
        let pattern = Path::new("frames").join(FRAME_PATTERN);
        assert_eq!(
            args,
            vec![
                "-y",
                "-framerate",
                "60",
                "-i",
                pattern.to_str().unwrap(),
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-crf",
                "18",
                "out.mp4",
            ]
        );
    }

    #[test]
    fn test_vp9_preset_and_extra_args() {
        let options = VideoEncodingOptions {
            codec: "libvpx-vp9".to_string(),
            preset: Some("slow".to_string()),
            extra_args: vec!["-loop".to_string(), "0".to_string()],
            ..Default::default()
        };
        let args = strings(&ffmpeg_args(Path::new("f"), Path::new("o.webm"), 30.0, &options));
        let tail = &args[9..];
        assert_eq!(tail, ["-crf", "18", "-b:v", "0", "-preset", "slow", "-loop", "0", "o.webm"]);
    }

    #[test]
    fn test_unknown_codec_skips_crf() {
        let options = VideoEncodingOptions {
            codec: "prores_ks".to_string(),
            ..Default::default()
        };
        let args = strings(&ffmpeg_args(Path::new("f"), Path::new("o.mov"), 24.0, &options));
        assert!(!args.iter().any(|a| a == "-crf"));
    }

    #[test]
    fn test_status_usable() {
        assert!(FfmpegStatus::Available("ffmpeg version 6".into()).is_usable());
        assert!(FfmpegStatus::Unknown.is_usable());
        assert!(!FfmpegStatus::NotFound.is_usable());
    }
}
