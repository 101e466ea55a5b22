//! Preset-driven transcode entry point.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::fs;
use tracing::info;

use rendify_models::{Intensity, PresetSpec};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Transcode a single rendition from `input` to `output`.
///
/// Writes exactly to `output` (overwriting on rerun, never creating
/// siblings), which keeps reprocessing of the same job idempotent. Returns
/// the written path.
pub async fn transcode(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    spec: &PresetSpec,
    intensity: Intensity,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output = output.as_ref().to_path_buf();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await?;
    }

    let cmd = FfmpegCommand::new(input, &output)
        .video_filter(format!("scale={}:{}:flags=lanczos", spec.width, spec.height))
        .output_args(intensity.encoder_args())
        .crf(spec.crf)
        .pixel_format("yuv420p")
        .output_args(["-movflags", "+faststart"])
        .no_audio();

    let started = Instant::now();
    cmd.run().await?;

    info!(
        "Transcoded {} -> {} ({}x{} crf={} intensity={}) in {:.2}s",
        input.display(),
        output.display(),
        spec.width,
        spec.height,
        spec.crf,
        intensity,
        started.elapsed().as_secs_f64()
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendify_models::resolve_preset;

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let spec = resolve_preset("mp4-720p");

        let result = transcode(
            dir.path().join("does-not-exist.mp4"),
            dir.path().join("out.mp4"),
            &spec,
            Intensity::High,
        )
        .await;

        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }

    #[test]
    fn test_transcode_arg_set() {
        let spec = resolve_preset("mp4-480p");
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .video_filter(format!("scale={}:{}:flags=lanczos", spec.width, spec.height))
            .output_args(Intensity::Medium.encoder_args())
            .crf(spec.crf)
            .pixel_format("yuv420p")
            .output_args(["-movflags", "+faststart"])
            .no_audio();

        let args = cmd.build_args();
        assert!(args.contains(&"scale=854:480:flags=lanczos".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"slow".to_string()));
        assert!(args.contains(&"24".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
    }
}
