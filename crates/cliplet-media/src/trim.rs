//! The trim stage: cut the requested range, correcting rotation.
//!
//! One transcoder invocation per job. Stream copy is preferred when no
//! corrective transform is needed; with a transform the video is re-encoded
//! and audio is copied through. Timestamps are normalized so the output
//! starts at zero regardless of where the cut landed.

use std::path::Path;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;
use crate::rotation::RotationPlan;

/// Video codec used when re-encoding for rotation correction.
const TRIM_VIDEO_CODEC: &str = "libx264";
/// Encoding preset for the re-encode path.
const TRIM_PRESET: &str = "fast";
/// CRF for the re-encode path.
const TRIM_CRF: u8 = 18;

/// Output duration may drift from (end - start) by container-seek rounding.
/// Drift beyond this is reported as a quality warning, not a failure.
const DRIFT_TOLERANCE_SECS: f64 = 1.0;

/// One trim request.
#[derive(Debug, Clone)]
pub struct TrimSpec {
    /// Clip start offset in the source, seconds
    pub start_seconds: f64,
    /// Clip end offset in the source, seconds
    pub end_seconds: f64,
    /// Rotation analyzer verdict
    pub plan: RotationPlan,
    /// Transcoder timeout in seconds
    pub timeout_secs: u64,
}

impl TrimSpec {
    /// Requested output duration.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Result of a completed trim.
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    /// Probed duration of the produced artifact
    pub actual_duration: f64,
    /// Drift beyond tolerance, if any (quality warning)
    pub drift_secs: Option<f64>,
}

/// Build the single ffmpeg invocation for a trim.
pub fn build_trim_command(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    spec: &TrimSpec,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(input, output)
        .seek(spec.start_seconds)
        .duration(spec.duration());

    match spec.plan.transform.filter() {
        // No correction: repackage without re-encoding
        None => cmd.codec_copy().zero_timestamps().faststart(),
        Some(filter) => {
            // Stabilization is advisory and only piggybacks on a re-encode
            let chain = if spec.plan.stabilize {
                format!("{},deshake", filter)
            } else {
                filter.to_string()
            };
            cmd.video_filter(chain)
                .video_codec(TRIM_VIDEO_CODEC)
                .preset(TRIM_PRESET)
                .crf(TRIM_CRF)
                .audio_codec("copy")
                .zero_timestamps()
                .faststart()
        }
    }
}

/// Cut the requested range from `input` into `output`.
///
/// A non-zero transcoder exit or an output without a video stream is a
/// terminal trim failure. Duration drift beyond tolerance is surfaced on the
/// outcome and logged, not failed.
pub async fn trim_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    spec: &TrimSpec,
) -> MediaResult<TrimOutcome> {
    let input = input.as_ref();
    let output = output.as_ref();

    info!(
        input = %input.display(),
        output = %output.display(),
        start = spec.start_seconds,
        end = spec.end_seconds,
        transform = ?spec.plan.transform,
        "Trimming clip"
    );

    let cmd = build_trim_command(input, output, spec);
    FfmpegRunner::new()
        .with_timeout(spec.timeout_secs)
        .run(&cmd)
        .await?;

    // probe_video fails when the artifact has no video stream
    let probed = probe_video(output).await.map_err(|e| match e {
        MediaError::InvalidVideo(msg) => MediaError::trim_failed(msg),
        other => other,
    })?;

    let drift_secs = check_drift(spec.duration(), probed.duration);
    if let Some(drift) = drift_secs {
        warn!(
            expected = spec.duration(),
            actual = probed.duration,
            drift = drift,
            "Trim output duration drifted beyond tolerance"
        );
    }

    Ok(TrimOutcome {
        actual_duration: probed.duration,
        drift_secs,
    })
}

/// Drift beyond the container-rounding tolerance, if any.
fn check_drift(expected: f64, actual: f64) -> Option<f64> {
    let drift = (expected - actual).abs();
    (drift > DRIFT_TOLERANCE_SECS).then_some(drift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::{RotationPlan, RotationTransform};

    fn spec(transform: RotationTransform, stabilize: bool) -> TrimSpec {
        TrimSpec {
            start_seconds: 10.0,
            end_seconds: 70.0,
            plan: RotationPlan {
                transform,
                stabilize,
            },
            timeout_secs: 300,
        }
    }

    #[test]
    fn stream_copy_when_no_transform() {
        let cmd = build_trim_command("in.mp4", "out.mp4", &spec(RotationTransform::None, false));
        let args = cmd.build_args().join(" ");
        assert!(args.contains("-c copy"));
        assert!(args.contains("-avoid_negative_ts make_zero"));
        assert!(!args.contains("-vf"));
    }

    #[test]
    fn reencode_with_transform_preserves_audio() {
        let cmd = build_trim_command(
            "in.mp4",
            "out.mp4",
            &spec(RotationTransform::Clockwise90, false),
        );
        let args = cmd.build_args().join(" ");
        assert!(args.contains("-vf transpose=1"));
        assert!(args.contains("-c:v libx264"));
        assert!(args.contains("-c:a copy"));
        assert!(!args.contains("-c copy"));
    }

    #[test]
    fn stabilize_only_applies_when_reencoding() {
        let cmd = build_trim_command(
            "in.mp4",
            "out.mp4",
            &spec(RotationTransform::Rotate180, true),
        );
        let args = cmd.build_args().join(" ");
        assert!(args.contains("transpose=1,transpose=1,deshake"));

        // Advisory flag never forces a re-encode on its own
        let cmd = build_trim_command("in.mp4", "out.mp4", &spec(RotationTransform::None, true));
        let args = cmd.build_args().join(" ");
        assert!(args.contains("-c copy"));
        assert!(!args.contains("deshake"));
    }

    #[test]
    fn cut_range_maps_to_seek_and_duration() {
        let cmd = build_trim_command("in.mp4", "out.mp4", &spec(RotationTransform::None, false));
        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "10.000");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "60.000");
    }

    #[test]
    fn drift_tolerance() {
        assert_eq!(check_drift(60.0, 60.4), None);
        assert_eq!(check_drift(60.0, 59.1), None);
        assert!(check_drift(60.0, 57.0).is_some());
        assert!((check_drift(60.0, 57.0).unwrap() - 3.0).abs() < 1e-9);
    }
}
