//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};
use crate::rotation::RotationSignals;

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Video codec
    pub codec: String,
    /// File size in bytes
    pub size: u64,
    /// Rotation hints from stream/container/display-matrix metadata
    pub rotation: RotationSignals,
    /// Stream handler name tag, when present (e.g. "Core Media Video")
    pub handler_name: Option<String>,
    /// Container encoder tag, when present
    pub encoder: Option<String>,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    side_data_type: Option<String>,
    rotation: Option<f64>,
}

/// Probe a video file for information.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Get video duration in seconds.
pub async fn get_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let info = probe_video(path).await?;
    Ok(info.duration)
}

/// Parse raw ffprobe JSON into `VideoInfo`.
fn parse_probe_output(raw: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(raw)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe
        .format
        .size
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    // The three rotation hints are observed independently. A tag can be
    // missing, "0", or a signed degree string; the display matrix reports a
    // float degree value.
    let stream_tag = video_stream
        .tags
        .get("rotate")
        .and_then(|r| r.parse::<i32>().ok());

    let format_tag = probe
        .format
        .tags
        .get("rotate")
        .and_then(|r| r.parse::<i32>().ok());

    let display_matrix = video_stream
        .side_data_list
        .iter()
        .find(|sd| {
            sd.side_data_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("Display Matrix"))
        })
        .and_then(|sd| sd.rotation)
        .map(|r| r.round() as i32);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        size,
        rotation: RotationSignals {
            stream_tag,
            format_tag,
            display_matrix,
        },
        handler_name: video_stream.tags.get("handler_name").cloned(),
        encoder: probe.format.tags.get("encoder").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON_ROTATED: &str = r#"{
        "format": {
            "duration": "62.145000",
            "size": "10485760",
            "tags": { "encoder": "Lavf58.76.100" }
        },
        "streams": [
            {
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "tags": { "rotate": "90", "handler_name": "Core Media Video" },
                "side_data_list": [
                    { "side_data_type": "Display Matrix", "rotation": -90.0 }
                ]
            },
            { "codec_type": "audio", "codec_name": "aac" }
        ]
    }"#;

    const PROBE_JSON_PLAIN: &str = r#"{
        "format": { "duration": "30.0", "size": "1000" },
        "streams": [
            { "codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720 }
        ]
    }"#;

    const PROBE_JSON_AUDIO_ONLY: &str = r#"{
        "format": { "duration": "30.0" },
        "streams": [ { "codec_type": "audio", "codec_name": "aac" } ]
    }"#;

    #[test]
    fn parses_rotation_signals() {
        let info = parse_probe_output(PROBE_JSON_ROTATED.as_bytes()).unwrap();
        assert_eq!(info.rotation.stream_tag, Some(90));
        assert_eq!(info.rotation.display_matrix, Some(-90));
        assert_eq!(info.rotation.format_tag, None);
        assert_eq!(info.handler_name.as_deref(), Some("Core Media Video"));
        assert!((info.duration - 62.145).abs() < 0.001);
    }

    #[test]
    fn absent_signals_stay_absent() {
        let info = parse_probe_output(PROBE_JSON_PLAIN.as_bytes()).unwrap();
        assert_eq!(info.rotation.stream_tag, None);
        assert_eq!(info.rotation.format_tag, None);
        assert_eq!(info.rotation.display_matrix, None);
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
    }

    #[test]
    fn missing_video_stream_is_invalid() {
        let err = parse_probe_output(PROBE_JSON_AUDIO_ONLY.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
    }
}
