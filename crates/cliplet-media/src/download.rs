//! Source download via yt-dlp with an ordered fallback chain.
//!
//! The download stage walks the platform's extraction configurations in
//! order, invoking yt-dlp once per configuration until one succeeds or the
//! chain is exhausted. Failures are classified from the extractor's stderr;
//! when everything fails the LAST classified failure is reported: later
//! configurations are more specific and their failure reason is the more
//! diagnostic one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::tail_lines;
use crate::error::{MediaError, MediaResult};
use crate::extraction::ExtractionConfig;

/// Reuse an already-downloaded source when it is at least this large.
const MIN_REUSE_FILE_SIZE: u64 = 1024 * 1024;

/// Classified reason an extraction attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadFailureKind {
    /// Credentials required (login wall, age gate, bot check)
    AuthRequired,
    /// The platform throttled the request
    RateLimited,
    /// Content is private, removed, or region-locked
    Unavailable,
    /// The attempt hit its time ceiling
    Timeout,
    /// Anything we could not classify
    Unknown,
}

impl fmt::Display for DownloadFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DownloadFailureKind::AuthRequired => "auth-required",
            DownloadFailureKind::RateLimited => "rate-limited",
            DownloadFailureKind::Unavailable => "unavailable",
            DownloadFailureKind::Timeout => "timeout",
            DownloadFailureKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Size and time ceilings for one download.
#[derive(Debug, Clone)]
pub struct DownloadLimits {
    /// Maximum artifact size in MiB, enforced by the extractor
    pub max_filesize_mb: u64,
    /// Wall-clock ceiling per attempt
    pub attempt_timeout: Duration,
}

impl Default for DownloadLimits {
    fn default() -> Self {
        Self {
            max_filesize_mb: 2048,
            attempt_timeout: Duration::from_secs(600),
        }
    }
}

/// A successfully downloaded source asset.
#[derive(Debug, Clone)]
pub struct DownloadedAsset {
    /// Local path of the asset
    pub path: PathBuf,
    /// Source title, when the extractor reported one (diagnostics only)
    pub title: Option<String>,
    /// Source duration in seconds, when reported (diagnostics only)
    pub duration_secs: Option<f64>,
}

/// Classify extractor failure text.
pub fn classify_failure(stderr: &str) -> DownloadFailureKind {
    let text = stderr.to_ascii_lowercase();

    if text.contains("429")
        || text.contains("too many requests")
        || text.contains("rate limit")
        || text.contains("rate-limit")
    {
        return DownloadFailureKind::RateLimited;
    }

    if text.contains("sign in to confirm")
        || text.contains("login required")
        || text.contains("log in or sign up")
        || text.contains("use --cookies")
        || text.contains("authentication")
        || (text.contains("age") && (text.contains("restrict") || text.contains("verif")))
    {
        return DownloadFailureKind::AuthRequired;
    }

    if text.contains("private video")
        || text.contains("video unavailable")
        || text.contains("is unavailable")
        || text.contains("not available")
        || text.contains("has been removed")
        || text.contains("was deleted")
        || text.contains("copyright")
        || text.contains("in your country")
        || text.contains("404")
    {
        return DownloadFailureKind::Unavailable;
    }

    if text.contains("timed out") || text.contains("timeout") {
        return DownloadFailureKind::Timeout;
    }

    DownloadFailureKind::Unknown
}

/// Download the source asset, walking the configuration chain.
///
/// Returns the first success; otherwise a `DownloadFailed` carrying the last
/// classified failure. The configuration list must be non-empty (the
/// builder guarantees a bare default).
pub async fn download_clip_source(
    url: &str,
    format_selector: &str,
    configs: &[ExtractionConfig],
    limits: &DownloadLimits,
    output_path: impl AsRef<Path>,
) -> MediaResult<DownloadedAsset> {
    let output_path = output_path.as_ref();

    // Reuse a previously downloaded asset of plausible size
    if output_path.exists() {
        if let Ok(metadata) = output_path.metadata() {
            if metadata.len() >= MIN_REUSE_FILE_SIZE {
                info!("Using existing source file: {}", output_path.display());
                return Ok(DownloadedAsset {
                    path: output_path.to_path_buf(),
                    title: None,
                    duration_secs: None,
                });
            }
            tokio::fs::remove_file(output_path).await?;
        }
    }

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let mut last_failure: Option<(DownloadFailureKind, String)> = None;

    for config in configs {
        debug!(
            config = config.name,
            format = format_selector,
            "Attempting extraction"
        );

        match run_attempt(url, format_selector, config, limits, output_path).await {
            Ok(asset) => {
                info!(
                    config = config.name,
                    output = %output_path.display(),
                    title = asset.title.as_deref().unwrap_or("<unknown>"),
                    "Extraction succeeded"
                );
                return Ok(asset);
            }
            Err((kind, message)) => {
                warn!(
                    config = config.name,
                    kind = %kind,
                    "Extraction attempt failed: {}",
                    message.lines().last().unwrap_or("unknown error")
                );
                last_failure = Some((kind, message));
            }
        }
    }

    let (kind, message) = last_failure.unwrap_or((
        DownloadFailureKind::Unknown,
        "No extraction configurations available".to_string(),
    ));
    Err(MediaError::download_failed(kind, message))
}

/// Run one yt-dlp invocation under one configuration.
async fn run_attempt(
    url: &str,
    format_selector: &str,
    config: &ExtractionConfig,
    limits: &DownloadLimits,
    output_path: &Path,
) -> Result<DownloadedAsset, (DownloadFailureKind, String)> {
    let mut args: Vec<String> = vec![
        "--no-playlist".to_string(),
        "--no-progress".to_string(),
        "--no-warnings".to_string(),
        "--socket-timeout".to_string(),
        config.socket_timeout_secs.to_string(),
        "--retries".to_string(),
        config.retries.to_string(),
        "--max-filesize".to_string(),
        format!("{}M", limits.max_filesize_mb),
        "--merge-output-format".to_string(),
        "mp4".to_string(),
        // Title and duration land on stdout for diagnostics
        "--no-simulate".to_string(),
        "--print".to_string(),
        "title".to_string(),
        "--print".to_string(),
        "duration".to_string(),
        "-f".to_string(),
        format_selector.to_string(),
        "-o".to_string(),
        output_path.to_string_lossy().to_string(),
    ];

    if let Some(ua) = config.user_agent {
        args.push("--user-agent".to_string());
        args.push(ua.to_string());
    }
    for (key, value) in config.http_headers {
        args.push("--add-header".to_string());
        args.push(format!("{}:{}", key, value));
    }
    if let Some(extractor_args) = config.extractor_args {
        args.push("--extractor-args".to_string());
        args.push(extractor_args.to_string());
    }
    if let Some(ref cookies) = config.cookies {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().to_string());
    }
    args.push(url.to_string());

    let child = Command::new("yt-dlp")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            (
                DownloadFailureKind::Unknown,
                format!("Failed to spawn yt-dlp: {}", e),
            )
        })?;

    let output = match tokio::time::timeout(limits.attempt_timeout, child.wait_with_output()).await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err((
                DownloadFailureKind::Unknown,
                format!("yt-dlp wait failed: {}", e),
            ))
        }
        Err(_) => {
            return Err((
                DownloadFailureKind::Timeout,
                format!(
                    "Extraction exceeded {}s time ceiling",
                    limits.attempt_timeout.as_secs()
                ),
            ))
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err((classify_failure(&stderr), tail_lines(&stderr, 5)));
    }

    if !output_path.exists() {
        return Err((
            DownloadFailureKind::Unknown,
            "Extractor exited cleanly but produced no output file".to_string(),
        ));
    }

    let (title, duration_secs) = parse_printed_metadata(&String::from_utf8_lossy(&output.stdout));

    Ok(DownloadedAsset {
        path: output_path.to_path_buf(),
        title,
        duration_secs,
    })
}

/// Parse the `--print title` / `--print duration` stdout lines.
/// Both are best-effort; yt-dlp prints "NA" when a field is unknown.
fn parse_printed_metadata(stdout: &str) -> (Option<String>, Option<f64>) {
    let mut lines = stdout.lines().filter(|l| !l.trim().is_empty());
    let title = lines
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "NA")
        .map(str::to_string);
    let duration = lines.next().and_then(|l| l.trim().parse::<f64>().ok());
    (title, duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_limiting() {
        assert_eq!(
            classify_failure("ERROR: HTTP Error 429: Too Many Requests"),
            DownloadFailureKind::RateLimited
        );
        assert_eq!(
            classify_failure("WARNING: rate limit reached"),
            DownloadFailureKind::RateLimited
        );
    }

    #[test]
    fn classifies_auth_requirements() {
        assert_eq!(
            classify_failure("ERROR: Sign in to confirm you're not a bot"),
            DownloadFailureKind::AuthRequired
        );
        assert_eq!(
            classify_failure("ERROR: This video is age-restricted; use --cookies"),
            DownloadFailureKind::AuthRequired
        );
        assert_eq!(
            classify_failure("ERROR: Login required to access this content"),
            DownloadFailureKind::AuthRequired
        );
    }

    #[test]
    fn classifies_unavailable_content() {
        assert_eq!(
            classify_failure("ERROR: Private video"),
            DownloadFailureKind::Unavailable
        );
        assert_eq!(
            classify_failure("ERROR: Video unavailable"),
            DownloadFailureKind::Unavailable
        );
        assert_eq!(
            classify_failure("ERROR: The uploader has not made this video available in your country"),
            DownloadFailureKind::Unavailable
        );
        assert_eq!(
            classify_failure("ERROR: This video has been removed by the uploader"),
            DownloadFailureKind::Unavailable
        );
    }

    #[test]
    fn classifies_timeouts_and_unknown() {
        assert_eq!(
            classify_failure("ERROR: Connection timed out"),
            DownloadFailureKind::Timeout
        );
        assert_eq!(
            classify_failure("ERROR: something novel happened"),
            DownloadFailureKind::Unknown
        );
    }

    #[test]
    fn parses_printed_metadata() {
        let (title, duration) = parse_printed_metadata("Some Video Title\n3621.0\n");
        assert_eq!(title.as_deref(), Some("Some Video Title"));
        assert_eq!(duration, Some(3621.0));

        let (title, duration) = parse_printed_metadata("NA\nNA\n");
        assert_eq!(title, None);
        assert_eq!(duration, None);

        let (title, duration) = parse_printed_metadata("");
        assert_eq!(title, None);
        assert_eq!(duration, None);
    }
}
