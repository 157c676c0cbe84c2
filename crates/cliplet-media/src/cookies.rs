//! Credential (cookie) resolution for the extractor.
//!
//! Resolution order per platform:
//! 1. explicit path override (`CLIPLET_COOKIES_FILE`)
//! 2. base64-encoded payload from the environment (`{PLATFORM}_COOKIES_B64`)
//! 3. plaintext payload from the environment (`{PLATFORM}_COOKIES`)
//! 4. conventional on-disk locations, platform-specific file first
//!
//! Finding nothing is normal: extraction proceeds without credentials and
//! the lack only shows up as a later auth failure, if at all.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cliplet_models::Platform;

/// Minimum size for a valid cookies file (bytes).
/// A real Netscape cookies file is at least ~50 bytes.
const MIN_COOKIES_FILE_SIZE: u64 = 50;

/// Guards concurrent materialization of cookie files.
static COOKIES_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Where credential material may live. Built from the environment once at
/// startup; tests inject their own paths.
#[derive(Debug, Clone)]
pub struct CredentialPaths {
    /// Explicit path override, wins over everything
    pub override_path: Option<PathBuf>,
    /// Directories searched for conventional cookie files, in order
    pub search_dirs: Vec<PathBuf>,
}

impl Default for CredentialPaths {
    fn default() -> Self {
        Self {
            override_path: None,
            search_dirs: vec![PathBuf::from("/app"), PathBuf::from("/etc/cliplet")],
        }
    }
}

impl CredentialPaths {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self {
            override_path: std::env::var("CLIPLET_COOKIES_FILE").ok().map(PathBuf::from),
            ..Self::default()
        }
    }
}

/// Resolve a usable cookies file for a platform, if any exists.
///
/// The returned path is always writable: yt-dlp saves cookies back after
/// use, so read-only sources are copied into a temp location first.
pub async fn resolve_cookies(platform: Platform, paths: &CredentialPaths) -> Option<PathBuf> {
    // 1. Explicit override
    if let Some(ref path) = paths.override_path {
        if let Some(found) = usable_cookies_file(platform, path).await {
            info!(platform = %platform, path = %found.display(), "Using cookies file override");
            return Some(found);
        }
    }

    let env_prefix = platform.as_str().to_ascii_uppercase();

    // 2. Encoded payload from environment
    if let Ok(encoded) = std::env::var(format!("{}_COOKIES_B64", env_prefix)) {
        match BASE64.decode(encoded.trim()) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => {
                    if let Some(path) = materialize(platform, &content).await {
                        info!(platform = %platform, "Using base64 cookies payload from environment");
                        return Some(path);
                    }
                }
                Err(_) => warn!(platform = %platform, "Cookies payload is not valid UTF-8"),
            },
            Err(e) => warn!(platform = %platform, "Failed to decode cookies payload: {}", e),
        }
    }

    // 3. Plaintext payload from environment
    if let Ok(content) = std::env::var(format!("{}_COOKIES", env_prefix)) {
        if let Some(path) = materialize(platform, &content).await {
            info!(platform = %platform, "Using plaintext cookies payload from environment");
            return Some(path);
        }
    }

    // 4. Conventional on-disk locations
    for dir in &paths.search_dirs {
        for name in candidate_file_names(platform) {
            let candidate = dir.join(name);
            if let Some(found) = usable_cookies_file(platform, &candidate).await {
                info!(platform = %platform, path = %found.display(), "Using on-disk cookies file");
                return Some(found);
            }
        }
    }

    debug!(platform = %platform, "No cookies available, extraction proceeds without credentials");
    None
}

/// File names searched for a platform, most specific first.
fn candidate_file_names(platform: Platform) -> Vec<String> {
    match platform {
        Platform::Unknown => vec!["cookies.txt".to_string()],
        p => vec![format!("{}-cookies.txt", p.as_str()), "cookies.txt".to_string()],
    }
}

/// Validate a file and copy it to a writable location.
async fn usable_cookies_file(platform: Platform, path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }

    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.len() < MIN_COOKIES_FILE_SIZE => {
            debug!(
                "Cookies file {} is too small ({} bytes), skipping",
                path.display(),
                metadata.len()
            );
            return None;
        }
        Ok(_) => {}
        Err(e) => {
            warn!("Failed to read cookies file metadata: {}", e);
            return None;
        }
    }

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read cookies file {}: {}", path.display(), e);
            return None;
        }
    };

    if !is_valid_netscape_cookies(&content) {
        debug!(
            "Cookies file {} is not in valid Netscape format, skipping",
            path.display()
        );
        return None;
    }

    materialize(platform, &content).await
}

/// Write cookie content to the per-platform writable temp path.
async fn materialize(platform: Platform, content: &str) -> Option<PathBuf> {
    if !is_valid_netscape_cookies(content) {
        debug!(platform = %platform, "Cookies payload is not in valid Netscape format, skipping");
        return None;
    }

    let dest = writable_cookies_path(platform);
    let lock = COOKIES_LOCK.get_or_init(|| Mutex::new(()));
    let _guard = lock.lock().await;

    match tokio::fs::write(&dest, content).await {
        Ok(()) => Some(dest),
        Err(e) => {
            warn!("Failed to write cookies file {}: {}", dest.display(), e);
            None
        }
    }
}

/// Writable temp path for a platform's cookies.
fn writable_cookies_path(platform: Platform) -> PathBuf {
    std::env::temp_dir().join(format!("cliplet-{}-cookies.txt", platform.as_str()))
}

/// Validate that cookie content appears to be in Netscape format.
///
/// Netscape cookies files either start with "# Netscape HTTP Cookie File"
/// or contain tab-separated lines with domain entries.
pub fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File")
        || content.starts_with("# HTTP Cookie File")
    {
        return true;
    }

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() >= 6 {
            return true;
        }
    }

    false
}
