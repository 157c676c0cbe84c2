//! Platform classification and format-selector resolution.
//!
//! All per-platform branching lives in the lookup tables below: URL patterns,
//! resolution maps, and fallback selectors. Adding a platform means adding
//! table rows, nothing else. Resolution is a pure function of these tables
//! and never fails; anything unrecognized falls through to a generic
//! selector.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported source platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Facebook,
    Instagram,
    Tiktok,
    #[default]
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered URL patterns; first match wins. Matching is case-insensitive
/// substring matching; source URLs arrive already validated as http(s).
const URL_PATTERNS: &[(Platform, &[&str])] = &[
    (
        Platform::Youtube,
        &["youtube.com/", "youtu.be/", "youtube-nocookie.com/"],
    ),
    (
        Platform::Facebook,
        &["facebook.com/", "fb.watch/", "fb.com/"],
    ),
    (
        Platform::Instagram,
        &["instagram.com/", "instagr.am/"],
    ),
    (Platform::Tiktok, &["tiktok.com/", "vm.tiktok.com/"]),
];

/// Per-platform resolution label to extractor format identifier.
///
/// YouTube entries are the classic progressive/DASH itags; Facebook uses the
/// named DASH variants. Platforms that only expose a single variant have no
/// rows; absence is not an error, it falls through to the platform fallback.
const RESOLUTION_MAPS: &[(Platform, &[(&str, &str)])] = &[
    (
        Platform::Youtube,
        &[
            ("360p", "18"),
            ("720p", "22"),
            ("1080p", "137+140"),
            ("1440p", "271+140"),
            ("2160p", "313+140"),
        ],
    ),
    (
        Platform::Facebook,
        &[("360p", "dash_sd_src"), ("720p", "dash_hd_src")],
    ),
];

/// Default height ceiling for fallback selectors.
const FALLBACK_HEIGHT_CEILING: u32 = 720;

/// Classify a URL into a platform.
pub fn resolve_platform(url: &str) -> Platform {
    let url = url.to_ascii_lowercase();
    for (platform, patterns) in URL_PATTERNS {
        if patterns.iter().any(|p| url.contains(p)) {
            return *platform;
        }
    }
    Platform::Unknown
}

/// Resolve the effective format selector for a request.
///
/// Priority, highest first:
/// 1. An explicit format identifier is returned unchanged.
/// 2. A resolution label present in the platform's resolution map.
/// 3. The platform's generic fallback selector.
pub fn resolve_format(
    platform: Platform,
    resolution: Option<&str>,
    format_id: Option<&str>,
) -> String {
    if let Some(id) = format_id {
        let id = id.trim();
        if !id.is_empty() {
            return id.to_string();
        }
    }

    if let Some(label) = resolution {
        if let Some(format) = lookup_resolution(platform, label) {
            return format.to_string();
        }
    }

    fallback_selector(platform).to_string()
}

/// Look up a resolution label in a platform's map.
fn lookup_resolution(platform: Platform, label: &str) -> Option<&'static str> {
    let label = label.trim().to_ascii_lowercase();
    RESOLUTION_MAPS
        .iter()
        .find(|(p, _)| *p == platform)
        .and_then(|(_, rows)| {
            rows.iter()
                .find(|(l, _)| *l == label.as_str())
                .map(|(_, f)| *f)
        })
}

/// Generic fallback selector for a platform: best available at or below the
/// default ceiling, preferring mp4 where the platform serves it.
pub fn fallback_selector(platform: Platform) -> &'static str {
    match platform {
        Platform::Youtube => {
            "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best"
        }
        Platform::Facebook => "best[height<=720]/best",
        Platform::Instagram => "best",
        Platform::Tiktok => "best",
        Platform::Unknown => "best[height<=720]/best",
    }
}

/// The ceiling used by the bounded fallback selectors.
pub fn fallback_height_ceiling() -> u32 {
    FALLBACK_HEIGHT_CEILING
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_platforms() {
        assert_eq!(
            resolve_platform("https://www.youtube.com/watch?v=abc123def45"),
            Platform::Youtube
        );
        assert_eq!(
            resolve_platform("https://youtu.be/abc123def45"),
            Platform::Youtube
        );
        assert_eq!(
            resolve_platform("https://fb.watch/xyz/"),
            Platform::Facebook
        );
        assert_eq!(
            resolve_platform("https://www.instagram.com/reel/abc/"),
            Platform::Instagram
        );
        assert_eq!(
            resolve_platform("https://vm.tiktok.com/ZM123/"),
            Platform::Tiktok
        );
        assert_eq!(
            resolve_platform("https://example.com/video.mp4"),
            Platform::Unknown
        );
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(
            resolve_platform("HTTPS://WWW.YOUTUBE.COM/WATCH?V=ABC"),
            Platform::Youtube
        );
    }

    #[test]
    fn explicit_format_id_wins() {
        let selector = resolve_format(Platform::Youtube, Some("720p"), Some("299+140"));
        assert_eq!(selector, "299+140");
    }

    #[test]
    fn resolution_label_maps_to_stream_id() {
        assert_eq!(resolve_format(Platform::Youtube, Some("720p"), None), "22");
        assert_eq!(resolve_format(Platform::Youtube, Some("360p"), None), "18");
        assert_eq!(
            resolve_format(Platform::Facebook, Some("720p"), None),
            "dash_hd_src"
        );
    }

    #[test]
    fn unmapped_resolution_falls_back() {
        let selector = resolve_format(Platform::Youtube, Some("480p"), None);
        assert_eq!(selector, fallback_selector(Platform::Youtube));

        let selector = resolve_format(Platform::Tiktok, Some("720p"), None);
        assert_eq!(selector, fallback_selector(Platform::Tiktok));
    }

    #[test]
    fn missing_everything_falls_back() {
        let selector = resolve_format(Platform::Unknown, None, None);
        assert_eq!(selector, "best[height<=720]/best");
    }

    #[test]
    fn empty_format_id_is_ignored() {
        let selector = resolve_format(Platform::Youtube, Some("720p"), Some("  "));
        assert_eq!(selector, "22");
    }

    #[test]
    fn resolution_is_deterministic() {
        let url = "https://youtube.com/watch?v=abc123def45";
        let a = (
            resolve_platform(url),
            resolve_format(resolve_platform(url), Some("720p"), None),
        );
        let b = (
            resolve_platform(url),
            resolve_format(resolve_platform(url), Some("720p"), None),
        );
        assert_eq!(a, b);
    }
}
