//! Ordered extraction configurations per platform.
//!
//! Each platform gets a fixed list of configuration profiles, tried in
//! order by the download stage: the most tailored (platform user-agent,
//! browser headers, credentials) first, ending with a bare default. The
//! list is never empty; even with no credential material the bare default
//! remains.

use std::path::{Path, PathBuf};

use cliplet_models::Platform;

/// Desktop Chrome user agent used for browser-like profiles.
const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Mobile Safari user agent used for Instagram.
const IOS_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";

/// Header set sent with browser-like profiles.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Accept-Encoding", "gzip, deflate"),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
];

/// One extraction attempt's configuration.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Profile name, for logging
    pub name: &'static str,
    /// User agent override
    pub user_agent: Option<&'static str>,
    /// Extra HTTP headers
    pub http_headers: &'static [(&'static str, &'static str)],
    /// Extractor arguments (e.g. player client selection)
    pub extractor_args: Option<&'static str>,
    /// Cookies file, when the profile uses credentials and any were found
    pub cookies: Option<PathBuf>,
    /// Socket timeout passed to the extractor
    pub socket_timeout_secs: u64,
    /// Extractor-internal retry count
    pub retries: u32,
}

/// Static profile row; cookies get attached at build time.
struct Profile {
    name: &'static str,
    user_agent: Option<&'static str>,
    http_headers: &'static [(&'static str, &'static str)],
    extractor_args: Option<&'static str>,
    wants_cookies: bool,
}

const YOUTUBE_PROFILES: &[Profile] = &[
    Profile {
        name: "web",
        user_agent: Some(CHROME_UA),
        http_headers: BROWSER_HEADERS,
        extractor_args: Some("youtube:player_client=web"),
        wants_cookies: true,
    },
    Profile {
        name: "android",
        user_agent: None,
        http_headers: &[],
        extractor_args: Some("youtube:player_client=android"),
        wants_cookies: false,
    },
    Profile {
        name: "default",
        user_agent: None,
        http_headers: &[],
        extractor_args: None,
        wants_cookies: false,
    },
];

const FACEBOOK_PROFILES: &[Profile] = &[
    Profile {
        name: "desktop",
        user_agent: Some(CHROME_UA),
        http_headers: BROWSER_HEADERS,
        extractor_args: None,
        wants_cookies: true,
    },
    Profile {
        name: "default",
        user_agent: None,
        http_headers: &[],
        extractor_args: None,
        wants_cookies: false,
    },
];

const INSTAGRAM_PROFILES: &[Profile] = &[
    Profile {
        name: "mobile",
        user_agent: Some(IOS_UA),
        http_headers: BROWSER_HEADERS,
        extractor_args: None,
        wants_cookies: true,
    },
    Profile {
        name: "default",
        user_agent: None,
        http_headers: &[],
        extractor_args: None,
        wants_cookies: false,
    },
];

const TIKTOK_PROFILES: &[Profile] = &[
    Profile {
        name: "desktop",
        user_agent: Some(CHROME_UA),
        http_headers: BROWSER_HEADERS,
        extractor_args: None,
        wants_cookies: false,
    },
    Profile {
        name: "default",
        user_agent: None,
        http_headers: &[],
        extractor_args: None,
        wants_cookies: false,
    },
];

const DEFAULT_PROFILES: &[Profile] = &[Profile {
    name: "default",
    user_agent: None,
    http_headers: &[],
    extractor_args: None,
    wants_cookies: true,
}];

fn profiles_for(platform: Platform) -> &'static [Profile] {
    match platform {
        Platform::Youtube => YOUTUBE_PROFILES,
        Platform::Facebook => FACEBOOK_PROFILES,
        Platform::Instagram => INSTAGRAM_PROFILES,
        Platform::Tiktok => TIKTOK_PROFILES,
        Platform::Unknown => DEFAULT_PROFILES,
    }
}

/// Build the ordered configuration list for a platform.
///
/// `cookies` is whatever the credential resolution produced; profiles that
/// use credentials get it attached, the rest run bare. Returns at least one
/// configuration.
pub fn build_extraction_configs(
    platform: Platform,
    cookies: Option<&Path>,
) -> Vec<ExtractionConfig> {
    profiles_for(platform)
        .iter()
        .map(|p| ExtractionConfig {
            name: p.name,
            user_agent: p.user_agent,
            http_headers: p.http_headers,
            extractor_args: p.extractor_args,
            cookies: if p.wants_cookies {
                cookies.map(Path::to_path_buf)
            } else {
                None
            },
            socket_timeout_secs: if p.name == "default" { 20 } else { 30 },
            retries: if p.name == "default" { 1 } else { 2 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_has_at_least_one_config() {
        for platform in [
            Platform::Youtube,
            Platform::Facebook,
            Platform::Instagram,
            Platform::Tiktok,
            Platform::Unknown,
        ] {
            let configs = build_extraction_configs(platform, None);
            assert!(!configs.is_empty(), "no configs for {}", platform);
        }
    }

    #[test]
    fn tailored_profile_comes_first_and_default_last() {
        let configs = build_extraction_configs(Platform::Youtube, None);
        assert_eq!(configs.first().unwrap().name, "web");
        assert_eq!(configs.last().unwrap().name, "default");
        assert!(configs.first().unwrap().user_agent.is_some());
        assert!(configs.last().unwrap().user_agent.is_none());
    }

    #[test]
    fn cookies_attach_only_to_credential_profiles() {
        let jar = PathBuf::from("/tmp/jar.txt");
        let configs = build_extraction_configs(Platform::Youtube, Some(&jar));

        let web = configs.iter().find(|c| c.name == "web").unwrap();
        let android = configs.iter().find(|c| c.name == "android").unwrap();
        assert_eq!(web.cookies.as_deref(), Some(jar.as_path()));
        assert!(android.cookies.is_none());
    }

    #[test]
    fn no_credentials_still_yields_configs() {
        let configs = build_extraction_configs(Platform::Instagram, None);
        assert!(configs.iter().all(|c| c.cookies.is_none()));
        assert_eq!(configs.len(), 2);
    }
}
