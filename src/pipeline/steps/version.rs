//! NVDA version resolution.
//!
//! A version is either given explicitly or scraped from the release directory listing. The
//! listing is searched for the `stable -> ./<version>` symlink first; failing that, the highest
//! year-first release that is not a pre-release wins.

use crate::pipeline::{
    Error, Result,
    clock::Clock,
    settings::Settings,
    utils::http,
};
use handlebars::Handlebars;
use regex::Regex;
use std::{cmp::Ordering, fmt, str::FromStr, sync::LazyLock};

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)+$").expect("valid version regex"));

/// `stable -> ./2024.4.2`, also in its HTML-escaped form.
static STABLE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"stable\s+(?:\\?->|-&gt;)\s+\.?\.?/?\.?/?(\d+(?:\.\d+)+)")
        .expect("valid stable marker regex")
});

/// Year-first release entries, with an optional pre-release suffix captured separately.
static RELEASE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{4}(?:\.\d+)+)([-_.]?(?:beta|rc|alpha|dev))?")
        .expect("valid release entry regex")
});

/// A dotted numeric NVDA version such as `2024.4.2`.
///
/// Versions compare numerically component by component, so `2024.10` sorts after `2024.9`.
#[derive(Debug, Clone)]
pub struct NvdaVersion {
    raw: String,
    parts: Vec<u64>,
}

impl NvdaVersion {
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for NvdaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        if !VERSION_PATTERN.is_match(raw) {
            return Err(Error::Resolution(format!(
                "invalid version '{}': expected dotted numbers such as 2024.4.2",
                s
            )));
        }
        let parts = raw
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|e| Error::Resolution(format!("invalid version '{}': {}", s, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }
}

impl fmt::Display for NvdaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for NvdaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NvdaVersion {}

impl PartialOrd for NvdaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NvdaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| {
                let a = self.parts.get(i).copied().unwrap_or(0);
                let b = other.parts.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// Where a resolved version came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    /// Supplied by the caller
    Explicit,
    /// Scraped from the release listing
    Discovered,
    /// Discovery failed and the configured last-known-good version was used
    Fallback(String),
}

impl VersionSource {
    pub fn name(&self) -> &'static str {
        match self {
            VersionSource::Explicit => "explicit",
            VersionSource::Discovered => "discovered",
            VersionSource::Fallback(_) => "fallback",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, VersionSource::Fallback(_))
    }
}

/// Output of the version resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub version: NvdaVersion,
    pub url: String,
    pub source: VersionSource,
}

/// Extracts the latest stable version from a release directory listing.
pub fn parse_latest_version(listing: &str) -> Option<NvdaVersion> {
    if let Some(version) = STABLE_MARKER
        .captures(listing)
        .and_then(|caps| caps[1].parse::<NvdaVersion>().ok())
    {
        log::debug!("Found stable marker pointing at {}", version);
        return Some(version);
    }

    log::debug!("No stable marker in listing; scanning release entries");
    RELEASE_ENTRY
        .captures_iter(listing)
        .filter(|caps| caps.get(2).is_none())
        .filter_map(|caps| caps[1].parse::<NvdaVersion>().ok())
        .max()
}

/// Renders the installer URL for `version` from a `{{version}}` template.
pub fn download_url(template: &str, version: &NvdaVersion) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);

    let rendered = handlebars
        .render_template(template, &serde_json::json!({ "version": version.as_str() }))
        .map_err(|e| Error::Resolution(format!("cannot render download URL: {}", e)))?;

    url::Url::parse(&rendered)
        .map_err(|e| Error::Resolution(format!("invalid download URL '{}': {}", rendered, e)))?;
    Ok(rendered)
}

/// Resolves the version to build and its installer URL.
///
/// An explicit version is validated and never replaced by the fallback. Discovery failures
/// fall back to [`Settings::fallback_version`] when one is configured.
pub async fn resolve<C: Clock>(
    client: &reqwest::Client,
    clock: &C,
    settings: &Settings,
    explicit: Option<&str>,
) -> Result<Resolution> {
    let template = settings.download_url_template();

    if let Some(explicit) = explicit {
        let version: NvdaVersion = explicit.parse()?;
        let url = download_url(template, &version)?;
        log::info!("Using requested NVDA version {}", version);
        return Ok(Resolution {
            version,
            url,
            source: VersionSource::Explicit,
        });
    }

    match discover(client, clock, settings).await {
        Ok(version) => {
            let url = download_url(template, &version)?;
            log::info!("Latest NVDA version is {}", version);
            Ok(Resolution {
                version,
                url,
                source: VersionSource::Discovered,
            })
        }
        Err(err) => {
            let Some(fallback) = settings.fallback_version() else {
                return Err(err);
            };
            let version: NvdaVersion = fallback.parse()?;
            log::warn!(
                "Version discovery failed ({}); falling back to last known good version {}",
                err,
                version
            );
            let url = download_url(template, &version)?;
            Ok(Resolution {
                version,
                url,
                source: VersionSource::Fallback(err.to_string()),
            })
        }
    }
}

async fn discover<C: Clock>(
    client: &reqwest::Client,
    clock: &C,
    settings: &Settings,
) -> Result<NvdaVersion> {
    let index_url = settings.release_index_url();
    let listing = http::fetch_text(client, clock, settings.retry(), index_url)
        .await
        .map_err(|e| Error::Resolution(format!("cannot fetch {}: {}", index_url, e)))?;

    parse_latest_version(&listing)
        .ok_or_else(|| Error::Resolution(format!("no release version found at {}", index_url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> NvdaVersion {
        s.parse().unwrap()
    }

    #[test]
    fn stable_marker_wins_over_newer_entries() {
        let listing = "\
2025.1beta3     2025-01-10
2024.4.2        2024-12-01
stable -> ./2024.4.1
";
        assert_eq!(parse_latest_version(listing), Some(v("2024.4.1")));
    }

    #[test]
    fn escaped_stable_marker_is_recognised() {
        let listing = r#"<a href="stable/">stable -&gt; ../2024.4.2</a>"#;
        assert_eq!(parse_latest_version(listing), Some(v("2024.4.2")));
    }

    #[test]
    fn fallback_scan_skips_prereleases_and_compares_numerically() {
        let listing = r#"
<a href="2024.9.1/">2024.9.1/</a>    01-Nov-2024 10:00
<a href="2024.10/">2024.10/</a>      01-Dec-2024 10:00
<a href="2025.1rc1/">2025.1rc1/</a>  01-Jan-2025 10:00
<a href="2025.1beta2/">2025.1beta2/</a>
"#;
        assert_eq!(parse_latest_version(listing), Some(v("2024.10")));
    }

    #[test]
    fn empty_listing_has_no_version() {
        assert_eq!(parse_latest_version("<html>nothing here</html>"), None);
    }

    #[test]
    fn url_contains_the_exact_version() {
        for version in ["2024.4.2", "2019.3", "2023.3.4.1"] {
            let url = download_url(crate::pipeline::settings::DOWNLOAD_URL_TEMPLATE, &v(version))
                .unwrap();
            assert!(url.contains(&format!("/{}/nvda_{}.exe", version, version)));
        }
    }

    #[test]
    fn invalid_versions_are_rejected() {
        for bad in ["", "2024", "2024.4.x", "latest", "2024..1"] {
            let err = bad.parse::<NvdaVersion>().unwrap_err();
            assert_eq!(err.kind(), "ResolutionError", "{bad}");
        }
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(v("2024.10") > v("2024.9.1"));
        assert_eq!(v("2024.4"), v("2024.4.0"));
    }
}
