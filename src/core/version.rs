use std::cmp::Ordering;
use std::fmt;

/// A version string as published, plus its semantic reading when one exists.
///
/// Registries routinely publish versions that are not strict semver
/// (`1.0`, `v2.3.1`, `01.2.3`), so parsing is lenient and a failed parse is
/// not an error: the release still exists, it just never satisfies a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub raw: String,
    pub semver: Option<semver::Version>,
}

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let semver = parse_lenient(&raw);
        Self { raw, semver }
    }

    /// Orders by semantic version first; a parseable version ranks above an
    /// unparseable one, and the raw text breaks the remaining ties.
    pub fn compare(&self, other: &Version) -> Ordering {
        match (&self.semver, &other.semver) {
            (Some(left), Some(right)) => left.cmp(right).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parses `raw` as a semantic version, accepting the shorthand forms that
/// registries publish: a leading `v`, one or two core components, and
/// leading zeros. Four-component and non-numeric cores are rejected.
pub fn parse_lenient(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(|ch: char| ch == 'v' || ch == 'V')
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(version) = semver::Version::parse(trimmed) {
        return Some(version);
    }

    let (rest, build) = match trimmed.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (trimmed, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let segments: Vec<&str> = core.split('.').collect();
    if segments.len() > 3 {
        return None;
    }
    let mut numbers = [0u64; 3];
    for (slot, segment) in numbers.iter_mut().zip(&segments) {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = segment.parse().ok()?;
    }

    let mut version = semver::Version::new(numbers[0], numbers[1], numbers[2]);
    if let Some(pre) = pre {
        version.pre = semver::Prerelease::new(pre).ok()?;
    }
    if let Some(build) = build {
        version.build = semver::BuildMetadata::new(build).ok()?;
    }
    Some(version)
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use crate::core::version::{parse_lenient, Version};

    #[test]
    fn strict_semver_parses_unchanged() {
        let parsed = parse_lenient("1.2.3-rc.1+build.5").expect("parse strict semver");
        assert_eq!(parsed.to_string(), "1.2.3-rc.1+build.5");
    }

    #[test]
    fn shorthand_versions_are_padded() {
        assert_eq!(parse_lenient("1.0"), Some(semver::Version::new(1, 0, 0)));
        assert_eq!(parse_lenient("v2"), Some(semver::Version::new(2, 0, 0)));
        assert_eq!(parse_lenient("01.02.3"), Some(semver::Version::new(1, 2, 3)));
        assert_eq!(
            parse_lenient("1.0-SNAPSHOT").map(|v| v.to_string()),
            Some("1.0.0-SNAPSHOT".to_string())
        );
    }

    #[test]
    fn malformed_versions_are_rejected() {
        assert_eq!(parse_lenient(""), None);
        assert_eq!(parse_lenient("1.2.3.4"), None);
        assert_eq!(parse_lenient("latest"), None);
        assert_eq!(parse_lenient("1..2"), None);
    }

    #[test]
    fn compare_prefers_parseable_then_raw_text() {
        let newer = Version::new("1.10.0");
        let older = Version::new("1.9.0");
        let junk = Version::new("nightly");
        assert_eq!(newer.compare(&older), Ordering::Greater);
        assert_eq!(junk.compare(&older), Ordering::Less);
        assert_eq!(
            Version::new("abc").compare(&Version::new("abd")),
            Ordering::Less
        );
    }
}
