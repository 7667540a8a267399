use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::core::version::parse_lenient;

/// How dependency range strings in an input document are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangeSyntax {
    /// npm-style ranges: `^1.2`, `>=1.0.0 <2.0.0`, `1.x || 2.x`, `1.0 - 1.4`.
    #[default]
    Semver,
    /// Maven-style interval lists: `[1.0,2.0)`, `(,1.0],[1.2,)`, `[1.5]`.
    Maven,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("empty version range")]
    Empty,
    #[error("invalid version range '{raw}': {reason}")]
    Invalid { raw: String, reason: String },
}

impl ConstraintError {
    fn invalid(raw: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ConstraintResult<T> = std::result::Result<T, ConstraintError>;

/// A parsed dependency range: satisfied when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    alternatives: Vec<semver::VersionReq>,
}

impl Constraint {
    pub fn parse(raw: &str, syntax: RangeSyntax) -> ConstraintResult<Self> {
        let alternatives = match syntax {
            RangeSyntax::Semver => parse_semver_range(raw)?,
            RangeSyntax::Maven => parse_maven_range(raw)?,
        };
        Ok(Self { alternatives })
    }

    pub fn matches(&self, version: &semver::Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    pub fn alternatives(&self) -> &[semver::VersionReq] {
        &self.alternatives
    }
}

const OPERATORS: [&str; 8] = [">=", "<=", "~>", ">", "<", "=", "~", "^"];

fn parse_semver_range(raw: &str) -> ConstraintResult<Vec<semver::VersionReq>> {
    raw.split("||")
        .map(|alternative| parse_semver_alternative(raw, alternative))
        .collect()
}

fn parse_semver_alternative(raw: &str, alternative: &str) -> ConstraintResult<semver::VersionReq> {
    let alternative = alternative.trim();
    let comparators = match alternative.split_once(" - ") {
        Some((low, high)) => vec![
            format!(">={}", strip_v(low.trim())),
            format!("<={}", strip_v(high.trim())),
        ],
        None => comparator_tokens(alternative)
            .into_iter()
            .filter_map(normalize_comparator)
            .collect(),
    };

    if comparators.is_empty() {
        return Ok(semver::VersionReq::STAR);
    }
    semver::VersionReq::parse(&comparators.join(", "))
        .map_err(|err| ConstraintError::invalid(raw, err.to_string()))
}

/// Splits a comparator list on whitespace and commas, re-attaching operators
/// that were written apart from their version (`>= 1.2`).
fn comparator_tokens(alternative: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_operator: Option<String> = None;
    for piece in alternative
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|piece| !piece.is_empty())
    {
        if OPERATORS.contains(&piece) {
            pending_operator = Some(piece.to_string());
            continue;
        }
        match pending_operator.take() {
            Some(operator) => tokens.push(format!("{operator}{piece}")),
            None => tokens.push(piece.to_string()),
        }
    }
    if let Some(operator) = pending_operator {
        tokens.push(operator);
    }
    tokens
}

/// Rewrites one comparator into the form `semver::VersionReq` accepts.
/// Returns `None` for comparators that match everything.
fn normalize_comparator(token: String) -> Option<String> {
    let operator = OPERATORS
        .iter()
        .find(|operator| token.starts_with(**operator))
        .copied();
    match operator {
        Some(operator) => {
            let version = strip_v(&token[operator.len()..]);
            let operator = if operator == "~>" { "~" } else { operator };
            Some(format!("{operator}{version}"))
        }
        None => {
            let version = strip_v(&token);
            if is_wildcard(version) {
                if version.split('.').all(is_any_segment) {
                    return None;
                }
                return Some(version.to_string());
            }
            // A bare version is an exact requirement.
            Some(format!("={version}"))
        }
    }
}

fn is_wildcard(version: &str) -> bool {
    version.split('.').any(is_any_segment)
}

fn is_any_segment(segment: &str) -> bool {
    matches!(segment, "*" | "x" | "X")
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix(|ch: char| ch == 'v' || ch == 'V')
        .unwrap_or(version)
}

fn maven_interval_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([\[(])([^\[\]()]*)([\])])").expect("maven interval pattern is valid")
    })
}

fn parse_maven_range(raw: &str) -> ConstraintResult<Vec<semver::VersionReq>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConstraintError::Empty);
    }

    if !trimmed.starts_with(|ch: char| ch == '[' || ch == '(') {
        // Soft requirement: Maven treats a bare version as a recommendation,
        // which resolves to that exact version.
        let exact = semver::VersionReq::parse(&format!("={}", maven_bound(raw, trimmed)?))
            .map_err(|err| ConstraintError::invalid(raw, err.to_string()))?;
        return Ok(vec![exact]);
    }

    let mut alternatives = Vec::new();
    let mut cursor = 0;
    for captures in maven_interval_pattern().captures_iter(trimmed) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let gap = &trimmed[cursor..whole.start()];
        if !gap.chars().all(|ch| ch == ',' || ch.is_whitespace()) {
            return Err(ConstraintError::invalid(raw, format!("unexpected '{gap}'")));
        }
        alternatives.push(maven_interval(
            raw,
            &captures[1] == "[",
            &captures[2],
            &captures[3] == "]",
        )?);
        cursor = whole.end();
    }

    let tail = &trimmed[cursor..];
    if alternatives.is_empty() || !tail.chars().all(|ch| ch == ',' || ch.is_whitespace()) {
        return Err(ConstraintError::invalid(raw, "unbalanced interval"));
    }
    Ok(alternatives)
}

fn maven_interval(
    raw: &str,
    lower_inclusive: bool,
    body: &str,
    upper_inclusive: bool,
) -> ConstraintResult<semver::VersionReq> {
    let comparators = match body.split_once(',') {
        None => {
            if !(lower_inclusive && upper_inclusive) {
                return Err(ConstraintError::invalid(
                    raw,
                    "a single-version interval must use [ ]",
                ));
            }
            vec![format!("={}", maven_bound(raw, body)?)]
        }
        Some((low, high)) => {
            let mut comparators = Vec::new();
            if !low.trim().is_empty() {
                let operator = if lower_inclusive { ">=" } else { ">" };
                comparators.push(format!("{operator}{}", maven_bound(raw, low)?));
            }
            if !high.trim().is_empty() {
                let operator = if upper_inclusive { "<=" } else { "<" };
                comparators.push(format!("{operator}{}", maven_bound(raw, high)?));
            }
            comparators
        }
    };

    if comparators.is_empty() {
        return Ok(semver::VersionReq::STAR);
    }
    semver::VersionReq::parse(&comparators.join(", "))
        .map_err(|err| ConstraintError::invalid(raw, err.to_string()))
}

fn maven_bound(raw: &str, bound: &str) -> ConstraintResult<String> {
    let bound = bound.trim();
    parse_lenient(bound)
        .map(|version| version.to_string())
        .ok_or_else(|| ConstraintError::invalid(raw, format!("'{bound}' is not a version")))
}
