use serde::Deserialize;

use crate::core::constraint::RangeSyntax;
use crate::graph::analytics::PageRankConfig;
use crate::graph::builder::BuildOptions;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSettings {
    /// Read dependency ranges as Maven version ranges.
    #[serde(default)]
    pub maven: bool,
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            maven: false,
            jobs: None,
            progress: default_true(),
        }
    }
}

impl BuildSettings {
    pub fn syntax(&self) -> RangeSyntax {
        if self.maven {
            RangeSyntax::Maven
        } else {
            RangeSyntax::Semver
        }
    }

    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            syntax: self.syntax(),
            jobs: self.jobs,
            progress: self.progress,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Rows shown by ranking commands unless `--top` is given.
    #[serde(default = "default_top")]
    pub top: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            top: default_top(),
        }
    }
}

impl AnalyticsSettings {
    pub fn pagerank(&self) -> PageRankConfig {
        PageRankConfig {
            damping: self.damping,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_damping() -> f64 {
    PageRankConfig::default().damping
}

fn default_tolerance() -> f64 {
    PageRankConfig::default().tolerance
}

fn default_max_iterations() -> usize {
    PageRankConfig::default().max_iterations
}

fn default_top() -> usize {
    10
}
