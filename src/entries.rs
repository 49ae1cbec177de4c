use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::circleci::BuildSelector;

/// One project to build, as listed in the build file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEntry {
    /// CircleCI project name
    #[serde(default)]
    pub name: String,

    /// Repository URL, matched against the project's VCS URL
    #[serde(default, rename = "repository")]
    pub url: String,

    /// Branch to build
    #[serde(default)]
    pub branch: String,

    /// Tag to build (cannot be combined with branch or commit)
    #[serde(default)]
    pub tag: String,

    /// Commit to build
    #[serde(default)]
    pub commit: String,

    /// Keep going with the next entry when this build fails
    #[serde(default)]
    pub continue_on_fail: bool,
}

impl BuildEntry {
    pub fn selector(&self) -> BuildSelector {
        BuildSelector {
            branch: self.branch.clone(),
            revision: self.commit.clone(),
            tag: self.tag.clone(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() || self.url.trim().is_empty()
    }
}

/// Reads the JSON array of build entries at `path`.
///
/// A missing file means there is nothing to build.
pub fn load_entries(path: &Path) -> Result<Vec<BuildEntry>> {
    if !path.exists() {
        warn!("Build file not found: {}", path.display());
        return Ok(Vec::new());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read build file: {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse build file: {}", path.display()))
}
