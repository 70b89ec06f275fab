//! Regex selection of groups and hosts

use std::collections::HashSet;

use nmsync_api::{RemoteDevice, RemoteGroup};
use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;

/// Compiled set of start-anchored patterns
///
/// An empty set selects everything.
#[derive(Debug, Clone)]
pub struct PatternSet {
    sources: Vec<String>,
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile patterns, anchoring each at the start of the subject
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidPattern`] for the first pattern that does not compile.
    pub fn compile(sources: &[String], ignore_case: bool) -> Result<Self, ConfigError> {
        let patterns = sources
            .iter()
            .map(|source| {
                RegexBuilder::new(&format!("^(?:{source})"))
                    .case_insensitive(ignore_case)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: source.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sources: sources.to_vec(),
            patterns,
        })
    }

    /// Patterns as configured
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Check for an empty set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check whether any pattern matches; an empty set matches everything
    #[must_use]
    pub fn matches(&self, subject: &str) -> bool {
        self.is_empty() || self.patterns.iter().any(|re| re.is_match(subject))
    }
}

/// Selects remote groups by name
#[derive(Debug, Clone)]
pub struct GroupSelector {
    patterns: PatternSet,
}

impl GroupSelector {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    /// Select groups whose name matches any pattern
    ///
    /// Results follow pattern order, then remote order. A group matching
    /// several patterns is returned once, at its first match.
    #[must_use]
    pub fn select(&self, groups: &[RemoteGroup]) -> Vec<RemoteGroup> {
        if self.patterns.is_empty() {
            return groups.to_vec();
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for pattern in &self.patterns.patterns {
            for group in groups {
                if pattern.is_match(&group.name) && seen.insert(group.name.as_str()) {
                    selected.push(group.clone());
                }
            }
        }
        selected
    }
}

/// Selects devices by display name
#[derive(Debug, Clone)]
pub struct HostSelector {
    patterns: PatternSet,
}

impl HostSelector {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    /// Check a device against the patterns; a null display name matches as `""`
    #[must_use]
    pub fn matches(&self, device: &RemoteDevice) -> bool {
        self.patterns.matches(device.display_name())
    }
}
