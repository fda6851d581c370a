use crate::error::{EngineError, Result};
use crate::model::Strategy;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OldLinksAction {
    Enrich,
    Regenerate,
    Audit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokenLinksAction {
    Delete,
    Replace,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    Append,
    Replace,
}

/// Global generation parameters, snapshotted at launch time.
///
/// A run only ever sees the snapshot captured in its config; settings edits
/// made while a run is in flight cannot reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub max_links_per_page: u32,
    /// Tie-break order for the resolver. Strategies not listed sort last.
    pub priorities: Vec<Strategy>,
    /// Minimum distance, in words, between two committed anchors on a page.
    pub min_gap: u32,
    pub exact_anchor_percent: u8,
    pub old_links_action: OldLinksAction,
    pub broken_links_action: BrokenLinksAction,
    pub html_class: String,
    pub link_mode: LinkMode,
    pub stop_anchors: Vec<String>,
    pub rel_attributes: Vec<String>,
    pub target_blank: bool,
    /// Optional regex a source URL must match to stay in scope. Empty = off.
    pub url_pattern: String,
    /// Sources published before this date are out of scope.
    pub newer_than: Option<DateTime<Utc>>,
    /// Percentage of the candidate pool to keep (seeded, reproducible).
    pub random_sample: u8,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            max_links_per_page: 3,
            priorities: vec![
                Strategy::Hubs,
                Strategy::Commerce,
                Strategy::Similar,
                Strategy::Deep,
                Strategy::Fresh,
                Strategy::Orphans,
            ],
            min_gap: 200,
            exact_anchor_percent: 20,
            old_links_action: OldLinksAction::Enrich,
            broken_links_action: BrokenLinksAction::Delete,
            html_class: "internal-link".to_string(),
            link_mode: LinkMode::Append,
            stop_anchors: vec![
                "click here".to_string(),
                "read more".to_string(),
                "learn more".to_string(),
            ],
            rel_attributes: Vec::new(),
            target_blank: false,
            url_pattern: String::new(),
            newer_than: None,
            random_sample: 100,
        }
    }
}

impl GlobalSettings {
    pub fn validate(&self) -> Result<()> {
        if self.exact_anchor_percent > 100 {
            return Err(EngineError::Validation(format!(
                "exact_anchor_percent must be 0-100, got {}",
                self.exact_anchor_percent
            )));
        }
        if self.random_sample > 100 {
            return Err(EngineError::Validation(format!(
                "random_sample must be 0-100, got {}",
                self.random_sample
            )));
        }
        if self.priorities.is_empty() {
            return Err(EngineError::Validation(
                "priorities must not be empty".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for s in &self.priorities {
            if !seen.insert(*s) {
                return Err(EngineError::Validation(format!(
                    "priorities lists '{}' more than once",
                    s.as_str()
                )));
            }
        }
        if !self.url_pattern.is_empty() {
            Regex::new(&self.url_pattern)?;
        }
        Ok(())
    }

    /// Position of a strategy in the priority order; unlisted strategies
    /// sort after all listed ones.
    pub fn priority_index(&self, strategy: Strategy) -> usize {
        self.priorities
            .iter()
            .position(|s| *s == strategy)
            .unwrap_or(self.priorities.len())
    }

    pub fn scope_pattern(&self) -> Result<Option<Regex>> {
        if self.url_pattern.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Regex::new(&self.url_pattern)?))
        }
    }

    pub fn is_stop_anchor(&self, anchor: &str) -> bool {
        let lowered = anchor.to_lowercase();
        self.stop_anchors
            .iter()
            .any(|s| s.to_lowercase() == lowered)
    }
}
