use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A page as it arrives from import, before the corpus graph is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub content: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub language: Option<String>,
}

/// A corpus page with computed graph position.
///
/// `depth` is the shortest internal-link distance from a root page;
/// `None` means the page is unreachable and `is_orphan` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub title: String,
    pub content: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub publish_date: DateTime<Utc>,
    pub language: String,
    pub depth: Option<u32>,
    pub is_orphan: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Hubs,
    Commerce,
    Similar,
    Deep,
    Fresh,
    Orphans,
    Broken,
    Regenerate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Hubs => "hubs",
            Strategy::Commerce => "commerce",
            Strategy::Similar => "similar",
            Strategy::Deep => "deep",
            Strategy::Fresh => "fresh",
            Strategy::Orphans => "orphans",
            Strategy::Broken => "broken",
            Strategy::Regenerate => "regenerate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hubs" => Some(Strategy::Hubs),
            "commerce" => Some(Strategy::Commerce),
            "similar" => Some(Strategy::Similar),
            "deep" => Some(Strategy::Deep),
            "fresh" => Some(Strategy::Fresh),
            "orphans" => Some(Strategy::Orphans),
            "broken" => Some(Strategy::Broken),
            "regenerate" => Some(Strategy::Regenerate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Draft,
    Running,
    Completed,
    Failed,
    Published,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Draft => "draft",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Published => "published",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(RunStatus::Draft),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            "published" => Some(RunStatus::Published),
            _ => None,
        }
    }

    pub fn allowed_transitions(&self) -> Vec<RunStatus> {
        use RunStatus::*;
        match self {
            Draft => vec![Running],
            Running => vec![Completed, Failed],
            Completed => vec![Published],
            Failed => vec![],
            Published => vec![],
        }
    }

    pub fn can_transition(&self, to: RunStatus) -> bool {
        self.allowed_transitions().into_iter().any(|s| s == to)
    }

    /// Terminal for the generation pipeline (review may still act on it).
    pub fn is_settled(&self) -> bool {
        !matches!(self, RunStatus::Draft | RunStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Approved => "approved",
            CandidateStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CandidateStatus::Pending),
            "approved" => Some(CandidateStatus::Approved),
            "rejected" => Some(CandidateStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CandidateStatus::Pending)
    }
}

/// Why the resolver refused a candidate. Recorded on the row, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    Duplicate,
    StopAnchor,
    AnchorNotFound,
    MinGap,
    ExactExceed,
    LimitReached,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::Duplicate => "duplicate",
            RejectionReason::StopAnchor => "stop_anchor",
            RejectionReason::AnchorNotFound => "anchor_not_found",
            RejectionReason::MinGap => "min_gap",
            RejectionReason::ExactExceed => "exact_exceed",
            RejectionReason::LimitReached => "limit_reached",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "duplicate" => Some(RejectionReason::Duplicate),
            "stop_anchor" => Some(RejectionReason::StopAnchor),
            "anchor_not_found" => Some(RejectionReason::AnchorNotFound),
            "min_gap" => Some(RejectionReason::MinGap),
            "exact_exceed" => Some(RejectionReason::ExactExceed),
            "limit_reached" => Some(RejectionReason::LimitReached),
            _ => None,
        }
    }
}

/// Similarity tier between an anchor and its target's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorClass {
    Exact,
    Partial,
    Generic,
}

/// How a candidate is applied to the source page.
///
/// `Text` candidates insert an anchor into the page body and go through the
/// full placement checks. `Directive` candidates (broken-link cleanup)
/// remove or re-point an existing link, so only the duplicate and budget
/// checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Text,
    Directive,
}

/// A raw source -> target -> anchor proposal from one generator.
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub source_url: String,
    pub target_url: String,
    pub anchor: String,
    pub strategy: Strategy,
    pub weight: f64,
    pub placement: Placement,
}

impl RawCandidate {
    pub fn text(source: &str, target: &str, anchor: String, strategy: Strategy, weight: f64) -> Self {
        Self {
            source_url: source.to_string(),
            target_url: target.to_string(),
            anchor,
            strategy,
            weight,
            placement: Placement::Text,
        }
    }
}

/// A resolver decision, ready to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCandidate {
    pub source_url: String,
    pub target_url: String,
    pub anchor: String,
    pub strategy: Strategy,
    pub status: CandidateStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub word_offset: Option<usize>,
    pub before_text: Option<String>,
    pub after_text: Option<String>,
}

/// A previously approved edge, replayed by the regenerate/enrich policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorLink {
    pub source_url: String,
    pub target_url: String,
    pub anchor: String,
}

/// Aggregated counters for a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub links_added: u32,
    pub rejected: u32,
    pub rejected_reasons: BTreeMap<String, u32>,
    pub pages_processed: u32,
    pub strategies_skipped: Vec<String>,
    pub orphans_linked: u32,
    pub processing_ms: u64,
}
