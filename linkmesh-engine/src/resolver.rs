//! Constraint and conflict resolution.
//!
//! Takes the merged raw candidate pool from every enabled generator and
//! turns it into final accept/reject decisions. The pool is canonically
//! sorted before the seeded sampling pass, so concatenation order across
//! generators can never change the outcome. Admission state is an explicit
//! per-page ledger; pages share nothing, so the per-page loops could run
//! concurrently without extra locking.

use crate::error::Result;
use crate::graph::PageGraph;
use crate::model::{
    AnchorClass, CandidateStatus, Placement, PriorLink, RawCandidate, RejectionReason,
    ResolvedCandidate, RunStats,
};
use crate::settings::GlobalSettings;
use crate::text::{PageText, classify_anchor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

pub struct ResolverInput<'a> {
    pub graph: &'a PageGraph,
    pub settings: &'a GlobalSettings,
    /// Seed for the sampling RNG; recorded in the run config so a re-run
    /// reproduces the exact same decisions.
    pub seed: u64,
    /// Previously approved edges pre-admitted before any candidate is
    /// considered (enrich policy). They consume budget and word offsets.
    pub seeded: &'a [PriorLink],
}

pub struct Resolution {
    pub candidates: Vec<ResolvedCandidate>,
    pub stats: RunStats,
}

/// Per-page admission state. One ledger per source page; the checks only
/// ever read and write their own page's ledger.
struct PageLedger {
    accepted: u32,
    exact: u32,
    total: u32,
    /// Word offsets already claimed on this page. An offset in here is a
    /// consumed anchor occurrence; the search skips it.
    offsets: Vec<usize>,
}

impl PageLedger {
    fn new() -> Self {
        Self {
            accepted: 0,
            exact: 0,
            total: 0,
            offsets: Vec::new(),
        }
    }

    fn commit(&mut self, offset: Option<usize>, class: Option<AnchorClass>) {
        self.accepted += 1;
        if let Some(off) = offset {
            self.offsets.push(off);
        }
        if class.is_some() {
            self.total += 1;
        }
        if class == Some(AnchorClass::Exact) {
            self.exact += 1;
        }
    }

    fn violates_gap(&self, offset: usize, min_gap: u32) -> bool {
        self.offsets
            .iter()
            .any(|&committed| committed.abs_diff(offset) < min_gap as usize)
    }

    fn would_exceed_exact(&self, percent: u8) -> bool {
        (self.exact + 1) as u64 * 100 > (self.total + 1) as u64 * u64::from(percent)
    }
}

pub fn resolve(pool: Vec<RawCandidate>, input: &ResolverInput) -> Result<Resolution> {
    let settings = input.settings;
    let scope_pattern = settings.scope_pattern()?;

    // Canonical order before sampling: generator completion order must not
    // influence which candidates the seeded RNG drops.
    let mut pool = pool;
    pool.sort_by(|a, b| {
        a.source_url
            .cmp(&b.source_url)
            .then_with(|| a.target_url.cmp(&b.target_url))
            .then_with(|| a.strategy.as_str().cmp(b.strategy.as_str()))
    });

    // Scope filter: source pattern, source recency, target existence for
    // text placements, then the seeded sampling pass.
    let mut rng = StdRng::seed_from_u64(input.seed);
    let sample = settings.random_sample;
    let in_scope: Vec<RawCandidate> = pool
        .into_iter()
        .filter(|c| {
            let Some(source) = input.graph.get(&c.source_url) else {
                return false;
            };
            if let Some(re) = &scope_pattern
                && !re.is_match(&c.source_url)
            {
                return false;
            }
            if let Some(floor) = settings.newer_than
                && source.publish_date < floor
            {
                return false;
            }
            if c.placement == Placement::Text && !input.graph.contains(&c.target_url) {
                return false;
            }
            true
        })
        .filter(|_| sample >= 100 || rng.random_range(0..100u8) < sample)
        .collect();
    debug!("{} candidate(s) in scope after filters", in_scope.len());

    // Group by source page; BTreeMap keeps page order deterministic.
    let mut groups: BTreeMap<String, Vec<RawCandidate>> = BTreeMap::new();
    for candidate in in_scope {
        groups.entry(candidate.source_url.clone()).or_default().push(candidate);
    }

    // Edges admitted anywhere in this run, pre-loaded with enrich seeds.
    let mut admitted_pairs: HashSet<(String, String)> = input
        .seeded
        .iter()
        .map(|s| (s.source_url.clone(), s.target_url.clone()))
        .collect();

    // The persisted set carries at most one row per (source, target): a
    // later admission for a pair replaces its earlier rejected row, and a
    // rejection for a pair that already has a row is folded into it.
    let mut resolved: Vec<ResolvedCandidate> = Vec::new();
    let mut row_index: HashMap<(String, String), usize> = HashMap::new();
    let mut pages_processed: u32 = 0;

    for (source_url, mut candidates) in groups {
        let Some(source) = input.graph.get(&source_url) else {
            continue;
        };
        let text = PageText::new(&source.content);
        let mut ledger = PageLedger::new();
        seed_ledger(&mut ledger, &source_url, &text, input);

        // Priority order, then strongest weight, then target URL.
        candidates.sort_by(|a, b| {
            settings
                .priority_index(a.strategy)
                .cmp(&settings.priority_index(b.strategy))
                .then_with(|| {
                    b.weight
                        .partial_cmp(&a.weight)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.target_url.cmp(&b.target_url))
        });

        for candidate in candidates {
            let pair = (candidate.source_url.clone(), candidate.target_url.clone());
            let decision = admit(&candidate, &text, &ledger, &admitted_pairs, settings, input.graph);
            let row = match decision {
                Ok((offset, class)) => {
                    admitted_pairs.insert(pair.clone());
                    ledger.commit(offset, class);
                    let (before, after) = match offset {
                        Some(off) => {
                            let anchor_words = candidate.anchor.split_whitespace().count();
                            let (b, a) = text.context(off, anchor_words);
                            (Some(b), Some(a))
                        }
                        None => (None, None),
                    };
                    ResolvedCandidate {
                        source_url: candidate.source_url,
                        target_url: candidate.target_url,
                        anchor: candidate.anchor,
                        strategy: candidate.strategy,
                        status: CandidateStatus::Pending,
                        rejection_reason: None,
                        word_offset: offset,
                        before_text: before,
                        after_text: after,
                    }
                }
                Err(reason) => ResolvedCandidate {
                    source_url: candidate.source_url,
                    target_url: candidate.target_url,
                    anchor: candidate.anchor,
                    strategy: candidate.strategy,
                    status: CandidateStatus::Rejected,
                    rejection_reason: Some(reason),
                    word_offset: None,
                    before_text: None,
                    after_text: None,
                },
            };
            match row_index.get(&pair) {
                None => {
                    row_index.insert(pair, resolved.len());
                    resolved.push(row);
                }
                Some(&existing) => {
                    // An admission outranks the rejected row it displaces;
                    // a second rejection for the pair carries no new edge.
                    if row.status == CandidateStatus::Pending {
                        resolved[existing] = row;
                    }
                }
            }
        }
        pages_processed += 1;
    }

    Ok(Resolution {
        stats: tally(&resolved, pages_processed, input.graph),
        candidates: resolved,
    })
}

/// Stats are derived from the emitted rows so they always agree with what
/// gets persisted.
fn tally(rows: &[ResolvedCandidate], pages_processed: u32, graph: &PageGraph) -> RunStats {
    let mut stats = RunStats {
        pages_processed,
        ..Default::default()
    };
    let mut orphan_targets: HashSet<&str> = HashSet::new();
    for row in rows {
        match row.status {
            CandidateStatus::Pending => {
                stats.links_added += 1;
                if graph.get(&row.target_url).is_some_and(|t| t.is_orphan) {
                    orphan_targets.insert(&row.target_url);
                }
            }
            _ => {
                stats.rejected += 1;
                if let Some(reason) = row.rejection_reason {
                    *stats
                        .rejected_reasons
                        .entry(reason.as_str().to_string())
                        .or_default() += 1;
                }
            }
        }
    }
    stats.orphans_linked = orphan_targets.len() as u32;
    stats
}

/// Pre-admit prior approved edges on this page so new candidates respect
/// the budget and gap they already occupy.
fn seed_ledger(ledger: &mut PageLedger, source_url: &str, text: &PageText, input: &ResolverInput) {
    for seed in input.seeded {
        if seed.source_url != source_url {
            continue;
        }
        let offset = text.find_unused(&seed.anchor, &ledger.offsets);
        let class = input
            .graph
            .get(&seed.target_url)
            .map(|t| classify_anchor(&seed.anchor, &t.title, t.meta_title.as_deref()));
        ledger.commit(offset, class);
    }
}

/// The fixed check sequence. The first failing check names the rejection;
/// the order is part of the engine's contract and must not change.
fn admit(
    candidate: &RawCandidate,
    text: &PageText,
    ledger: &PageLedger,
    admitted_pairs: &HashSet<(String, String)>,
    settings: &GlobalSettings,
    graph: &PageGraph,
) -> std::result::Result<(Option<usize>, Option<AnchorClass>), RejectionReason> {
    let is_text = candidate.placement == Placement::Text;

    if admitted_pairs.contains(&(candidate.source_url.clone(), candidate.target_url.clone())) {
        return Err(RejectionReason::Duplicate);
    }
    if is_text && settings.is_stop_anchor(&candidate.anchor) {
        return Err(RejectionReason::StopAnchor);
    }
    let offset = if is_text {
        match text.find_unused(&candidate.anchor, &ledger.offsets) {
            Some(off) => Some(off),
            None => return Err(RejectionReason::AnchorNotFound),
        }
    } else {
        None
    };
    if let Some(off) = offset
        && ledger.violates_gap(off, settings.min_gap)
    {
        return Err(RejectionReason::MinGap);
    }
    let class = if is_text {
        let target = graph.get(&candidate.target_url);
        let class = target
            .map(|t| classify_anchor(&candidate.anchor, &t.title, t.meta_title.as_deref()))
            .unwrap_or(AnchorClass::Generic);
        if class == AnchorClass::Exact && ledger.would_exceed_exact(settings.exact_anchor_percent) {
            return Err(RejectionReason::ExactExceed);
        }
        Some(class)
    } else {
        None
    };
    if ledger.accepted >= settings.max_links_per_page {
        return Err(RejectionReason::LimitReached);
    }
    Ok((offset, class))
}
