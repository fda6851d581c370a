//! Task candidate generators.
//!
//! One generator per strategy, behind the closed `StrategyConfig` enum.
//! Each is a pure function of the immutable graph and its own config, so
//! the launch pipeline can run them as independent parallel tasks and
//! isolate a failing strategy without touching the others.

use crate::error::Result;
use crate::graph::{PageGraph, parent_path, path_segments, top_prefix};
use crate::model::{Page, Placement, PriorLink, RawCandidate, Strategy};
use crate::settings::{BrokenLinksAction, OldLinksAction};
use crate::text::{default_anchor, jaccard_similarity};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Injectable similarity function for the similar-in-section generator.
pub type SimilarityFn = Arc<dyn Fn(&Page, &Page) -> f64 + Send + Sync>;

/// Shared read-only inputs every generator receives besides its config.
pub struct GeneratorContext {
    pub now: DateTime<Utc>,
    pub similarity: SimilarityFn,
    /// Approved candidates from earlier runs of the project.
    pub prior_links: Vec<PriorLink>,
}

impl GeneratorContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            similarity: Arc::new(|a: &Page, b: &Page| {
                jaccard_similarity(&a.title, &a.content, &b.title, &b.content)
            }),
            prior_links: Vec::new(),
        }
    }

    pub fn with_similarity(mut self, similarity: SimilarityFn) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_prior_links(mut self, prior_links: Vec<PriorLink>) -> Self {
        self.prior_links = prior_links;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HubTopology {
    Star,
    Ring,
    Wheel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubsConfig {
    pub topology: HubTopology,
    /// Group by the full parent path instead of the top-level section, so
    /// edges stay strictly within a (sub)prefix.
    pub restrict_prefix: bool,
}

impl Default for HubsConfig {
    fn default() -> Self {
        Self {
            topology: HubTopology::Star,
            restrict_prefix: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommerceConfig {
    /// Regex a page URL must match to qualify as a commerce target.
    pub url_pattern: String,
    /// Optional prefix restricting donor pages.
    pub limit_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarConfig {
    pub prefixes: Vec<String>,
    pub k_neighbors: usize,
}

impl Default for SimilarConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["/blog".to_string()],
            k_neighbors: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepConfig {
    pub min_depth: u32,
    /// Restrict donors to pages at depth 3 or less.
    pub donors_from_levels: bool,
}

impl Default for DeepConfig {
    fn default() -> Self {
        Self {
            min_depth: 5,
            donors_from_levels: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshConfig {
    pub days_fresh: i64,
    pub links_per_donor: usize,
}

impl Default for FreshConfig {
    fn default() -> Self {
        Self {
            days_fresh: 30,
            links_per_donor: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum OrphanScope {
    Entire,
    Prefix { prefix: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrphansConfig {
    #[serde(flatten)]
    pub scope: OrphanScope,
}

impl Default for OrphansConfig {
    fn default() -> Self {
        Self {
            scope: OrphanScope::Entire,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokenConfig {
    pub action: BrokenLinksAction,
}

impl Default for BrokenConfig {
    fn default() -> Self {
        Self {
            action: BrokenLinksAction::Delete,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateConfig {
    pub mode: OldLinksAction,
}

impl Default for RegenerateConfig {
    fn default() -> Self {
        Self {
            mode: OldLinksAction::Enrich,
        }
    }
}

/// The closed set of strategies a run can enable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum StrategyConfig {
    Hubs(HubsConfig),
    Commerce(CommerceConfig),
    Similar(SimilarConfig),
    Deep(DeepConfig),
    Fresh(FreshConfig),
    Orphans(OrphansConfig),
    Broken(BrokenConfig),
    Regenerate(RegenerateConfig),
}

impl StrategyConfig {
    pub fn strategy(&self) -> Strategy {
        match self {
            StrategyConfig::Hubs(_) => Strategy::Hubs,
            StrategyConfig::Commerce(_) => Strategy::Commerce,
            StrategyConfig::Similar(_) => Strategy::Similar,
            StrategyConfig::Deep(_) => Strategy::Deep,
            StrategyConfig::Fresh(_) => Strategy::Fresh,
            StrategyConfig::Orphans(_) => Strategy::Orphans,
            StrategyConfig::Broken(_) => Strategy::Broken,
            StrategyConfig::Regenerate(_) => Strategy::Regenerate,
        }
    }

    /// Default config for a strategy named on the command line.
    pub fn for_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Hubs => StrategyConfig::Hubs(HubsConfig::default()),
            Strategy::Commerce => StrategyConfig::Commerce(CommerceConfig::default()),
            Strategy::Similar => StrategyConfig::Similar(SimilarConfig::default()),
            Strategy::Deep => StrategyConfig::Deep(DeepConfig::default()),
            Strategy::Fresh => StrategyConfig::Fresh(FreshConfig::default()),
            Strategy::Orphans => StrategyConfig::Orphans(OrphansConfig::default()),
            Strategy::Broken => StrategyConfig::Broken(BrokenConfig::default()),
            Strategy::Regenerate => StrategyConfig::Regenerate(RegenerateConfig::default()),
        }
    }

    /// Whether this config asks the resolver to pre-seed prior approved
    /// edges instead of re-emitting them (enrich policy).
    pub fn seeds_prior_links(&self) -> bool {
        matches!(
            self,
            StrategyConfig::Regenerate(RegenerateConfig {
                mode: OldLinksAction::Enrich,
            })
        )
    }

    pub fn generate(&self, graph: &PageGraph, ctx: &GeneratorContext) -> Result<Vec<RawCandidate>> {
        let candidates = match self {
            StrategyConfig::Hubs(cfg) => generate_hubs(graph, cfg),
            StrategyConfig::Commerce(cfg) => generate_commerce(graph, cfg)?,
            StrategyConfig::Similar(cfg) => generate_similar(graph, cfg, ctx),
            StrategyConfig::Deep(cfg) => generate_deep(graph, cfg),
            StrategyConfig::Fresh(cfg) => generate_fresh(graph, cfg, ctx),
            StrategyConfig::Orphans(cfg) => generate_orphans(graph, cfg),
            StrategyConfig::Broken(cfg) => generate_broken(graph, cfg),
            StrategyConfig::Regenerate(cfg) => generate_regenerate(cfg, ctx),
        };
        debug!(
            "{} generator produced {} raw candidate(s)",
            self.strategy().as_str(),
            candidates.len()
        );
        Ok(candidates)
    }
}

fn anchor_for(page: &Page) -> String {
    default_anchor(&page.title, &page.url)
}

/// Hub linking: group pages by URL prefix, pick a hub per group, wire the
/// group per the configured topology.
fn generate_hubs(graph: &PageGraph, cfg: &HubsConfig) -> Vec<RawCandidate> {
    let mut groups: BTreeMap<String, Vec<&Page>> = BTreeMap::new();
    for page in graph.pages() {
        let key = if cfg.restrict_prefix {
            parent_path(&page.url)
        } else {
            top_prefix(&page.url)
        };
        groups.entry(key).or_default().push(page);
    }

    let mut candidates = Vec::new();
    for (_, members) in groups {
        if members.len() < 2 {
            continue;
        }
        // The hub is the shallowest member, the section's index page.
        let hub: &Page = *members
            .iter()
            .min_by_key(|p| (path_segments(&p.url), p.url.clone()))
            .expect("group has members");
        let mut emitted: HashSet<(String, String)> = HashSet::new();

        if matches!(cfg.topology, HubTopology::Star | HubTopology::Wheel) {
            for member in &members {
                if member.url != hub.url
                    && emitted.insert((member.url.clone(), hub.url.clone()))
                {
                    candidates.push(RawCandidate::text(
                        &member.url,
                        &hub.url,
                        anchor_for(hub),
                        Strategy::Hubs,
                        1.0,
                    ));
                }
            }
        }
        if matches!(cfg.topology, HubTopology::Ring | HubTopology::Wheel) {
            // Members are already URL-sorted; link each to its lexical
            // successor, wrapping around.
            for (i, member) in members.iter().enumerate() {
                let successor = members[(i + 1) % members.len()];
                if member.url != successor.url
                    && emitted.insert((member.url.clone(), successor.url.clone()))
                {
                    candidates.push(RawCandidate::text(
                        &member.url,
                        &successor.url,
                        anchor_for(successor),
                        Strategy::Hubs,
                        1.0,
                    ));
                }
            }
        }
    }
    candidates
}

/// Commerce linking: every in-scope page points at pages matching the
/// conversion-intent URL pattern.
fn generate_commerce(graph: &PageGraph, cfg: &CommerceConfig) -> Result<Vec<RawCandidate>> {
    if cfg.url_pattern.is_empty() {
        return Ok(Vec::new());
    }
    let pattern = Regex::new(&cfg.url_pattern)?;
    let targets: Vec<&Page> = graph
        .pages()
        .iter()
        .filter(|p| pattern.is_match(&p.url))
        .collect();

    let mut candidates = Vec::new();
    for source in graph.pages() {
        if let Some(prefix) = &cfg.limit_prefix
            && !source.url.starts_with(prefix.as_str())
        {
            continue;
        }
        for &target in &targets {
            if source.url != target.url {
                candidates.push(RawCandidate::text(
                    &source.url,
                    &target.url,
                    anchor_for(target),
                    Strategy::Commerce,
                    1.0,
                ));
            }
        }
    }
    Ok(candidates)
}

/// Similar-in-section: within each configured prefix group, link every page
/// to its k nearest neighbors by the injected similarity function.
fn generate_similar(graph: &PageGraph, cfg: &SimilarConfig, ctx: &GeneratorContext) -> Vec<RawCandidate> {
    let prefixes: Vec<String> = cfg
        .prefixes
        .iter()
        .map(|p| crate::graph::normalize_path(p))
        .collect();

    let mut groups: BTreeMap<usize, Vec<&Page>> = BTreeMap::new();
    for page in graph.pages() {
        if let Some(idx) = prefixes.iter().position(|p| page.url.starts_with(p.as_str())) {
            groups.entry(idx).or_default().push(page);
        }
    }

    let mut candidates = Vec::new();
    for (_, members) in groups {
        if members.len() < 2 {
            continue;
        }
        for &page in &members {
            let mut scored: Vec<(&Page, f64)> = members
                .iter()
                .filter(|other| other.url != page.url)
                .map(|&other| (other, (ctx.similarity)(page, other)))
                .filter(|(_, score)| *score > 0.0)
                .collect();
            scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.url.cmp(&b.0.url))
            });
            for (neighbor, score) in scored.into_iter().take(cfg.k_neighbors) {
                candidates.push(RawCandidate::text(
                    &page.url,
                    &neighbor.url,
                    anchor_for(neighbor),
                    Strategy::Similar,
                    score,
                ));
            }
        }
    }
    candidates
}

/// Deep linking: push link equity toward pages buried below `min_depth`.
fn generate_deep(graph: &PageGraph, cfg: &DeepConfig) -> Vec<RawCandidate> {
    let targets: Vec<&Page> = graph
        .pages()
        .iter()
        .filter(|p| p.depth.is_some_and(|d| d >= cfg.min_depth))
        .collect();
    let donors: Vec<&Page> = graph
        .pages()
        .iter()
        .filter(|p| !cfg.donors_from_levels || p.depth.is_some_and(|d| d <= 3))
        .collect();

    let mut candidates = Vec::new();
    for &donor in &donors {
        for &target in &targets {
            if donor.url != target.url {
                candidates.push(RawCandidate::text(
                    &donor.url,
                    &target.url,
                    anchor_for(target),
                    Strategy::Deep,
                    target.depth.unwrap_or(0) as f64,
                ));
            }
        }
    }
    candidates
}

/// Fresh linking: recently published targets get donors round-robin, each
/// donor contributing at most `links_per_donor` edges.
fn generate_fresh(graph: &PageGraph, cfg: &FreshConfig, ctx: &GeneratorContext) -> Vec<RawCandidate> {
    let floor = ctx.now - Duration::days(cfg.days_fresh);
    let mut targets: Vec<&Page> = graph
        .pages()
        .iter()
        .filter(|p| p.publish_date >= floor)
        .collect();
    if targets.is_empty() || cfg.links_per_donor == 0 {
        return Vec::new();
    }
    // Newest first so scarce donor slots favor the freshest content.
    targets.sort_by(|a, b| b.publish_date.cmp(&a.publish_date).then_with(|| a.url.cmp(&b.url)));

    let mut candidates = Vec::new();
    for (i, donor) in graph.pages().iter().enumerate() {
        let mut granted = 0;
        for j in 0..targets.len() {
            if granted >= cfg.links_per_donor {
                break;
            }
            let target = targets[(i + j) % targets.len()];
            if donor.url == target.url {
                continue;
            }
            candidates.push(RawCandidate::text(
                &donor.url,
                &target.url,
                anchor_for(target),
                Strategy::Fresh,
                1.0,
            ));
            granted += 1;
        }
    }
    candidates
}

/// Orphan rescue: pages unreachable from the root get inbound links from
/// donors in the configured scope.
fn generate_orphans(graph: &PageGraph, cfg: &OrphansConfig) -> Vec<RawCandidate> {
    let donors: Vec<&Page> = graph
        .pages()
        .iter()
        .filter(|p| match &cfg.scope {
            OrphanScope::Entire => true,
            OrphanScope::Prefix { prefix } => p.url.starts_with(prefix.as_str()),
        })
        .collect();

    let mut candidates = Vec::new();
    for orphan in graph.orphans() {
        for &donor in &donors {
            if donor.url != orphan.url && !donor.is_orphan {
                candidates.push(RawCandidate::text(
                    &donor.url,
                    &orphan.url,
                    anchor_for(orphan),
                    Strategy::Orphans,
                    1.0,
                ));
            }
        }
    }
    candidates
}

/// Broken-link cleanup: turn each dangling reference into a removal or
/// replacement directive, per the configured action.
fn generate_broken(graph: &PageGraph, cfg: &BrokenConfig) -> Vec<RawCandidate> {
    if cfg.action == BrokenLinksAction::Ignore {
        return Vec::new();
    }
    let mut candidates = Vec::new();
    for dangling in graph.dangling() {
        let replacement = if cfg.action == BrokenLinksAction::Replace {
            best_replacement(graph, &dangling.target_path)
        } else {
            None
        };
        let candidate = match replacement {
            Some(page) => RawCandidate {
                source_url: dangling.source_url.clone(),
                target_url: page.url.clone(),
                anchor: anchor_for(page),
                strategy: Strategy::Broken,
                weight: 1.0,
                placement: Placement::Directive,
            },
            // No plausible replacement (or delete mode): emit a removal.
            None => RawCandidate {
                source_url: dangling.source_url.clone(),
                target_url: dangling.target_path.clone(),
                anchor: dangling.target_path.clone(),
                strategy: Strategy::Broken,
                weight: 1.0,
                placement: Placement::Directive,
            },
        };
        candidates.push(candidate);
    }
    candidates
}

/// Closest surviving page to a dangling path: most shared leading segments,
/// lexicographic tie-break.
fn best_replacement<'a>(graph: &'a PageGraph, dangling_path: &str) -> Option<&'a Page> {
    let dangling_segments: Vec<&str> = dangling_path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    graph
        .pages()
        .iter()
        .map(|p| {
            let shared = p
                .url
                .trim_matches('/')
                .split('/')
                .filter(|s| !s.is_empty())
                .zip(&dangling_segments)
                .take_while(|(a, b)| a == *b)
                .count();
            (shared, p)
        })
        .filter(|(shared, _)| *shared > 0)
        .max_by(|(sa, pa), (sb, pb)| sa.cmp(sb).then_with(|| pb.url.cmp(&pa.url)))
        .map(|(_, p)| p)
}

/// Replay of prior approved edges. Enrich mode emits nothing here; the
/// launch pipeline seeds the resolver instead.
fn generate_regenerate(cfg: &RegenerateConfig, ctx: &GeneratorContext) -> Vec<RawCandidate> {
    match cfg.mode {
        OldLinksAction::Enrich => Vec::new(),
        OldLinksAction::Regenerate | OldLinksAction::Audit => ctx
            .prior_links
            .iter()
            .map(|prior| RawCandidate::text(
                &prior.source_url,
                &prior.target_url,
                prior.anchor.clone(),
                Strategy::Regenerate,
                1.0,
            ))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageRecord;
    use chrono::Utc;

    fn record(url: &str, title: &str, content: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            meta_title: None,
            meta_description: None,
            publish_date: None,
            language: None,
        }
    }

    fn shop_graph() -> PageGraph {
        PageGraph::build(
            vec![
                record("/", "Home", "see /catalog and /blog"),
                record("/catalog", "Catalog", "browse /catalog/phones and /catalog/laptops"),
                record("/catalog/phones", "Phones", "great phones"),
                record("/catalog/laptops", "Laptops", "great laptops"),
                record("/blog", "Blog", "read /blog/phones-review"),
                record("/blog/phones-review", "Phones review", "we review great phones here"),
            ],
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn hubs_star_links_members_to_hub() {
        let graph = shop_graph();
        let cfg = HubsConfig {
            topology: HubTopology::Star,
            restrict_prefix: false,
        };
        let candidates = generate_hubs(&graph, &cfg);
        // /catalog group: phones and laptops point at /catalog.
        assert!(candidates.iter().any(|c| {
            c.source_url == "/catalog/phones" && c.target_url == "/catalog"
        }));
        assert!(candidates.iter().any(|c| {
            c.source_url == "/catalog/laptops" && c.target_url == "/catalog"
        }));
        // Never away from the hub in star mode.
        assert!(!candidates.iter().any(|c| c.source_url == "/catalog"));
    }

    #[test]
    fn hubs_ring_is_cyclic() {
        let graph = shop_graph();
        let cfg = HubsConfig {
            topology: HubTopology::Ring,
            restrict_prefix: false,
        };
        let candidates = generate_hubs(&graph, &cfg);
        let catalog_ring: Vec<_> = candidates
            .iter()
            .filter(|c| c.source_url.starts_with("/catalog"))
            .collect();
        // 3 members in the /catalog group -> 3 ring edges.
        assert_eq!(catalog_ring.len(), 3);
        assert!(catalog_ring.iter().any(|c| {
            c.source_url == "/catalog/phones" && c.target_url == "/catalog"
        }));
    }

    #[test]
    fn commerce_respects_pattern_and_prefix() {
        let graph = shop_graph();
        let cfg = CommerceConfig {
            url_pattern: "^/catalog/".to_string(),
            limit_prefix: Some("/blog".to_string()),
        };
        let candidates = generate_commerce(&graph, &cfg).unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.source_url.starts_with("/blog")));
        assert!(candidates.iter().all(|c| c.target_url.starts_with("/catalog/")));
    }

    #[test]
    fn commerce_bad_pattern_is_an_error() {
        let graph = shop_graph();
        let cfg = CommerceConfig {
            url_pattern: "([broken".to_string(),
            limit_prefix: None,
        };
        assert!(generate_commerce(&graph, &cfg).is_err());
    }

    #[test]
    fn similar_emits_k_neighbors_within_group() {
        let graph = PageGraph::build(
            vec![
                record("/blog/a", "Rust async tips", "tokio async runtime tips"),
                record("/blog/b", "Rust async traps", "tokio async runtime traps"),
                record("/blog/c", "Gardening", "flowers and soil"),
                record("/shop/x", "Rust book", "tokio async runtime book"),
            ],
            None,
            Utc::now(),
        )
        .unwrap();
        let cfg = SimilarConfig {
            prefixes: vec!["/blog".to_string()],
            k_neighbors: 1,
        };
        let ctx = GeneratorContext::new(Utc::now());
        let candidates = generate_similar(&graph, &cfg, &ctx);
        // a and b are each other's nearest neighbor; c shares no tokens.
        assert!(candidates.iter().any(|c| c.source_url == "/blog/a" && c.target_url == "/blog/b"));
        assert!(candidates.iter().any(|c| c.source_url == "/blog/b" && c.target_url == "/blog/a"));
        // The shop page is outside every configured prefix.
        assert!(!candidates.iter().any(|c| c.source_url == "/shop/x" || c.target_url == "/shop/x"));
    }

    #[test]
    fn deep_targets_buried_pages() {
        let graph = PageGraph::build(
            vec![
                record("/", "Home", "/a"),
                record("/a", "A", "/a/b"),
                record("/a/b", "B", "/a/b/c"),
                record("/a/b/c", "C", "deep content"),
            ],
            None,
            Utc::now(),
        )
        .unwrap();
        let cfg = DeepConfig {
            min_depth: 3,
            donors_from_levels: true,
        };
        let candidates = generate_deep(&graph, &cfg);
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.target_url == "/a/b/c"));
        assert!(candidates.iter().all(|c| c.source_url != "/a/b/c"));
    }

    #[test]
    fn fresh_caps_links_per_donor() {
        let now = Utc::now();
        let old = now - Duration::days(300);
        let mut fresh_a = record("/news/a", "News A", "x");
        fresh_a.publish_date = Some(now - Duration::days(2));
        let mut fresh_b = record("/news/b", "News B", "y");
        fresh_b.publish_date = Some(now - Duration::days(1));
        let mut stale = record("/old", "Old", "z");
        stale.publish_date = Some(old);
        let mut home = record("/", "Home", "/news/a /news/b /old");
        home.publish_date = Some(old);

        let graph = PageGraph::build(vec![home, fresh_a, fresh_b, stale], None, now).unwrap();
        let cfg = FreshConfig {
            days_fresh: 30,
            links_per_donor: 1,
        };
        let ctx = GeneratorContext::new(now);
        let candidates = generate_fresh(&graph, &cfg, &ctx);
        let mut per_donor: BTreeMap<&str, usize> = BTreeMap::new();
        for c in &candidates {
            *per_donor.entry(c.source_url.as_str()).or_default() += 1;
            assert!(c.target_url.starts_with("/news/"));
        }
        assert!(per_donor.values().all(|&n| n <= 1));
    }

    #[test]
    fn orphans_get_donors_from_scope() {
        let graph = PageGraph::build(
            vec![
                record("/", "Home", "/catalog"),
                record("/catalog", "Catalog", "x"),
                record("/island", "Island", "unreferenced"),
            ],
            None,
            Utc::now(),
        )
        .unwrap();
        let candidates = generate_orphans(
            &graph,
            &OrphansConfig {
                scope: OrphanScope::Entire,
            },
        );
        assert!(candidates.iter().all(|c| c.target_url == "/island"));
        assert_eq!(candidates.len(), 2);

        let scoped = generate_orphans(
            &graph,
            &OrphansConfig {
                scope: OrphanScope::Prefix {
                    prefix: "/catalog".to_string(),
                },
            },
        );
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].source_url, "/catalog");
    }

    #[test]
    fn broken_delete_emits_removal_directives() {
        let graph = PageGraph::build(
            vec![
                record("/", "Home", "link to /gone-forever"),
                record("/stays", "Stays", "x"),
            ],
            None,
            Utc::now(),
        )
        .unwrap();
        let candidates = generate_broken(
            &graph,
            &BrokenConfig {
                action: BrokenLinksAction::Delete,
            },
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target_url, "/gone-forever");
        assert_eq!(candidates[0].placement, Placement::Directive);
    }

    #[test]
    fn broken_replace_picks_nearest_surviving_path() {
        let graph = PageGraph::build(
            vec![
                record("/", "Home", "see /catalog/phones/nokia-3310"),
                record("/catalog/phones", "Phones", "x"),
                record("/blog", "Blog", "y"),
            ],
            None,
            Utc::now(),
        )
        .unwrap();
        let candidates = generate_broken(
            &graph,
            &BrokenConfig {
                action: BrokenLinksAction::Replace,
            },
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target_url, "/catalog/phones");
    }

    #[test]
    fn broken_ignore_emits_nothing() {
        let graph = PageGraph::build(
            vec![record("/", "Home", "/missing"), record("/a", "A", "x")],
            None,
            Utc::now(),
        )
        .unwrap();
        let candidates = generate_broken(
            &graph,
            &BrokenConfig {
                action: BrokenLinksAction::Ignore,
            },
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn regenerate_replays_prior_links_outside_enrich() {
        let prior = vec![PriorLink {
            source_url: "/a".to_string(),
            target_url: "/b".to_string(),
            anchor: "b things".to_string(),
        }];
        let ctx = GeneratorContext::new(Utc::now()).with_prior_links(prior);

        let replayed = generate_regenerate(
            &RegenerateConfig {
                mode: OldLinksAction::Regenerate,
            },
            &ctx,
        );
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].strategy, Strategy::Regenerate);

        let enriched = generate_regenerate(
            &RegenerateConfig {
                mode: OldLinksAction::Enrich,
            },
            &ctx,
        );
        assert!(enriched.is_empty());
    }
}
