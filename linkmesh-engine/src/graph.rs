//! Corpus graph construction.
//!
//! Pages are normalized into a directed graph keyed by site-relative URL.
//! Internal links are path references found in page content; references to
//! paths absent from the corpus are kept as dangling links for the broken
//! generator. Depth is computed by BFS from the root set with an explicit
//! visited set.

use crate::error::{EngineError, Result};
use crate::model::{Page, PageRecord};
use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// A link found in content whose target does not exist in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingLink {
    pub source_url: String,
    pub target_path: String,
}

pub struct PageGraph {
    graph: DiGraph<usize, ()>,
    pages: Vec<Page>,
    index: HashMap<String, NodeIndex>,
    dangling: Vec<DanglingLink>,
}

impl PageGraph {
    /// Build the corpus graph from imported records.
    ///
    /// `roots` overrides root detection; otherwise `/` is the root when
    /// present, else every page sharing the minimal path-segment count.
    pub fn build(
        records: Vec<PageRecord>,
        roots: Option<Vec<String>>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if records.len() < 2 {
            return Err(EngineError::CorpusEmpty);
        }

        // Normalize, drop duplicate URLs (first record wins), sort for a
        // deterministic node order.
        let mut seen = HashSet::new();
        let mut normalized: Vec<PageRecord> = Vec::with_capacity(records.len());
        for mut record in records {
            record.url = normalize_path(&record.url);
            if seen.insert(record.url.clone()) {
                normalized.push(record);
            }
        }
        normalized.sort_by(|a, b| a.url.cmp(&b.url));
        if normalized.len() < 2 {
            return Err(EngineError::CorpusEmpty);
        }

        let mut graph = DiGraph::new();
        let mut pages = Vec::with_capacity(normalized.len());
        let mut index = HashMap::new();
        for (i, record) in normalized.into_iter().enumerate() {
            let node = graph.add_node(i);
            index.insert(record.url.clone(), node);
            pages.push(Page {
                url: record.url,
                title: record.title,
                content: record.content,
                meta_title: record.meta_title,
                meta_description: record.meta_description,
                publish_date: record.publish_date.unwrap_or(now),
                language: record.language.unwrap_or_else(|| "en".to_string()),
                depth: None,
                is_orphan: false,
            });
        }

        // Edge extraction: every internal path reference in content.
        let link_re = Regex::new(r#"(?:^|[\s"'(>=])(/[A-Za-z0-9][A-Za-z0-9\-_./]*)"#)
            .expect("link pattern is valid");
        let mut dangling = Vec::new();
        let mut dangling_seen = HashSet::new();
        for i in 0..pages.len() {
            let source_url = pages[i].url.clone();
            let source_node = index[&source_url];
            let mut edge_seen = HashSet::new();
            for captures in link_re.captures_iter(&pages[i].content) {
                let path = normalize_path(&captures[1]);
                if path == source_url || !edge_seen.insert(path.clone()) {
                    continue;
                }
                match index.get(&path) {
                    Some(&target_node) => {
                        graph.add_edge(source_node, target_node, ());
                    }
                    None => {
                        if dangling_seen.insert((source_url.clone(), path.clone())) {
                            dangling.push(DanglingLink {
                                source_url: source_url.clone(),
                                target_path: path,
                            });
                        }
                    }
                }
            }
        }

        let mut built = Self {
            graph,
            pages,
            index,
            dangling,
        };
        built.compute_depths(roots);
        Ok(built)
    }

    fn compute_depths(&mut self, roots: Option<Vec<String>>) {
        let root_urls: Vec<String> = match roots {
            Some(explicit) => explicit
                .into_iter()
                .map(|r| normalize_path(&r))
                .filter(|r| self.index.contains_key(r))
                .collect(),
            None => self.detect_roots(),
        };
        debug!("BFS roots: {:?}", root_urls);

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<(NodeIndex, u32)> = VecDeque::new();
        for url in &root_urls {
            let node = self.index[url];
            if visited.insert(node) {
                queue.push_back((node, 0));
            }
        }
        while let Some((node, depth)) = queue.pop_front() {
            let page_idx = self.graph[node];
            self.pages[page_idx].depth = Some(depth);
            let neighbors: Vec<NodeIndex> = self.graph.neighbors(node).collect();
            for next in neighbors {
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        for page in &mut self.pages {
            page.is_orphan = page.depth.is_none();
        }
    }

    fn detect_roots(&self) -> Vec<String> {
        if self.index.contains_key("/") {
            return vec!["/".to_string()];
        }
        let min_segments = self
            .pages
            .iter()
            .map(|p| path_segments(&p.url))
            .min()
            .unwrap_or(0);
        self.pages
            .iter()
            .filter(|p| path_segments(&p.url) == min_segments)
            .map(|p| p.url.clone())
            .collect()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn get(&self, url: &str) -> Option<&Page> {
        self.index.get(url).map(|&node| &self.pages[self.graph[node]])
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn dangling(&self) -> &[DanglingLink] {
        &self.dangling
    }

    pub fn orphans(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| p.is_orphan)
    }
}

/// Normalize a site-relative path: leading slash, no trailing slash (except
/// the root), query/fragment stripped, trailing punctuation trimmed.
pub fn normalize_path(raw: &str) -> String {
    let mut path = raw.trim().to_string();
    for sep in ['#', '?'] {
        if let Some(pos) = path.find(sep) {
            path.truncate(pos);
        }
    }
    let path = path.trim_end_matches(|c: char| c == '.' || c == ',' || c == ';' || c == ')');
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return "/".to_string();
    }
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

pub fn path_segments(url: &str) -> usize {
    url.trim_matches('/').split('/').filter(|s| !s.is_empty()).count()
}

/// First path segment, the page's top-level section.
pub fn top_prefix(url: &str) -> String {
    match url.trim_matches('/').split('/').find(|s| !s.is_empty()) {
        Some(first) => format!("/{}", first),
        None => "/".to_string(),
    }
}

/// All segments but the last, the page's immediate section.
pub fn parent_path(url: &str) -> String {
    let segments: Vec<&str> = url.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() <= 1 {
        return "/".to_string();
    }
    format!("/{}", segments[..segments.len() - 1].join("/"))
}
