//! Run launch pipeline.
//!
//! Validates settings, snapshots them into a new run, fans the enabled
//! generators out as parallel tasks over the immutable corpus graph, funnels
//! everything through the resolver and persists the decisions in a single
//! transaction. Progress is reported through a subscriber callback fed by
//! strategy-completion and page-resolution checkpoints.

use crate::data::{Database, RunRow};
use chrono::Utc;
use linkmesh_engine::error::{EngineError, Result};
use linkmesh_engine::generators::{GeneratorContext, StrategyConfig};
use linkmesh_engine::graph::PageGraph;
use linkmesh_engine::model::{RawCandidate, RunStats, Strategy};
use linkmesh_engine::resolver::{ResolverInput, resolve};
use linkmesh_engine::settings::GlobalSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The config snapshot stored on the run row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub strategies: Vec<StrategyConfig>,
    pub settings: GlobalSettings,
    pub seed: u64,
}

pub struct LaunchOptions {
    pub project_id: String,
    pub strategies: Vec<StrategyConfig>,
    pub settings: GlobalSettings,
    /// Sampling seed, recorded in the run config for reproducibility.
    pub seed: u64,
    /// Hard wall-clock budget; exceeding it fails the run.
    pub max_duration: Option<Duration>,
    /// Cooperative cancellation, checked between pipeline stages.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Optional explicit BFS roots for depth computation.
    pub roots: Option<Vec<String>>,
}

impl LaunchOptions {
    pub fn new(project_id: &str, strategies: Vec<StrategyConfig>, settings: GlobalSettings) -> Self {
        Self {
            project_id: project_id.to_string(),
            strategies,
            settings,
            seed: 0,
            max_duration: None,
            cancel: None,
            roots: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted { run_id: String, pages: usize },
    StrategyCompleted { strategy: Strategy, candidates: usize },
    StrategySkipped { strategy: Strategy, error: String },
    Resolved { pages: u32, candidates: usize },
    Completed { stats: RunStats },
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

fn emit(progress: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = progress {
        callback(event);
    }
}

fn cancelled(options: &LaunchOptions) -> bool {
    options
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Launch a generation run for a project.
///
/// Validation failures surface before any run row exists; scope and storage
/// failures mark the created run `failed`. Exactly one run per project may
/// be `running` at a time.
pub async fn execute_launch(
    db: &Database,
    options: LaunchOptions,
    progress: Option<ProgressCallback>,
) -> Result<RunRow> {
    options.settings.validate()?;
    if options.strategies.is_empty() {
        return Err(EngineError::Validation(
            "at least one strategy must be enabled".to_string(),
        ));
    }

    db.get_project(&options.project_id)
        .map_err(storage)?
        .ok_or_else(|| EngineError::NotFound(format!("project {}", options.project_id)))?;

    // Reject concurrent launches before creating any run row.
    let config = RunConfig {
        strategies: options.strategies.clone(),
        settings: options.settings.clone(),
        seed: options.seed,
    };
    let config_json = serde_json::to_string(&config)
        .map_err(|e| EngineError::Validation(format!("config snapshot: {}", e)))?;
    let run_id = db
        .create_run(&options.project_id, &config_json)
        .map_err(storage)?;
    if !db.mark_running(&run_id, &options.project_id).map_err(storage)? {
        db.fail_run(&run_id, "another run is already running")
            .map_err(storage)?;
        return Err(EngineError::ConcurrentRun);
    }
    info!("run {} started for project {}", run_id, options.project_id);

    let started = Instant::now();
    let result = match options.max_duration {
        Some(budget) => {
            match tokio::time::timeout(budget, generate(db, &options, &run_id, &progress)).await {
                Ok(inner) => inner,
                Err(_) => Err(EngineError::Timeout),
            }
        }
        None => generate(db, &options, &run_id, &progress).await,
    };

    match result {
        Ok(mut stats) => {
            stats.processing_ms = started.elapsed().as_millis() as u64;
            let stats_json = serde_json::to_string(&stats)
                .map_err(|e| EngineError::Storage(e.to_string()))?;
            db.complete_run(&run_id, &stats_json).map_err(storage)?;
            emit(&progress, ProgressEvent::Completed { stats });
            db.get_run(&run_id)
                .map_err(storage)?
                .ok_or_else(|| EngineError::NotFound(format!("run {}", run_id)))
        }
        Err(error) => {
            db.fail_run(&run_id, &error.to_string()).map_err(storage)?;
            Err(error)
        }
    }
}

/// The generation body: corpus build, generator fan-out, resolution and the
/// all-or-nothing candidate insert. Any error here fails the run.
async fn generate(
    db: &Database,
    options: &LaunchOptions,
    run_id: &str,
    progress: &Option<ProgressCallback>,
) -> Result<RunStats> {
    let records = db.list_pages(&options.project_id).map_err(storage)?;
    let graph = Arc::new(PageGraph::build(records, options.roots.clone(), Utc::now())?);
    emit(
        progress,
        ProgressEvent::RunStarted {
            run_id: run_id.to_string(),
            pages: graph.len(),
        },
    );

    let prior_links = db
        .prior_approved_links(&options.project_id)
        .map_err(storage)?;
    let seeds_prior = options.strategies.iter().any(|s| s.seeds_prior_links());
    let ctx = Arc::new(GeneratorContext::new(Utc::now()).with_prior_links(prior_links.clone()));

    if cancelled(options) {
        return Err(EngineError::Cancelled);
    }

    // One task per enabled generator; a failing strategy is isolated and
    // recorded as skipped, the run proceeds with the rest.
    let mut handles = Vec::new();
    for strategy_config in options.strategies.clone() {
        let graph = Arc::clone(&graph);
        let ctx = Arc::clone(&ctx);
        let strategy = strategy_config.strategy();
        let handle = tokio::spawn(async move {
            (strategy, strategy_config.generate(&graph, &ctx))
        });
        handles.push(handle);
    }

    let mut pool: Vec<RawCandidate> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    for handle in handles {
        match handle.await {
            Ok((strategy, Ok(candidates))) => {
                emit(
                    progress,
                    ProgressEvent::StrategyCompleted {
                        strategy,
                        candidates: candidates.len(),
                    },
                );
                pool.extend(candidates);
            }
            Ok((strategy, Err(error))) => {
                warn!("{} generator failed: {}", strategy.as_str(), error);
                emit(
                    progress,
                    ProgressEvent::StrategySkipped {
                        strategy,
                        error: error.to_string(),
                    },
                );
                skipped.push(strategy.as_str().to_string());
            }
            Err(join_error) => {
                warn!("generator task panicked: {}", join_error);
                skipped.push("unknown".to_string());
            }
        }
    }

    if cancelled(options) {
        return Err(EngineError::Cancelled);
    }

    let seeded = if seeds_prior { prior_links } else { Vec::new() };
    let input = ResolverInput {
        graph: &graph,
        settings: &options.settings,
        seed: options.seed,
        seeded: &seeded,
    };
    let resolution = resolve(pool, &input)?;
    emit(
        progress,
        ProgressEvent::Resolved {
            pages: resolution.stats.pages_processed,
            candidates: resolution.candidates.len(),
        },
    );
    if resolution.candidates.is_empty() {
        return Err(EngineError::EmptyPool);
    }

    if cancelled(options) {
        return Err(EngineError::Cancelled);
    }

    db.bulk_insert_candidates(run_id, &resolution.candidates)
        .map_err(storage)?;

    let mut stats = resolution.stats;
    stats.strategies_skipped = skipped;
    Ok(stats)
}

fn storage(error: rusqlite::Error) -> EngineError {
    EngineError::Storage(error.to_string())
}
