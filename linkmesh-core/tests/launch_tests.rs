// End-to-end tests for the launch pipeline

use chrono::Utc;
use linkmesh_core::data::{CandidateFilter, Database};
use linkmesh_core::launch::{LaunchOptions, ProgressEvent, execute_launch};
use linkmesh_engine::error::EngineError;
use linkmesh_engine::generators::{
    CommerceConfig, HubTopology, HubsConfig, OrphanScope, OrphansConfig, RegenerateConfig,
    StrategyConfig,
};
use linkmesh_engine::model::{CandidateStatus, PageRecord, RejectionReason, RunStatus, Strategy};
use linkmesh_engine::settings::{GlobalSettings, OldLinksAction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn record(url: &str, title: &str, content: &str) -> PageRecord {
    PageRecord {
        url: url.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        meta_title: None,
        meta_description: None,
        publish_date: Some(Utc::now()),
        language: Some("en".to_string()),
    }
}

/// A small shop corpus: /island is an orphan, only the home page mentions
/// the word "island", and the catalog section mentions its members.
fn seed_corpus(db: &Database, project_id: &str) {
    let pages = vec![
        record(
            "/",
            "Home",
            "welcome to the home of shopping browse our catalog at /catalog \
             and visit the island hideout for rare finds",
        ),
        record(
            "/catalog",
            "Catalog",
            "the catalog lists /catalog/phones and /catalog/laptops with \
             phones and laptops for everyone",
        ),
        record(
            "/catalog/phones",
            "Phones",
            "phones galore in the catalog with laptops nearby",
        ),
        record(
            "/catalog/laptops",
            "Laptops",
            "laptops galore in the catalog with phones nearby",
        ),
        record("/island", "Island", "island content far away from everything"),
    ];
    db.replace_pages(project_id, &pages).unwrap();
}

fn test_settings() -> GlobalSettings {
    GlobalSettings {
        min_gap: 1,
        exact_anchor_percent: 100,
        ..Default::default()
    }
}

fn hub_and_orphan_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::Hubs(HubsConfig {
            topology: HubTopology::Star,
            restrict_prefix: false,
        }),
        StrategyConfig::Orphans(OrphansConfig {
            scope: OrphanScope::Entire,
        }),
    ]
}

#[tokio::test]
async fn launch_completes_and_persists_decisions() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    let options = LaunchOptions::new(&project_id, hub_and_orphan_strategies(), test_settings());
    let run = execute_launch(&db, options, None).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.completed_at.is_some());

    let stats: serde_json::Value = serde_json::from_str(run.stats.as_deref().unwrap()).unwrap();
    // Two hub spokes plus the home->island rescue.
    assert_eq!(stats["links_added"], 3);
    assert_eq!(stats["orphans_linked"], 1);

    let candidates = db.list_candidates(&run.id, &CandidateFilter::default()).unwrap();
    assert!(!candidates.is_empty());

    let island_pending = candidates
        .iter()
        .find(|c| c.target_url == "/island" && c.status == CandidateStatus::Pending)
        .unwrap();
    assert_eq!(island_pending.source_url, "/");
    assert_eq!(island_pending.strategy, Strategy::Orphans);

    // Donors without the anchor word on the page are turned away.
    assert!(candidates.iter().any(|c| {
        c.target_url == "/island"
            && c.rejection_reason == Some(RejectionReason::AnchorNotFound)
    }));
}

#[tokio::test]
async fn per_page_budget_is_never_exceeded() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    let settings = GlobalSettings {
        max_links_per_page: 1,
        ..test_settings()
    };
    let options = LaunchOptions::new(&project_id, hub_and_orphan_strategies(), settings);
    let run = execute_launch(&db, options, None).await.unwrap();

    let candidates = db.list_candidates(&run.id, &CandidateFilter::default()).unwrap();
    let mut per_source: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for candidate in &candidates {
        if candidate.status == CandidateStatus::Pending {
            *per_source.entry(candidate.source_url.as_str()).or_default() += 1;
        }
    }
    assert!(per_source.values().all(|&n| n <= 1));
}

#[tokio::test]
async fn zero_budget_completes_with_nothing_added() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    let settings = GlobalSettings {
        max_links_per_page: 0,
        ..test_settings()
    };
    let options = LaunchOptions::new(&project_id, hub_and_orphan_strategies(), settings);
    let run = execute_launch(&db, options, None).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let stats: serde_json::Value = serde_json::from_str(run.stats.as_deref().unwrap()).unwrap();
    assert_eq!(stats["links_added"], 0);
    let candidates = db.list_candidates(&run.id, &CandidateFilter::default()).unwrap();
    assert!(candidates.iter().all(|c| c.status == CandidateStatus::Rejected));
}

#[tokio::test]
async fn concurrent_launch_is_rejected() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    // Simulate an in-flight run.
    let busy = db.create_run(&project_id, "{}").unwrap();
    assert!(db.mark_running(&busy, &project_id).unwrap());

    let options = LaunchOptions::new(&project_id, hub_and_orphan_strategies(), test_settings());
    let result = execute_launch(&db, options, None).await;
    assert!(matches!(result, Err(EngineError::ConcurrentRun)));

    // The refused launch created no candidates.
    let runs = db.list_runs(&project_id).unwrap();
    for run in runs {
        let candidates = db.list_candidates(&run.id, &CandidateFilter::default()).unwrap();
        assert!(candidates.is_empty());
    }
}

#[tokio::test]
async fn empty_corpus_fails_the_run() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();

    let options = LaunchOptions::new(&project_id, hub_and_orphan_strategies(), test_settings());
    let result = execute_launch(&db, options, None).await;
    assert!(matches!(result, Err(EngineError::CorpusEmpty)));

    let runs = db.list_runs(&project_id).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].error.as_deref().unwrap().contains("Corpus"));
}

#[tokio::test]
async fn invalid_settings_never_create_a_run() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    let settings = GlobalSettings {
        exact_anchor_percent: 150,
        ..Default::default()
    };
    let options = LaunchOptions::new(&project_id, hub_and_orphan_strategies(), settings);
    let result = execute_launch(&db, options, None).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(db.list_runs(&project_id).unwrap().is_empty());
}

#[tokio::test]
async fn failing_generator_is_skipped_not_fatal() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    let strategies = vec![
        StrategyConfig::Commerce(CommerceConfig {
            url_pattern: "([broken".to_string(),
            limit_prefix: None,
        }),
        StrategyConfig::Orphans(OrphansConfig {
            scope: OrphanScope::Entire,
        }),
    ];
    let options = LaunchOptions::new(&project_id, strategies, test_settings());
    let run = execute_launch(&db, options, None).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let stats: serde_json::Value = serde_json::from_str(run.stats.as_deref().unwrap()).unwrap();
    assert_eq!(stats["strategies_skipped"][0], "commerce");
}

#[tokio::test]
async fn cancellation_fails_the_run_without_candidates() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    let cancel = Arc::new(AtomicBool::new(true));
    cancel.store(true, Ordering::Relaxed);
    let mut options = LaunchOptions::new(&project_id, hub_and_orphan_strategies(), test_settings());
    options.cancel = Some(cancel);

    let result = execute_launch(&db, options, None).await;
    assert!(matches!(result, Err(EngineError::Cancelled)));

    let runs = db.list_runs(&project_id).unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
    let candidates = db.list_candidates(&runs[0].id, &CandidateFilter::default()).unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn progress_events_arrive_in_order() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let callback = Arc::new(move |event: ProgressEvent| {
        let label = match event {
            ProgressEvent::RunStarted { .. } => "started",
            ProgressEvent::StrategyCompleted { .. } => "strategy",
            ProgressEvent::StrategySkipped { .. } => "skipped",
            ProgressEvent::Resolved { .. } => "resolved",
            ProgressEvent::Completed { .. } => "completed",
        };
        sink.lock().unwrap().push(label.to_string());
    });

    let options = LaunchOptions::new(&project_id, hub_and_orphan_strategies(), test_settings());
    execute_launch(&db, options, Some(callback)).await.unwrap();

    let seen = events.lock().unwrap();
    assert_eq!(seen.first().map(String::as_str), Some("started"));
    assert_eq!(seen.last().map(String::as_str), Some("completed"));
    assert_eq!(seen.iter().filter(|e| *e == "strategy").count(), 2);
    assert!(seen.contains(&"resolved".to_string()));
}

#[tokio::test]
async fn relaunching_is_deterministic() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    let view = |run_id: &str| {
        db.list_candidates(run_id, &CandidateFilter::default())
            .unwrap()
            .into_iter()
            .map(|c| (c.source_url, c.target_url, c.status, c.rejection_reason))
            .collect::<Vec<_>>()
    };

    let first = execute_launch(
        &db,
        LaunchOptions::new(&project_id, hub_and_orphan_strategies(), test_settings()),
        None,
    )
    .await
    .unwrap();
    let second = execute_launch(
        &db,
        LaunchOptions::new(&project_id, hub_and_orphan_strategies(), test_settings()),
        None,
    )
    .await
    .unwrap();

    assert_eq!(view(&first.id), view(&second.id));
}

#[tokio::test]
async fn enrich_seeds_prior_approved_edges() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    seed_corpus(&db, &project_id);

    // First run: approve the home -> island rescue.
    let first = execute_launch(
        &db,
        LaunchOptions::new(&project_id, hub_and_orphan_strategies(), test_settings()),
        None,
    )
    .await
    .unwrap();
    db.approve_pending(&first.id, &CandidateFilter::default()).unwrap();

    // Second run with enrich: the already-approved edge must not be
    // proposed again.
    let mut strategies = hub_and_orphan_strategies();
    strategies.push(StrategyConfig::Regenerate(RegenerateConfig {
        mode: OldLinksAction::Enrich,
    }));
    let second = execute_launch(
        &db,
        LaunchOptions::new(&project_id, strategies, test_settings()),
        None,
    )
    .await
    .unwrap();

    let candidates = db.list_candidates(&second.id, &CandidateFilter::default()).unwrap();
    let island_edge = candidates
        .iter()
        .find(|c| c.source_url == "/" && c.target_url == "/island")
        .unwrap();
    assert_eq!(island_edge.status, CandidateStatus::Rejected);
    assert_eq!(island_edge.rejection_reason, Some(RejectionReason::Duplicate));
}
