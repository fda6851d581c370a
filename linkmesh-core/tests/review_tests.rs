// Tests for the review ledger and export rendering

use chrono::Utc;
use linkmesh_core::data::{CandidateFilter, Database};
use linkmesh_core::export::{
    ExportFormat, gather_export_data, generate_csv_report, generate_json_report,
    generate_text_report,
};
use linkmesh_core::review::{
    approve_all_visible, counts_by_type, decide_candidate, list_candidates, publish_run,
};
use linkmesh_engine::error::EngineError;
use linkmesh_engine::model::{
    CandidateStatus, PageRecord, RejectionReason, ResolvedCandidate, RunStatus, Strategy,
};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn resolved(source: &str, target: &str, anchor: &str, strategy: Strategy) -> ResolvedCandidate {
    ResolvedCandidate {
        source_url: source.to_string(),
        target_url: target.to_string(),
        anchor: anchor.to_string(),
        strategy,
        status: CandidateStatus::Pending,
        rejection_reason: None,
        word_offset: Some(12),
        before_text: None,
        after_text: None,
    }
}

/// A completed run with three pending candidates and one resolver reject.
fn completed_run(db: &Database) -> String {
    let project_id = db.create_project("shop", "shop.example").unwrap();
    db.replace_pages(
        &project_id,
        &[
            PageRecord {
                url: "/a".to_string(),
                title: "A".to_string(),
                content: "x".to_string(),
                meta_title: None,
                meta_description: None,
                publish_date: Some(Utc::now()),
                language: None,
            },
            PageRecord {
                url: "/b".to_string(),
                title: "B".to_string(),
                content: "y".to_string(),
                meta_title: None,
                meta_description: None,
                publish_date: Some(Utc::now()),
                language: None,
            },
        ],
    )
    .unwrap();

    let run_id = db.create_run(&project_id, "{}").unwrap();
    db.mark_running(&run_id, &project_id).unwrap();

    let mut rejected = resolved("/b", "/d", "missing words", Strategy::Fresh);
    rejected.status = CandidateStatus::Rejected;
    rejected.rejection_reason = Some(RejectionReason::AnchorNotFound);
    rejected.word_offset = None;

    db.bulk_insert_candidates(
        &run_id,
        &[
            resolved("/a", "/b", "b things", Strategy::Hubs),
            resolved("/a", "/c", "c things", Strategy::Similar),
            resolved("/b", "/a", "a things", Strategy::Hubs),
            rejected,
        ],
    )
    .unwrap();
    db.complete_run(&run_id, "{\"links_added\":3,\"rejected\":1}")
        .unwrap();
    run_id
}

// ============================================================================
// Review Ledger Tests
// ============================================================================

#[test]
fn test_list_with_filters() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);

    let all = list_candidates(&db, &run_id, &CandidateFilter::default()).unwrap();
    assert_eq!(all.len(), 4);

    let hubs = list_candidates(
        &db,
        &run_id,
        &CandidateFilter {
            strategy: Some(Strategy::Hubs),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(hubs.len(), 2);

    let searched = list_candidates(
        &db,
        &run_id,
        &CandidateFilter {
            search: Some("c thing".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].target_url, "/c");

    assert!(matches!(
        list_candidates(&db, "missing-run", &CandidateFilter::default()),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn test_decide_candidate_and_conflicts() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);
    let id = list_candidates(&db, &run_id, &CandidateFilter::default()).unwrap()[0]
        .id
        .clone();

    let updated = decide_candidate(&db, &id, CandidateStatus::Approved).unwrap();
    assert_eq!(updated.status, CandidateStatus::Approved);

    // Second decision on the same row conflicts.
    assert!(matches!(
        decide_candidate(&db, &id, CandidateStatus::Rejected),
        Err(EngineError::Conflict)
    ));

    // Pending is not a decision.
    assert!(matches!(
        decide_candidate(&db, &id, CandidateStatus::Pending),
        Err(EngineError::Validation(_))
    ));

    assert!(matches!(
        decide_candidate(&db, "missing", CandidateStatus::Approved),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn test_approve_all_visible_only_touches_filtered_pending() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);

    let approved = approve_all_visible(
        &db,
        &run_id,
        &CandidateFilter {
            strategy: Some(Strategy::Hubs),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(approved, 2);

    // The similar candidate is still pending, the resolver reject untouched.
    assert_eq!(db.pending_count(&run_id).unwrap(), 1);
    let all = list_candidates(&db, &run_id, &CandidateFilter::default()).unwrap();
    assert!(all.iter().any(|c| {
        c.strategy == Strategy::Fresh && c.status == CandidateStatus::Rejected
    }));
}

#[test]
fn test_publish_requires_every_candidate_decided() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);

    match publish_run(&db, &run_id) {
        Err(EngineError::ReviewIncomplete { pending }) => assert_eq!(pending, 3),
        other => panic!("expected ReviewIncomplete, got {:?}", other.map(|r| r.status)),
    }

    approve_all_visible(&db, &run_id, &CandidateFilter::default()).unwrap();
    let published = publish_run(&db, &run_id).unwrap();
    assert_eq!(published.status, RunStatus::Published);

    // Idempotent: publishing again is a no-op, not an error.
    let again = publish_run(&db, &run_id).unwrap();
    assert_eq!(again.status, RunStatus::Published);
}

#[test]
fn test_publish_rejects_unfinished_runs() {
    let (_temp_dir, db) = create_test_db();
    let project_id = db.create_project("shop", "shop.example").unwrap();
    let run_id = db.create_run(&project_id, "{}").unwrap();

    assert!(matches!(
        publish_run(&db, &run_id),
        Err(EngineError::IllegalTransition { .. })
    ));
}

#[test]
fn test_counts_by_type() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);

    let counts = counts_by_type(&db, &run_id).unwrap();
    assert!(counts.contains(&("hubs".to_string(), 2)));
    assert!(counts.contains(&("similar".to_string(), 1)));
    assert!(counts.contains(&("fresh".to_string(), 1)));
}

// ============================================================================
// Export Tests
// ============================================================================

#[test]
fn test_export_contains_all_statuses() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);
    approve_all_visible(
        &db,
        &run_id,
        &CandidateFilter {
            strategy: Some(Strategy::Hubs),
            ..Default::default()
        },
    )
    .unwrap();

    let data = gather_export_data(&db, &run_id).unwrap();
    assert_eq!(data.candidates.len(), 4);
    let statuses: Vec<&str> = data.candidates.iter().map(|c| c.status.as_str()).collect();
    assert!(statuses.contains(&"approved"));
    assert!(statuses.contains(&"pending"));
    assert!(statuses.contains(&"rejected"));
}

#[test]
fn test_csv_export_columns() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);

    let data = gather_export_data(&db, &run_id).unwrap();
    let csv = generate_csv_report(&data);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "source_url,target_url,anchor,type,status,rejection_reason"
    );
    assert_eq!(lines.count(), 4);
    assert!(csv.contains("/b,/d,missing words,fresh,rejected,anchor_not_found"));
}

#[test]
fn test_json_export_shape() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);

    let data = gather_export_data(&db, &run_id).unwrap();
    let json = generate_json_report(&data).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["report"]["run"]["id"], run_id);
    assert_eq!(parsed["report"]["run"]["status"], "completed");
    assert_eq!(
        parsed["report"]["candidates"].as_array().unwrap().len(),
        4
    );
    assert_eq!(parsed["report"]["candidates"][0]["type"], "hubs");
}

#[test]
fn test_text_report_mentions_run_and_candidates() {
    let (_temp_dir, db) = create_test_db();
    let run_id = completed_run(&db);

    let data = gather_export_data(&db, &run_id).unwrap();
    let report = generate_text_report(&data);
    assert!(report.contains("LINKMESH RUN REPORT"));
    assert!(report.contains(&run_id));
    assert!(report.contains("anchor: \"b things\""));
    assert!(report.contains("rejected: anchor_not_found"));
}

#[test]
fn test_export_format_parsing() {
    assert!(matches!(ExportFormat::from_str("csv"), Some(ExportFormat::Csv)));
    assert!(matches!(ExportFormat::from_str("JSON"), Some(ExportFormat::Json)));
    assert!(matches!(ExportFormat::from_str("text"), Some(ExportFormat::Text)));
    assert!(ExportFormat::from_str("pdf").is_none());
}
