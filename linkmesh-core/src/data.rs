use chrono::{DateTime, Utc};
use linkmesh_engine::model::{
    CandidateStatus, PageRecord, PriorLink, RejectionReason, ResolvedCandidate, RunStatus, Strategy,
};
use rusqlite::{Connection, OptionalExtension, Result, params};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct RunRow {
    pub id: String,
    pub project_id: String,
    pub status: RunStatus,
    pub config: Option<String>,
    pub stats: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub id: String,
    pub run_id: String,
    pub source_url: String,
    pub target_url: String,
    pub anchor: String,
    pub strategy: Strategy,
    pub status: CandidateStatus,
    pub rejection_reason: Option<RejectionReason>,
    pub word_offset: Option<i64>,
    pub before_text: Option<String>,
    pub after_text: Option<String>,
    pub created_at: i64,
}

/// Review-ledger filter: strategy, status, free-text search.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub strategy: Option<Strategy>,
    pub status: Option<CandidateStatus>,
    pub search: Option<String>,
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

impl Database {
    pub fn drop(path: &Path) {
        fs::remove_file(path).unwrap();
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Optimize for concurrent writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    domain TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- Imported corpus, replaced wholesale on re-import
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    meta_title TEXT,
    meta_description TEXT,
    publish_date INTEGER,
    language TEXT,
    created_at INTEGER NOT NULL,
    FOREIGN KEY(project_id) REFERENCES projects(id) ON DELETE CASCADE,
    UNIQUE(project_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_project ON pages(project_id);

-- Generation attempts
CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('draft', 'running', 'completed', 'failed', 'published')),
    config TEXT,              -- JSON: strategies + settings snapshot + seed
    stats TEXT,               -- JSON counters
    error TEXT,               -- failure reason when status = failed
    created_at INTEGER NOT NULL,
    completed_at INTEGER,
    FOREIGN KEY(project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_runs_project ON runs(project_id);
CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(project_id, status);

-- Resolver decisions; rows are re-statused by review, never deleted
CREATE TABLE IF NOT EXISTS link_candidates (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    source_url TEXT NOT NULL,
    target_url TEXT NOT NULL,
    anchor TEXT NOT NULL,
    type TEXT NOT NULL CHECK(type IN (
        'hubs',
        'commerce',
        'similar',
        'deep',
        'fresh',
        'orphans',
        'broken',
        'regenerate'
    )),
    status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'approved', 'rejected')),
    rejection_reason TEXT CHECK(rejection_reason IN (
        'duplicate',
        'stop_anchor',
        'anchor_not_found',
        'min_gap',
        'exact_exceed',
        'limit_reached'
    ) OR rejection_reason IS NULL),
    word_offset INTEGER,
    before_text TEXT,
    after_text TEXT,
    created_at INTEGER NOT NULL,
    FOREIGN KEY(run_id) REFERENCES runs(id) ON DELETE CASCADE,
    UNIQUE(run_id, source_url, target_url)
);

CREATE INDEX IF NOT EXISTS idx_candidates_run ON link_candidates(run_id);
CREATE INDEX IF NOT EXISTS idx_candidates_status ON link_candidates(run_id, status);
CREATE INDEX IF NOT EXISTS idx_candidates_type ON link_candidates(run_id, type);
            ",
        )?;
        Ok(())
    }

    // Project management
    pub fn create_project(&self, name: &str, domain: &str) -> Result<String> {
        let project_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();

        self.conn.execute(
            "INSERT INTO projects (id, name, domain, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![&project_id, name, domain, timestamp],
        )?;

        Ok(project_id)
    }

    pub fn get_project(&self, project_id: &str) -> Result<Option<ProjectRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, domain, created_at FROM projects WHERE id = ?1")?;
        stmt.query_row(params![project_id], |row| {
            Ok(ProjectRow {
                id: row.get(0)?,
                name: row.get(1)?,
                domain: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, domain, created_at FROM projects ORDER BY created_at DESC, id",
        )?;
        let projects = stmt
            .query_map([], |row| {
                Ok(ProjectRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    domain: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(projects)
    }

    // Page corpus
    /// Replace the project's corpus with a freshly imported one.
    pub fn replace_pages(&self, project_id: &str, records: &[PageRecord]) -> Result<usize> {
        let timestamp = current_timestamp();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM pages WHERE project_id = ?1", params![project_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO pages (
                    project_id, url, title, content, meta_title, meta_description,
                    publish_date, language, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for record in records {
                stmt.execute(params![
                    project_id,
                    &record.url,
                    &record.title,
                    &record.content,
                    &record.meta_title,
                    &record.meta_description,
                    record.publish_date.map(|d| d.timestamp()),
                    &record.language,
                    timestamp,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn list_pages(&self, project_id: &str) -> Result<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, title, content, meta_title, meta_description, publish_date, language
             FROM pages WHERE project_id = ?1 ORDER BY url",
        )?;
        let pages = stmt
            .query_map(params![project_id], |row| {
                let publish_ts: Option<i64> = row.get(5)?;
                Ok(PageRecord {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    meta_title: row.get(3)?,
                    meta_description: row.get(4)?,
                    publish_date: publish_ts.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
                    language: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(pages)
    }

    pub fn page_count(&self, project_id: &str) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )
    }

    // Run lifecycle
    pub fn create_run(&self, project_id: &str, config_json: &str) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();

        self.conn.execute(
            "INSERT INTO runs (id, project_id, status, config, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&run_id, project_id, RunStatus::Draft.as_str(), config_json, timestamp],
        )?;

        Ok(run_id)
    }

    /// Atomically move a draft run to `running`, refusing when another run
    /// of the same project is already running. Returns false on refusal.
    pub fn mark_running(&self, run_id: &str, project_id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let busy: i64 = tx.query_row(
            "SELECT COUNT(*) FROM runs WHERE project_id = ?1 AND status = 'running'",
            params![project_id],
            |row| row.get(0),
        )?;
        if busy > 0 {
            return Ok(false);
        }
        let changed = tx.execute(
            "UPDATE runs SET status = 'running' WHERE id = ?1 AND status = 'draft'",
            params![run_id],
        )?;
        tx.commit()?;
        Ok(changed == 1)
    }

    pub fn complete_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        let timestamp = current_timestamp();
        self.conn.execute(
            "UPDATE runs SET status = 'completed', stats = ?1, completed_at = ?2 WHERE id = ?3 AND status = 'running'",
            params![stats_json, timestamp, run_id],
        )?;
        Ok(())
    }

    pub fn fail_run(&self, run_id: &str, error: &str) -> Result<()> {
        let timestamp = current_timestamp();
        self.conn.execute(
            "UPDATE runs SET status = 'failed', error = ?1, completed_at = ?2 WHERE id = ?3 AND status IN ('draft', 'running')",
            params![error, timestamp, run_id],
        )?;
        Ok(())
    }

    pub fn mark_published(&self, run_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE runs SET status = 'published' WHERE id = ?1 AND status = 'completed'",
            params![run_id],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, status, config, stats, error, created_at, completed_at
             FROM runs WHERE id = ?1",
        )?;
        stmt.query_row(params![run_id], row_to_run).optional()
    }

    pub fn list_runs(&self, project_id: &str) -> Result<Vec<RunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, status, config, stats, error, created_at, completed_at
             FROM runs WHERE project_id = ?1 ORDER BY created_at DESC, id",
        )?;
        let runs = stmt
            .query_map(params![project_id], row_to_run)?
            .collect::<Result<Vec<_>>>()?;
        Ok(runs)
    }

    // Candidate persistence
    /// All-or-nothing insert of a run's resolved candidates.
    pub fn bulk_insert_candidates(
        &self,
        run_id: &str,
        candidates: &[ResolvedCandidate],
    ) -> Result<usize> {
        let timestamp = current_timestamp();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO link_candidates (
                    id, run_id, source_url, target_url, anchor, type, status,
                    rejection_reason, word_offset, before_text, after_text, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for candidate in candidates {
                stmt.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    run_id,
                    &candidate.source_url,
                    &candidate.target_url,
                    &candidate.anchor,
                    candidate.strategy.as_str(),
                    candidate.status.as_str(),
                    candidate.rejection_reason.map(|r| r.as_str()),
                    candidate.word_offset.map(|o| o as i64),
                    &candidate.before_text,
                    &candidate.after_text,
                    timestamp,
                ])?;
            }
        }
        tx.commit()?;
        Ok(candidates.len())
    }

    pub fn get_candidate(&self, candidate_id: &str) -> Result<Option<CandidateRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, source_url, target_url, anchor, type, status,
                    rejection_reason, word_offset, before_text, after_text, created_at
             FROM link_candidates WHERE id = ?1",
        )?;
        stmt.query_row(params![candidate_id], row_to_candidate).optional()
    }

    pub fn list_candidates(&self, run_id: &str, filter: &CandidateFilter) -> Result<Vec<CandidateRow>> {
        let mut sql = String::from(
            "SELECT id, run_id, source_url, target_url, anchor, type, status,
                    rejection_reason, word_offset, before_text, after_text, created_at
             FROM link_candidates WHERE run_id = ?1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(run_id.to_string())];
        push_filter(&mut sql, &mut args, filter);
        sql.push_str(" ORDER BY source_url, target_url");

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let candidates = stmt
            .query_map(param_refs.as_slice(), row_to_candidate)?
            .collect::<Result<Vec<_>>>()?;
        Ok(candidates)
    }

    /// Optimistic status toggle: only moves a row that is still in
    /// `expected` state. Returns the number of rows changed (0 or 1).
    pub fn update_candidate_status(
        &self,
        candidate_id: &str,
        expected: CandidateStatus,
        to: CandidateStatus,
    ) -> Result<usize> {
        self.conn.execute(
            "UPDATE link_candidates SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.as_str(), candidate_id, expected.as_str()],
        )
    }

    /// Approve every pending candidate the filter currently selects.
    pub fn approve_pending(&self, run_id: &str, filter: &CandidateFilter) -> Result<usize> {
        let mut sql = String::from(
            "UPDATE link_candidates SET status = 'approved'
             WHERE run_id = ?1 AND status = 'pending'",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(run_id.to_string())];
        push_filter(&mut sql, &mut args, filter);
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
        self.conn.execute(&sql, param_refs.as_slice())
    }

    pub fn pending_count(&self, run_id: &str) -> Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM link_candidates WHERE run_id = ?1 AND status = 'pending'",
            params![run_id],
            |row| row.get(0),
        )
    }

    /// Approved edges across all of a project's runs, one entry per
    /// distinct (source, target) pair, for the regenerate/enrich replay.
    pub fn prior_approved_links(&self, project_id: &str) -> Result<Vec<PriorLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.source_url, c.target_url, MIN(c.anchor)
             FROM link_candidates c
             JOIN runs r ON c.run_id = r.id
             WHERE r.project_id = ?1 AND c.status = 'approved'
             GROUP BY c.source_url, c.target_url
             ORDER BY c.source_url, c.target_url",
        )?;
        let links = stmt
            .query_map(params![project_id], |row| {
                Ok(PriorLink {
                    source_url: row.get(0)?,
                    target_url: row.get(1)?,
                    anchor: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(links)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

fn push_filter(sql: &mut String, args: &mut Vec<Box<dyn rusqlite::ToSql>>, filter: &CandidateFilter) {
    if let Some(strategy) = filter.strategy {
        sql.push_str(&format!(" AND type = ?{}", args.len() + 1));
        args.push(Box::new(strategy.as_str().to_string()));
    }
    if let Some(status) = filter.status {
        sql.push_str(&format!(" AND status = ?{}", args.len() + 1));
        args.push(Box::new(status.as_str().to_string()));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        sql.push_str(&format!(
            " AND (source_url LIKE ?{n} OR target_url LIKE ?{n} OR anchor LIKE ?{n})",
            n = args.len() + 1
        ));
        args.push(Box::new(pattern));
    }
}

fn row_to_run(row: &rusqlite::Row) -> Result<RunRow> {
    let status: String = row.get(2)?;
    Ok(RunRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        status: RunStatus::from_str(&status).unwrap_or(RunStatus::Failed),
        config: row.get(3)?,
        stats: row.get(4)?,
        error: row.get(5)?,
        created_at: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

fn row_to_candidate(row: &rusqlite::Row) -> Result<CandidateRow> {
    let strategy: String = row.get(5)?;
    let status: String = row.get(6)?;
    let reason: Option<String> = row.get(7)?;
    Ok(CandidateRow {
        id: row.get(0)?,
        run_id: row.get(1)?,
        source_url: row.get(2)?,
        target_url: row.get(3)?,
        anchor: row.get(4)?,
        strategy: Strategy::from_str(&strategy).unwrap_or(Strategy::Similar),
        status: CandidateStatus::from_str(&status).unwrap_or(CandidateStatus::Pending),
        rejection_reason: reason.as_deref().and_then(RejectionReason::from_str),
        word_offset: row.get(8)?,
        before_text: row.get(9)?,
        after_text: row.get(10)?,
        created_at: row.get(11)?,
    })
}
