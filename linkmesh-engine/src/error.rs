use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid settings: {0}")]
    Validation(String),

    #[error("Corpus is empty: at least 2 pages are required")]
    CorpusEmpty,

    #[error("No eligible candidates after scope filters")]
    EmptyPool,

    #[error("Another run for this project is already running")]
    ConcurrentRun,

    #[error("Review incomplete: {pending} candidate(s) still pending")]
    ReviewIncomplete { pending: usize },

    #[error("Row was modified concurrently")]
    Conflict,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal run transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Run exceeded the maximum allowed duration")]
    Timeout,

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
