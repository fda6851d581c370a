// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{format_timestamp, parse_filter, parse_strategies, resolve_db_path};

// Re-export the launch surface from linkmesh-core
pub use linkmesh_core::launch::{
    LaunchOptions, ProgressCallback, ProgressEvent, RunConfig, execute_launch,
};
