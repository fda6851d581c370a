pub mod data;
pub mod export;
pub mod import;
pub mod launch;
pub mod review;

pub use data::{CandidateFilter, CandidateRow, Database, ProjectRow, RunRow};
pub use launch::{LaunchOptions, ProgressCallback, ProgressEvent, RunConfig, execute_launch};

const BANNER: &str = r#"
  _ _       _                        _
 | (_)_ __ | | ___ __ ___   ___  ___| |__
 | | | '_ \| |/ / '_ ` _ \ / _ \/ __| '_ \
 | | | | | |   <| | | | | |  __/\__ \ | | |
 |_|_|_| |_|_|\_\_| |_| |_|\___||___/_| |_|

 internal link planning for site owners
"#;

pub fn print_banner() {
    println!("{}", BANNER);
}
