use chrono::{DateTime, Utc};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use linkmesh_core::data::{CandidateFilter, Database};
use linkmesh_core::export::{
    ExportFormat, gather_export_data, generate_csv_report, generate_json_report,
    generate_text_report, save_report,
};
use linkmesh_core::import::load_pages_csv;
use linkmesh_core::launch::{LaunchOptions, ProgressEvent, execute_launch};
use linkmesh_core::review;
use linkmesh_engine::generators::{CommerceConfig, StrategyConfig};
use linkmesh_engine::model::{CandidateStatus, Strategy};
use linkmesh_engine::settings::GlobalSettings;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush().unwrap();
    let mut response = String::new();
    io::stdin().read_line(&mut response).unwrap();
    response.trim().to_lowercase()
}

/// Expand the configured directory and point at the database file inside.
pub fn resolve_db_path(raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    Path::new(expanded.as_ref()).join("linkmesh.db")
}

/// Parse the --tasks list into strategy configs, wiring the commerce
/// pattern through when given.
pub fn parse_strategies(
    raw: &str,
    commerce_pattern: Option<&str>,
) -> Result<Vec<StrategyConfig>, String> {
    let mut configs = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let strategy = Strategy::from_str(name)
            .ok_or_else(|| format!("Unknown strategy '{}'", name))?;
        let config = match (strategy, commerce_pattern) {
            (Strategy::Commerce, Some(pattern)) => StrategyConfig::Commerce(CommerceConfig {
                url_pattern: pattern.to_string(),
                limit_prefix: None,
            }),
            _ => StrategyConfig::for_strategy(strategy),
        };
        configs.push(config);
    }
    if configs.is_empty() {
        return Err("No strategies given; expected e.g. --tasks hubs,similar".to_string());
    }
    Ok(configs)
}

/// Build a review filter from the optional CLI flags.
pub fn parse_filter(
    type_: Option<&str>,
    status: Option<&str>,
    search: Option<&str>,
) -> Result<CandidateFilter, String> {
    let strategy = match type_ {
        Some(t) => Some(Strategy::from_str(t).ok_or_else(|| format!("Unknown type '{}'", t))?),
        None => None,
    };
    let status = match status {
        Some(s) => {
            Some(CandidateStatus::from_str(s).ok_or_else(|| format!("Unknown status '{}'", s))?)
        }
        None => None,
    };
    Ok(CandidateFilter {
        strategy,
        status,
        search: search.map(str::to_string),
    })
}

pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

fn open_database(matches: &ArgMatches) -> Database {
    let db_path = resolve_db_path(matches.get_one::<String>("database").unwrap());
    if !Database::exists(&db_path) {
        eprintln!(
            "{} No database at {}. Run `linkmesh init` first.",
            "✗".red().bold(),
            db_path.display()
        );
        std::process::exit(1);
    }
    match Database::new(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{} Failed to open database: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  LINKMESH INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let raw_path = args.get_one::<String>("PATH").unwrap();
    let force = args.get_flag("force");
    let expanded = shellexpand::tilde(raw_path);
    let config_dir = Path::new(expanded.as_ref());
    let db_path = config_dir.join("linkmesh.db");

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if Database::exists(&db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Database already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Overwrite it? [y/N]:");
        println!();
        if response != "y" && response != "yes" {
            println!("{} Keeping existing database.", "→".blue());
            return;
        }
        Database::drop(&db_path);
        println!("{} Existing database removed", "✓".green().bold());
        println!();
    } else if Database::exists(&db_path) && force {
        Database::drop(&db_path);
        println!(
            "{} Deleted existing database (force mode)",
            "→".yellow().bold()
        );
        println!();
    }

    std::fs::create_dir_all(config_dir).expect("Failed to create config directory");
    println!("{} Creating database...", "→".blue());
    Database::new(&db_path).expect("Failed to create database");

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
}

pub fn handle_project_create(matches: &ArgMatches, args: &ArgMatches) {
    let db = open_database(matches);
    let name = args.get_one::<String>("name").unwrap();
    let domain = args.get_one::<String>("domain").unwrap();

    match db.create_project(name, domain) {
        Ok(project_id) => {
            println!(
                "{} Project created: {} ({})",
                "✓".green().bold(),
                name.bright_white(),
                project_id.cyan()
            );
        }
        Err(e) => {
            eprintln!("{} Failed to create project: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_project_list(matches: &ArgMatches) {
    let db = open_database(matches);
    let projects = db.list_projects().unwrap_or_default();
    if projects.is_empty() {
        println!("No projects yet. Create one with `linkmesh project create`.");
        return;
    }
    for project in projects {
        println!(
            "{}  {}  {}",
            project.id.cyan(),
            project.name.bright_white(),
            project.domain
        );
    }
}

pub fn handle_import(matches: &ArgMatches, args: &ArgMatches) {
    let db = open_database(matches);
    let project_id = args.get_one::<String>("project").unwrap();
    let file = args.get_one::<PathBuf>("file").unwrap();

    let (records, stats) = match load_pages_csv(file) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{} Import failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match db.replace_pages(project_id, &records) {
        Ok(count) => {
            println!("{} Imported {} page(s)", "✓".green().bold(), count);
            if stats.duplicates > 0 {
                println!("  {} duplicate URL(s) dropped", stats.duplicates);
            }
            if stats.skipped > 0 {
                println!("  {} row(s) skipped (missing url or content)", stats.skipped);
            }
        }
        Err(e) => {
            eprintln!("{} Import failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub async fn handle_run(matches: &ArgMatches, args: &ArgMatches) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let db = open_database(matches);
    let project_id = args.get_one::<String>("project").unwrap();
    let tasks = args.get_one::<String>("tasks").unwrap();
    let commerce_pattern = args.get_one::<String>("commerce-pattern").map(String::as_str);

    let strategies = match parse_strategies(tasks, commerce_pattern) {
        Ok(strategies) => strategies,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let mut settings = GlobalSettings::default();
    if let Some(max_links) = args.get_one::<u32>("max-links") {
        settings.max_links_per_page = *max_links;
    }
    if let Some(min_gap) = args.get_one::<u32>("min-gap") {
        settings.min_gap = *min_gap;
    }
    if let Some(sample) = args.get_one::<u8>("sample") {
        settings.random_sample = *sample;
    }
    if let Some(exact) = args.get_one::<u8>("exact-percent") {
        settings.exact_anchor_percent = *exact;
    }
    if let Some(pattern) = args.get_one::<String>("url-pattern") {
        settings.url_pattern = pattern.clone();
    }

    let mut options = LaunchOptions::new(project_id, strategies, settings);
    options.seed = *args.get_one::<u64>("seed").unwrap();
    options.max_duration = args
        .get_one::<u64>("timeout")
        .map(|secs| Duration::from_secs(*secs));

    println!("\n🔗 Generating links for project {}", project_id);
    println!("Tasks: {}", tasks);
    println!("Seed: {}\n", options.seed);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Building corpus graph...");

    let spinner_clone = spinner.clone();
    let progress: linkmesh_core::launch::ProgressCallback = Arc::new(move |event: ProgressEvent| {
        match event {
            ProgressEvent::RunStarted { pages, .. } => {
                spinner_clone.set_message(format!("Corpus ready: {} pages. Generating...", pages));
            }
            ProgressEvent::StrategyCompleted { strategy, candidates } => {
                spinner_clone.set_message(format!(
                    "{}: {} raw candidate(s)",
                    strategy.as_str(),
                    candidates
                ));
            }
            ProgressEvent::StrategySkipped { strategy, error } => {
                spinner_clone.println(format!(
                    "[!] {} strategy skipped: {}",
                    strategy.as_str(),
                    error
                ));
            }
            ProgressEvent::Resolved { pages, candidates } => {
                spinner_clone.set_message(format!(
                    "Resolved {} candidate(s) across {} page(s)",
                    candidates, pages
                ));
            }
            ProgressEvent::Completed { .. } => {}
        }
    });

    match execute_launch(&db, options, Some(progress)).await {
        Ok(run) => {
            spinner.finish_and_clear();
            println!("{} Run complete: {}\n", "✓".green().bold(), run.id.cyan());
            if let Some(stats_json) = run.stats.as_deref()
                && let Ok(stats) = serde_json::from_str::<serde_json::Value>(stats_json)
            {
                println!("  Links added (pending review): {}", stats["links_added"]);
                println!("  Rejected:                     {}", stats["rejected"]);
                println!("  Pages processed:              {}", stats["pages_processed"]);
            }
            println!("\nReview with: linkmesh review list --run {}", run.id);
        }
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} Run failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_runs(matches: &ArgMatches, args: &ArgMatches) {
    let db = open_database(matches);
    let project_id = args.get_one::<String>("project").unwrap();

    let runs = db.list_runs(project_id).unwrap_or_default();
    if runs.is_empty() {
        println!("No runs yet for project {}.", project_id);
        return;
    }

    for run in runs {
        let status = match run.status.as_str() {
            "completed" => run.status.as_str().green(),
            "published" => run.status.as_str().bright_green().bold(),
            "failed" => run.status.as_str().red(),
            "running" => run.status.as_str().cyan(),
            other => other.normal(),
        };
        println!(
            "{}  {}  {}",
            run.id.cyan(),
            status,
            format_timestamp(run.created_at)
        );
        if let Some(error) = &run.error {
            println!("    error: {}", error.red());
        }
        if let Some(stats_json) = run.stats.as_deref()
            && let Ok(stats) = serde_json::from_str::<serde_json::Value>(stats_json)
        {
            println!(
                "    added: {}  rejected: {}  pages: {}  {} ms",
                stats["links_added"], stats["rejected"], stats["pages_processed"],
                stats["processing_ms"]
            );
        }
    }
}

pub fn handle_review_list(matches: &ArgMatches, args: &ArgMatches) {
    let db = open_database(matches);
    let run_id = args.get_one::<String>("run").unwrap();
    let filter = match parse_filter(
        args.get_one::<String>("type").map(String::as_str),
        args.get_one::<String>("status").map(String::as_str),
        args.get_one::<String>("search").map(String::as_str),
    ) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let candidates = match review::list_candidates(&db, run_id, &filter) {
        Ok(candidates) => candidates,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if candidates.is_empty() {
        println!("No candidates match the filter.");
        return;
    }

    for candidate in &candidates {
        let status = match candidate.status {
            CandidateStatus::Approved => "approved".green(),
            CandidateStatus::Rejected => "rejected".red(),
            CandidateStatus::Pending => "pending".yellow(),
        };
        println!(
            "{}  [{}] {} -> {}",
            candidate.id.cyan(),
            status,
            candidate.source_url,
            candidate.target_url
        );
        println!(
            "    anchor: \"{}\"  type: {}{}",
            candidate.anchor,
            candidate.strategy.as_str(),
            candidate
                .rejection_reason
                .map(|r| format!("  reason: {}", r.as_str()))
                .unwrap_or_default()
        );
    }
    println!("\n{} candidate(s)", candidates.len());
}

pub fn handle_review_decide(matches: &ArgMatches, args: &ArgMatches, decision: CandidateStatus) {
    let db = open_database(matches);
    let candidate_id = args.get_one::<String>("id").unwrap();

    match review::decide_candidate(&db, candidate_id, decision) {
        Ok(candidate) => {
            println!(
                "{} {} -> {} is now {}",
                "✓".green().bold(),
                candidate.source_url,
                candidate.target_url,
                candidate.status.as_str().bright_white()
            );
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_review_approve_all(matches: &ArgMatches, args: &ArgMatches) {
    let db = open_database(matches);
    let run_id = args.get_one::<String>("run").unwrap();
    let filter = match parse_filter(
        args.get_one::<String>("type").map(String::as_str),
        None,
        args.get_one::<String>("search").map(String::as_str),
    ) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match review::approve_all_visible(&db, run_id, &filter) {
        Ok(count) => println!("{} Approved {} candidate(s)", "✓".green().bold(), count),
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_publish(matches: &ArgMatches, args: &ArgMatches) {
    let db = open_database(matches);
    let run_id = args.get_one::<String>("run").unwrap();

    match review::publish_run(&db, run_id) {
        Ok(run) => {
            println!(
                "{} Run {} is {}",
                "✓".green().bold(),
                run.id.cyan(),
                run.status.as_str().bright_green().bold()
            );
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_export(matches: &ArgMatches, args: &ArgMatches) {
    let db = open_database(matches);
    let run_id = args.get_one::<String>("run").unwrap();
    let format = ExportFormat::from_str(args.get_one::<String>("format").unwrap())
        .expect("clap restricts format values");

    let data = match gather_export_data(&db, run_id) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let content = match format {
        ExportFormat::Text => generate_text_report(&data),
        ExportFormat::Csv => generate_csv_report(&data),
        ExportFormat::Json => match generate_json_report(&data) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("{} JSON rendering failed: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        },
    };

    match args.get_one::<PathBuf>("output") {
        Some(path) => match save_report(&content, path) {
            Ok(()) => println!("{} Report saved to {}", "✓".green().bold(), path.display()),
            Err(e) => {
                eprintln!("{} Failed to save report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        },
        None => print!("{}", content),
    }
}
