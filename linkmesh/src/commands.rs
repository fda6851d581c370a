use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkmesh")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkmesh")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-d --"database" <PATH>)
                .required(false)
                .help("Location of the linkmesh database directory")
                .default_value("~/.config/linkmesh/"),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the linkmesh database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the linkmesh database")
                        .default_value("~/.config/linkmesh/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("project")
                .about("Manage linkmesh projects")
                .subcommand(
                    command!("create")
                        .about("Creates a project")
                        .arg(
                            arg!(-n --"name" <NAME>)
                                .required(true)
                                .help("The name of the project"),
                        )
                        .arg(
                            arg!(--"domain" <DOMAIN>)
                                .required(true)
                                .help("The site domain the project plans links for"),
                        ),
                )
                .subcommand(command!("list").about("List all projects")),
        )
        .subcommand(
            command!("import")
                .about(
                    "Import a page corpus from a CSV export. Replaces the project's \
                current corpus.",
                )
                .arg(
                    arg!(-p --"project" <PROJECT_ID>)
                        .required(true)
                        .help("The project to import into"),
                )
                .arg(
                    arg!(-F --"file" <PATH>)
                        .required(true)
                        .help("Path to the CSV file (url and html_or_text columns required)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("run")
                .about(
                    "Launch a link generation run: enabled strategies propose edges, \
                the resolver decides, results await review.",
                )
                .arg(
                    arg!(-p --"project" <PROJECT_ID>)
                        .required(true)
                        .help("The project to run against"),
                )
                .arg(
                    arg!(-t --"tasks" <TASKS>)
                        .required(true)
                        .help("Comma-separated strategies: hubs,commerce,similar,deep,fresh,orphans,broken,regenerate"),
                )
                .arg(
                    arg!(--"seed" <SEED>)
                        .required(false)
                        .help("Sampling seed for reproducible runs")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("0"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Maximum run duration before it is failed")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"max-links" <N>)
                        .required(false)
                        .help("Per-page link budget (default 3)")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(--"min-gap" <WORDS>)
                        .required(false)
                        .help("Minimum word gap between anchors on a page (default 200)")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(--"sample" <PERCENT>)
                        .required(false)
                        .help("Random sample percentage of the candidate pool (default 100)")
                        .value_parser(clap::value_parser!(u8)),
                )
                .arg(
                    arg!(--"exact-percent" <PERCENT>)
                        .required(false)
                        .help("Upper bound on exact-match anchors per page (default 20)")
                        .value_parser(clap::value_parser!(u8)),
                )
                .arg(
                    arg!(--"url-pattern" <REGEX>)
                        .required(false)
                        .help("Only source pages matching this regex stay in scope"),
                )
                .arg(
                    arg!(--"commerce-pattern" <REGEX>)
                        .required(false)
                        .help("URL regex selecting commerce targets (with --tasks commerce)"),
                ),
        )
        .subcommand(
            command!("runs").about("Show run history for a project").arg(
                arg!(-p --"project" <PROJECT_ID>)
                    .required(true)
                    .help("The project whose runs to list"),
            ),
        )
        .subcommand(
            command!("review")
                .about("Review a run's link candidates")
                .subcommand(
                    command!("list")
                        .about("List candidates with optional filters")
                        .arg(
                            arg!(-r --"run" <RUN_ID>)
                                .required(true)
                                .help("The run to review"),
                        )
                        .arg(
                            arg!(--"type" <TYPE>)
                                .required(false)
                                .help("Filter by strategy type"),
                        )
                        .arg(
                            arg!(--"status" <STATUS>)
                                .required(false)
                                .help("Filter by status: pending, approved, rejected"),
                        )
                        .arg(
                            arg!(-s --"search" <TEXT>)
                                .required(false)
                                .help("Search source, target and anchor text"),
                        ),
                )
                .subcommand(
                    command!("approve").about("Approve one candidate").arg(
                        arg!(--"id" <CANDIDATE_ID>)
                            .required(true)
                            .help("The candidate to approve"),
                    ),
                )
                .subcommand(
                    command!("reject").about("Reject one candidate").arg(
                        arg!(--"id" <CANDIDATE_ID>)
                            .required(true)
                            .help("The candidate to reject"),
                    ),
                )
                .subcommand(
                    command!("approve-all")
                        .about("Approve every pending candidate the filter selects")
                        .arg(
                            arg!(-r --"run" <RUN_ID>)
                                .required(true)
                                .help("The run to approve candidates on"),
                        )
                        .arg(
                            arg!(--"type" <TYPE>)
                                .required(false)
                                .help("Filter by strategy type"),
                        )
                        .arg(
                            arg!(-s --"search" <TEXT>)
                                .required(false)
                                .help("Search source, target and anchor text"),
                        ),
                ),
        )
        .subcommand(
            command!("publish")
                .about("Publish a fully reviewed run")
                .arg(
                    arg!(-r --"run" <RUN_ID>)
                        .required(true)
                        .help("The run to publish"),
                ),
        )
        .subcommand(
            command!("export")
                .about("Export a run's full candidate set")
                .arg(
                    arg!(-r --"run" <RUN_ID>)
                        .required(true)
                        .help("The run to export"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, csv, json")
                        .value_parser(["text", "csv", "json"])
                        .default_value("csv"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
