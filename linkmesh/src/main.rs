use commands::command_argument_builder;
use linkmesh_core::print_banner;
use linkmesh_engine::model::CandidateStatus;

mod commands;
mod handlers;

use handlers::*;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("project", primary_command)) => match primary_command.subcommand() {
            Some(("create", secondary_command)) => {
                handle_project_create(&chosen_command, secondary_command)
            }
            Some(("list", _)) => handle_project_list(&chosen_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("import", primary_command)) => handle_import(&chosen_command, primary_command),
        Some(("run", primary_command)) => handle_run(&chosen_command, primary_command).await,
        Some(("runs", primary_command)) => handle_runs(&chosen_command, primary_command),
        Some(("review", primary_command)) => match primary_command.subcommand() {
            Some(("list", secondary_command)) => {
                handle_review_list(&chosen_command, secondary_command)
            }
            Some(("approve", secondary_command)) => handle_review_decide(
                &chosen_command,
                secondary_command,
                CandidateStatus::Approved,
            ),
            Some(("reject", secondary_command)) => handle_review_decide(
                &chosen_command,
                secondary_command,
                CandidateStatus::Rejected,
            ),
            Some(("approve-all", secondary_command)) => {
                handle_review_approve_all(&chosen_command, secondary_command)
            }
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("publish", primary_command)) => handle_publish(&chosen_command, primary_command),
        Some(("export", primary_command)) => handle_export(&chosen_command, primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
