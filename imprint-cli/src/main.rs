mod cmd;
mod config;

use anyhow::Result;
use clap::Command;

fn make_command() -> Command {
    Command::new("imprint")
        .about("Compile handlebars templates, partials, and data files into a static site")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cmd::build::make_subcommand())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let matches = make_command().get_matches();

    match matches.subcommand() {
        Some(("build", args)) => cmd::build::execute(args).await,
        _ => unreachable!("subcommand is required"),
    }
}
