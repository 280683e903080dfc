use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use imprint_core::{DirNames, Project, ProjectPaths, compile_and_write};

use crate::config::load_build_config;

pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("DIR")
                .help("Project root directory")
                .default_value("."),
        )
        .arg(
            Arg::new("dest")
                .short('d')
                .long("dest")
                .value_name("DIR")
                .help("Destination directory for generated pages")
                .default_value("./build"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .default_value("./imprint.toml"),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .action(ArgAction::SetTrue)
                .help("Replace existing output files"),
        )
        .arg(
            Arg::new("minify")
                .long("minify")
                .action(ArgAction::SetTrue)
                .help("Minify rendered HTML"),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .action(ArgAction::SetTrue)
                .help("Print build logging"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Page name to exclude from compilation (repeatable)"),
        )
        .arg(
            Arg::new("typecheck-config")
                .long("typecheck-config")
                .value_name("FILE")
                .help("Type-checking configuration; enables TypeScript helper sources"),
        )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build")).about("Compile the project into standalone HTML files")
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let cfg = load_build_config(args)?;

    if cfg.options.logging {
        tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .init();
    }

    let paths = ProjectPaths::resolve(&cfg.build.root, DirNames::default());
    let dest = cfg.options.dest.clone();
    let project = Project::new(paths, cfg.options);

    // Script helpers need an embedder-supplied runtime; the CLI ships none,
    // so a project carrying helper files fails with a clear message.
    let pages = compile_and_write(&project, None).await?;

    println!("Compiled {} page(s) into {}", pages.len(), dest.display());

    Ok(())
}
