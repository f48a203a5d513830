use anyhow::Result;
use clap::{Arg, ArgAction, Command};

mod cmd;
mod config;
mod logging;

fn cli() -> Command {
    Command::new("sophia-docs")
        .about("Static documentation site generator for the Sophia Library")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only show errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .global(true),
        )
        .subcommand(cmd::build::make_subcommand())
        .subcommand(cmd::serve::make_subcommand())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    logging::initialize_logging(&matches)?;

    match matches.subcommand() {
        Some(("build", args)) => cmd::build::execute(args),
        Some(("serve", args)) => cmd::serve::execute(args).await,
        Some((name, _)) => anyhow::bail!("Unknown command: {name}"),
        None => Ok(()),
    }
}
