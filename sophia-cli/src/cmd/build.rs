use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use sophia_core::build_site;

use crate::config::load_build_config;

/// Arguments shared by `build` and `serve`. Unset values fall back to env
/// vars, then the config file, then defaults.
pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("DIR")
                .help("Directory containing the markdown docs [default: ./docs]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for generated site [default: ./build]"),
        )
        .arg(
            Arg::new("theme")
                .short('t')
                .long("theme")
                .value_name("DIR")
                .help("Templates overriding the built-in theme [default: ./theme]"),
        )
        .arg(
            Arg::new("static_dir")
                .long("static")
                .value_name("DIR")
                .help("Files copied as-is into the output [default: ./static]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./sophia.toml]"),
        )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build")).about("Build the documentation site")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = load_build_config(args)?;
    let sidebars = config.load_sidebars()?;

    let report = build_site(&config.site, &sidebars, &config.paths())?;

    tracing::info!(
        pages = report.pages_written,
        broken_links = report.broken_links.len(),
        output = %config.build.output,
        "Site built successfully"
    );

    Ok(())
}
