use anyhow::Result;
use clap::ArgMatches;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Sets up the global subscriber. Logs go to stderr.
///
/// `--verbose` shows debug output, `--quiet` only errors.
pub fn initialize_logging(matches: &ArgMatches) -> Result<()> {
    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else if matches.get_flag("quiet") {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
