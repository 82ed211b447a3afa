use anyhow::Result;
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vmig",
    version,
    about = "Migrate the contents of one volume into an empty one",
    long_about = "`vmig` copies the full contents of a source directory into an empty destination
directory, preserving modes and optionally rewriting ownership. It is meant to run
as a one-shot init step when moving a persistent volume to a new backend.

EXAMPLE:
    # Migrate a volume and hand it over to uid/gid 1000
    vmig -s /mnt/old -d /mnt/new --owner 1000 --group 1000 --summary

If the destination already holds data the migration is skipped and the run still
counts as a success, so the tool can be re-run safely."
)]
struct Args {
    // Migration options
    /// Source data directory
    #[arg(
        short = 's',
        long = "source-directory",
        value_name = "PATH",
        help_heading = "Migration options"
    )]
    source_directory: std::path::PathBuf,

    /// Destination data directory
    #[arg(
        short = 'd',
        long = "destination-directory",
        value_name = "PATH",
        help_heading = "Migration options"
    )]
    destination_directory: std::path::PathBuf,

    /// Change the owner of every copied entry to this numeric uid
    #[arg(
        short = 'u',
        long,
        default_value = "",
        value_name = "UID",
        help_heading = "Migration options"
    )]
    owner: String,

    /// Change the group of every copied entry to this numeric gid
    #[arg(
        short = 'g',
        long,
        default_value = "",
        value_name = "GID",
        help_heading = "Migration options"
    )]
    group: String,

    /// Cancel the migration if it has not finished within this duration
    ///
    /// This option accepts a human readable duration, e.g. "200ms", "10s", "5min" etc.
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help_heading = "Migration options"
    )]
    timeout: Option<std::time::Duration>,

    // Progress & output
    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,
}

/// Cancel `token` once the process receives an interrupt or, when set,
/// `timeout` elapses.
async fn wait_for_cancel(
    timeout: Option<std::time::Duration>,
    token: tokio_util::sync::CancellationToken,
) {
    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::warn!("interrupt received, cancelling the migration"),
            Err(error) => {
                tracing::error!("cannot listen for interrupts: {error}");
                std::future::pending::<()>().await;
            }
        }
    };
    match timeout {
        Some(delay) => {
            tokio::select! {
                () = interrupted => {}
                () = tokio::time::sleep(delay) => {
                    tracing::warn!(
                        "migration timed out after {}, cancelling",
                        humantime::format_duration(delay)
                    );
                }
            }
        }
        None => interrupted.await,
    }
    token.cancel();
}

#[instrument]
async fn async_main(args: Args) -> Result<common::Outcome, common::Error> {
    let token = tokio_util::sync::CancellationToken::new();
    let watcher = tokio::spawn(wait_for_cancel(args.timeout, token.clone()));
    let request = common::Request {
        source: args.source_directory,
        destination: args.destination_directory,
        owner: args.owner,
        group: args.group,
    };
    let result = common::migrate(&request, &token, &common::events::TracingSink).await;
    watcher.abort();
    if let Ok(common::Outcome::Migrated(_)) = &result {
        tracing::info!(
            "all the data have been migrated from {:?} to {:?}",
            &request.source,
            &request.destination
        );
    }
    result
}

fn main() -> Result<()> {
    let args = Args::parse();
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let func = || async_main(args);
    if common::run(&output, func).is_none() {
        std::process::exit(1);
    }
    Ok(())
}
