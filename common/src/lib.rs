//! Internal library for the `vmig` volume migration tool.
//!
//! Holds the emptiness probe, the pre-order tree walk, the copy routine and
//! the migration orchestrator; the `vmig` binary is a thin CLI wrapper
//! around [`migrate`].

pub mod config;
pub mod copy;
pub mod errors;
pub mod events;
pub mod migrate;
pub mod ownership;
pub mod probe;
pub mod walk;

#[cfg(test)]
mod testutils;

pub use config::OutputConfig;
pub use errors::Error;
pub use migrate::{Outcome, Request, migrate};

/// Set up tracing and a tokio runtime, run `func` to completion on it and
/// report the result.
///
/// The traversal is strictly sequential, so the runtime is single-threaded;
/// the only concurrent task is whatever the caller spawns to feed the
/// cancellation token.
///
/// Returns `None` when the operation failed; callers are expected to map
/// that to a non-zero exit code.
pub fn run<Fut, Res>(output: &OutputConfig, func: impl FnOnce() -> Fut) -> Option<Res>
where
    Fut: Future<Output = Result<Res, Error>>,
    Res: std::fmt::Display,
{
    let log_level = match output.verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed starting the tokio runtime: {error}");
            return None;
        }
    };
    match runtime.block_on(func()) {
        Ok(result) => {
            if output.print_summary {
                println!("{result}");
            }
            Some(result)
        }
        Err(error) => {
            if !output.quiet {
                tracing::error!("{}", &error);
            }
            None
        }
    }
}
