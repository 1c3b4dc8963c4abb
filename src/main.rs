use std::time::Duration;

use clap::Parser;
use log::{error, info};
use vortex_tracker::servers::signals::global_shutdown_signal;
use vortex_tracker::{app, bootstrap};

/// How long the services are awaited after the shutdown signal before the
/// process gives up on them.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file. Built-in defaults are used when not
    /// provided.
    #[arg(short, long)]
    config: Option<String>,

    /// Maximum number of parallel worker threads. Defaults to the host CPU
    /// count.
    #[arg(long)]
    maxprocs: Option<usize>,
}

fn main() {
    let args = Args::parse();

    let worker_threads = args.maxprocs.unwrap_or_else(|| {
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
        .expect("it should build the tokio runtime");

    runtime.block_on(async {
        let (config, tracker) = match bootstrap::app::setup(args.config.as_deref()) {
            Ok(dependencies) => dependencies,
            Err(e) => {
                eprintln!("vortex-tracker: failed to load the configuration: {e}");
                std::process::exit(1);
            }
        };

        info!("Using {worker_threads} worker threads");

        let jobs = app::start(&config, tracker).await;

        global_shutdown_signal().await;

        info!("Shutting down...");

        let handles: Vec<_> = jobs.into_iter().map(vortex_tracker::bootstrap::jobs::Job::halt).collect();

        let shutdown = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    error!("Failed to shut down a service cleanly: {e}");
                }
            }
        };

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, shutdown).await.is_err() {
            error!("Some services did not shut down within the timeout");
        }

        info!("Goodbye.");
    });
}
