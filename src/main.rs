//! chunk-gc: removes chunks no snapshot index refers to.
//!
//! Runs a dry run by default; pass `--delete` to remove the reported chunks.

use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing::{error, warn, Level};
use tracing_subscriber::FmtSubscriber;

use chunk_gc::{Args, Config, ErrorCode, GarbageCollector};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {}", e);
    }

    let config = match Config::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}\n", e.message);
            let _ = Args::command().print_help();
            return ExitCode::from(2);
        }
    };

    let collector = GarbageCollector::new(config);

    // Ctrl+C stops all workers; a scan interrupted this way never reaches the sweep.
    let cancel = collector.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping workers");
            cancel.cancel();
        }
    });

    match collector.run().await {
        Ok(summary) => {
            println!(
                "live digests: {}, blobs found: {}, garbage found: {}",
                summary.live_digests, summary.blobs_found, summary.garbage_found
            );
            println!("file list written at {}", summary.report_path.display());
            if let Some(deleted) = summary.deleted {
                println!(
                    "attempted: {}, deleted: {}, already gone: {}, failed: {}",
                    deleted.attempted(),
                    deleted.removed,
                    deleted.missing,
                    deleted.failed
                );
                if deleted.interrupted {
                    let left = (summary.garbage_found as u64).saturating_sub(deleted.attempted());
                    error!("Sweep interrupted, {} files left in place", left);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.code == ErrorCode::Cancelled {
                error!("Run cancelled");
            } else if e.code.is_fatal_scan() {
                error!("Scan failed, no report written and nothing deleted: {}", e.message);
            } else {
                error!("{}", e.message);
            }
            ExitCode::FAILURE
        }
    }
}
