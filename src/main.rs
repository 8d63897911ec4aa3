use std::time::Duration;

use clap::Parser;
use tracing::metadata::LevelFilter;
use voicebot_models::{
    cli::{self, output, Cli},
    models::CancelFlag,
};

const CANCEL_GRACE: Duration = Duration::from_secs(5);

fn setup_logging(verbose: bool) {
    let fallback = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    let filter = std::env::var("MODELS_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn interrupted() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for interrupts: {error}");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    setup_logging(args.verbose);

    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let mut worker = tokio::task::spawn_blocking(move || cli::run(&args, worker_cancel));

    let code = tokio::select! {
        joined = &mut worker => joined.unwrap_or_else(|error| {
            tracing::error!("Provisioning worker crashed: {error}");
            cli::EXIT_FAILURE
        }),
        () = interrupted() => {
            cancel.cancel();
            // A read blocked on a stalled socket never sees the flag.
            if tokio::time::timeout(CANCEL_GRACE, &mut worker).await.is_err() {
                tracing::warn!("Download did not stop within {CANCEL_GRACE:?}, exiting anyway");
            }
            output::print_cancelled();
            cli::EXIT_CANCELLED
        }
    };

    std::process::exit(code);
}
