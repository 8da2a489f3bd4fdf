use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use common::{AppConfig, Logger, SessionResult};
use log::{error, info};
use ping::{run_session, ProbeError, RawTransport, SessionOutcome};

mod args;

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler, run until the count or deadline stops us.
        std::future::pending::<()>().await;
    }
}

async fn persist(config: &AppConfig, result: &SessionResult) -> Result<()> {
    let path = config.daily_file(Local::now().date_naive());
    let mut logger = Logger::<SessionResult>::new(&path).await?;
    logger.log(result).await?;
    info!("session result appended to {}", path.display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    env_logger::init();
    let opts = args::Opts::parse();
    let config = AppConfig::load(opts.config.as_deref())?;

    let mut transport = RawTransport::new(opts.iface.clone());
    let outcome = run_session(
        &opts.destination,
        opts.family(),
        opts.probe_options(),
        &mut transport,
        shutdown_signal(),
    )
    .await;

    match outcome {
        Ok(SessionOutcome::Completed(report)) => {
            persist(&config, &report.result).await?;
            if report.received > 0 {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Ok(SessionOutcome::UnknownHost(_)) => Ok(ExitCode::FAILURE),
        Err(err @ ProbeError::SocketUnavailable(_)) => {
            error!("{}", err);
            eprintln!("{}", err);
            Ok(ExitCode::from(3))
        }
        Err(err) => Err(err.into()),
    }
}
