//! EcoPoint sync entry point.
//!
//! Loads the dashboard (or one leaderboard period) and prints it as JSON.
//! With `--watch` it keeps running and re-synchronizes on the season refresh
//! interval until interrupted.

use ecopoint_cache::TtlCache;
use ecopoint_core::{PeriodSelector, SystemClock, UserId};
use ecopoint_sync::telemetry::init_tracing;
use ecopoint_sync::{AppError, LoggingSessionObserver, RestTransport, SyncConfig, SyncService};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Args {
    user: Option<UserId>,
    period: Option<PeriodSelector>,
    force_refresh: bool,
    watch: bool,
}

fn parse_args() -> Result<Args, AppError> {
    let mut parsed = Args::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--user" => {
                let value = args
                    .next()
                    .ok_or_else(|| AppError::Args("--user needs a value".to_string()))?;
                parsed.user = Some(UserId::new(value));
            }
            "--period" => {
                let value = args
                    .next()
                    .ok_or_else(|| AppError::Args("--period needs a value".to_string()))?;
                parsed.period = Some(value.parse().map_err(AppError::Args)?);
            }
            "--force" => parsed.force_refresh = true,
            "--watch" => parsed.watch = true,
            // Read by SyncConfig::load.
            "--config" => {
                args.next();
            }
            other => return Err(AppError::Args(format!("unknown argument: {}", other))),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = parse_args()?;
    let config = SyncConfig::load()?;
    init_tracing(&config.log)?;

    let clock = Arc::new(SystemClock);
    let transport = Arc::new(RestTransport::new(&config)?);
    let cache = Arc::new(TtlCache::new(clock.clone()));
    let session = Arc::new(LoggingSessionObserver::new());
    let refresh_interval = config.season.refresh_interval();
    let service = SyncService::new(config, transport, cache, session.clone(), clock);

    sync_once(&service, &args, args.force_refresh).await?;
    if !args.watch {
        return Ok(());
    }

    let mut ticker = tokio::time::interval(refresh_interval);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                service.season().recompute();
                if let Err(err) = sync_once(&service, &args, false).await {
                    tracing::warn!(error = %err, "Periodic sync failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(
                    session_rejections = session.rejections(),
                    cache = ?service.cache().stats(),
                    "Shutting down"
                );
                return Ok(());
            }
        }
    }
}

async fn sync_once(service: &SyncService, args: &Args, force_refresh: bool) -> Result<(), AppError> {
    let json = match args.period {
        Some(period) => {
            let view = service
                .fetch_leaderboard(args.user.as_ref(), period, force_refresh)
                .await?;
            serde_json::to_string_pretty(&view)?
        }
        None => {
            let dashboard = service
                .fetch_dashboard(args.user.as_ref(), force_refresh)
                .await?;
            serde_json::to_string_pretty(&dashboard)?
        }
    };
    println!("{}", json);
    Ok(())
}
