//! SeasonRisk: keeps today's and tomorrow's seasonal risk current and
//! optionally loads a whole season on request.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use seasonrisk_core::{AppError, Config};
use seasonrisk_data::{LoadOutcome, SeasonDataService, SeasonRecord, SeasonState, StaticGate};

#[derive(Parser)]
#[command(name = "seasonrisk", about = "Seasonal risk data watcher")]
struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `data.base_url` from the config.
    #[arg(long)]
    base_url: Option<String>,

    /// Load the season containing this date (YYYY-MM-DD) after starting.
    #[arg(long)]
    date: Option<String>,
}

fn describe(record: Option<&SeasonRecord>) -> String {
    match record {
        Some(r) if r.is_pending() => format!("{} pending", r.date),
        Some(r) => match r.max_risk() {
            Some(risk) => format!("{} risk {}", r.date, risk),
            None => format!("{} no risk value", r.date),
        },
        None => "unavailable".to_string(),
    }
}

fn log_state(state: &SeasonState) {
    tracing::info!(
        today = %describe(state.today_data.as_ref()),
        tomorrow = %describe(state.tomorrow_data.as_ref()),
        season_days = state.season_data_map.as_ref().map_or(0, |m| m.len()),
        season_exists = state.season_exists,
        "Season state updated"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    seasonrisk_core::init()?;

    let (mut config, _) = Config::load_validated(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.data.base_url = base_url;
        if let Err(e) = config.validate().check() {
            let err = AppError::from(e);
            tracing::error!("{} ({})", err.user_message(), err);
            return Err(err.into());
        }
    }

    // The static files are served as-is, so they are always ready to query.
    let service = SeasonDataService::from_config(&config.data, Arc::new(StaticGate(true)))
        .map_err(AppError::from)?;
    let mut updates = service.subscribe();
    service.start();

    tracing::info!("SeasonRisk started against {}", config.data.base_url);

    if let Some(date) = cli.date.as_deref() {
        match service.load_data(date).await {
            LoadOutcome::Loaded => tracing::info!("Season for {} loaded", date),
            LoadOutcome::Skipped => tracing::info!("Data source not ready, season not loaded"),
            LoadOutcome::Failed => tracing::warn!("No season data for {}", date),
        }
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                log_state(&updates.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    service.stop();
    Ok(())
}
