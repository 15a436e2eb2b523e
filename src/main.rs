use chrono::{Utc, Weekday};
use clap::Parser;
use forge_processor::{
    args::Args,
    database::{db::DbClient, store::RatingStore},
    model::{
        ranking_service::{RankingService, WeeklyRefresh},
        structures::week_window::WeekWindow
    }
};
use serde::Serialize;
use std::{process::ExitCode, sync::Arc};
use tracing::{error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshReport {
    user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh: Option<WeeklyRefresh>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();

    let client = match DbClient::connect(&args.connection_string).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = client.ensure_schema().await {
        error!("Failed to verify schema: {}", e);
        return ExitCode::FAILURE;
    }

    let week_start = Weekday::from(args.week_start);
    let window = match args.week {
        Some(date) => WeekWindow::containing(date, week_start, args.utc_offset),
        None => WeekWindow::current(Utc::now(), week_start, args.utc_offset)
    };

    let user_ids = if args.users.is_empty() {
        match client.list_user_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to list users: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        args.users.clone()
    };

    info!(
        "Refreshing week of {} ({}) for {} users",
        window.start(),
        window.offset(),
        user_ids.len()
    );

    let client = Arc::new(client);
    let service = RankingService::new(Arc::clone(&client), client);
    let results = service.refresh_many(&user_ids, &window, args.concurrency).await;

    let skipped = results
        .iter()
        .filter(|(_, result)| matches!(result, Err(failure) if failure.is_skipped()))
        .count();
    let failed = results.iter().filter(|(_, result)| result.is_err()).count() - skipped;
    let reports = results
        .into_iter()
        .map(|(user_id, result)| match result {
            Ok(refresh) => RefreshReport {
                user_id,
                refresh: Some(refresh),
                error: None
            },
            Err(failure) => RefreshReport {
                user_id,
                refresh: None,
                error: Some(failure.to_string())
            }
        })
        .collect::<Vec<_>>();

    if args.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize results: {}", e)
        }
    }

    info!(
        "Refreshed {} users, {} without activity, {} failed",
        reports.len() - failed - skipped,
        skipped,
        failed
    );

    if failed > 0 {
        warn!("Some refreshes failed, rerun to retry them");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
