//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - sets up logging and loads `.env`
//! - parses CLI arguments and resolves the store location
//! - dispatches to the shared pipeline
//! - prints reports and writes optional exports

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{AggregateArgs, CensusArgs, Command, IngestArgs, PricesArgs, StoreArgs};
use crate::domain::{AggregationRequest, PipelineConfig};
use crate::error::AppError;

pub mod pipeline;

use pipeline::PipelineContext;

/// Environment variable naming the default store file.
pub const DB_ENV: &str = "TFLOW_DB";

/// Entry point for the `tflow` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Ingest(args) => handle_ingest(args),
        Command::Aggregate(args) => handle_aggregate(args),
        Command::Prices(args) => handle_prices(args),
        Command::Census(args) => handle_census(args),
    }
}

fn handle_ingest(args: IngestArgs) -> Result<(), AppError> {
    let config = PipelineConfig {
        db_path: resolve_db_path(&args.store),
        agr_file: args.agr.clone(),
        update: args.update,
    };
    let mut ctx = PipelineContext::open(config)?;
    let (feed, outcome) = ctx.ingest_file(&args.input, args.source)?;
    println!("{}", crate::report::format_ingest_summary(&feed, &outcome));
    Ok(())
}

fn handle_aggregate(args: AggregateArgs) -> Result<(), AppError> {
    let ctx = PipelineContext::open(store_config(&args.store))?;
    let request = request_from_args(&args);
    let rows = ctx.run_aggregate(args.source, &request)?;

    println!("{}", crate::report::format_aggregated(&rows, &request, args.top));

    if let Some(path) = &args.export {
        crate::io::export::export_aggregated_csv(path, &rows)?;
    }
    if let Some(path) = &args.json {
        crate::io::export::export_aggregated_json(path, &rows)?;
    }
    Ok(())
}

fn handle_prices(args: PricesArgs) -> Result<(), AppError> {
    let ctx = PipelineContext::open(store_config(&args.store))?;
    let rows = ctx.run_prices(args.source, args.agr_only)?;
    let movers = crate::report::rank_movers(&rows, args.top);

    println!("{}", crate::report::format_prices(&rows, &movers));

    if let Some(path) = &args.export {
        crate::io::export::export_price_csv(path, &rows)?;
    }
    Ok(())
}

fn handle_census(args: CensusArgs) -> Result<(), AppError> {
    let client = crate::data::CensusClient::from_env()?;
    let records = client.fetch_range(args.kind, args.flow, &args.state, args.start, args.end)?;
    crate::io::export::export_census_csv(&args.out, &records)?;
    println!("Wrote {} census records to {}", records.len(), args.out.display());
    Ok(())
}

pub fn request_from_args(args: &AggregateArgs) -> AggregationRequest {
    let mut request = AggregationRequest::new(args.period, args.level);
    request.date_range = args.date.unwrap_or_default();
    request.agriculture_only = args.agr_only;
    request.level_filter = args.filter.clone().unwrap_or_default();
    request.group = args.group;
    request
}

fn store_config(store: &StoreArgs) -> PipelineConfig {
    PipelineConfig {
        db_path: resolve_db_path(store),
        ..PipelineConfig::default()
    }
}

/// `--db`, then `$TFLOW_DB`, then the built-in default.
fn resolve_db_path(store: &StoreArgs) -> PathBuf {
    store
        .db
        .clone()
        .or_else(|| std::env::var_os(DB_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PipelineConfig::default().db_path)
}
