//! Command-line parsing for the trade-flows pipeline.
//!
//! Argument parsing stays here; command dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{CensusFlow, CensusKind, DateRange, Level, Period, SourceKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tflow", version, about = "International trade ingestion and aggregation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a source feed into the store (dimensions first, then facts).
    Ingest(IngestArgs),
    /// Aggregate stored facts into a period x breakdown view.
    Aggregate(AggregateArgs),
    /// Monthly unit prices, rolling bands and year-over-year changes per HS4.
    Prices(PricesArgs),
    /// Pull state-level series from the Census international trade API.
    Census(CensusArgs),
}

/// Store location shared by the store-backed commands.
#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// SQLite database file (defaults to $TFLOW_DB, then data/data.sqlite).
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct IngestArgs {
    #[arg(long, value_enum)]
    pub source: SourceKind,

    /// Feed CSV file.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// JSON file keyed by 4-digit agricultural HTS codes.
    #[arg(long, value_name = "JSON")]
    pub agr: Option<PathBuf>,

    /// Append facts even when the fact table already exists.
    #[arg(long)]
    pub update: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct AggregateArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Jp)]
    pub source: SourceKind,

    #[arg(long, value_enum, default_value_t = Period::Yearly)]
    pub period: Period,

    #[arg(long, value_enum, default_value_t = Level::Total)]
    pub level: Level,

    /// A single date (YYYY-MM-DD) or an inclusive range `start+end`.
    #[arg(long)]
    pub date: Option<DateRange>,

    /// Keep only agricultural commodities.
    #[arg(long)]
    pub agr_only: bool,

    /// Prefix of the breakdown attribute (HTS code, NAICS code or country name).
    #[arg(long)]
    pub filter: Option<String>,

    /// Group by classification instead of raw codes.
    #[arg(long)]
    pub group: bool,

    /// Rows to print.
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Export rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export rows to JSON.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct PricesArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Org)]
    pub source: SourceKind,

    /// Keep only agricultural commodities.
    #[arg(long)]
    pub agr_only: bool,

    /// Movers to print on each side.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Export price rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct CensusArgs {
    #[arg(long, value_enum)]
    pub kind: CensusKind,

    #[arg(long, value_enum)]
    pub flow: CensusFlow,

    /// First year to pull.
    #[arg(long)]
    pub start: i32,

    /// Last year to pull (inclusive).
    #[arg(long)]
    pub end: i32,

    /// Two-letter state code.
    #[arg(long, default_value = "PR")]
    pub state: String,

    /// Output CSV file.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn aggregate_flags_parse() {
        let cli = Cli::parse_from([
            "tflow",
            "aggregate",
            "--source",
            "org",
            "--period",
            "qrt",
            "--level",
            "hts",
            "--date",
            "2020-01-01+2020-12-01",
            "--filter",
            "01",
        ]);
        let Command::Aggregate(args) = cli.command else {
            panic!("expected aggregate");
        };
        assert_eq!(args.source, SourceKind::Org);
        assert_eq!(args.period, Period::Quarterly);
        assert_eq!(args.level, Level::Hts);
        assert_eq!(
            args.date,
            Some(DateRange::Between(
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 12, 1).unwrap()
            ))
        );
        assert_eq!(args.filter.as_deref(), Some("01"));
        assert!(args.store.db.is_none());
    }

    #[test]
    fn ingest_requires_input() {
        assert!(Cli::try_parse_from(["tflow", "ingest", "--source", "jp"]).is_err());
        let argv = ["tflow", "ingest", "--source", "jp", "--input", "a.csv", "--update"];
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert!(args.update);
    }

    #[test]
    fn unknown_period_or_level_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["tflow", "aggregate", "--period", "weekly"]).is_err());
        assert!(Cli::try_parse_from(["tflow", "aggregate", "--level", "state"]).is_err());
    }
}
