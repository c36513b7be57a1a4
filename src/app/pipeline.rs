//! Shared ingest -> aggregate -> price workflow.
//!
//! Every command runs against an explicit `PipelineContext` (store handle +
//! configuration), so the same code drives the SQLite-backed binary and the
//! in-memory end-to-end tests.

use std::collections::HashSet;
use std::path::Path;

use crate::aggregate::aggregate;
use crate::domain::{
    AggregatedRow, AggregationRequest, HydratedFact, Level, Period, PipelineConfig, PriceRow,
    SourceKind,
};
use crate::enrich::{enrich, hydrate};
use crate::error::AppError;
use crate::io::ingest::{IngestedFeed, load_agri_codes, load_feed};
use crate::price::price_trends;
use crate::reference::{DimensionIndex, build_dimensions};
use crate::store::{
    SqliteStore, TradeStore, append_rows, create_and_insert_if_absent, has_dimensions,
    load_dimensions, load_facts, write_dimensions,
};

/// What one ingestion run changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub source: SourceKind,
    pub records: usize,
    pub facts_written: usize,
    /// Fact table already existed and `update` was off.
    pub facts_skipped: bool,
}

pub struct PipelineContext {
    store: Box<dyn TradeStore>,
    config: PipelineConfig,
}

impl PipelineContext {
    pub fn new(store: Box<dyn TradeStore>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Open the SQLite store named by the configuration.
    pub fn open(config: PipelineConfig) -> Result<Self, AppError> {
        let store = SqliteStore::open(&config.db_path)?;
        Ok(Self::new(Box::new(store), config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn TradeStore {
        self.store.as_ref()
    }

    /// Load a feed file (and the configured agricultural codes) and ingest it.
    pub fn ingest_file(
        &mut self,
        path: &Path,
        source: SourceKind,
    ) -> Result<(IngestedFeed, IngestOutcome), AppError> {
        let feed = load_feed(path, source)?;
        let agri_codes = match &self.config.agr_file {
            Some(p) => load_agri_codes(p)?,
            None => HashSet::new(),
        };
        let outcome = self.ingest_feed(&feed, &agri_codes)?;
        Ok((feed, outcome))
    }

    /// Persist a parsed feed.
    ///
    /// The jp feed builds and persists the reference dimensions (first ingestion
    /// wins) before its facts. The org feed is enriched against whatever
    /// dimensions are already stored and fails if there are none.
    pub fn ingest_feed(
        &mut self,
        feed: &IngestedFeed,
        agri_codes: &HashSet<String>,
    ) -> Result<IngestOutcome, AppError> {
        let store = self.store.as_mut();
        match feed.source {
            SourceKind::Jp => {
                let dims = build_dimensions(&feed.records, agri_codes);
                write_dimensions(store, &dims)?;
            }
            SourceKind::Org => {
                if !has_dimensions(store)? {
                    return Err(AppError::config(
                        "Reference tables are missing; ingest the jp feed before the org feed.",
                    ));
                }
            }
        }

        // stored ids are authoritative when the tables predate this run
        let index = DimensionIndex::new(&load_dimensions(store)?);
        let facts = enrich(&feed.records, feed.source, &index);

        let table = feed.source.fact_table();
        let (facts_written, facts_skipped) = if self.config.update {
            (append_rows(store, table, &facts)?, false)
        } else if create_and_insert_if_absent(store, table, &facts)? {
            (facts.len(), false)
        } else {
            (0, true)
        };

        Ok(IngestOutcome {
            source: feed.source,
            records: feed.records.len(),
            facts_written,
            facts_skipped,
        })
    }

    /// Persisted facts of a source joined back to their natural codes.
    pub fn hydrated_facts(
        &self,
        source: SourceKind,
    ) -> Result<(DimensionIndex, Vec<HydratedFact>), AppError> {
        let store = self.store.as_ref();
        let index = DimensionIndex::new(&load_dimensions(store)?);
        let facts = load_facts(store, source)?;
        let hydrated = hydrate(&facts, &index);
        log::debug!("hydrated {} facts for {}", hydrated.len(), source.display_name());
        Ok((index, hydrated))
    }

    pub fn run_aggregate(
        &self,
        source: SourceKind,
        request: &AggregationRequest,
    ) -> Result<Vec<AggregatedRow>, AppError> {
        let (_, facts) = self.hydrated_facts(source)?;
        aggregate(source, request, &facts)
    }

    /// Monthly commodity view followed by the price pipeline.
    pub fn run_prices(
        &self,
        source: SourceKind,
        agriculture_only: bool,
    ) -> Result<Vec<PriceRow>, AppError> {
        let (index, facts) = self.hydrated_facts(source)?;
        let mut request = AggregationRequest::new(Period::Monthly, Level::Hts);
        request.agriculture_only = agriculture_only;
        let rows = aggregate(source, &request, &facts)?;
        price_trends(&rows, &index)
    }
}
