//! Fact enrichment: natural keys → surrogate keys, and back.
//!
//! `enrich` is a left join of raw records against every dimension: a record is
//! never dropped for lack of a match, its surrogate key is simply `None`.
//! `hydrate` is the inverse lookup used when reading persisted facts for
//! aggregation.

use crate::domain::{EnrichedFact, HydratedFact, RawFactRecord, SourceKind, TradeDirection};
use crate::reference::DimensionIndex;

/// Replace natural keys with surrogate keys.
///
/// The jp feed resolves countries by code; the org feed only carries names.
/// The two unit lookups are independent so `unit1_id` and `unit2_id` never
/// shadow each other.
pub fn enrich(
    records: &[RawFactRecord],
    source: SourceKind,
    index: &DimensionIndex,
) -> Vec<EnrichedFact> {
    let mut out = Vec::with_capacity(records.len());
    let mut unmatched_hts = 0usize;

    for r in records {
        // ingest rejects rows without a valid month
        let Some(date) = r.date() else { continue };

        let country_id = match source {
            SourceKind::Jp => index.country_id(r.country_code.as_deref()),
            SourceKind::Org => index.country_id_by_name(r.country_name.as_deref()),
        };
        let hts_id = index.hts_id(r.commodity_code.as_deref());
        if hts_id.is_none() {
            unmatched_hts += 1;
        }

        out.push(EnrichedFact {
            date,
            direction: r.direction.unwrap_or(TradeDirection::Export),
            country_id,
            sitc_id: index.sitc_id(r.sitc_code.as_deref()),
            hts_id,
            naics_id: index.naics_id(r.naics_code.as_deref()),
            district_id: index.district_id(r.district_code.as_deref()),
            unit1_id: index.unit_id(r.unit_1.as_deref()),
            unit2_id: index.unit_id(r.unit_2.as_deref()),
            value: r.value,
            end_use_i: r.end_use_i,
            end_use_e: r.end_use_e,
            qty_1: r.qty_1,
            qty_2: r.qty_2,
        });
    }

    if unmatched_hts > 0 {
        log::warn!(
            "{unmatched_hts} facts have no commodity match and will be excluded from aggregation"
        );
    }
    log::info!("enriched {} facts", out.len());
    out
}

/// Re-attach the natural attributes needed for filtering and unit conversion.
pub fn hydrate(facts: &[EnrichedFact], index: &DimensionIndex) -> Vec<HydratedFact> {
    facts
        .iter()
        .map(|f| {
            let hts = index.hts(f.hts_id);
            HydratedFact {
                fact: f.clone(),
                hts_code: hts.map(|h| h.hts_code.clone()),
                agri_prod: hts.map(|h| h.agri_prod),
                naics_code: index.naics(f.naics_id).map(|n| n.naics_code.clone()),
                country_name: index.country(f.country_id).and_then(|c| c.country_name.clone()),
                unit_1: index.unit(f.unit1_id).map(|u| u.unit_code.clone()),
                unit_2: index.unit(f.unit2_id).map(|u| u.unit_code.clone()),
            }
        })
        .collect()
}
