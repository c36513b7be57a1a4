//! Pre-aggregation filters: date range, agricultural flag, level prefix.

use crate::domain::{AggregationRequest, HydratedFact, Level};
use crate::error::AppError;

/// Apply the request's filters in order: date range, agricultural-only, then
/// the level prefix.
///
/// An empty prefix matches every fact, including facts whose level attribute
/// is missing; those reach aggregation as a null-key group. A non-empty prefix
/// never matches a missing attribute. At a breakdown level, no surviving rows
/// is reported as a configuration error naming the prefix; at the total level
/// the result is simply empty.
pub fn apply_filters(
    facts: &[HydratedFact],
    request: &AggregationRequest,
) -> Result<Vec<HydratedFact>, AppError> {
    let prefix = request.level_filter.as_str();

    let filtered: Vec<HydratedFact> = facts
        .iter()
        .filter(|h| request.date_range.contains(h.fact.date))
        .filter(|h| !request.agriculture_only || h.agri_prod == Some(true))
        .filter(|h| match request.level {
            Level::Total => true,
            Level::Hts => matches_prefix(h.hts_code.as_deref(), prefix),
            Level::Naics => matches_prefix(h.naics_code.as_deref(), prefix),
            Level::Country => matches_prefix(h.country_name.as_deref(), prefix),
        })
        .cloned()
        .collect();

    if filtered.is_empty() {
        let msg = match request.level {
            Level::Total => None,
            Level::Hts => Some(format!("Invalid HTS code: {prefix}")),
            Level::Naics => Some(format!("Invalid NAICS code: {prefix}")),
            Level::Country => Some(format!("Invalid Country name: {prefix}")),
        };
        if let Some(msg) = msg {
            return Err(AppError::empty(msg));
        }
        log::warn!("no facts match the requested filters");
    }

    log::debug!("{} of {} facts pass the filters", filtered.len(), facts.len());
    Ok(filtered)
}

fn matches_prefix(value: Option<&str>, prefix: &str) -> bool {
    prefix.is_empty() || value.is_some_and(|v| v.starts_with(prefix))
}
