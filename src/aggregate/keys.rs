//! (period, level) → group-by columns.

use crate::domain::{KeyColumn, Level, Period};
use crate::normalize::ConvertedFact;

use KeyColumn::{CountryId, FiscalYear, HtsId, Month, NaicsId, Quarter, Year};

/// Group-by columns of a view: period columns first, then the breakdown column.
pub fn key_columns(period: Period, level: Level) -> &'static [KeyColumn] {
    match (period, level) {
        (Period::Yearly, Level::Total) => &[Year],
        (Period::Yearly, Level::Hts) => &[Year, HtsId],
        (Period::Yearly, Level::Naics) => &[Year, NaicsId],
        (Period::Yearly, Level::Country) => &[Year, CountryId],
        (Period::Fiscal, Level::Total) => &[FiscalYear],
        (Period::Fiscal, Level::Hts) => &[FiscalYear, HtsId],
        (Period::Fiscal, Level::Naics) => &[FiscalYear, NaicsId],
        (Period::Fiscal, Level::Country) => &[FiscalYear, CountryId],
        (Period::Quarterly, Level::Total) => &[Year, Quarter],
        (Period::Quarterly, Level::Hts) => &[Year, Quarter, HtsId],
        (Period::Quarterly, Level::Naics) => &[Year, Quarter, NaicsId],
        (Period::Quarterly, Level::Country) => &[Year, Quarter, CountryId],
        (Period::Monthly, Level::Total) => &[Year, Month],
        (Period::Monthly, Level::Hts) => &[Year, Month, HtsId],
        (Period::Monthly, Level::Naics) => &[Year, Month, NaicsId],
        (Period::Monthly, Level::Country) => &[Year, Month, CountryId],
    }
}

/// Value of one key column for a fact.
pub fn key_value(fact: &ConvertedFact, column: KeyColumn) -> Option<i64> {
    match column {
        Year => Some(i64::from(fact.year)),
        FiscalYear => Some(i64::from(fact.fiscal_year)),
        Quarter => fact.quarter.map(i64::from),
        Month => Some(i64::from(fact.month)),
        HtsId => fact.hts_id,
        NaicsId => fact.naics_id,
        CountryId => fact.country_id,
    }
}

pub fn key_of(fact: &ConvertedFact, columns: &[KeyColumn]) -> Vec<Option<i64>> {
    columns.iter().map(|c| key_value(fact, *c)).collect()
}
