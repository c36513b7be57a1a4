//! Lookups over a built (or reloaded) set of dimension tables.

use std::collections::HashMap;

use crate::domain::{CountryEntry, Dimensions, HtsEntry, NaicsEntry, UnitEntry};

/// Natural key → surrogate key, and surrogate key → entry, for every dimension.
#[derive(Debug, Clone, Default)]
pub struct DimensionIndex {
    country_by_code: HashMap<String, i64>,
    country_by_name: HashMap<String, i64>,
    hts_by_code: HashMap<String, i64>,
    sitc_by_code: HashMap<String, i64>,
    naics_by_code: HashMap<String, i64>,
    district_by_code: HashMap<String, i64>,
    unit_by_code: HashMap<String, i64>,

    country_by_id: HashMap<i64, CountryEntry>,
    hts_by_id: HashMap<i64, HtsEntry>,
    naics_by_id: HashMap<i64, NaicsEntry>,
    unit_by_id: HashMap<i64, UnitEntry>,
}

impl DimensionIndex {
    pub fn new(dims: &Dimensions) -> Self {
        let mut index = DimensionIndex::default();

        for c in &dims.country {
            index.country_by_code.insert(c.cty_code.clone(), c.id);
            if let Some(name) = &c.country_name {
                // several codes can share a display name; the lowest id wins
                index.country_by_name.entry(name.clone()).or_insert(c.id);
            }
            index.country_by_id.insert(c.id, c.clone());
        }
        for h in &dims.hts {
            index.hts_by_code.insert(h.hts_code.clone(), h.id);
            index.hts_by_id.insert(h.id, h.clone());
        }
        for s in &dims.sitc {
            index.sitc_by_code.insert(s.sitc_code.clone(), s.id);
        }
        for n in &dims.naics {
            index.naics_by_code.insert(n.naics_code.clone(), n.id);
            index.naics_by_id.insert(n.id, n.clone());
        }
        for d in &dims.district {
            index.district_by_code.insert(d.district_code.clone(), d.id);
        }
        for u in &dims.unit {
            index.unit_by_code.insert(u.unit_code.clone(), u.id);
            index.unit_by_id.insert(u.id, u.clone());
        }

        index
    }

    pub fn country_id(&self, code: Option<&str>) -> Option<i64> {
        code.and_then(|c| self.country_by_code.get(c).copied())
    }

    pub fn country_id_by_name(&self, name: Option<&str>) -> Option<i64> {
        name.and_then(|n| self.country_by_name.get(n).copied())
    }

    pub fn hts_id(&self, code: Option<&str>) -> Option<i64> {
        code.and_then(|c| self.hts_by_code.get(c).copied())
    }

    pub fn sitc_id(&self, code: Option<&str>) -> Option<i64> {
        code.and_then(|c| self.sitc_by_code.get(c).copied())
    }

    pub fn naics_id(&self, code: Option<&str>) -> Option<i64> {
        code.and_then(|c| self.naics_by_code.get(c).copied())
    }

    pub fn district_id(&self, code: Option<&str>) -> Option<i64> {
        code.and_then(|c| self.district_by_code.get(c).copied())
    }

    pub fn unit_id(&self, code: Option<&str>) -> Option<i64> {
        code.and_then(|c| self.unit_by_code.get(c).copied())
    }

    pub fn country(&self, id: Option<i64>) -> Option<&CountryEntry> {
        id.and_then(|id| self.country_by_id.get(&id))
    }

    pub fn hts(&self, id: Option<i64>) -> Option<&HtsEntry> {
        id.and_then(|id| self.hts_by_id.get(&id))
    }

    pub fn naics(&self, id: Option<i64>) -> Option<&NaicsEntry> {
        id.and_then(|id| self.naics_by_id.get(&id))
    }

    pub fn unit(&self, id: Option<i64>) -> Option<&UnitEntry> {
        id.and_then(|id| self.unit_by_id.get(&id))
    }
}
