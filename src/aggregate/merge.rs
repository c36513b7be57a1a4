//! Outer-merge-coalesce: a full outer join of two keyed tables on a shared
//! key-column list, with the duplicate key columns folded back into one.
//!
//! A full outer join yields a left and a right copy of every key; whichever
//! side had no matching group holds nulls there. Coalescing each pair (left
//! value, falling back to right) reconstructs one key tuple per row, including
//! rows present on the right only.

use std::collections::{HashMap, HashSet};

use crate::domain::KeyColumn;
use crate::error::AppError;

/// One grouped row: key values aligned with the join columns plus its measures.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRow<M> {
    pub key: Vec<Option<i64>>,
    pub measures: M,
}

/// One merged row. At least one of `left` / `right` is always `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow<L, R> {
    pub key: Vec<Option<i64>>,
    pub left: Option<L>,
    pub right: Option<R>,
}

/// Full outer join `left ⋈ right` on `on`, coalescing key columns left-first.
///
/// Each side must hold at most one row per key (the join is validated 1:1).
/// Null key values compare equal, so null groups merge like any other.
/// Output order: left rows in input order, then unmatched right rows in input order.
pub fn outer_merge_coalesce<L, R>(
    left: Vec<KeyedRow<L>>,
    right: Vec<KeyedRow<R>>,
    on: &[KeyColumn],
) -> Result<Vec<MergedRow<L, R>>, AppError> {
    validate_side(&left, on, "left")?;
    validate_side(&right, on, "right")?;

    let mut right_slots: Vec<Option<KeyedRow<R>>> = right.into_iter().map(Some).collect();
    let right_index: HashMap<Vec<Option<i64>>, usize> = right_slots
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| r.as_ref().map(|r| (r.key.clone(), idx)))
        .collect();

    let mut out = Vec::with_capacity(left.len() + right_slots.len());

    for l in left {
        let matched = right_index.get(&l.key).and_then(|idx| right_slots[*idx].take());
        let (right_key, right_measures) = match matched {
            Some(r) => (Some(r.key), Some(r.measures)),
            None => (None, None),
        };
        out.push(MergedRow {
            key: coalesce(Some(&l.key), right_key.as_deref(), on.len()),
            left: Some(l.measures),
            right: right_measures,
        });
    }

    for r in right_slots.into_iter().flatten() {
        out.push(MergedRow {
            key: coalesce(None, Some(&r.key), on.len()),
            left: None,
            right: Some(r.measures),
        });
    }

    Ok(out)
}

/// Column-wise `left.or(right)` over the two copies of a join key.
fn coalesce(
    left: Option<&[Option<i64>]>,
    right: Option<&[Option<i64>]>,
    width: usize,
) -> Vec<Option<i64>> {
    (0..width)
        .map(|i| {
            left.and_then(|k| k[i])
                .or_else(|| right.and_then(|k| k[i]))
        })
        .collect()
}

fn validate_side<M>(rows: &[KeyedRow<M>], on: &[KeyColumn], side: &str) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if row.key.len() != on.len() {
            return Err(AppError::integrity(format!(
                "{side} key has {} values but the join is on {} columns",
                row.key.len(),
                on.len()
            )));
        }
        if !seen.insert(&row.key) {
            let names: Vec<&str> = on.iter().map(|c| c.name()).collect();
            return Err(AppError::integrity(format!(
                "join on [{}] is not 1:1: duplicate {side} key {:?}",
                names.join(", "),
                row.key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const ON: &[KeyColumn] = &[KeyColumn::Year, KeyColumn::HtsId];

    fn row(year: i64, hts: Option<i64>, v: f64) -> KeyedRow<f64> {
        KeyedRow {
            key: vec![Some(year), hts],
            measures: v,
        }
    }

    #[test]
    fn keeps_rows_from_both_sides() {
        let left = vec![row(2020, Some(1), 10.0), row(2020, Some(2), 20.0)];
        let right = vec![row(2020, Some(2), 5.0), row(2021, Some(3), 7.0)];
        let merged = outer_merge_coalesce(left, right, ON).unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].key, vec![Some(2020), Some(1)]);
        assert_eq!((merged[0].left, merged[0].right), (Some(10.0), None));
        assert_eq!((merged[1].left, merged[1].right), (Some(20.0), Some(5.0)));
        // right-only row gets its key from the right side
        assert_eq!(merged[2].key, vec![Some(2021), Some(3)]);
        assert_eq!((merged[2].left, merged[2].right), (None, Some(7.0)));
    }

    #[test]
    fn null_keys_match_each_other() {
        let left = vec![row(2020, None, 1.0)];
        let right = vec![row(2020, None, 2.0)];
        let merged = outer_merge_coalesce(left, right, ON).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].key, vec![Some(2020), None]);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let left = vec![row(2020, Some(1), 1.0), row(2020, Some(1), 2.0)];
        let err = outer_merge_coalesce(left, Vec::<KeyedRow<f64>>::new(), ON).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn empty_sides_are_fine() {
        let merged =
            outer_merge_coalesce(Vec::<KeyedRow<f64>>::new(), vec![row(2020, Some(1), 1.0)], ON)
                .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].left, None);
    }
}
