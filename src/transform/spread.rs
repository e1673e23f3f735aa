//! Derived spread columns (`long - short`).

use tracing::info;

use crate::domain::{MergedTable, SpreadPair};

/// Add one `"{long}_{short}_spread"` column per pair.
///
/// Pairs naming a column the table does not have are skipped and returned so
/// callers can report them. Re-running with the same pairs overwrites the
/// derived columns with identical values.
pub fn add_spreads(mut table: MergedTable, pairs: &[SpreadPair]) -> (MergedTable, Vec<SpreadPair>) {
    let mut skipped = Vec::new();

    for pair in pairs {
        let (Some(long), Some(short)) = (table.column(&pair.long), table.column(&pair.short)) else {
            info!(
                long = %pair.long,
                short = %pair.short,
                "skipping spread, missing column(s) in table"
            );
            skipped.push(pair.clone());
            continue;
        };

        let values: Vec<Option<f64>> = long
            .values
            .iter()
            .zip(&short.values)
            .map(|(l, s)| match (l, s) {
                (Some(l), Some(s)) => Some(l - s),
                _ => None,
            })
            .collect();

        table.upsert_column(pair.column_name(), values);
    }

    (table, skipped)
}
