//! Namespacing merger: left-joins every stream's aggregate onto the grid.
//!
//! The grid is the unconditional left side, so the result always has exactly
//! `grid.len()` rows. Streams are joined in catalog order; a stream or
//! reducer that produced nothing still gets its column, filled with nulls,
//! so the output schema does not depend on which logs were present.

use std::collections::HashMap;

use crate::{
    aggregate::StreamAggregate, catalog::StreamCatalog, grid::TimeGrid, table::Column,
    table::UnifiedTable,
};

/// Join `aggregates` onto `grid` in the order the catalog declares streams.
pub fn merge_onto_grid(
    grid: &TimeGrid,
    catalog: &StreamCatalog,
    aggregates: &[StreamAggregate],
) -> UnifiedTable {
    let by_stream: HashMap<&str, &StreamAggregate> =
        aggregates.iter().map(|a| (a.stream.as_str(), a)).collect();

    let mut table = UnifiedTable::new(grid.times());

    for spec in catalog.streams() {
        let aggregate = by_stream.get(spec.name.as_str()).copied();

        // Row index of every occupied bucket, computed once per stream.
        let rows: Vec<Option<usize>> = aggregate
            .map(|a| a.ticks.iter().map(|&t| grid.index_of(t)).collect())
            .unwrap_or_default();

        for col in &spec.columns {
            let mut values = vec![None; grid.len()];
            if let Some(reduced) = aggregate.and_then(|a| a.column(&col.output)) {
                for (row, value) in rows.iter().zip(&reduced.values) {
                    debug_assert!(row.is_some(), "aggregate tick outside the grid");
                    if let Some(i) = *row {
                        values[i] = *value;
                    }
                }
            }
            table.push_column(Column::new(col.output.clone(), col.kind(), values));
        }
    }

    table
}
