use std::cmp::Ordering;
use tracing::trace;

use crate::domain::ColumnId;
use crate::table::{Row, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// Numeric for price, case sensitive lexicographic for text columns.
pub fn compare(a: &Row, b: &Row, column: ColumnId) -> Ordering {
    match column {
        ColumnId::Make => a.make.cmp(&b.make),
        ColumnId::Model => a.model.cmp(&b.model),
        ColumnId::Price => a.price.cmp(&b.price),
    }
}

/// Returns the view order of the table (indices into the backing rows).
/// The sort is stable and always starts from the backing order, so ties
/// keep their original relative order in both directions.
pub fn sort_by(table: &Table, column: ColumnId, direction: SortDirection) -> Vec<usize> {
    let rows = table.rows();
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    match direction {
        SortDirection::Ascending => {
            indices.sort_by(|&a, &b| compare(&rows[a], &rows[b], column));
        }
        SortDirection::Descending => {
            indices.sort_by(|&a, &b| compare(&rows[b], &rows[a], column));
        }
    }
    trace!("Sorted by {} {:?}: {:?}", column, direction, indices);
    indices
}

/// Rows of the table in sorted order.
pub fn sorted_rows(table: &Table, column: ColumnId, direction: SortDirection) -> Vec<Row> {
    sort_by(table, column, direction)
        .into_iter()
        .map(|idx| table.rows()[idx].clone())
        .collect()
}

/// The active sort key. At most one column is sorted at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    active: Option<(ColumnId, SortDirection)>,
}

impl SortState {
    pub fn active(&self) -> Option<(ColumnId, SortDirection)> {
        self.active
    }

    pub fn direction_of(&self, column: ColumnId) -> Option<SortDirection> {
        match self.active {
            Some((c, direction)) if c == column => Some(direction),
            _ => None,
        }
    }

    /// Header click: the same column toggles the direction, any other
    /// column replaces the sort key and starts ascending.
    pub fn click(&mut self, column: ColumnId) -> SortDirection {
        let direction = match self.active {
            Some((c, direction)) if c == column => direction.toggle(),
            _ => SortDirection::Ascending,
        };
        self.active = Some((column, direction));
        direction
    }

    pub fn set(&mut self, column: ColumnId, direction: SortDirection) {
        self.active = Some((column, direction));
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    /// View order for the current sort key, backing order if none is set.
    pub fn apply(&self, table: &Table) -> Vec<usize> {
        match self.active {
            Some((column, direction)) => sort_by(table, column, direction),
            None => (0..table.len()).collect(),
        }
    }
}
