use std::collections::HashMap;
use tracing::{debug, trace};

use crate::domain::{ColumnId, GridError};

/// Definition of a grid column. Widths are in terminal cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: ColumnId,
    pub display_name: String,
    pub width: u16,
    pub editable: bool,
    pub order: usize,
}

impl Column {
    pub fn new(id: ColumnId, display_name: impl Into<String>, width: u16, editable: bool) -> Self {
        Column {
            id,
            display_name: display_name.into(),
            width,
            editable,
            order: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drag {
    Resize { column: ColumnId, start_width: u16 },
    Move { column: ColumnId, start_order: Vec<ColumnId> },
}

impl Drag {
    pub fn column(&self) -> ColumnId {
        match self {
            Drag::Resize { column, .. } | Drag::Move { column, .. } => *column,
        }
    }
}

/// Width and left to right order of the grid columns.
///
/// Order ranks always form the permutation `0..N-1`. Every mutation goes
/// through `apply_order` to keep that true.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    columns: HashMap<ColumnId, Column>,
    min_width: u16,
    drag: Option<Drag>,
}

impl ColumnLayout {
    /// Columns are ranked in the order they are given. Widths below the
    /// floor are raised to it. A repeated id keeps its first definition.
    pub fn new(columns: Vec<Column>, min_width: u16) -> Self {
        let min_width = min_width.max(1);
        let mut order: Vec<ColumnId> = Vec::with_capacity(columns.len());
        let mut by_id: HashMap<ColumnId, Column> = HashMap::with_capacity(columns.len());
        for mut c in columns {
            if by_id.contains_key(&c.id) {
                debug!("Ignoring duplicate definition of column {}", c.id);
                continue;
            }
            c.width = c.width.max(min_width);
            order.push(c.id);
            by_id.insert(c.id, c);
        }
        let mut layout = ColumnLayout {
            columns: by_id,
            min_width,
            drag: None,
        };
        layout.apply_order(&order);
        layout
    }

    pub fn with_defaults(min_width: u16) -> Self {
        ColumnLayout::new(
            vec![
                Column::new(ColumnId::Make, "Make", 14, true),
                Column::new(ColumnId::Model, "Model", 14, true),
                Column::new(ColumnId::Price, "Price", 10, true),
            ],
            min_width,
        )
    }

    pub fn min_width(&self) -> u16 {
        self.min_width
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, id: ColumnId) -> Result<&Column, GridError> {
        self.columns
            .get(&id)
            .ok_or_else(|| GridError::UnknownColumn(id.to_string()))
    }

    fn column_mut(&mut self, id: ColumnId) -> Result<&mut Column, GridError> {
        self.columns
            .get_mut(&id)
            .ok_or_else(|| GridError::UnknownColumn(id.to_string()))
    }

    /// Columns from left to right.
    pub fn ordered(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.values().collect();
        columns.sort_by_key(|c| c.order);
        columns
    }

    pub fn order(&self) -> Vec<ColumnId> {
        self.ordered().iter().map(|c| c.id).collect()
    }

    /// Column at a visual position.
    pub fn at(&self, position: usize) -> Option<ColumnId> {
        self.columns
            .values()
            .find(|c| c.order == position)
            .map(|c| c.id)
    }

    fn apply_order(&mut self, order: &[ColumnId]) {
        for (rank, id) in order.iter().enumerate() {
            if let Some(column) = self.columns.get_mut(id) {
                column.order = rank;
            }
        }
    }

    /// Change the width of a column by `delta` cells. The width stays within
    /// `min_width..=u16::MAX`; a clamp is not an error.
    pub fn resize(&mut self, id: ColumnId, delta: i32) -> Result<u16, GridError> {
        let min_width = self.min_width;
        let column = self.column_mut(id)?;
        let wanted = i64::from(column.width) + i64::from(delta);
        if wanted < i64::from(min_width) || wanted > i64::from(u16::MAX) {
            debug!(
                "Resize of {} to {} clamped to {}..={}",
                id,
                wanted,
                min_width,
                u16::MAX
            );
        }
        column.width = wanted.clamp(i64::from(min_width), i64::from(u16::MAX)) as u16;
        trace!("Resized {} by {} to {}", id, delta, column.width);
        Ok(column.width)
    }

    /// Move a column to `new_index`, shifting the columns in between by one.
    /// An index past the end moves the column to the last position.
    pub fn reorder(&mut self, id: ColumnId, new_index: usize) -> Result<Vec<ColumnId>, GridError> {
        let mut order = self.order();
        let old_index = order
            .iter()
            .position(|&c| c == id)
            .ok_or_else(|| GridError::UnknownColumn(id.to_string()))?;
        let new_index = new_index.min(order.len() - 1);
        let moved = order.remove(old_index);
        order.insert(new_index, moved);
        self.apply_order(&order);
        trace!("Moved {} from {} to {}: {:?}", id, old_index, new_index, order);
        Ok(order)
    }

    /// Drop `id` directly left of `anchor`.
    pub fn move_before(&mut self, id: ColumnId, anchor: ColumnId) -> Result<Vec<ColumnId>, GridError> {
        let from = self.column(id)?.order;
        let to = self.column(anchor)?.order;
        if id == anchor {
            return Ok(self.order());
        }
        let target = if from < to { to - 1 } else { to };
        self.reorder(id, target)
    }

    pub fn drag(&self) -> Option<&Drag> {
        self.drag.as_ref()
    }

    pub fn begin_resize(&mut self, id: ColumnId) -> Result<(), GridError> {
        let start_width = self.column(id)?.width;
        self.drag = Some(Drag::Resize {
            column: id,
            start_width,
        });
        Ok(())
    }

    pub fn begin_move(&mut self, id: ColumnId) -> Result<(), GridError> {
        self.column(id)?;
        self.drag = Some(Drag::Move {
            column: id,
            start_order: self.order(),
        });
        Ok(())
    }

    /// One increment of the active drag: cells for a resize, positions for
    /// a move. Without an active drag this does nothing.
    pub fn drag_step(&mut self, delta: i32) -> Result<(), GridError> {
        match self.drag.as_ref().map(|d| (d.column(), matches!(d, Drag::Move { .. }))) {
            Some((column, false)) => {
                self.resize(column, delta)?;
            }
            Some((column, true)) => {
                let current = self.column(column)?.order as i64;
                let target = (current + delta as i64).max(0) as usize;
                self.reorder(column, target)?;
            }
            None => {}
        }
        Ok(())
    }

    /// Keep the live state of the drag.
    pub fn end_drag(&mut self) -> Option<Drag> {
        self.drag.take()
    }

    /// Restore the state from before the drag started.
    pub fn cancel_drag(&mut self) -> Option<Drag> {
        let drag = self.drag.take();
        match &drag {
            Some(Drag::Resize {
                column,
                start_width,
            }) => {
                if let Some(c) = self.columns.get_mut(column) {
                    c.width = *start_width;
                }
            }
            Some(Drag::Move { start_order, .. }) => {
                let order = start_order.clone();
                self.apply_order(&order);
            }
            None => {}
        }
        drag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(layout: &ColumnLayout) -> Vec<usize> {
        let mut ranks: Vec<usize> = layout.ordered().iter().map(|c| c.order).collect();
        ranks.sort_unstable();
        ranks
    }

    #[test]
    fn defaults_are_ranked_in_order() {
        let layout = ColumnLayout::with_defaults(4);
        assert_eq!(
            layout.order(),
            vec![ColumnId::Make, ColumnId::Model, ColumnId::Price]
        );
        assert_eq!(layout.at(2), Some(ColumnId::Price));
        assert_eq!(layout.column(ColumnId::Model).unwrap().display_name, "Model");
    }

    #[test]
    fn positive_resize_grows_every_column() {
        let mut layout = ColumnLayout::with_defaults(4);
        for id in ColumnId::ALL {
            let before = layout.column(id).unwrap().width;
            let after = layout.resize(id, 3).unwrap();
            assert!(after > before);
            assert_eq!(after, before + 3);
        }
    }

    #[test]
    fn resize_clamps_at_floor() {
        let mut layout = ColumnLayout::with_defaults(4);
        assert_eq!(layout.resize(ColumnId::Price, -100).unwrap(), 4);
        assert_eq!(layout.resize(ColumnId::Price, -1).unwrap(), 4);
        assert_eq!(layout.resize(ColumnId::Price, 1).unwrap(), 5);
    }

    #[test]
    fn extreme_deltas_saturate() {
        let mut layout = ColumnLayout::with_defaults(4);
        assert_eq!(layout.resize(ColumnId::Make, i32::MAX).unwrap(), u16::MAX);
        // Already at the widest width, growing is a no-op.
        assert_eq!(layout.resize(ColumnId::Make, 1).unwrap(), u16::MAX);
        assert_eq!(layout.resize(ColumnId::Make, i32::MIN).unwrap(), 4);
        assert_eq!(layout.resize(ColumnId::Make, 1).unwrap(), 5);

        assert_eq!(layout.resize(ColumnId::Price, i32::MIN).unwrap(), 4);
        assert_eq!(layout.resize(ColumnId::Price, i32::MAX).unwrap(), u16::MAX);
    }

    #[test]
    fn duplicate_columns_keep_first_definition() {
        let layout = ColumnLayout::new(
            vec![
                Column::new(ColumnId::Make, "Make", 8, true),
                Column::new(ColumnId::Make, "Brand", 20, false),
                Column::new(ColumnId::Price, "Price", 10, true),
            ],
            4,
        );
        assert_eq!(layout.len(), 2);
        assert_eq!(ranks(&layout), vec![0, 1]);
        assert_eq!(layout.at(0), Some(ColumnId::Make));
        assert_eq!(layout.at(1), Some(ColumnId::Price));
        assert_eq!(layout.column(ColumnId::Make).unwrap().display_name, "Make");
    }

    #[test]
    fn zero_floor_is_raised_to_one() {
        let mut layout = ColumnLayout::with_defaults(0);
        assert_eq!(layout.min_width(), 1);
        assert_eq!(layout.resize(ColumnId::Make, -50).unwrap(), 1);
    }

    #[test]
    fn unknown_column_in_partial_layout() {
        let mut layout = ColumnLayout::new(vec![Column::new(ColumnId::Make, "Make", 8, true)], 4);
        assert!(matches!(
            layout.resize(ColumnId::Price, 1),
            Err(GridError::UnknownColumn(_))
        ));
        assert!(layout.reorder(ColumnId::Model, 0).is_err());
    }

    #[test]
    fn reorder_uses_move_semantics() {
        let mut layout = ColumnLayout::with_defaults(4);
        let order = layout.reorder(ColumnId::Make, 2).unwrap();
        assert_eq!(order, vec![ColumnId::Model, ColumnId::Price, ColumnId::Make]);
        assert_eq!(ranks(&layout), vec![0, 1, 2]);

        let order = layout.reorder(ColumnId::Make, 0).unwrap();
        assert_eq!(order, vec![ColumnId::Make, ColumnId::Model, ColumnId::Price]);
    }

    #[test]
    fn reorder_past_end_is_clamped() {
        let mut layout = ColumnLayout::with_defaults(4);
        let order = layout.reorder(ColumnId::Model, 17).unwrap();
        assert_eq!(order, vec![ColumnId::Make, ColumnId::Price, ColumnId::Model]);
        assert_eq!(ranks(&layout), vec![0, 1, 2]);
    }

    #[test]
    fn move_before_ranks_lower() {
        for (x, y) in [
            (ColumnId::Price, ColumnId::Make),
            (ColumnId::Make, ColumnId::Price),
            (ColumnId::Model, ColumnId::Make),
            (ColumnId::Make, ColumnId::Model),
        ] {
            let mut layout = ColumnLayout::with_defaults(4);
            layout.move_before(x, y).unwrap();
            let rx = layout.column(x).unwrap().order;
            let ry = layout.column(y).unwrap().order;
            assert_eq!(rx + 1, ry, "{x} before {y}");
            assert_eq!(ranks(&layout), vec![0, 1, 2]);
        }
    }

    #[test]
    fn resize_drag_commits_final_width() {
        let mut layout = ColumnLayout::with_defaults(4);
        layout.begin_resize(ColumnId::Model).unwrap();
        layout.drag_step(2).unwrap();
        layout.drag_step(3).unwrap();
        layout.drag_step(-1).unwrap();
        assert!(layout.end_drag().is_some());
        assert_eq!(layout.column(ColumnId::Model).unwrap().width, 18);
        assert!(layout.drag().is_none());
    }

    #[test]
    fn cancelled_drags_restore_state() {
        let mut layout = ColumnLayout::with_defaults(4);
        layout.begin_resize(ColumnId::Make).unwrap();
        layout.drag_step(-30).unwrap();
        layout.cancel_drag();
        assert_eq!(layout.column(ColumnId::Make).unwrap().width, 14);

        layout.begin_move(ColumnId::Make).unwrap();
        layout.drag_step(1).unwrap();
        layout.drag_step(1).unwrap();
        assert_eq!(layout.at(2), Some(ColumnId::Make));
        layout.cancel_drag();
        assert_eq!(
            layout.order(),
            vec![ColumnId::Make, ColumnId::Model, ColumnId::Price]
        );
    }

    #[test]
    fn move_drag_stays_in_bounds() {
        let mut layout = ColumnLayout::with_defaults(4);
        layout.begin_move(ColumnId::Model).unwrap();
        layout.drag_step(-5).unwrap();
        assert_eq!(layout.at(0), Some(ColumnId::Model));
        layout.drag_step(9).unwrap();
        assert_eq!(layout.at(2), Some(ColumnId::Model));
        layout.end_drag();
        assert_eq!(ranks(&layout), vec![0, 1, 2]);
    }
}
