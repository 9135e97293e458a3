use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, trace};

use crate::domain::{ColumnId, GridError, ValidationError};
use crate::inputter::{InputResult, Inputter};
use crate::layout::ColumnLayout;
use crate::table::Table;

/// An edit in progress. The buffer is separate from the committed value in
/// the table until the edit is confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub row: usize,
    pub column: ColumnId,
    pub original: String,
    pub input: Inputter,
    pub error: Option<ValidationError>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditState {
    #[default]
    Viewing,
    Editing(PendingEdit),
}

/// Result of feeding a key into the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Ignored,
    Editing,
    Committed { row: usize, column: ColumnId },
    Canceled,
    Rejected(ValidationError),
}

#[derive(Debug, Default)]
pub struct CellEditor {
    state: EditState,
}

impl CellEditor {
    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing(_))
    }

    pub fn pending(&self) -> Option<&PendingEdit> {
        match &self.state {
            EditState::Editing(pending) => Some(pending),
            EditState::Viewing => None,
        }
    }

    /// Start editing a cell, seeding the buffer with the committed value.
    /// Starting a new edit drops any edit in progress.
    pub fn begin(
        &mut self,
        table: &Table,
        layout: &ColumnLayout,
        row: usize,
        column: ColumnId,
    ) -> Result<(), GridError> {
        if !layout.column(column)?.editable {
            return Err(GridError::NotEditable(column));
        }
        let original = table.cell(row, column)?;
        trace!("Start editing {}:{} \"{}\"", row, column, original);
        self.state = EditState::Editing(PendingEdit {
            row,
            column,
            input: Inputter::new(&original),
            original,
            error: None,
        });
        Ok(())
    }

    /// Replace the pending buffer.
    pub fn set_text(&mut self, raw: &str) {
        if let EditState::Editing(pending) = &mut self.state {
            pending.input.set(raw);
        }
    }

    /// Write the buffer into the table. On failure the editor stays in
    /// editing mode with the error attached and the table is unchanged.
    pub fn commit(&mut self, table: &mut Table) -> Result<(usize, ColumnId), GridError> {
        let EditState::Editing(pending) = &mut self.state else {
            return Err(GridError::NoEditInProgress);
        };
        match table.set_cell(pending.row, pending.column, pending.input.text()) {
            Ok(()) => {
                let target = (pending.row, pending.column);
                debug!(
                    "Committed {}:{} \"{}\" -> \"{}\"",
                    pending.row,
                    pending.column,
                    pending.original,
                    pending.input.text()
                );
                self.state = EditState::Viewing;
                Ok(target)
            }
            Err(GridError::Validation(e)) => {
                debug!("Rejected edit: {}", e);
                pending.error = Some(e.clone());
                Err(GridError::Validation(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the buffer. The table was never touched, so the committed
    /// value is the original one.
    pub fn cancel(&mut self) -> Option<PendingEdit> {
        match std::mem::take(&mut self.state) {
            EditState::Editing(pending) => {
                trace!("Canceled edit of {}:{}", pending.row, pending.column);
                Some(pending)
            }
            EditState::Viewing => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, table: &mut Table) -> EditOutcome {
        let EditState::Editing(pending) = &mut self.state else {
            return EditOutcome::Ignored;
        };
        match pending.input.read(key) {
            InputResult::Editing => {
                pending.error = None;
                EditOutcome::Editing
            }
            InputResult::Canceled => {
                self.cancel();
                EditOutcome::Canceled
            }
            InputResult::Confirmed => match self.commit(table) {
                Ok((row, column)) => EditOutcome::Committed { row, column },
                Err(GridError::Validation(e)) => EditOutcome::Rejected(e),
                Err(e) => {
                    debug!("Commit failed: {}", e);
                    EditOutcome::Editing
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Column;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(editor: &mut CellEditor, table: &mut Table, s: &str) {
        for c in s.chars() {
            editor.handle_key(key(KeyCode::Char(c)), table);
        }
    }

    fn setup() -> (Table, ColumnLayout, CellEditor) {
        (
            Table::seed(),
            ColumnLayout::with_defaults(4),
            CellEditor::default(),
        )
    }

    #[test]
    fn valid_price_edit_commits() {
        let (mut table, layout, mut editor) = setup();
        editor.begin(&table, &layout, 0, ColumnId::Price).unwrap();
        assert_eq!(editor.pending().unwrap().input.text(), "64950");
        editor.set_text("70000");
        assert_eq!(table.rows()[0].price, 64950);

        assert_eq!(editor.commit(&mut table).unwrap(), (0, ColumnId::Price));
        assert_eq!(editor.state(), &EditState::Viewing);

        let mut expected = Table::seed().rows().to_vec();
        expected[0].price = 70000;
        assert_eq!(table.rows(), expected.as_slice());
    }

    #[test]
    fn typed_make_edit_commits_with_enter() {
        let (mut table, layout, mut editor) = setup();
        editor.begin(&table, &layout, 1, ColumnId::Make).unwrap();
        editor.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL), &mut table);
        type_str(&mut editor, &mut table, "Chevrolet");
        assert_eq!(
            editor.handle_key(key(KeyCode::Enter), &mut table),
            EditOutcome::Committed {
                row: 1,
                column: ColumnId::Make
            }
        );
        assert_eq!(table.rows()[1].make, "Chevrolet");
        for idx in [0, 2, 3, 4, 5] {
            assert_eq!(table.rows()[idx], Table::seed().rows()[idx]);
        }
    }

    #[test]
    fn invalid_price_stays_in_editing() {
        let (mut table, layout, mut editor) = setup();
        editor.begin(&table, &layout, 3, ColumnId::Price).unwrap();
        editor.set_text("lots");
        let outcome = editor.handle_key(key(KeyCode::Enter), &mut table);
        assert!(matches!(outcome, EditOutcome::Rejected(ref e) if e.column == ColumnId::Price));

        assert!(editor.is_editing());
        let pending = editor.pending().unwrap();
        assert_eq!(pending.input.text(), "lots");
        assert!(pending.error.is_some());
        assert_eq!(table.rows()[3].price, 48890);

        // Typing again clears the error and a valid value then commits.
        editor.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL), &mut table);
        assert!(editor.pending().unwrap().error.is_none());
        type_str(&mut editor, &mut table, "49000");
        editor.handle_key(key(KeyCode::Enter), &mut table);
        assert!(!editor.is_editing());
        assert_eq!(table.rows()[3].price, 49000);
    }

    #[test]
    fn negative_price_is_rejected() {
        let (mut table, layout, mut editor) = setup();
        editor.begin(&table, &layout, 4, ColumnId::Price).unwrap();
        editor.set_text("-100");
        assert!(matches!(
            editor.commit(&mut table),
            Err(GridError::Validation(_))
        ));
        assert!(editor.is_editing());
        assert_eq!(table.rows()[4].price, 15774);
    }

    #[test]
    fn cancel_restores_original() {
        let (mut table, layout, mut editor) = setup();
        editor.begin(&table, &layout, 2, ColumnId::Model).unwrap();
        type_str(&mut editor, &mut table, " Hybrid");
        assert_eq!(editor.pending().unwrap().input.text(), "Corolla Hybrid");
        assert_eq!(
            editor.handle_key(key(KeyCode::Esc), &mut table),
            EditOutcome::Canceled
        );
        assert!(!editor.is_editing());
        assert_eq!(table.cell(2, ColumnId::Model).unwrap(), "Corolla");
        assert_eq!(table.rows(), Table::seed().rows());
    }

    #[test]
    fn read_only_column_cannot_be_edited() {
        let table = Table::seed();
        let layout = ColumnLayout::new(
            vec![
                Column::new(ColumnId::Make, "Make", 10, true),
                Column::new(ColumnId::Price, "Price", 10, false),
            ],
            4,
        );
        let mut editor = CellEditor::default();
        assert!(matches!(
            editor.begin(&table, &layout, 0, ColumnId::Price),
            Err(GridError::NotEditable(ColumnId::Price))
        ));
        assert!(matches!(
            editor.begin(&table, &layout, 0, ColumnId::Model),
            Err(GridError::UnknownColumn(_))
        ));
        assert!(!editor.is_editing());
    }

    #[test]
    fn keys_are_ignored_when_viewing() {
        let (mut table, _, mut editor) = setup();
        assert_eq!(
            editor.handle_key(key(KeyCode::Enter), &mut table),
            EditOutcome::Ignored
        );
        assert!(editor.cancel().is_none());
    }
}
