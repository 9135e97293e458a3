use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace};

use crate::domain::{ColumnId, GridConfig, GridError, HELP_TEXT, Message};
use crate::editor::{CellEditor, EditOutcome};
use crate::layout::{ColumnLayout, Drag};
use crate::sort::{SortDirection, SortState};
use crate::table::{Row, Table};
use crate::ui::{CMDLINE_HEIGH, TABLE_BORDER_HEIGHT, TABLE_HEADER_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    EDIT,
    RESIZE,
    MOVE,
    POPUP,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderView {
    pub name: String,
    pub width: u16,
    pub sort: Option<SortDirection>,
}

/// Pending edit as shown in the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct EditView {
    pub row: usize,    // Visible row
    pub column: usize, // Visual column position
    pub text: String,
    pub curser_pos: usize,
    pub error: Option<String>,
}

pub struct UIData {
    pub name: String,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<Vec<String>>, // Visible rows, cells in visual column order
    pub nrows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub modus: Modus,
    pub edit: Option<EditView>,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            modus: Modus::TABLE,
            edit: None,
            show_popup: false,
            popup_message: String::new(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub statusline_width: usize,
    pub statusline_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(CMDLINE_HEIGH + TABLE_HEADER_HEIGHT + TABLE_BORDER_HEIGHT)
            .max(1);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width,
            table_height,
            statusline_width: ui_width,
            statusline_height: CMDLINE_HEIGH,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: GridConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: Table,
    rows: Vec<usize>, // Mapping of view row index to table row index
    sort: SortState,
    layout: ColumnLayout,
    editor: CellEditor,
    curser_row: usize,
    curser_column: usize, // Visual column position
    offset_row: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &GridConfig,
        table: Table,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, GridError> {
        let clipboard = if config.clipboard {
            Clipboard::new()
                .map_err(|e| error!("Clipboard is not available: {:?}", e))
                .ok()
        } else {
            None
        };
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            rows: (0..table.len()).collect(),
            table,
            sort: SortState::default(),
            layout: ColumnLayout::with_defaults(config.min_column_width),
            editor: CellEditor::default(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        info!(
            "Model ready with {} rows from {}",
            model.table.len(),
            model.table.name()
        );
        if model.table.is_empty() {
            model.set_status_message("No rows to show");
        } else {
            model.set_status_message(format!("Loaded {} rows", model.table.len()));
        }
        model.update_uidata();
        Ok(model)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    /// Rows in the order they are shown.
    pub fn view_rows(&self) -> Vec<&Row> {
        self.rows.iter().map(|&idx| &self.table.rows()[idx]).collect()
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// While editing, every key goes to the cell editor unmapped.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::EDIT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        trace!("Status: {}", self.status_message);
    }

    fn selected_column(&self) -> Option<ColumnId> {
        self.layout.at(self.curser_column)
    }

    fn selected_record(&self) -> Option<usize> {
        self.rows.get(self.offset_row + self.curser_row).copied()
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), GridError> {
        let Some(msg) = message else {
            return Ok(());
        };
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MoveBeginning => self.move_selection_beginning(),
                Message::MoveEnd => self.move_selection_end(),
                Message::HeaderClick => self.header_click(),
                Message::SortAscending => self.sort_current_column(SortDirection::Ascending),
                Message::SortDescending => self.sort_current_column(SortDirection::Descending),
                Message::ClearSort => self.clear_sort(),
                Message::Widen => self.resize_current_column(self.config.resize_step as i32),
                Message::Narrow => self.resize_current_column(-(self.config.resize_step as i32)),
                Message::BeginResize => self.begin_drag(Modus::RESIZE),
                Message::BeginMove => self.begin_drag(Modus::MOVE),
                Message::Edit | Message::Enter => self.begin_edit(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::RESIZE => match msg {
                Message::Quit => self.quit(),
                Message::MoveLeft | Message::Narrow => {
                    self.drag_step(-(self.config.resize_step as i32))
                }
                Message::MoveRight | Message::Widen => {
                    self.drag_step(self.config.resize_step as i32)
                }
                Message::Enter => self.end_drag(),
                Message::Exit => self.cancel_drag(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            // A move drag steps one position at a time.
            Modus::MOVE => match msg {
                Message::Quit => self.quit(),
                Message::MoveLeft => self.drag_step(-1),
                Message::MoveRight => self.drag_step(1),
                Message::Enter => self.end_drag(),
                Message::Exit => self.cancel_drag(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::EDIT => match msg {
                Message::Quit => self.quit(),
                Message::RawKey(key) => self.edit_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => self.close_popup(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        self.update_uidata();
        Ok(())
    }

    // -------------------- Sorting ---------------------- //

    fn apply_sort(&mut self) {
        self.rows = self.sort.apply(&self.table);
        match self.sort.active() {
            Some((column, direction)) => {
                self.set_status_message(format!("Sorted by {} {:?}", column, direction))
            }
            None => self.set_status_message("Sort cleared"),
        }
    }

    fn header_click(&mut self) {
        if let Some(column) = self.selected_column() {
            self.sort.click(column);
            self.apply_sort();
        }
    }

    fn sort_current_column(&mut self, direction: SortDirection) {
        if let Some(column) = self.selected_column() {
            self.sort.set(column, direction);
            self.apply_sort();
        }
    }

    fn clear_sort(&mut self) {
        self.sort.clear();
        self.apply_sort();
    }

    // -------------------- Column layout ---------------------- //

    fn resize_current_column(&mut self, delta: i32) {
        let Some(column) = self.selected_column() else {
            return;
        };
        match self.layout.resize(column, delta) {
            Ok(width) => self.set_status_message(format!("Width of {} is {}", column, width)),
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn begin_drag(&mut self, modus: Modus) {
        let Some(column) = self.selected_column() else {
            return;
        };
        let started = match modus {
            Modus::RESIZE => self.layout.begin_resize(column),
            _ => self.layout.begin_move(column),
        };
        match started {
            Ok(()) => {
                self.previous_modus = self.modus;
                self.modus = modus;
                self.set_status_message(format!(
                    "{} {}: ←→ to drag, Enter to commit, Esc to cancel",
                    if modus == Modus::RESIZE { "Resize" } else { "Move" },
                    column
                ));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn drag_step(&mut self, delta: i32) {
        if let Err(e) = self.layout.drag_step(delta) {
            error!("Drag step failed: {}", e);
        }
        // The selection follows a moved column.
        if let Some(Drag::Move { column, .. }) = self.layout.drag()
            && let Ok(c) = self.layout.column(*column)
        {
            self.curser_column = c.order;
        }
    }

    fn end_drag(&mut self) {
        if let Some(drag) = self.layout.end_drag() {
            let column = drag.column();
            if let Ok(c) = self.layout.column(column) {
                let message = match drag {
                    Drag::Resize { .. } => format!("Width of {} is {}", column, c.width),
                    Drag::Move { .. } => format!("Moved {} to position {}", column, c.order + 1),
                };
                self.set_status_message(message);
            }
        }
        self.previous_modus = self.modus;
        self.modus = Modus::TABLE;
    }

    fn cancel_drag(&mut self) {
        if let Some(drag) = self.layout.cancel_drag()
            && let Ok(c) = self.layout.column(drag.column())
        {
            if matches!(drag, Drag::Move { .. }) {
                self.curser_column = c.order;
            }
            self.set_status_message(format!("Canceled change of {}", drag.column()));
        }
        self.previous_modus = self.modus;
        self.modus = Modus::TABLE;
    }

    // -------------------- Editing ---------------------- //

    fn begin_edit(&mut self) {
        let (Some(row), Some(column)) = (self.selected_record(), self.selected_column()) else {
            return;
        };
        match self.editor.begin(&self.table, &self.layout, row, column) {
            Ok(()) => {
                self.previous_modus = self.modus;
                self.modus = Modus::EDIT;
                self.set_status_message(format!("Editing {}: Enter to confirm, Esc to cancel", column));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn edit_input(&mut self, key: KeyEvent) {
        match self.editor.handle_key(key, &mut self.table) {
            EditOutcome::Committed { row, column } => {
                // The new value may move the record under the active sort.
                self.rows = self.sort.apply(&self.table);
                self.select_record(row);
                let value = self.table.cell(row, column).unwrap_or_default();
                self.set_status_message(format!("Set {} to \"{}\"", column, value));
                self.previous_modus = Modus::EDIT;
                self.modus = Modus::TABLE;
            }
            EditOutcome::Canceled => {
                self.set_status_message("Edit canceled");
                self.previous_modus = Modus::EDIT;
                self.modus = Modus::TABLE;
            }
            EditOutcome::Rejected(e) => {
                self.set_status_message(GridError::Validation(e).to_string());
            }
            EditOutcome::Editing | EditOutcome::Ignored => {}
        }
    }

    // -------------------- Misc ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        // Keep the selected row visible.
        if self.curser_row >= self.uilayout.table_height {
            let abs = self.offset_row + self.curser_row;
            self.curser_row = self.uilayout.table_height - 1;
            self.offset_row = abs - self.curser_row;
        }
    }

    fn copy_to_clipboard(&mut self, content: String) {
        trace!("Clipboard content: {}", content);
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => self.set_status_message("Copied to clipboard"),
                Err(e) => {
                    debug!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copy to clipboard failed");
                }
            },
            None => self.set_status_message("Clipboard is not available"),
        }
    }

    fn copy_cell(&mut self) {
        if let (Some(row), Some(column)) = (self.selected_record(), self.selected_column())
            && let Ok(cell) = self.table.cell(row, column)
        {
            self.copy_to_clipboard(cell);
        }
    }

    fn copy_row(&mut self) {
        if let Some(row) = self.selected_record() {
            let content = self.row_as_csv(row);
            self.copy_to_clipboard(content);
        }
    }

    /// Row in visual column order as a csv line.
    fn row_as_csv(&self, row: usize) -> String {
        self.layout
            .order()
            .into_iter()
            .filter_map(|column| self.table.cell(row, column).ok())
            .map(|c| Model::wrap_cell_content(&c))
            .collect::<Vec<String>>()
            .join(",")
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',' || c == '"');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    // -------------------- Navigation ---------------------- //

    /// Scroll so the given table row is visible and selected.
    fn select_record(&mut self, record: usize) {
        let Some(position) = self.rows.iter().position(|&r| r == record) else {
            return;
        };
        let height = self.uilayout.table_height;
        if position < self.offset_row {
            self.offset_row = position;
        } else if position >= self.offset_row + height {
            self.offset_row = position + 1 - height;
        }
        self.curser_row = position - self.offset_row;
    }

    fn move_selection_beginning(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
    }

    fn move_selection_end(&mut self) {
        let height = self.uilayout.table_height;
        if self.rows.len() <= height {
            self.offset_row = 0;
            self.curser_row = self.rows.len().saturating_sub(1);
        } else {
            self.offset_row = self.rows.len() - height;
            self.curser_row = height - 1;
        }
    }

    fn move_selection_up(&mut self, size: usize) {
        if self.curser_row > 0 {
            self.curser_row = self.curser_row.saturating_sub(size);
        } else {
            self.offset_row = self.offset_row.saturating_sub(size);
        }
    }

    fn move_selection_down(&mut self, size: usize) {
        let abs = self.offset_row + self.curser_row;
        if abs + size >= self.rows.len() {
            return;
        }
        if self.curser_row + size < self.uilayout.table_height {
            self.curser_row += size;
        } else {
            // At the bottom of the table, need to shift table down
            self.offset_row += size;
        }
    }

    fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
    }

    fn move_selection_right(&mut self) {
        if self.curser_column + 1 < self.layout.len() {
            self.curser_column += 1;
        }
    }

    // -------------------- UI data ---------------------- //

    fn update_uidata(&mut self) {
        let order = self.layout.order();
        let headers = self
            .layout
            .ordered()
            .into_iter()
            .map(|c| HeaderView {
                name: c.display_name.clone(),
                width: c.width,
                sort: self.sort.direction_of(c.id),
            })
            .collect();

        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, self.rows.len());
        let rows = self.rows[rbegin.min(rend)..rend]
            .iter()
            .map(|&ridx| {
                order
                    .iter()
                    .map(|&column| self.table.rows()[ridx].text(column))
                    .collect()
            })
            .collect();

        let edit = self.editor.pending().and_then(|pending| {
            let view_row = self.rows.iter().position(|&r| r == pending.row)?;
            Some(EditView {
                row: view_row.checked_sub(self.offset_row)?,
                column: self.layout.column(pending.column).ok()?.order,
                text: pending.input.text().to_string(),
                curser_pos: pending.input.curser_pos(),
                error: pending.error.as_ref().map(|e| e.to_string()),
            })
        });

        let show_popup = self.modus == Modus::POPUP;
        self.uidata = UIData {
            name: self.table.name().to_string(),
            headers,
            rows,
            nrows: self.rows.len(),
            selected_row: self.curser_row,
            selected_column: self.curser_column,
            abs_selected_row: self.offset_row + self.curser_row,
            modus: self.modus,
            edit,
            show_popup,
            popup_message: if show_popup {
                HELP_TEXT.to_string()
            } else {
                String::new()
            },
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}
