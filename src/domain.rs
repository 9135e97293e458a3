use std::fmt;
use std::io::Error;
use std::path::PathBuf;
use std::str::FromStr;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

pub const HELP_TEXT: &str = "vgrid - a tui data grid

  Navigation
    ←↓↑→ / hjkl     Move the selection
    g / G           First / last row

  Sorting
    s               Sort by column (again to toggle direction)
    a / d           Sort ascending / descending
    c               Clear sort

  Editing
    e / Enter       Edit selected cell
    Enter           Confirm edit
    Esc             Cancel edit

  Columns
    + / - or > / <  Widen / narrow selected column
    r               Resize column (←→ to drag, Enter to commit, Esc to cancel)
    m               Move column (←→ to drag, Enter to commit, Esc to cancel)

  Misc
    y / Y           Copy cell / row to clipboard
    ?               Show this help
    q / Ctrl-C      Quit (Ctrl-C also while editing)
";

/// Fields of a vehicle record. The set of columns is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnId {
    Make,
    Model,
    Price,
}

impl ColumnId {
    pub const ALL: [ColumnId; 3] = [ColumnId::Make, ColumnId::Model, ColumnId::Price];

    pub fn name(&self) -> &'static str {
        match self {
            ColumnId::Make => "make",
            ColumnId::Model => "model",
            ColumnId::Price => "price",
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnId {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "make" => Ok(ColumnId::Make),
            "model" => Ok(ColumnId::Model),
            "price" => Ok(ColumnId::Price),
            _ => Err(GridError::UnknownColumn(s.to_string())),
        }
    }
}

/// Raw input that could not be coerced into the type of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub column: ColumnId,
    pub input: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(column: ColumnId, input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            column,
            input: input.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \"{}\" {}", self.column, self.input, self.reason)
    }
}

#[derive(Debug)]
pub enum GridError {
    IoError(Error),
    PolarsError(PolarsError),
    Validation(ValidationError),
    UnknownColumn(String),
    RowOutOfBounds { row: usize, total: usize },
    NotEditable(ColumnId),
    NoEditInProgress,
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::IoError(e) => write!(f, "IO error: {e}"),
            GridError::PolarsError(e) => write!(f, "Data error: {e}"),
            GridError::Validation(e) => write!(f, "Invalid value for {e}"),
            GridError::UnknownColumn(name) => write!(f, "Unknown column \"{name}\""),
            GridError::RowOutOfBounds { row, total } => {
                write!(f, "Row {row} out of bounds (total: {total})")
            }
            GridError::NotEditable(column) => write!(f, "Column {column} is not editable"),
            GridError::NoEditInProgress => write!(f, "No edit in progress"),
            GridError::LoadingFailed(reason) => write!(f, "Loading failed: {reason}"),
            GridError::FileNotFound => write!(f, "File not found"),
            GridError::PermissionDenied => write!(f, "Permission denied"),
            GridError::UnknownFileType => write!(f, "Unknown file type"),
        }
    }
}

impl std::error::Error for GridError {}

impl From<Error> for GridError {
    fn from(err: Error) -> Self {
        GridError::IoError(err)
    }
}

impl From<PolarsError> for GridError {
    fn from(err: PolarsError) -> Self {
        GridError::PolarsError(err)
    }
}

impl From<ValidationError> for GridError {
    fn from(err: ValidationError) -> Self {
        GridError::Validation(err)
    }
}

/// Gestures the controller maps key events to. How a message is applied
/// depends on the modus the model is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveBeginning,
    MoveEnd,
    HeaderClick,
    SortAscending,
    SortDescending,
    ClearSort,
    Widen,
    Narrow,
    BeginResize,
    BeginMove,
    Edit,
    Enter,
    Exit,
    CopyCell,
    CopyRow,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Setters)]
pub struct GridConfig {
    pub event_poll_time: u64,
    pub min_column_width: u16,
    pub resize_step: u16,
    pub clipboard: bool,
    pub data_path: Option<PathBuf>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            min_column_width: 4,
            resize_step: 1,
            clipboard: true,
            data_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_column_names() {
        assert_eq!("make".parse::<ColumnId>().unwrap(), ColumnId::Make);
        assert_eq!(" Price ".parse::<ColumnId>().unwrap(), ColumnId::Price);
        assert!(matches!(
            "color".parse::<ColumnId>(),
            Err(GridError::UnknownColumn(name)) if name == "color"
        ));
    }

    #[test]
    fn help_lists_every_binding() {
        for binding in ["Ctrl-C", "> / <", "+ / -", "r ", "m ", "y / Y", "a / d"] {
            assert!(HELP_TEXT.contains(binding), "missing {binding}");
        }
    }

    #[test]
    fn config_setters_chain() {
        let cfg = GridConfig::default().min_column_width(6).clipboard(false);
        assert_eq!(cfg.min_column_width, 6);
        assert!(!cfg.clipboard);
        assert_eq!(cfg.event_poll_time, 100);
    }

    #[test]
    fn validation_error_is_readable() {
        let err: GridError = ValidationError::new(ColumnId::Price, "abc", "is not a number").into();
        assert_eq!(err.to_string(), "Invalid value for price: \"abc\" is not a number");
    }
}
