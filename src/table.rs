use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::num::IntErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::{ColumnId, GridError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// A single vehicle record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub make: String,
    pub model: String,
    pub price: u64,
}

impl Row {
    pub fn new(make: impl Into<String>, model: impl Into<String>, price: u64) -> Self {
        Row {
            make: make.into(),
            model: model.into(),
            price,
        }
    }

    /// Display text of a field.
    pub fn text(&self, column: ColumnId) -> String {
        match column {
            ColumnId::Make => self.make.clone(),
            ColumnId::Model => self.model.clone(),
            ColumnId::Price => self.price.to_string(),
        }
    }
}

/// Coerce raw text into a price. Prices are non-negative whole numbers.
pub fn parse_price(raw: &str) -> Result<u64, ValidationError> {
    let trimmed = raw.trim();
    let err = match trimmed.parse::<u64>() {
        Ok(price) => return Ok(price),
        Err(e) => e,
    };
    let reason = match err.kind() {
        IntErrorKind::Empty => "is empty",
        IntErrorKind::PosOverflow => "is too large",
        _ => match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f < 0.0 => "must not be negative",
            Ok(f) if f.is_finite() => "must be a whole number",
            _ => "is not a number",
        },
    };
    Err(ValidationError::new(ColumnId::Price, raw, reason))
}

/// Backing store of the grid. Row identity is the position in `rows`.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    rows: Vec<Row>,
}

impl Table {
    pub fn from_rows(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Table {
            name: name.into(),
            rows,
        }
    }

    /// The fixed dataset the grid starts with when no data file is given.
    pub fn seed() -> Self {
        Table::from_rows(
            "vehicles",
            vec![
                Row::new("Tesla", "Model Y", 64950),
                Row::new("Ford", "F-Series", 33850),
                Row::new("Toyota", "Corolla", 29600),
                Row::new("Mercedes", "EQA", 48890),
                Row::new("Fiat", "500", 15774),
                Row::new("Nissan", "Juke", 20675),
            ],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, row_index: usize) -> Result<&Row, GridError> {
        self.rows.get(row_index).ok_or(GridError::RowOutOfBounds {
            row: row_index,
            total: self.rows.len(),
        })
    }

    pub fn cell(&self, row_index: usize, column: ColumnId) -> Result<String, GridError> {
        Ok(self.row(row_index)?.text(column))
    }

    /// Replace one field of a row. The raw text is coerced to the column's
    /// type first; on failure the row is left untouched.
    pub fn set_cell(
        &mut self,
        row_index: usize,
        column: ColumnId,
        raw: &str,
    ) -> Result<(), GridError> {
        let total = self.rows.len();
        let row = self
            .rows
            .get_mut(row_index)
            .ok_or(GridError::RowOutOfBounds {
                row: row_index,
                total,
            })?;
        match column {
            ColumnId::Make => row.make = raw.to_string(),
            ColumnId::Model => row.model = raw.to_string(),
            ColumnId::Price => row.price = parse_price(raw)?,
        }
        trace!("Set cell {}:{} to \"{}\"", row_index, column, raw);
        Ok(())
    }

    /// Load rows from a csv, parquet or arrow file. The file needs a
    /// `make`, `model` and `price` column, other columns are ignored.
    pub fn load_data_file(path: PathBuf) -> Result<Self, GridError> {
        let file_info = Table::get_file_info(path)?;
        debug!("Loading {:?}", file_info);
        let frame = match file_info.file_type {
            FileType::CSV => Table::load_csv(&file_info.path)?,
            FileType::PARQUET => Table::load_parquet(&file_info.path)?,
            FileType::ARROW => Table::load_arrow(&file_info.path)?,
        };

        let start_time = Instant::now();
        let df = frame.collect()?;

        // Each column is decoded in its own thread.
        let columns: Result<Vec<Vec<Option<String>>>, GridError> = ColumnId::ALL[..]
            .par_iter()
            .map(|&column| Self::load_column(&df, column))
            .collect();
        let columns = columns?;
        let (makes, models, prices) = (&columns[0], &columns[1], &columns[2]);

        let mut rows = Vec::with_capacity(df.height());
        for (ridx, ((make, model), price)) in makes.iter().zip(models).zip(prices).enumerate() {
            let price = price
                .as_deref()
                .ok_or_else(|| GridError::LoadingFailed(format!("Row {} has no price", ridx + 1)))
                .and_then(|p| {
                    parse_price(p).map_err(|e| {
                        GridError::LoadingFailed(format!("Row {}: {} {}", ridx + 1, p, e.reason))
                    })
                })?;
            rows.push(Row {
                make: make.clone().unwrap_or_default(),
                model: model.clone().unwrap_or_default(),
                price,
            });
        }

        info!(
            "Loading {} rows ({} bytes) took {}ms ...",
            rows.len(),
            file_info.file_size,
            start_time.elapsed().as_millis()
        );

        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        Ok(Table::from_rows(name, rows))
    }

    fn load_column(df: &DataFrame, column: ColumnId) -> Result<Vec<Option<String>>, GridError> {
        let col = df
            .column(column.name())
            .map_err(|_| GridError::LoadingFailed(format!("Missing column \"{}\"", column)))?
            .cast(&DataType::String)?;
        let series = col.str()?;
        Ok(series
            .into_iter()
            .map(|value| value.map(|s| s.to_string()))
            .collect())
    }

    fn detect_file_type(path: &Path) -> Result<FileType, GridError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(GridError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, GridError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => GridError::FileNotFound,
            ErrorKind::PermissionDenied => GridError::PermissionDenied,
            _ => GridError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(GridError::LoadingFailed("Not a file!".into()));
        }

        let file_type = Table::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size: metadata.len(),
            file_type,
        })
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn seed_has_six_vehicles() {
        let table = Table::seed();
        assert_eq!(table.len(), 6);
        assert_eq!(table.rows()[0], Row::new("Tesla", "Model Y", 64950));
        assert_eq!(table.cell(4, ColumnId::Model).unwrap(), "500");
    }

    #[test]
    fn set_price_with_valid_number() {
        let mut table = Table::seed();
        table.set_cell(2, ColumnId::Price, "70000").unwrap();
        assert_eq!(table.rows()[2].price, 70000);

        let mut expected = Table::seed().rows().to_vec();
        expected[2].price = 70000;
        assert_eq!(table.rows(), expected.as_slice());
    }

    #[test]
    fn set_make_only_touches_one_row() {
        let mut table = Table::seed();
        table.set_cell(1, ColumnId::Make, "Chevrolet").unwrap();
        let seed = Table::seed();
        for (idx, row) in table.rows().iter().enumerate() {
            if idx == 1 {
                assert_eq!(row, &Row::new("Chevrolet", "F-Series", 33850));
            } else {
                assert_eq!(row, &seed.rows()[idx]);
            }
        }
    }

    #[test]
    fn set_price_rejects_bad_input() {
        let mut table = Table::seed();
        for raw in ["abc", "", "-5", "12.5", "99999999999999999999999", "inf"] {
            let err = table.set_cell(0, ColumnId::Price, raw).unwrap_err();
            assert!(matches!(err, GridError::Validation(_)), "{raw} was accepted");
        }
        assert_eq!(table.rows(), Table::seed().rows());
    }

    #[test]
    fn parse_price_reasons() {
        assert_eq!(parse_price(" 42 ").unwrap(), 42);
        assert_eq!(parse_price("-1").unwrap_err().reason, "must not be negative");
        assert_eq!(parse_price("1.5").unwrap_err().reason, "must be a whole number");
        assert_eq!(parse_price("cheap").unwrap_err().reason, "is not a number");
        assert_eq!(parse_price("  ").unwrap_err().reason, "is empty");
    }

    #[test]
    fn set_cell_out_of_bounds() {
        let mut table = Table::seed();
        assert!(matches!(
            table.set_cell(6, ColumnId::Make, "Kia"),
            Err(GridError::RowOutOfBounds { row: 6, total: 6 })
        ));
    }

    #[test]
    fn detect_types_by_extension() {
        assert_eq!(
            Table::detect_file_type(Path::new("a.CSV")).unwrap(),
            FileType::CSV
        );
        assert_eq!(
            Table::detect_file_type(Path::new("a.pq")).unwrap(),
            FileType::PARQUET
        );
        assert!(matches!(
            Table::detect_file_type(Path::new("a.xlsx")),
            Err(GridError::UnknownFileType)
        ));
    }

    #[test]
    fn load_csv_fixture() {
        let table = Table::load_data_file(fixture("vehicles.csv")).unwrap();
        assert_eq!(table.name(), "vehicles.csv");
        assert_eq!(table.rows(), Table::seed().rows());
    }

    #[test]
    fn load_csv_with_bad_price() {
        let err = Table::load_data_file(fixture("bad_price.csv")).unwrap_err();
        assert!(matches!(err, GridError::LoadingFailed(_)));
    }

    #[test]
    fn load_missing_file() {
        assert!(matches!(
            Table::load_data_file(fixture("missing.csv")),
            Err(GridError::FileNotFound)
        ));
    }
}
