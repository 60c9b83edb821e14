//! Delimited-text loading into a [`Dataset`].
//!
//! The first row names the columns.  A column is numeric when every present cell parses as a
//! number; otherwise it is categorical and keeps its cells as text.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use log::debug;

use crate::dataset::{Column, ColumnKind, Dataset, DatasetError, Value};

/// Cell contents read as missing values.
pub const MISSING_TOKENS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Failures while turning a file into a [`Dataset`].
#[derive(Debug)]
pub enum DataLoadError {
    /// The file could not be opened.
    Io {
        /// File being opened.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The contents are not well-formed delimited text.
    Csv(csv::Error),
    /// The file type is not supported, such as spreadsheets.
    UnsupportedFormat(String),
    /// The parsed columns do not form a valid dataset.
    Dataset(DatasetError),
}

impl fmt::Display for DataLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "Failed to open {}: {source}", path.display()),
            Self::Csv(err) => write!(f, "Failed to parse delimited data: {err}"),
            Self::UnsupportedFormat(extension) => write!(
                f,
                "Unsupported file type '.{extension}'; export the sheet as CSV first"
            ),
            Self::Dataset(err) => write!(f, "Invalid dataset: {err}"),
        }
    }
}

impl std::error::Error for DataLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(err) => Some(err),
            Self::Dataset(err) => Some(err),
            Self::UnsupportedFormat(_) => None,
        }
    }
}

impl From<csv::Error> for DataLoadError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<DatasetError> for DataLoadError {
    fn from(err: DatasetError) -> Self {
        Self::Dataset(err)
    }
}

/// Loads the file at `path`, choosing the parser from its extension.
///
/// `.tsv` files are tab separated; spreadsheets are rejected; anything else is read as CSV.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, DataLoadError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xls" | "xlsm" | "ods" => Err(DataLoadError::UnsupportedFormat(extension)),
        "tsv" => load_delimited(path, b'\t'),
        _ => load_delimited(path, b','),
    }
}

/// Loads a comma separated file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Dataset, DataLoadError> {
    load_delimited(path.as_ref(), b',')
}

/// Parses comma separated data from `reader`.
pub fn load_csv_from_reader<R: Read>(reader: R) -> Result<Dataset, DataLoadError> {
    parse(reader, b',')
}

fn load_delimited(path: &Path, delimiter: u8) -> Result<Dataset, DataLoadError> {
    let file = File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = parse(BufReader::new(file), delimiter)?;
    debug!(
        "Loaded {} rows x {} columns from {}",
        dataset.row_count(),
        dataset.column_count(),
        path.display()
    );
    Ok(dataset)
}

fn parse<R: Read>(reader: R, delimiter: u8) -> Result<Dataset, DataLoadError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (index, column) in cells.iter_mut().enumerate() {
            let cell = record.get(index).unwrap_or("");
            column.push((!is_missing_token(cell)).then(|| cell.to_owned()));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| build_column(name, cells))
        .collect();
    Ok(Dataset::new(columns)?)
}

fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell)
}

fn build_column(name: String, cells: Vec<Option<String>>) -> Column {
    let numbers: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            Some(text) => text.parse::<f64>().ok().map(Some),
            None => Some(None),
        })
        .collect();

    match numbers {
        Some(numbers) => Column::numeric(name, numbers),
        None => Column::new(
            name,
            ColumnKind::Categorical,
            cells.into_iter().map(Value::from).collect(),
        ),
    }
}
