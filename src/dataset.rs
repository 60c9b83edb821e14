//! In-memory tabular dataset consumed by the report pipeline.
//!
//! A [`Dataset`] is an ordered list of named [`Column`]s sharing one row count.  Columns carry a
//! declared [`ColumnKind`] so the summarizer and the chart planner know which columns are numeric
//! without re-inspecting values.  The pipeline only ever borrows a dataset; nothing in the crate
//! mutates one after construction.

use std::collections::HashSet;
use std::fmt;

/// Declared kind of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Floating point measurements.
    Numeric,
    /// Free text or category labels.
    Categorical,
}

/// A single cell value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A numeric cell.
    Number(f64),
    /// A textual cell.
    Text(String),
    /// An absent cell.
    Missing,
}

impl Value {
    /// Returns whether the cell counts as missing. Non-finite numbers are treated as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(value) => !value.is_finite(),
            Self::Text(_) => false,
        }
    }

    /// Returns the numeric payload of a present, finite numeric cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    /// Returns a display label for the cell, or `None` when it is missing.
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Number(value) if value.is_finite() => Some(value.to_string()),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// A named column of values.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Column {
    /// Creates a column with the given kind.
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Creates a numeric column; `None` entries become missing cells.
    pub fn numeric<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        Self::new(
            name,
            ColumnKind::Numeric,
            values.into_iter().map(Value::from).collect(),
        )
    }

    /// Creates a categorical column; `None` entries become missing cells.
    pub fn categorical<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self::new(
            name,
            ColumnKind::Categorical,
            values
                .into_iter()
                .map(|value| value.map_or(Value::Missing, |text| Value::Text(text.into())))
                .collect(),
        )
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared kind.
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Returns the cell values in row order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of rows in the column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_missing()).count()
    }

    /// Iterates over the present numeric values, skipping missing cells.
    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(Value::as_number)
    }
}

/// Violations of the dataset invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetError {
    /// Two columns share the same name.
    DuplicateColumn(String),
    /// The column at this index has a blank name.
    EmptyHeader(usize),
    /// A column's length differs from the first column's.
    RowCountMismatch {
        /// Name of the offending column.
        column: String,
        /// Row count of the first column.
        expected: usize,
        /// Row count of the offending column.
        found: usize,
    },
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateColumn(name) => write!(f, "Column '{name}' appears more than once"),
            Self::EmptyHeader(index) => write!(f, "Column {} has an empty name", index + 1),
            Self::RowCountMismatch {
                column,
                expected,
                found,
            } => write!(
                f,
                "Column '{column}' has {found} rows but the dataset has {expected}"
            ),
        }
    }
}

impl std::error::Error for DatasetError {}

/// Ordered collection of equally sized, uniquely named columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Validates the columns and builds a dataset.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            if column.name().trim().is_empty() {
                return Err(DatasetError::EmptyHeader(index));
            }
            if !seen.insert(column.name()) {
                return Err(DatasetError::DuplicateColumn(column.name().to_owned()));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(column) = columns.iter().find(|column| column.len() != expected) {
                return Err(DatasetError::RowCountMismatch {
                    column: column.name().to_owned(),
                    expected,
                    found: column.len(),
                });
            }
        }

        Ok(Self { columns })
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name() == name)
    }

    /// Number of rows shared by every column.
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total number of missing cells across every column.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Numeric columns in dataset order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns_of(ColumnKind::Numeric)
    }

    /// Categorical columns in dataset order.
    pub fn categorical_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns_of(ColumnKind::Categorical)
    }

    fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &Column> + '_ {
        self.columns
            .iter()
            .filter(move |column| column.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::numeric("age", [Some(20.0), None, Some(40.0)]),
            Column::categorical("city", [Some("A"), Some("B"), None]),
        ])
        .expect("valid dataset")
    }

    #[test]
    fn counts_shape_and_missing_cells() {
        let dataset = sample();
        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.column_count(), 2);
        assert_eq!(dataset.missing_count(), 2);
    }

    #[test]
    fn non_finite_numbers_count_as_missing() {
        let column = Column::new(
            "x",
            ColumnKind::Numeric,
            vec![Value::Number(f64::NAN), Value::Number(1.0)],
        );
        assert_eq!(column.missing_count(), 1);
        assert_eq!(column.numbers().collect::<Vec<_>>(), vec![1.0]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Dataset::new(vec![
            Column::numeric("a", [Some(1.0)]),
            Column::numeric("a", [Some(2.0)]),
        ])
        .unwrap_err();
        assert_eq!(err, DatasetError::DuplicateColumn("a".into()));
    }

    #[test]
    fn rejects_blank_names() {
        let err = Dataset::new(vec![
            Column::numeric("a", [Some(1.0)]),
            Column::numeric("  ", [Some(2.0)]),
        ])
        .unwrap_err();
        assert_eq!(err, DatasetError::EmptyHeader(1));
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = Dataset::new(vec![
            Column::numeric("a", [Some(1.0), Some(2.0)]),
            Column::categorical("b", [Some("x")]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            DatasetError::RowCountMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn splits_columns_by_kind() {
        let dataset = sample();
        let numeric: Vec<_> = dataset.numeric_columns().map(Column::name).collect();
        let categorical: Vec<_> = dataset.categorical_columns().map(Column::name).collect();
        assert_eq!(numeric, ["age"]);
        assert_eq!(categorical, ["city"]);
    }
}
