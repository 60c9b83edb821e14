//! Descriptive statistics for the numeric columns of a [`Dataset`].
//!
//! Percentiles use linear interpolation between order statistics (the numpy/pandas default):
//! the `p`-th percentile of `n` sorted values sits at fractional rank `p * (n - 1)`.

use crate::dataset::{Column, Dataset};

/// Header labels of the statistics table, in column order.
pub const STATISTIC_LABELS: [&str; 9] = [
    "Column", "Count", "Mean", "Std Dev", "Min", "25%", "50%", "75%", "Max",
];

/// Text rendered for a statistic that is undefined for its column.
pub const UNDEFINED_STATISTIC: &str = "NaN";

/// Summary of one numeric column.
///
/// Values are `None` when undefined: every statistic for a column without values, and the
/// standard deviation for a column with a single value.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStatistics {
    /// Column name.
    pub column: String,
    /// Number of non-missing values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: Option<f64>,
    /// Sample standard deviation (N - 1 denominator).
    pub std_dev: Option<f64>,
    /// Smallest value.
    pub min: Option<f64>,
    /// 25th percentile.
    pub p25: Option<f64>,
    /// Median.
    pub p50: Option<f64>,
    /// 75th percentile.
    pub p75: Option<f64>,
    /// Largest value.
    pub max: Option<f64>,
}

impl ColumnStatistics {
    /// Computes the statistics of a single column, ignoring missing cells.
    pub fn from_column(column: &Column) -> Self {
        let mut values: Vec<f64> = column.numbers().collect();
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let mean = mean(&values);

        Self {
            column: column.name().to_owned(),
            count,
            mean,
            std_dev: mean.and_then(|mean| sample_std_dev(&values, mean)),
            min: values.first().copied(),
            p25: percentile(&values, 0.25),
            p50: percentile(&values, 0.50),
            p75: percentile(&values, 0.75),
            max: values.last().copied(),
        }
    }

    /// Renders the row as table cells, in [`STATISTIC_LABELS`] order.
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(STATISTIC_LABELS.len());
        cells.push(self.column.clone());
        cells.push(self.count.to_string());
        cells.extend(
            [
                self.mean,
                self.std_dev,
                self.min,
                self.p25,
                self.p50,
                self.p75,
                self.max,
            ]
            .into_iter()
            .map(format_statistic),
        );
        cells
    }
}

/// Computes one statistics row per numeric column, in dataset order.
pub fn summarize(dataset: &Dataset) -> Vec<ColumnStatistics> {
    dataset
        .numeric_columns()
        .map(ColumnStatistics::from_column)
        .collect()
}

/// Formats a statistic with exactly two decimals, rounding to nearest.
pub fn format_statistic(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.2}"),
        None => UNDEFINED_STATISTIC.to_owned(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let squares: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
    Some((squares / (values.len() - 1) as f64).sqrt())
}

/// Linear-interpolation percentile of already sorted values; `fraction` lies in `[0, 1]`.
pub fn percentile(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = fraction.clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn stats_of(values: &[Option<f64>]) -> ColumnStatistics {
        ColumnStatistics::from_column(&Column::numeric("x", values.iter().copied()))
    }

    #[test]
    fn matches_reference_values() {
        let stats = stats_of(&[Some(20.0), Some(30.0), Some(40.0), Some(50.0)]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, Some(35.0));
        assert_eq!(stats.min, Some(20.0));
        assert_eq!(stats.max, Some(50.0));
        assert_eq!(stats.p25, Some(27.5));
        assert_eq!(stats.p50, Some(35.0));
        assert_eq!(stats.p75, Some(42.5));
        let std_dev = stats.std_dev.expect("std defined");
        assert!((std_dev - 12.909_944_487_358_056).abs() < 1e-12);
    }

    #[test]
    fn missing_values_are_ignored() {
        let stats = stats_of(&[Some(1.0), None, Some(3.0), Some(f64::NAN)]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, Some(2.0));
        assert_eq!(stats.p50, Some(2.0));
    }

    #[test]
    fn empty_column_is_undefined_not_a_panic() {
        let stats = stats_of(&[None, None]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_none());
        assert!(stats.std_dev.is_none());
        assert!(stats.p50.is_none());
        assert_eq!(stats.to_cells()[2], UNDEFINED_STATISTIC);
    }

    #[test]
    fn single_value_has_undefined_std_dev() {
        let stats = stats_of(&[Some(7.0)]);
        assert_eq!(stats.mean, Some(7.0));
        assert_eq!(stats.p75, Some(7.0));
        assert!(stats.std_dev.is_none());
    }

    #[test]
    fn mean_and_percentiles_stay_ordered() {
        let samples: [&[Option<f64>]; 4] = [
            &[Some(-3.5), Some(10.0), Some(0.25)],
            &[Some(1e9), Some(-1e9), Some(5.0), Some(5.0), Some(6.0)],
            &[Some(2.0), Some(2.0), Some(2.0)],
            &[Some(0.1), Some(0.7), Some(0.2), Some(0.9), Some(0.4), Some(0.3)],
        ];
        for values in samples {
            let stats = stats_of(values);
            let (min, max) = (stats.min.unwrap(), stats.max.unwrap());
            let mean = stats.mean.unwrap();
            assert!(min <= mean && mean <= max, "mean {mean} outside [{min}, {max}]");
            assert!(stats.p25.unwrap() <= stats.p50.unwrap());
            assert!(stats.p50.unwrap() <= stats.p75.unwrap());
        }
    }

    #[test]
    fn formats_with_two_rounded_decimals() {
        assert_eq!(format_statistic(Some(35.0)), "35.00");
        assert_eq!(format_statistic(Some(2.0 / 3.0)), "0.67");
        assert_eq!(format_statistic(Some(-1.005_1)), "-1.01");
        assert_eq!(format_statistic(None), "NaN");
    }

    #[test]
    fn cells_follow_label_order() {
        let cells = stats_of(&[Some(20.0), Some(30.0), Some(40.0), Some(50.0)]).to_cells();
        assert_eq!(cells.len(), STATISTIC_LABELS.len());
        assert_eq!(cells[0], "x");
        assert_eq!(cells[1], "4");
        assert_eq!(cells[2], "35.00");
        assert_eq!(cells[4], "20.00");
        assert_eq!(cells[8], "50.00");
    }

    #[test]
    fn summarize_keeps_dataset_order_and_skips_text() {
        let dataset = Dataset::new(vec![
            Column::numeric("b", [Some(1.0)]),
            Column::categorical("label", [Some("x")]),
            Column::numeric("a", [Some(2.0)]),
        ])
        .unwrap();
        let names: Vec<_> = summarize(&dataset).into_iter().map(|s| s.column).collect();
        assert_eq!(names, ["b", "a"]);
    }
}
