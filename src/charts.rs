//! Chart planning and rasterization.
//!
//! [`chart_plan`] decides which charts a report gets: a distribution and a boxplot per selected
//! numeric column, then a top-values bar chart per selected categorical column.  A
//! [`ChartRasterizer`] turns each [`ChartSpec`] into PNG bytes; [`BitmapRasterizer`] draws them
//! with `plotters` onto an in-memory bitmap.  Charts carry no text; the caption printed under
//! each image in the report names the chart.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::f64::consts::PI;
use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, RgbImage};
use log::debug;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::compose::{ChartArtifact, ChartCategory};
use crate::dataset::{Column, ColumnKind, Dataset};
use crate::error::ReportError;
use crate::model::ImageSource;
use crate::stats::ColumnStatistics;

/// Smallest number of categories a top-values chart shows.
pub const MIN_TOP_N: usize = 5;
/// Largest number of categories a top-values chart shows.
pub const MAX_TOP_N: usize = 20;
/// Default number of categories a top-values chart shows.
pub const DEFAULT_TOP_N: usize = 10;

const PRIMARY: RGBColor = RGBColor(0x1a, 0x3a, 0x8f);
const SECONDARY: RGBColor = RGBColor(0x1e, 0x4e, 0xd8);
const GRID: RGBColor = RGBColor(0xe5, 0xe7, 0xeb);
const PALETTE: [RGBColor; 5] = [
    PRIMARY,
    SECONDARY,
    RGBColor(0x25, 0x63, 0xeb),
    RGBColor(0x3b, 0x82, 0xf6),
    RGBColor(0x93, 0xc5, 0xfd),
];
const CHART_MARGIN: u32 = 20;
const GRID_LINES: usize = 5;
const KDE_SAMPLES: usize = 200;
const KDE_CUT: f64 = 3.0;
const WHISKER_IQR: f64 = 1.5;

type DrawResult = Result<(), Box<dyn StdError>>;

/// Number of categories shown by a top-values chart, clamped to
/// [`MIN_TOP_N`]..=[`MAX_TOP_N`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopN(usize);

impl TopN {
    /// Clamps `n` into the supported range.
    pub fn new(n: usize) -> Self {
        Self(n.clamp(MIN_TOP_N, MAX_TOP_N))
    }

    /// The clamped value.
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for TopN {
    fn default() -> Self {
        Self(DEFAULT_TOP_N)
    }
}

/// What a chart shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    /// Histogram with a density curve.
    Distribution,
    /// Horizontal Tukey boxplot.
    Boxplot,
    /// Horizontal bars of the most frequent values.
    TopValues(TopN),
}

/// One planned chart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartSpec {
    column: String,
    kind: ChartKind,
    category: ChartCategory,
    position: usize,
}

impl ChartSpec {
    /// Column the chart is drawn from.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// What the chart shows.
    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    /// Gallery section the chart belongs to.
    pub fn category(&self) -> ChartCategory {
        self.category
    }

    /// Ordering key within the section.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Caption printed under the chart.
    pub fn caption(&self) -> String {
        match self.kind {
            ChartKind::Distribution => format!("Distribution of {}", self.column),
            ChartKind::Boxplot => format!("Boxplot of {}", self.column),
            ChartKind::TopValues(top_n) => format!("Top {} values of {}", top_n.get(), self.column),
        }
    }
}

/// Plans the charts for the selected columns, in selection order.
pub fn chart_plan<N, C>(numeric: &[N], categorical: &[C], top_n: TopN) -> Vec<ChartSpec>
where
    N: AsRef<str>,
    C: AsRef<str>,
{
    let numeric_specs = numeric
        .iter()
        .flat_map(|column| [ChartKind::Distribution, ChartKind::Boxplot].map(|kind| (column, kind)))
        .enumerate()
        .map(|(position, (column, kind))| ChartSpec {
            column: column.as_ref().to_owned(),
            kind,
            category: ChartCategory::Numeric,
            position,
        });
    let categorical_specs = categorical
        .iter()
        .enumerate()
        .map(|(position, column)| ChartSpec {
            column: column.as_ref().to_owned(),
            kind: ChartKind::TopValues(top_n),
            category: ChartCategory::Categorical,
            position,
        });

    numeric_specs.chain(categorical_specs).collect()
}

/// Occurrences of every present value, most frequent first. Ties keep first-appearance order.
pub fn value_counts(column: &Column) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for label in column.values().iter().filter_map(|value| value.label()) {
        match index.get(&label) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(label.clone(), counts.len());
                counts.push((label, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Turns a chart description into PNG bytes.
pub trait ChartRasterizer {
    /// Draws `spec` from `dataset`.
    fn rasterize(&self, dataset: &Dataset, spec: &ChartSpec) -> Result<Vec<u8>, ReportError>;
}

/// Rasterizes every spec and wraps the results as gallery artifacts captioned with
/// [`ChartSpec::caption`].
pub fn render_charts(
    dataset: &Dataset,
    specs: &[ChartSpec],
    rasterizer: &dyn ChartRasterizer,
) -> Result<Vec<ChartArtifact>, ReportError> {
    specs
        .iter()
        .map(|spec| {
            let bytes = rasterizer.rasterize(dataset, spec)?;
            debug!("Rendered '{}' ({} bytes)", spec.caption(), bytes.len());
            Ok(
                ChartArtifact::new(spec.category(), spec.position(), ImageSource::from_bytes(bytes))
                    .with_caption(spec.caption()),
            )
        })
        .collect()
}

/// Draws charts with `plotters` into PNG bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapRasterizer {
    width: u32,
    height: u32,
}

impl Default for BitmapRasterizer {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
        }
    }
}

impl BitmapRasterizer {
    /// Creates a rasterizer producing 800x400 pixel charts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pixel size and returns the updated rasterizer.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    fn render<F>(&self, column: &str, draw: F) -> Result<Vec<u8>, ReportError>
    where
        F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
    {
        let chart_error = |err: &dyn std::fmt::Display| ReportError::chart(column, err.to_string());
        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(|err| chart_error(&err))?;
            draw(&root).map_err(|err| chart_error(&err))?;
            root.present().map_err(|err| chart_error(&err))?;
        }

        let image = RgbImage::from_raw(self.width, self.height, buffer)
            .ok_or_else(|| ReportError::chart(column, "bitmap size mismatch"))?;
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .map_err(|err| chart_error(&err))?;
        Ok(bytes)
    }
}

impl ChartRasterizer for BitmapRasterizer {
    fn rasterize(&self, dataset: &Dataset, spec: &ChartSpec) -> Result<Vec<u8>, ReportError> {
        let column = dataset
            .column(spec.column())
            .ok_or_else(|| ReportError::chart(spec.column(), "no such column"))?;

        match (spec.kind(), column.kind()) {
            (ChartKind::TopValues(top_n), _) => {
                let mut counts = value_counts(column);
                counts.truncate(top_n.get());
                self.render(column.name(), |root| draw_top_values(root, &counts))
            }
            (kind, ColumnKind::Categorical) => Err(ReportError::chart(
                column.name(),
                format!("{kind:?} needs a numeric column"),
            )),
            (ChartKind::Distribution, ColumnKind::Numeric) => {
                let values: Vec<f64> = column.numbers().collect();
                let stats = ColumnStatistics::from_column(column);
                self.render(column.name(), |root| draw_distribution(root, &values, &stats))
            }
            (ChartKind::Boxplot, ColumnKind::Numeric) => {
                let values: Vec<f64> = column.numbers().collect();
                let stats = ColumnStatistics::from_column(column);
                self.render(column.name(), |root| draw_boxplot(root, &values, &stats))
            }
        }
    }
}

/// Sturges-binned histogram as `(left, right, count)` triples.
fn histogram(values: &[f64], min: f64, max: f64) -> Vec<(f64, f64, usize)> {
    if values.is_empty() {
        return Vec::new();
    }
    if max - min <= f64::EPSILON {
        return vec![(min - 0.5, max + 0.5, values.len())];
    }

    let bins = (values.len() as f64).log2().ceil() as usize + 1;
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for value in values {
        let slot = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[slot] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(slot, count)| {
            let left = min + width * slot as f64;
            (left, left + width, count)
        })
        .collect()
}

/// Gaussian kernel density estimate scaled to histogram counts, using Scott's bandwidth.
fn density_curve(values: &[f64], std_dev: f64, bin_width: f64) -> Vec<(f64, f64)> {
    let n = values.len() as f64;
    let bandwidth = std_dev * n.powf(-0.2);
    if bandwidth <= 0.0 || !bandwidth.is_finite() {
        return Vec::new();
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let start = min - KDE_CUT * bandwidth;
    let step = (max - min + 2.0 * KDE_CUT * bandwidth) / (KDE_SAMPLES - 1) as f64;
    let norm = n * bandwidth * (2.0 * PI).sqrt();
    let scale = n * bin_width;

    (0..KDE_SAMPLES)
        .map(|sample| {
            let x = start + step * sample as f64;
            let density: f64 = values
                .iter()
                .map(|value| (-0.5 * ((x - value) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                / norm;
            (x, density * scale)
        })
        .collect()
}

fn draw_horizontal_grid(
    chart: &mut ChartContext<'_, BitMapBackend<'_>, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    x_range: (f64, f64),
    y_max: f64,
) -> DrawResult {
    chart.draw_series((1..=GRID_LINES).map(|line| {
        let y = y_max * line as f64 / GRID_LINES as f64;
        PathElement::new(vec![(x_range.0, y), (x_range.1, y)], GRID.stroke_width(1))
    }))?;
    Ok(())
}

fn draw_distribution(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    values: &[f64],
    stats: &ColumnStatistics,
) -> DrawResult {
    let (Some(min), Some(max)) = (stats.min, stats.max) else {
        return Ok(());
    };
    let bins = histogram(values, min, max);
    let bin_width = bins.first().map_or(1.0, |(left, right, _)| right - left);
    let curve = stats
        .std_dev
        .map(|std_dev| density_curve(values, std_dev, bin_width))
        .unwrap_or_default();

    let x_lo = curve.first().map_or(bins[0].0, |(x, _)| x.min(bins[0].0));
    let x_hi = curve
        .last()
        .map_or(bins[bins.len() - 1].1, |(x, _)| x.max(bins[bins.len() - 1].1));
    let peak = bins
        .iter()
        .map(|(_, _, count)| *count as f64)
        .chain(curve.iter().map(|(_, y)| *y))
        .fold(0.0, f64::max);
    let y_max = peak * 1.1;

    let mut chart = ChartBuilder::on(root)
        .margin(CHART_MARGIN)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_max)?;
    draw_horizontal_grid(&mut chart, (x_lo, x_hi), y_max)?;
    chart.draw_series(bins.iter().map(|&(left, right, count)| {
        Rectangle::new([(left, 0.0), (right, count as f64)], PRIMARY.mix(0.6).filled())
    }))?;
    chart.draw_series(bins.iter().map(|&(left, right, count)| {
        Rectangle::new([(left, 0.0), (right, count as f64)], WHITE.stroke_width(1))
    }))?;
    if !curve.is_empty() {
        chart.draw_series(LineSeries::new(curve, PRIMARY.stroke_width(3)))?;
    }
    Ok(())
}

/// Tukey whisker ends: the most extreme values within 1.5 IQR of the box.
fn whiskers(values: &[f64], q1: f64, q3: f64) -> (f64, f64) {
    let reach = WHISKER_IQR * (q3 - q1);
    let inside = values
        .iter()
        .copied()
        .filter(|value| *value >= q1 - reach && *value <= q3 + reach);
    inside.fold((q1, q3), |(lo, hi), value| (lo.min(value), hi.max(value)))
}

fn draw_boxplot(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    values: &[f64],
    stats: &ColumnStatistics,
) -> DrawResult {
    let (Some(min), Some(max), Some(q1), Some(median), Some(q3)) =
        (stats.min, stats.max, stats.p25, stats.p50, stats.p75)
    else {
        return Ok(());
    };
    let (low, high) = whiskers(values, q1, q3);
    let pad = if max > min { (max - min) * 0.05 } else { 0.5 };

    let mut chart = ChartBuilder::on(root)
        .margin(CHART_MARGIN)
        .build_cartesian_2d((min - pad)..(max + pad), 0.0..1.0)?;

    chart.draw_series(std::iter::once(Rectangle::new(
        [(q1, 0.3), (q3, 0.7)],
        SECONDARY.mix(0.8).filled(),
    )))?;
    chart.draw_series(std::iter::once(Rectangle::new(
        [(q1, 0.3), (q3, 0.7)],
        BLACK.stroke_width(2),
    )))?;
    chart.draw_series(
        [
            vec![(median, 0.3), (median, 0.7)],
            vec![(low, 0.5), (q1, 0.5)],
            vec![(q3, 0.5), (high, 0.5)],
            vec![(low, 0.4), (low, 0.6)],
            vec![(high, 0.4), (high, 0.6)],
        ]
        .into_iter()
        .map(|points| PathElement::new(points, BLACK.stroke_width(2))),
    )?;
    chart.draw_series(
        values
            .iter()
            .filter(|value| **value < low || **value > high)
            .map(|value| Circle::new((*value, 0.5), 4, BLACK.filled())),
    )?;
    Ok(())
}

fn draw_top_values(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    counts: &[(String, usize)],
) -> DrawResult {
    let Some(largest) = counts.first().map(|(_, count)| *count as f64) else {
        return Ok(());
    };
    let rows = counts.len() as f64;
    let x_max = largest * 1.1;

    let mut chart = ChartBuilder::on(root)
        .margin(CHART_MARGIN)
        .build_cartesian_2d(0.0..x_max, 0.0..rows)?;
    chart.draw_series(counts.iter().enumerate().map(|(row, (_, count))| {
        let top = rows - row as f64;
        let color = PALETTE[row * PALETTE.len() / counts.len()];
        Rectangle::new([(0.0, top - 0.85), (*count as f64, top - 0.15)], color.filled())
    }))?;
    Ok(())
}
