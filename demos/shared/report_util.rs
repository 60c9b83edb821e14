use std::error::Error;
use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use report_lab::charts::{chart_plan, render_charts, BitmapRasterizer, TopN};
use report_lab::model::ImageSource;
use report_lab::{ChartArtifact, Column, Dataset, LogoAsset, ReportRequest};

const SAMPLE_ROWS: usize = 120;
const CITIES: [&str; 6] = ["Lisbon", "Porto", "Braga", "Faro", "Coimbra", "Aveiro"];

/// Inputs for the sample report: a synthetic survey plus its rendered charts and a logo.
pub struct SampleReport {
    dataset: Dataset,
    charts: Vec<ChartArtifact>,
    logo: Vec<u8>,
}

impl SampleReport {
    pub fn build() -> Result<Self, Box<dyn Error>> {
        let dataset = sample_dataset()?;
        let specs = chart_plan(&["age", "income"], &["city"], TopN::new(6));
        let charts = render_charts(&dataset, &specs, &BitmapRasterizer::new())?;
        Ok(Self {
            dataset,
            charts,
            logo: generate_gradient_image(160, 160, [26, 58, 143], [147, 197, 253])?,
        })
    }

    pub fn request(&self) -> ReportRequest<'_> {
        ReportRequest::new(&self.dataset)
            .with_logo(LogoAsset::new(ImageSource::from_bytes(self.logo.clone())))
            .with_charts(self.charts.iter().cloned())
    }
}

/// Deterministic survey-like data with a few gaps.
fn sample_dataset() -> Result<Dataset, Box<dyn Error>> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 10_000) as f64 / 10_000.0
    };

    let mut ages = Vec::with_capacity(SAMPLE_ROWS);
    let mut incomes = Vec::with_capacity(SAMPLE_ROWS);
    let mut cities = Vec::with_capacity(SAMPLE_ROWS);
    for row in 0..SAMPLE_ROWS {
        let age = 18.0 + (next() + next() + next()) / 3.0 * 60.0;
        ages.push((row % 17 != 0).then_some(age.round()));
        incomes.push((row % 23 != 0).then(|| 900.0 + age * 35.0 + next() * 1_500.0));
        let city = CITIES[((next() * next()) * CITIES.len() as f64) as usize % CITIES.len()];
        cities.push((row % 29 != 0).then_some(city));
    }

    Ok(Dataset::new(vec![
        Column::numeric("age", ages),
        Column::numeric("income", incomes),
        Column::categorical("city", cities),
    ])?)
}

/// Renders a diagonal gradient between two anchor colours.
fn generate_gradient_image(
    width: u32,
    height: u32,
    start: [u8; 3],
    end: [u8; 3],
) -> Result<Vec<u8>, image::ImageError> {
    let width_f = (width.saturating_sub(1)) as f32;
    let height_f = (height.saturating_sub(1)) as f32;
    let buffer = ImageBuffer::from_fn(width, height, |x, y| {
        let xf = if width_f > 0.0 { x as f32 / width_f } else { 0.0 };
        let yf = if height_f > 0.0 { y as f32 / height_f } else { 0.0 };
        let mix = (0.65 * xf + 0.35 * yf).clamp(0.0, 1.0);
        let mut channels = [0u8; 3];
        for (index, channel) in channels.iter_mut().enumerate() {
            let start = start[index] as f32;
            let end = end[index] as f32;
            *channel = (start + (end - start) * mix).round().clamp(0.0, 255.0) as u8;
        }
        Rgb(channels)
    });

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(buffer).write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}
