#[path = "shared/report_util.rs"]
mod report_util;

use std::error::Error;

use report_lab::{render_report, MemoryStore, ReportOptions};

fn main() -> Result<(), Box<dyn Error>> {
    let sample = report_util::SampleReport::build()?;
    let pdf = render_report(&sample.request(), &mut MemoryStore::new(), &ReportOptions::default())?;
    std::fs::write("sample_report.pdf", &pdf)?;
    println!("Generated sample_report.pdf ({} bytes)", pdf.len());
    Ok(())
}
