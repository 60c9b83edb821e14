#[path = "shared/report_util.rs"]
mod report_util;

#[cfg(feature = "bookmarks")]
use std::error::Error;

#[cfg(feature = "bookmarks")]
fn main() -> Result<(), Box<dyn Error>> {
    use report_lab::{render_report_with_details, ExportOptions, MemoryStore, ReportOptions};

    let sample = report_util::SampleReport::build()?;
    let options = ReportOptions {
        export: ExportOptions::default().with_bookmarks(true),
        ..ReportOptions::default()
    };
    let pdf = render_report_with_details(&sample.request(), &mut MemoryStore::new(), &options)?;
    std::fs::write("sample_report_with_bookmarks.pdf", pdf.bytes())?;
    println!(
        "Generated sample_report_with_bookmarks.pdf ({} bytes, {} pages) with {} bookmarks",
        pdf.bytes().len(),
        pdf.page_count(),
        pdf.sections().len()
    );
    Ok(())
}

#[cfg(not(feature = "bookmarks"))]
fn main() {
    eprintln!(
        "Enable the `bookmarks` feature to run this example: \
         cargo run --example sample_report_bookmarks --features bookmarks"
    );
}
