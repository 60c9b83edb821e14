use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;
use report_lab::charts::{chart_plan, render_charts, BitmapRasterizer, TopN, DEFAULT_TOP_N};
use report_lab::model::ImageSource;
use report_lab::scratch::ScratchStore;
use report_lab::stats::STATISTIC_LABELS;
use report_lab::{
    load_dataset, render_report, summarize, Dataset, DiskStore, ExportOptions, LogoAsset,
    MemoryStore, ReportOptions, ReportRequest,
};

/// Builds PDF analysis reports from delimited data files.
///
/// Fonts are looked up in `--fonts-dir`, then `REPORT_LAB_FONTS_DIR`, then `assets/fonts` next
/// to the binary, then the usual system locations.
#[derive(Parser)]
#[command(author, version, about = "Statistical PDF reports for CSV data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a report with statistics and charts.
    Generate(GenerateArgs),

    /// Print the statistics table without rendering anything.
    #[command(aliases = ["stats"])]
    Summary {
        /// CSV or TSV file to summarize.
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// CSV or TSV file to analyze.
    #[arg(short, long)]
    input: PathBuf,

    /// Image drawn in the top-left corner of the first page.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Numeric column to chart; repeatable. Defaults to every numeric column.
    #[arg(long = "numeric", value_name = "COLUMN")]
    numeric: Vec<String>,

    /// Categorical column to chart; repeatable. Defaults to every categorical column.
    #[arg(long = "categorical", value_name = "COLUMN")]
    categorical: Vec<String>,

    /// Number of values shown in categorical charts (5 to 20).
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Where to write the PDF.
    #[arg(short, long, default_value = "report.pdf")]
    output: PathBuf,

    /// Stage chart images as files in this directory instead of memory.
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Directory holding the Roboto font files.
    #[arg(long)]
    fonts_dir: Option<PathBuf>,

    /// Embed a PDF outline with one entry per section.
    #[cfg(feature = "bookmarks")]
    #[arg(long)]
    bookmarks: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate(args) => generate(args),
        Commands::Summary { input } => summary(input),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn generate(args: GenerateArgs) -> Result<(), Box<dyn Error>> {
    let dataset = load_dataset(&args.input)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        dataset.row_count(),
        dataset.column_count(),
        args.input.display()
    );

    let numeric = selection(args.numeric, || {
        dataset.numeric_columns().map(|column| column.name().to_owned()).collect()
    });
    let categorical = selection(args.categorical, || {
        dataset
            .categorical_columns()
            .map(|column| column.name().to_owned())
            .collect()
    });
    let specs = chart_plan(numeric.as_slice(), categorical.as_slice(), TopN::new(args.top_n));
    let charts = render_charts(&dataset, &specs, &BitmapRasterizer::new())?;

    let request = ReportRequest::new(&dataset)
        .with_logo(args.logo.map(|path| LogoAsset::new(ImageSource::from_path(path))))
        .with_charts(charts);

    let export = ExportOptions::default().with_fonts_dir(args.fonts_dir);
    #[cfg(feature = "bookmarks")]
    let export = export.with_bookmarks(args.bookmarks);
    let options = ReportOptions::new().with_export(export);

    let mut store: Box<dyn ScratchStore> = match args.scratch_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            Box::new(DiskStore::in_dir(dir))
        }
        None => Box::new(MemoryStore::new()),
    };
    let bytes = render_report(&request, store.as_mut(), &options)?;

    std::fs::write(&args.output, &bytes)?;
    println!("Generated {} ({} bytes)", args.output.display(), bytes.len());
    Ok(())
}

fn selection(requested: Vec<String>, all: impl FnOnce() -> Vec<String>) -> Vec<String> {
    if requested.is_empty() {
        all()
    } else {
        requested
    }
}

fn summary(input: PathBuf) -> Result<(), Box<dyn Error>> {
    let dataset = load_dataset(&input)?;
    print_summary(&dataset);
    Ok(())
}

fn print_summary(dataset: &Dataset) {
    println!(
        "{} rows, {} columns, {} missing values",
        dataset.row_count(),
        dataset.column_count(),
        dataset.missing_count()
    );

    let rows: Vec<Vec<String>> = summarize(dataset)
        .iter()
        .map(|statistics| statistics.to_cells())
        .collect();
    if rows.is_empty() {
        println!("No numeric columns.");
        return;
    }

    let widths: Vec<usize> = STATISTIC_LABELS
        .iter()
        .enumerate()
        .map(|(index, label)| {
            rows.iter()
                .map(|row| row[index].len())
                .chain(std::iter::once(label.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    println!("{}", format_row(STATISTIC_LABELS.iter().copied(), &widths));
    for row in &rows {
        println!("{}", format_row(row.iter().map(String::as_str), &widths));
    }
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:>width$}", width = *width))
        .collect::<Vec<_>>()
        .join("  ")
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
