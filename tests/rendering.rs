mod common;

use std::fs;
use std::path::PathBuf;

use report_lab::charts::{chart_plan, render_charts, BitmapRasterizer, TopN};
use report_lab::compose::{
    CATEGORICAL_HEADING, GALLERY_HEADING, NUMERIC_HEADING, STATISTICS_HEADING,
};
use genpdf::style::Color;
use report_lab::elements::SectionMark;
use report_lab::model::ImageSource;
use report_lab::{
    generate_report, render_report, render_report_with_details, ChartArtifact, Column, Dataset,
    DiskStore, ExportOptions, LayoutOptions, LogoAsset, MemoryStore, ReportError, ReportOptions,
    ReportRequest, REPORT_MIME_TYPE,
};

fn mark(title: &str, page: usize) -> SectionMark {
    SectionMark {
        title: title.to_owned(),
        page,
    }
}

#[test]
fn rendering_is_deterministic() {
    if common::skip_without_fonts("rendering_is_deterministic") {
        return;
    }
    let dataset = common::age_city_dataset();
    let request = ReportRequest::new(&dataset)
        .with_logo(LogoAsset::new(ImageSource::from_bytes(common::gradient_png(40, 40))))
        .with_chart(ChartArtifact::numeric(
            0,
            ImageSource::from_bytes(common::gradient_png(120, 40)),
        ))
        .with_generated_at(common::fixed_timestamp());
    let options = ReportOptions::default();

    let first = render_report(&request, &mut MemoryStore::new(), &options).expect("first render");
    let second = render_report(&request, &mut MemoryStore::new(), &options).expect("second render");

    assert_eq!(first, second, "identical requests must give identical bytes");

    let later = request
        .clone()
        .with_generated_at(common::fixed_timestamp() + chrono::Duration::minutes(1));
    let third = render_report(&later, &mut MemoryStore::new(), &options).expect("third render");
    assert_ne!(first, third, "the timestamp is part of the output");
}

#[test]
fn statistics_header_row_is_filled() {
    if common::skip_without_fonts("statistics_header_row_is_filled") {
        return;
    }
    let bytes = generate_report(&common::age_city_dataset(), None, &[], &[]).expect("render");
    let document = common::load_pdf(&bytes);
    let colors = common::page_stroke_colors(&document, 1);
    assert!(
        common::has_color(&colors, [200, 220, 255]),
        "header fill missing from page 1: {colors:?}"
    );
}

#[test]
fn configured_header_fill_is_used() {
    if common::skip_without_fonts("configured_header_fill_is_used") {
        return;
    }
    let dataset = common::age_city_dataset();
    let request = ReportRequest::new(&dataset).with_generated_at(common::fixed_timestamp());
    let options = ReportOptions::new()
        .with_layout(LayoutOptions::new().with_table_header_fill(Color::Rgb(10, 120, 40)))
        .with_export(ExportOptions::new());

    let bytes = render_report(&request, &mut MemoryStore::new(), &options).expect("render");
    let colors = common::page_stroke_colors(&common::load_pdf(&bytes), 1);
    assert!(common::has_color(&colors, [10, 120, 40]), "{colors:?}");
    assert!(!common::has_color(&colors, [200, 220, 255]), "{colors:?}");
}

#[test]
fn dataset_without_numeric_columns_or_charts_is_one_page() {
    if common::skip_without_fonts("dataset_without_numeric_columns_or_charts_is_one_page") {
        return;
    }
    let dataset = Dataset::new(vec![Column::categorical(
        "city",
        [Some("A"), Some("B"), None],
    )])
    .expect("valid dataset");

    let bytes = generate_report(&dataset, None, &[], &[]).expect("render report");
    let document = common::load_pdf(&bytes);
    assert_eq!(common::page_count(&document), 1);
    assert!(common::page_image_sizes(&document, 1).is_empty());

    let request = ReportRequest::new(&dataset);
    let rendered =
        render_report_with_details(&request, &mut MemoryStore::new(), &ReportOptions::default())
            .expect("render report");
    assert_eq!(rendered.page_count(), 1);
    assert_eq!(rendered.sections(), [mark(STATISTICS_HEADING, 1)]);
}

#[test]
fn numeric_charts_precede_categorical_charts() {
    if common::skip_without_fonts("numeric_charts_precede_categorical_charts") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let numeric = dir.path().join("age_distribution.png");
    let categorical = dir.path().join("city_top_values.png");
    common::write_png(&numeric, 120, 20);
    common::write_png(&categorical, 160, 20);
    let dataset = common::age_city_dataset();

    let bytes = generate_report(&dataset, None, &[numeric.clone()], &[categorical.clone()])
        .expect("render report");
    let document = common::load_pdf(&bytes);
    assert_eq!(common::page_count(&document), 2);
    assert!(common::page_image_sizes(&document, 1).is_empty());
    assert_eq!(
        common::page_image_sizes(&document, 2),
        [(120, 20), (160, 20)]
    );

    // Request order does not matter, only the category.
    let request = ReportRequest::new(&dataset)
        .with_chart(ChartArtifact::categorical(0, ImageSource::from_path(&categorical)))
        .with_chart(ChartArtifact::numeric(0, ImageSource::from_path(&numeric)))
        .with_generated_at(common::fixed_timestamp());
    let rendered =
        render_report_with_details(&request, &mut MemoryStore::new(), &ReportOptions::default())
            .expect("render report");
    assert_eq!(rendered.page_count(), 2);
    assert_eq!(
        rendered.sections(),
        [
            mark(STATISTICS_HEADING, 1),
            mark(GALLERY_HEADING, 2),
            mark(NUMERIC_HEADING, 2),
            mark(CATEGORICAL_HEADING, 2),
        ]
    );
    let document = common::load_pdf(rendered.bytes());
    assert_eq!(
        common::page_image_sizes(&document, 2),
        [(120, 20), (160, 20)]
    );
}

#[test]
fn logo_is_drawn_on_the_first_page_only() {
    if common::skip_without_fonts("logo_is_drawn_on_the_first_page_only") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let logo = dir.path().join("logo.png");
    let chart = dir.path().join("chart.png");
    common::write_png(&logo, 40, 40);
    common::write_png(&chart, 120, 20);

    let bytes = generate_report(&common::age_city_dataset(), Some(&logo), &[chart], &[])
        .expect("render report");
    let document = common::load_pdf(&bytes);
    assert_eq!(common::page_image_sizes(&document, 1), [(40, 40)]);
    assert_eq!(common::page_image_sizes(&document, 2), [(120, 20)]);
}

#[test]
fn missing_logo_is_left_out() {
    if common::skip_without_fonts("missing_logo_is_left_out") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let logo = dir.path().join("never_written.png");

    let bytes = generate_report(&common::age_city_dataset(), Some(&logo), &[], &[])
        .expect("missing logo is not an error");
    let document = common::load_pdf(&bytes);
    assert_eq!(common::page_count(&document), 1);
    assert!(common::page_image_sizes(&document, 1).is_empty());
}

#[test]
fn deleted_chart_is_omitted() {
    if common::skip_without_fonts("deleted_chart_is_omitted") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let kept = dir.path().join("kept.png");
    let deleted = dir.path().join("deleted.png");
    common::write_png(&kept, 120, 20);
    common::write_png(&deleted, 160, 20);
    fs::remove_file(&deleted).expect("delete chart");

    let bytes = generate_report(&common::age_city_dataset(), None, &[deleted, kept], &[])
        .expect("deleted chart is not an error");
    let document = common::load_pdf(&bytes);
    assert_eq!(common::page_count(&document), 2);
    assert_eq!(common::page_image_sizes(&document, 2), [(120, 20)]);
}

#[test]
fn supplied_but_missing_charts_keep_the_gallery_page() {
    if common::skip_without_fonts("supplied_but_missing_charts_keep_the_gallery_page") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let gone: Vec<PathBuf> = ["a.png", "b.png"]
        .iter()
        .map(|name| dir.path().join(name))
        .collect();

    let bytes = generate_report(&common::age_city_dataset(), None, &gone[..1], &[])
        .expect("render report");
    let document = common::load_pdf(&bytes);
    assert_eq!(common::page_count(&document), 2);
    assert!(common::page_image_sizes(&document, 2).is_empty());

    let dataset = common::age_city_dataset();
    let request = ReportRequest::new(&dataset)
        .with_chart(ChartArtifact::numeric(0, ImageSource::from_path(&gone[0])))
        .with_chart(ChartArtifact::categorical(0, ImageSource::from_path(&gone[1])))
        .with_generated_at(common::fixed_timestamp());
    let rendered =
        render_report_with_details(&request, &mut MemoryStore::new(), &ReportOptions::default())
            .expect("render report");
    assert_eq!(rendered.page_count(), 2);
    assert_eq!(
        rendered.sections(),
        [
            mark(STATISTICS_HEADING, 1),
            mark(GALLERY_HEADING, 2),
            mark(NUMERIC_HEADING, 2),
            mark(CATEGORICAL_HEADING, 2),
        ]
    );
}

#[test]
fn tall_galleries_continue_on_following_pages() {
    if common::skip_without_fonts("tall_galleries_continue_on_following_pages") {
        return;
    }
    // At the default width each chart is 130mm tall, so only one fits per page.
    let charts = (0..3)
        .map(|position| {
            ChartArtifact::numeric(
                position,
                ImageSource::from_bytes(common::gradient_png(100 + position as u32, 50)),
            )
        })
        .collect::<Vec<_>>();
    let dataset = common::age_city_dataset();
    let request = ReportRequest::new(&dataset)
        .with_charts(charts)
        .with_generated_at(common::fixed_timestamp());

    let rendered =
        render_report_with_details(&request, &mut MemoryStore::new(), &ReportOptions::default())
            .expect("render report");
    assert_eq!(rendered.page_count(), 4);

    let document = common::load_pdf(rendered.bytes());
    assert_eq!(common::page_count(&document), 4);
    for (page, width) in (2..=4).zip(100..) {
        assert_eq!(common::page_image_sizes(&document, page), [(width, 50)]);
    }
}

#[test]
fn oversized_chart_is_scaled_onto_one_page() {
    if common::skip_without_fonts("oversized_chart_is_scaled_onto_one_page") {
        return;
    }
    let dataset = common::age_city_dataset();
    let request = ReportRequest::new(&dataset).with_chart(ChartArtifact::numeric(
        0,
        ImageSource::from_bytes(common::gradient_png(20, 60)),
    ));

    let rendered =
        render_report_with_details(&request, &mut MemoryStore::new(), &ReportOptions::default())
            .expect("render report");
    assert_eq!(rendered.page_count(), 3);
    let document = common::load_pdf(rendered.bytes());
    assert_eq!(common::page_count(&document), 3);
    assert!(common::page_image_sizes(&document, 2).is_empty());
    assert_eq!(common::page_image_sizes(&document, 3), [(20, 60)]);
}

#[test]
fn page_filling_chart_is_followed_by_the_next_section() {
    if common::skip_without_fonts("page_filling_chart_is_followed_by_the_next_section") {
        return;
    }
    let dataset = common::age_city_dataset();
    let request = ReportRequest::new(&dataset)
        .with_chart(ChartArtifact::numeric(
            0,
            ImageSource::from_bytes(common::gradient_png(20, 60)),
        ))
        .with_chart(ChartArtifact::categorical(
            0,
            ImageSource::from_bytes(common::gradient_png(160, 20)),
        ))
        .with_generated_at(common::fixed_timestamp());

    let rendered =
        render_report_with_details(&request, &mut MemoryStore::new(), &ReportOptions::default())
            .expect("render report");
    assert_eq!(rendered.page_count(), 4);
    assert_eq!(rendered.sections().last(), Some(&mark(CATEGORICAL_HEADING, 4)));
    let document = common::load_pdf(rendered.bytes());
    assert_eq!(common::page_image_sizes(&document, 3), [(20, 60)]);
    assert_eq!(common::page_image_sizes(&document, 4), [(160, 20)]);
}

#[test]
fn disk_scratch_files_are_removed_after_success() {
    if common::skip_without_fonts("disk_scratch_files_are_removed_after_success") {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = DiskStore::in_dir(dir.path());
    let dataset = common::age_city_dataset();
    let request = ReportRequest::new(&dataset)
        .with_logo(LogoAsset::new(ImageSource::from_bytes(common::gradient_png(40, 40))))
        .with_chart(ChartArtifact::numeric(
            0,
            ImageSource::from_bytes(common::gradient_png(120, 20)),
        ))
        .with_chart(ChartArtifact::categorical(
            0,
            ImageSource::from_bytes(common::gradient_png(160, 20)),
        ));

    let bytes = render_report(&request, &mut store, &ReportOptions::default())
        .expect("render report");
    assert_eq!(common::page_count(&common::load_pdf(&bytes)), 2);
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[test]
fn disk_scratch_files_are_removed_after_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = DiskStore::in_dir(dir.path());
    let dataset = common::age_city_dataset();
    let request = ReportRequest::new(&dataset)
        .with_chart(ChartArtifact::numeric(
            0,
            ImageSource::from_bytes(common::gradient_png(120, 20)),
        ))
        .with_chart(ChartArtifact::numeric(
            1,
            ImageSource::from_bytes(b"definitely not an image".to_vec()),
        ));

    let err = render_report(&request, &mut store, &ReportOptions::default())
        .expect_err("corrupt chart must fail");
    assert!(matches!(err, ReportError::Composition(_)), "{err}");
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[test]
fn rasterized_charts_render_end_to_end() {
    if common::skip_without_fonts("rasterized_charts_render_end_to_end") {
        return;
    }
    let dataset = common::age_city_dataset();
    let specs = chart_plan(&["age"], &["city"], TopN::default());
    let charts = render_charts(&dataset, &specs, &BitmapRasterizer::new()).expect("rasterize");
    assert_eq!(charts.len(), 3);

    let request = ReportRequest::new(&dataset)
        .with_charts(charts)
        .with_generated_at(common::fixed_timestamp());
    let rendered =
        render_report_with_details(&request, &mut MemoryStore::new(), &ReportOptions::default())
            .expect("render report");

    assert!(rendered.page_count() >= 2);
    let titles: Vec<_> = rendered.sections().iter().map(|mark| mark.title.as_str()).collect();
    assert_eq!(
        titles,
        [STATISTICS_HEADING, GALLERY_HEADING, NUMERIC_HEADING, CATEGORICAL_HEADING]
    );
    let document = common::load_pdf(rendered.bytes());
    assert_eq!(common::page_image_sizes(&document, 2).first(), Some(&(800, 400)));
}

#[test]
fn output_is_a_pdf() {
    assert_eq!(REPORT_MIME_TYPE, "application/pdf");
    if common::skip_without_fonts("output_is_a_pdf") {
        return;
    }
    let bytes = generate_report(&common::age_city_dataset(), None, &[], &[]).expect("render");
    assert!(bytes.starts_with(b"%PDF"));
}
