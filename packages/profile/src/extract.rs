//! End-to-end profile extraction.

use census_profile_models::config::ProfileConfig;
use census_profile_models::{AreaIdentity, AreaSummary, ExtractionReport, ProfileRecord, RawRow};

use crate::area_index::{build_name_index, resolve_columns};
use crate::derived::{accumulate, dominant_by_area, summarize};
use crate::emit::{RecordCollector, emit_category, policy_for};
use crate::progress::ProgressCallback;
use crate::sections::{AnchorClassifier, group_by_category, tag_rows};

/// Everything produced by one extraction run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileExtraction {
    /// Normalized records, unique by natural key.
    pub records: Vec<ProfileRecord>,
    /// One summary per matched area.
    pub summaries: Vec<AreaSummary>,
    /// Counts describing the run.
    pub report: ExtractionReport,
}

/// Extracts profile records and area summaries from one worksheet.
///
/// Column headers are resolved against `areas` once up front; unmatched
/// columns are reported and skipped. Tagging and the derived-metric pass
/// both read the same immutable `rows`. Emission reports one progress
/// step per category.
#[must_use]
pub fn extract_profile(
    rows: &[RawRow],
    areas: &[AreaIdentity],
    census_year: u16,
    config: &ProfileConfig,
    progress: &dyn ProgressCallback,
) -> ProfileExtraction {
    let index = build_name_index(areas);
    let resolution = resolve_columns(
        &index,
        rows.iter()
            .flat_map(|row| row.values.keys().map(String::as_str)),
    );
    let columns = &resolution.columns;
    log::info!(
        "Matched {} of {} area columns",
        columns.len(),
        columns.len() + resolution.unmatched.len()
    );

    let classifier = AnchorClassifier::new(&config.sections);
    let sections = tag_rows(rows, &classifier);
    let sections_detected = sections.headers.len();
    let tagged_rows = sections.rows.len();
    let grouped = group_by_category(sections.rows);

    let aggregates = accumulate(rows, columns);
    let dominant = dominant_by_area(&grouped, &config.derived.dominant, columns);
    let summaries = summarize(&aggregates, dominant, census_year);

    progress.set_total(grouped.len() as u64);
    let mut collector = RecordCollector::new(census_year);
    for (&category, category_rows) in &grouped {
        progress.set_message(format!("Emitting {category}"));
        let before = collector.len();
        emit_category(
            category_rows,
            columns,
            policy_for(category, config),
            &mut collector,
        );
        log::debug!(
            "{category}: {} rows -> {} records",
            category_rows.len(),
            collector.len() - before
        );
        progress.inc(1);
    }
    let outcome = collector.finish();

    let report = ExtractionReport {
        sections_detected,
        tagged_rows,
        records_emitted: outcome.records.len(),
        records_skipped: outcome.skipped,
        matched_areas: columns.len(),
        unmatched_labels: resolution.unmatched,
    };
    progress.finish(format!("Emitted {} records", report.records_emitted));

    log::info!(
        "Extraction complete: {} sections, {} tagged rows, {} records emitted, {} skipped, {} areas matched, {} unmatched",
        report.sections_detected,
        report.tagged_rows,
        report.records_emitted,
        report.records_skipped,
        report.matched_areas,
        report.unmatched_labels.len()
    );

    ProfileExtraction {
        records: outcome.records,
        summaries,
        report,
    }
}
