//! Conversion of tagged rows into [`ProfileRecord`]s.
//!
//! Each category is emitted under one of three policies:
//!
//! * [`EmitPolicy::Standard`]: every row for every matched area.
//! * [`EmitPolicy::CityWideTopK`]: rank rows once by their total over all
//!   areas and keep the top `k` everywhere.
//! * [`EmitPolicy::PerAreaTopK`]: rank rows separately inside each area,
//!   always keeping the override labels and never the aggregate rows.
//!
//! Ranking only starts after every count of the category has been read,
//! and a record that fails validation is logged and skipped on its own.

use std::collections::{BTreeMap, HashSet};

use census_profile_models::config::{PerAreaTopK, ProfileConfig};
use census_profile_models::{AreaId, Category, NaturalKey, ProfileRecord, TaggedRow};

use crate::area_index::ResolvedColumn;
use crate::parsing::parse_count;

/// How a category's rows become records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitPolicy<'a> {
    /// Emit every row.
    Standard,
    /// Keep the `k` rows with the largest all-area totals.
    CityWideTopK {
        /// Number of rows kept.
        k: usize,
    },
    /// Keep the `k` largest rows of each area plus the override labels.
    PerAreaTopK(&'a PerAreaTopK),
}

/// Returns the policy configured for `category`.
#[must_use]
pub fn policy_for(category: Category, config: &ProfileConfig) -> EmitPolicy<'_> {
    if category == config.city_wide_top_k.category {
        EmitPolicy::CityWideTopK {
            k: config.city_wide_top_k.k,
        }
    } else if category == config.per_area_top_k.category {
        EmitPolicy::PerAreaTopK(&config.per_area_top_k)
    } else {
        EmitPolicy::Standard
    }
}

/// Records emitted for a batch, plus how many were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitOutcome {
    /// Valid records with unique natural keys.
    pub records: Vec<ProfileRecord>,
    /// Records dropped as invalid or duplicate.
    pub skipped: usize,
}

/// Validates and de-duplicates records as they are emitted.
#[derive(Debug)]
pub struct RecordCollector {
    census_year: u16,
    seen: HashSet<NaturalKey>,
    outcome: EmitOutcome,
}

impl RecordCollector {
    /// Creates an empty collector stamping `census_year` on every record.
    #[must_use]
    pub fn new(census_year: u16) -> Self {
        Self {
            census_year,
            seen: HashSet::new(),
            outcome: EmitOutcome::default(),
        }
    }

    fn push(&mut self, area_id: AreaId, row: &TaggedRow, count: Option<u64>) {
        let record = match ProfileRecord::new(
            area_id,
            self.census_year,
            row.category,
            row.subcategory.as_str(),
            row.level,
            count,
        ) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping record for area {area_id} ({:?}): {e}", row.subcategory);
                self.outcome.skipped += 1;
                return;
            }
        };

        if !self.seen.insert(record.natural_key()) {
            log::debug!(
                "Skipping duplicate {} row {:?} for area {area_id}",
                row.category,
                row.subcategory
            );
            self.outcome.skipped += 1;
            return;
        }

        self.outcome.records.push(record);
    }

    /// Number of records collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcome.records.len()
    }

    /// Whether no records have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcome.records.is_empty()
    }

    /// Consumes the collector.
    #[must_use]
    pub fn finish(self) -> EmitOutcome {
        self.outcome
    }
}

fn count_for(row: &TaggedRow, column: &ResolvedColumn) -> Option<u64> {
    parse_count(row.value(&column.label))
}

/// Emits every row for every matched area.
pub fn emit_standard(
    rows: &[TaggedRow],
    columns: &[ResolvedColumn],
    collector: &mut RecordCollector,
) {
    for row in rows {
        for column in columns {
            collector.push(column.area_id, row, count_for(row, column));
        }
    }
}

/// Emits only the `k` rows with the largest totals across all areas.
///
/// Absent counts add zero to a row's total but are stored as absent.
/// Totals saturate at `u64::MAX` instead of overflowing.
/// Equal totals keep row order (stable sort), which decides ties at the
/// cut-off.
pub fn emit_city_wide_top_k(
    rows: &[TaggedRow],
    columns: &[ResolvedColumn],
    k: usize,
    collector: &mut RecordCollector,
) {
    let mut totals: Vec<(usize, u64)> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let total = columns
                .iter()
                .filter_map(|column| count_for(row, column))
                .fold(0, u64::saturating_add);
            (index, total)
        })
        .collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1));

    let kept: HashSet<usize> = totals.iter().take(k).map(|&(index, _)| index).collect();
    log::debug!("City-wide top {k}: keeping {} of {} rows", kept.len(), rows.len());

    for (index, row) in rows.iter().enumerate() {
        if !kept.contains(&index) {
            continue;
        }
        for column in columns {
            collector.push(column.area_id, row, count_for(row, column));
        }
    }
}

/// Emits, for each area, its `k` largest ranked rows plus every
/// always-included row.
///
/// Labels exactly matching `always_include` (case-insensitive) are kept
/// regardless of count. Otherwise, labels containing a `skip_patterns`
/// entry are dropped. Remaining rows are ranked by the area's own count,
/// absent counting as zero, with ties keeping row order.
pub fn emit_per_area_top_k(
    rows: &[TaggedRow],
    columns: &[ResolvedColumn],
    policy: &PerAreaTopK,
    collector: &mut RecordCollector,
) {
    let mut always: Vec<usize> = Vec::new();
    let mut candidates: Vec<usize> = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let lower = row.subcategory.trim().to_lowercase();
        if policy.always_include.iter().any(|label| *label == lower) {
            always.push(index);
        } else if !policy
            .skip_patterns
            .iter()
            .any(|pattern| lower.contains(pattern.as_str()))
        {
            candidates.push(index);
        }
    }

    for column in columns {
        let mut ranked: Vec<(usize, u64)> = candidates
            .iter()
            .map(|&index| (index, count_for(&rows[index], column).unwrap_or(0)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let mut kept: Vec<usize> = always.clone();
        kept.extend(ranked.iter().take(policy.k).map(|&(index, _)| index));
        kept.sort_unstable();

        for index in kept {
            let row = &rows[index];
            collector.push(column.area_id, row, count_for(row, column));
        }
    }
}

/// Emits one category's rows under `policy`.
pub fn emit_category(
    rows: &[TaggedRow],
    columns: &[ResolvedColumn],
    policy: EmitPolicy<'_>,
    collector: &mut RecordCollector,
) {
    match policy {
        EmitPolicy::Standard => emit_standard(rows, columns, collector),
        EmitPolicy::CityWideTopK { k } => emit_city_wide_top_k(rows, columns, k, collector),
        EmitPolicy::PerAreaTopK(per_area) => {
            emit_per_area_top_k(rows, columns, per_area, collector);
        }
    }
}

/// Emits records for every category using its configured policy.
#[must_use]
pub fn emit(
    grouped: &BTreeMap<Category, Vec<TaggedRow>>,
    columns: &[ResolvedColumn],
    census_year: u16,
    config: &ProfileConfig,
) -> EmitOutcome {
    let mut collector = RecordCollector::new(census_year);
    for (&category, rows) in grouped {
        emit_category(rows, columns, policy_for(category, config), &mut collector);
    }
    collector.finish()
}
