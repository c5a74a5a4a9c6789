//! Derived per-area metrics.
//!
//! Single pass over the raw (untagged) rows that collects age-group,
//! tenure and education counts for every matched area column, followed
//! by a reduction to scalars: median age, owner/renter shares, and the
//! share of adults holding a bachelor's degree or higher. A missing or
//! zero denominator always yields `None`.

use std::collections::BTreeMap;

use census_profile_models::config::DominantCategory;
use census_profile_models::{AreaId, AreaSummary, Category, Level, RawRow, TaggedRow};

use crate::area_index::ResolvedColumn;
use crate::parsing::parse_count;

/// Age-group rows: `(label, lower bound, upper bound)`. The open-ended top
/// bracket is capped at 90.
const AGE_BRACKETS: &[(&str, u32, u32)] = &[
    ("0 to 14 years", 0, 14),
    ("15 to 24 years", 15, 24),
    ("25 to 54 years", 25, 54),
    ("55 to 64 years", 55, 64),
    ("65 years and over", 65, 90),
];

const TENURE_TOTAL_ANCHOR: &str = "total - private households by tenure";
const TENURE_OWNER: &str = "owner";
const TENURE_RENTER: &str = "renter";

const EDUCATION_TOTAL_ANCHOR: &str =
    "highest certificate, diploma or degree for the population aged 15 years and over";
const EDUCATION_BACHELORS: &str = "bachelor's degree or higher";

/// Count for one age bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeGroupCount {
    /// Lowest age in the bracket.
    pub lo: u32,
    /// Highest age in the bracket.
    pub hi: u32,
    /// Persons in the bracket.
    pub count: u64,
}

/// Household counts by tenure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenureCounts {
    /// All private households.
    pub total: Option<u64>,
    /// Owner-occupied households.
    pub owner: Option<u64>,
    /// Renter-occupied households.
    pub renter: Option<u64>,
}

/// Population aged 15+ by highest certificate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EducationCounts {
    /// Population aged 15 and over.
    pub total: Option<u64>,
    /// Holders of a bachelor's degree or higher.
    pub bachelors: Option<u64>,
}

/// Raw counts collected for one area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedAggregate {
    /// Age-group counts in row order.
    pub age_groups: Vec<AgeGroupCount>,
    /// Tenure counts.
    pub tenure: TenureCounts,
    /// Education counts.
    pub education: EducationCounts,
}

/// Where the scan is relative to a total/part row block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    /// Total row not seen yet.
    Waiting,
    /// Total row seen; collecting parts.
    Open,
    /// All parts seen; later matches are ignored.
    Closed,
}

/// What a raw row contributes to the aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowRole {
    AgeGroup { lo: u32, hi: u32 },
    TenureTotal,
    Owner,
    Renter,
    EducationTotal,
    Bachelors,
}

/// Lowercases and folds typographic apostrophes.
fn fold_label(label: &str) -> String {
    label.trim().to_lowercase().replace(['\u{2019}', '\u{2018}', '`'], "'")
}

/// Tracks the tenure and education windows across rows.
struct RowScanner {
    tenure: Window,
    education: Window,
    seen_brackets: [bool; AGE_BRACKETS.len()],
}

impl RowScanner {
    const fn new() -> Self {
        Self {
            tenure: Window::Waiting,
            education: Window::Waiting,
            seen_brackets: [false; AGE_BRACKETS.len()],
        }
    }

    /// Classifies the next row and advances the window states.
    fn next_role(&mut self, characteristic: &str) -> Option<RowRole> {
        let label = fold_label(characteristic);

        if let Some(position) = AGE_BRACKETS.iter().position(|(name, _, _)| *name == label) {
            // Age brackets repeat in the by-sex breakdowns; only the first
            // (total population) block counts.
            if self.seen_brackets[position] {
                return None;
            }
            self.seen_brackets[position] = true;
            let (_, lo, hi) = AGE_BRACKETS[position];
            return Some(RowRole::AgeGroup { lo, hi });
        }

        match self.tenure {
            Window::Waiting if label.starts_with(TENURE_TOTAL_ANCHOR) => {
                self.tenure = Window::Open;
                return Some(RowRole::TenureTotal);
            }
            Window::Open if label == TENURE_OWNER => return Some(RowRole::Owner),
            Window::Open if label == TENURE_RENTER => {
                self.tenure = Window::Closed;
                return Some(RowRole::Renter);
            }
            _ => {}
        }

        match self.education {
            Window::Waiting if label.contains(EDUCATION_TOTAL_ANCHOR) => {
                self.education = Window::Open;
                Some(RowRole::EducationTotal)
            }
            Window::Open if label == EDUCATION_BACHELORS => {
                self.education = Window::Closed;
                Some(RowRole::Bachelors)
            }
            _ => None,
        }
    }
}

/// Collects age, tenure and education counts for every matched column.
///
/// Areas are independent; every column gets an entry even if none of its
/// cells could be parsed.
#[must_use]
pub fn accumulate(
    rows: &[RawRow],
    columns: &[ResolvedColumn],
) -> BTreeMap<AreaId, DerivedAggregate> {
    let mut aggregates: BTreeMap<AreaId, DerivedAggregate> = columns
        .iter()
        .map(|column| (column.area_id, DerivedAggregate::default()))
        .collect();
    let mut scanner = RowScanner::new();

    for row in rows {
        let Some(role) = scanner.next_role(&row.characteristic) else {
            continue;
        };

        for column in columns {
            let count = parse_count(row.value(&column.label));
            let Some(aggregate) = aggregates.get_mut(&column.area_id) else {
                continue;
            };

            match role {
                RowRole::AgeGroup { lo, hi } => {
                    if let Some(count) = count {
                        aggregate.age_groups.push(AgeGroupCount { lo, hi, count });
                    }
                }
                RowRole::TenureTotal => aggregate.tenure.total = count,
                RowRole::Owner => aggregate.tenure.owner = count,
                RowRole::Renter => aggregate.tenure.renter = count,
                RowRole::EducationTotal => aggregate.education.total = count,
                RowRole::Bachelors => aggregate.education.bachelors = count,
            }
        }
    }

    aggregates
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Interpolates the median age from grouped counts.
///
/// Groups are sorted by lower bound; the bracket in which the running
/// total reaches half the population is interpolated linearly. Returns
/// `None` if the total is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn median_age(groups: &[AgeGroupCount]) -> Option<f64> {
    let mut sorted = groups.to_vec();
    sorted.sort_by_key(|group| group.lo);

    let total = sorted
        .iter()
        .map(|group| group.count)
        .fold(0, u64::saturating_add);
    if total == 0 {
        return None;
    }

    let half = total as f64 / 2.0;
    let mut cumulative = 0.0;
    for group in &sorted {
        let count = group.count as f64;
        if group.count > 0 && cumulative + count >= half {
            let fraction = (half - cumulative) / count;
            let span = f64::from(group.hi) - f64::from(group.lo);
            return Some(round1(f64::from(group.lo) + fraction * span));
        }
        cumulative += count;
    }

    None
}

/// `part / total * 100`, rounded to one decimal. `None` if either count
/// is missing or the total is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: Option<u64>, total: Option<u64>) -> Option<f64> {
    let total = total.filter(|&t| t > 0)?;
    let part = part?;
    Some(round1(part as f64 / total as f64 * 100.0))
}

/// Owner and renter shares of private households.
#[must_use]
pub fn tenure_shares(tenure: &TenureCounts) -> (Option<f64>, Option<f64>) {
    (
        percentage(tenure.owner, tenure.total),
        percentage(tenure.renter, tenure.total),
    )
}

/// Picks the largest subcategory of each requested category, per area.
///
/// Continent rows, and rows whose label contains one of that category's
/// `exclude_patterns` (lowercase), are aggregates and never win. Absent
/// counts are ignored; ties keep the earlier row.
#[must_use]
pub fn dominant_by_area(
    grouped: &BTreeMap<Category, Vec<TaggedRow>>,
    categories: &[DominantCategory],
    columns: &[ResolvedColumn],
) -> BTreeMap<AreaId, BTreeMap<Category, String>> {
    let mut dominant: BTreeMap<AreaId, BTreeMap<Category, String>> = BTreeMap::new();

    for DominantCategory {
        category,
        exclude_patterns,
    } in categories
    {
        let Some(rows) = grouped.get(category) else {
            continue;
        };
        let candidates: Vec<&TaggedRow> = rows
            .iter()
            .filter(|row| row.level != Level::Continent)
            .filter(|row| {
                let lower = row.subcategory.to_lowercase();
                !exclude_patterns.iter().any(|p| lower.contains(p.as_str()))
            })
            .collect();

        for column in columns {
            let mut best: Option<(&TaggedRow, u64)> = None;
            for &row in &candidates {
                let Some(count) = parse_count(row.value(&column.label)) else {
                    continue;
                };
                if best.is_none_or(|(_, best_count)| count > best_count) {
                    best = Some((row, count));
                }
            }
            if let Some((row, _)) = best {
                dominant
                    .entry(column.area_id)
                    .or_default()
                    .insert(*category, row.subcategory.clone());
            }
        }
    }

    dominant
}

/// Reduces aggregates to one [`AreaSummary`] per area.
#[must_use]
pub fn summarize(
    aggregates: &BTreeMap<AreaId, DerivedAggregate>,
    mut dominant: BTreeMap<AreaId, BTreeMap<Category, String>>,
    census_year: u16,
) -> Vec<AreaSummary> {
    aggregates
        .iter()
        .map(|(&area_id, aggregate)| {
            let (pct_owner_occupied, pct_renter_occupied) = tenure_shares(&aggregate.tenure);
            AreaSummary {
                area_id,
                census_year,
                median_age: median_age(&aggregate.age_groups),
                pct_owner_occupied,
                pct_renter_occupied,
                pct_bachelors_or_higher: percentage(
                    aggregate.education.bachelors,
                    aggregate.education.total,
                ),
                dominant: dominant.remove(&area_id).unwrap_or_default(),
            }
        })
        .collect()
}
