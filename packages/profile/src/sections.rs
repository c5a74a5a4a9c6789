//! Section detection and row tagging.
//!
//! A census profile worksheet is one long list of rows with topical
//! blocks introduced by header rows such as
//! `"Total - Mother tongue for the total population - 100% data"`.
//! Tagging runs in two phases: find every header row with a
//! [`CategoryClassifier`], then slice the rows between headers into
//! [`TaggedRow`]s.

use std::collections::BTreeMap;

use census_profile_models::config::SectionDefinition;
use census_profile_models::{Category, Level, RawRow, TaggedRow};

/// Prefix of aggregate rows. Ends the final section and is never emitted.
const TOTAL_PREFIX: &str = "total -";

/// Bare subtotal label. Skipped without ending the section.
const TOTAL_LABEL: &str = "total";

/// Place-of-birth labels treated as continent aggregates.
const CONTINENTS: &[&str] = &["africa", "americas", "asia", "europe", "oceania"];

/// Decides whether a row label opens a section.
pub trait CategoryClassifier {
    /// Returns the category of the section opened by `lowercase_label`, or
    /// `None` if the row is not a section header.
    fn classify(&self, lowercase_label: &str) -> Option<Category>;
}

/// Classifies header rows by ordered substring anchors.
///
/// The first anchor contained in the label wins, so more specific anchors
/// must be listed before anchors they contain.
#[derive(Debug, Clone)]
pub struct AnchorClassifier {
    anchors: Vec<SectionDefinition>,
}

impl AnchorClassifier {
    /// Creates a classifier from section definitions. Anchors are
    /// lowercased; blank anchors are dropped.
    #[must_use]
    pub fn new(sections: &[SectionDefinition]) -> Self {
        let anchors = sections
            .iter()
            .map(|section| SectionDefinition {
                start_anchor: section.start_anchor.trim().to_lowercase(),
                category: section.category,
            })
            .filter(|section| !section.start_anchor.is_empty())
            .collect();

        Self { anchors }
    }
}

impl CategoryClassifier for AnchorClassifier {
    fn classify(&self, lowercase_label: &str) -> Option<Category> {
        self.anchors
            .iter()
            .find(|section| lowercase_label.contains(section.start_anchor.as_str()))
            .map(|section| section.category)
    }
}

/// A detected section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Index of the header row.
    pub index: usize,
    /// Category of the section it opens.
    pub category: Category,
}

fn is_total_row(label: &str) -> bool {
    label.trim_start().to_lowercase().starts_with(TOTAL_PREFIX)
}

/// Finds every section header, in row order.
pub fn detect_sections<C: CategoryClassifier + ?Sized>(
    rows: &[RawRow],
    classifier: &C,
) -> Vec<SectionHeader> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            classifier
                .classify(&row.characteristic.to_lowercase())
                .map(|category| SectionHeader { index, category })
        })
        .collect()
}

/// Determines the [`Level`] of a row within `category`.
///
/// For place-of-birth categories, the last `" - "` segment of the label is
/// compared against the continent names; anything else is a country.
/// Other categories have no level.
#[must_use]
pub fn classify_level(category: Category, subcategory: &str) -> Level {
    if !category.has_level() {
        return Level::None;
    }

    let last = subcategory
        .rsplit(" - ")
        .next()
        .unwrap_or(subcategory)
        .trim()
        .to_lowercase();

    if CONTINENTS.contains(&last.as_str()) {
        Level::Continent
    } else {
        Level::Country
    }
}

/// Slices rows into tagged rows using previously detected headers.
///
/// A section runs from its header to the next header. The final section
/// instead ends at the next row starting with `"total -"`, or at the end
/// of the input. Blank rows, `"total -"` rows and bare `"total"` rows are
/// never emitted.
#[must_use]
pub fn tag_sections(rows: &[RawRow], headers: &[SectionHeader]) -> Vec<TaggedRow> {
    let mut tagged = Vec::new();

    for (position, header) in headers.iter().enumerate() {
        let start = header.index + 1;
        let end = headers.get(position + 1).map_or_else(
            || {
                rows.iter()
                    .enumerate()
                    .skip(start)
                    .find(|(_, row)| is_total_row(&row.characteristic))
                    .map_or(rows.len(), |(index, _)| index)
            },
            |next| next.index,
        );

        for row in rows.get(start..end).unwrap_or_default() {
            let label = row.characteristic.trim();
            if label.is_empty() || is_total_row(label) || label.eq_ignore_ascii_case(TOTAL_LABEL) {
                continue;
            }

            tagged.push(TaggedRow {
                category: header.category,
                subcategory: label.to_string(),
                level: classify_level(header.category, label),
                values: row.values.clone(),
            });
        }
    }

    tagged
}

/// Output of [`tag_rows`]: the detected headers and the rows they tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggedSections {
    /// Section headers in row order.
    pub headers: Vec<SectionHeader>,
    /// Data rows tagged with their section's category.
    pub rows: Vec<TaggedRow>,
}

/// Tags every data row with the category of its enclosing section.
///
/// Returns no rows (and logs a warning) if no section header is found.
#[must_use]
pub fn tag_rows<C: CategoryClassifier + ?Sized>(
    rows: &[RawRow],
    classifier: &C,
) -> TaggedSections {
    let headers = detect_sections(rows, classifier);
    if headers.is_empty() {
        log::warn!("No section headers found in {} rows", rows.len());
        return TaggedSections::default();
    }

    let tagged = tag_sections(rows, &headers);
    TaggedSections {
        headers,
        rows: tagged,
    }
}

/// Groups tagged rows by category, preserving row order within each group.
#[must_use]
pub fn group_by_category(rows: Vec<TaggedRow>) -> BTreeMap<Category, Vec<TaggedRow>> {
    let mut grouped: BTreeMap<Category, Vec<TaggedRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.category).or_default().push(row);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str) -> RawRow {
        RawRow::new(label, [("Area A", "1")])
    }

    fn classifier() -> AnchorClassifier {
        AnchorClassifier::new(&[
            SectionDefinition {
                start_anchor: "Place of birth for the recent immigrant population".to_string(),
                category: Category::PlaceOfBirthRecent,
            },
            SectionDefinition {
                start_anchor: "place of birth".to_string(),
                category: Category::PlaceOfBirth,
            },
            SectionDefinition {
                start_anchor: "knowledge of official languages".to_string(),
                category: Category::OfficialLanguage,
            },
            SectionDefinition {
                start_anchor: "religion".to_string(),
                category: Category::Religion,
            },
        ])
    }

    fn labels(tagged: &[TaggedRow]) -> Vec<&str> {
        tagged.iter().map(|t| t.subcategory.as_str()).collect()
    }

    #[test]
    fn first_matching_anchor_wins() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("total - place of birth for the recent immigrant population"),
            Some(Category::PlaceOfBirthRecent)
        );
        assert_eq!(
            classifier.classify("total - place of birth for the immigrant population"),
            Some(Category::PlaceOfBirth)
        );
        assert_eq!(classifier.classify("english only"), None);
    }

    #[test]
    fn sections_end_at_next_header() {
        let rows = vec![
            row("Total - Knowledge of official languages for the total population"),
            row("English only"),
            row("French only"),
            row("Total - Religion for the population in private households"),
            row("Buddhist"),
        ];
        let sections = tag_rows(&rows, &classifier());
        assert_eq!(
            sections.headers,
            vec![
                SectionHeader {
                    index: 0,
                    category: Category::OfficialLanguage
                },
                SectionHeader {
                    index: 3,
                    category: Category::Religion
                },
            ]
        );
        let tagged = sections.rows;

        assert_eq!(labels(&tagged), vec!["English only", "French only", "Buddhist"]);
        assert_eq!(tagged[0].category, Category::OfficialLanguage);
        assert_eq!(tagged[1].category, Category::OfficialLanguage);
        assert_eq!(tagged[2].category, Category::Religion);
    }

    #[test]
    fn final_section_ends_at_total_row() {
        let rows = vec![
            row("Total - Religion for the population in private households"),
            row("Buddhist"),
            row("Christian"),
            row("Total - Generation status for the population in private households"),
            row("First generation"),
        ];
        let tagged = tag_rows(&rows, &classifier()).rows;
        assert_eq!(labels(&tagged), vec!["Buddhist", "Christian"]);
    }

    #[test]
    fn final_section_runs_to_end_without_total_row() {
        let rows = vec![
            row("Religion"),
            row("Buddhist"),
            row("Hindu"),
        ];
        let tagged = tag_rows(&rows, &classifier()).rows;
        assert_eq!(labels(&tagged), vec!["Buddhist", "Hindu"]);
    }

    #[test]
    fn never_emits_total_rows() {
        let rows = vec![
            row("Total - Knowledge of official languages"),
            row("English only"),
            row("TOTAL - English and French subtotal"),
            row("Total"),
            row(""),
            row("   "),
            row("French only"),
            row("Religion"),
            row("total"),
            row("Jewish"),
        ];
        let tagged = tag_rows(&rows, &classifier()).rows;

        assert_eq!(labels(&tagged), vec!["English only", "French only", "Jewish"]);
        assert!(
            tagged
                .iter()
                .all(|t| !t.subcategory.to_lowercase().starts_with("total -"))
        );
    }

    #[test]
    fn no_headers_yields_empty_result() {
        let rows = vec![row("English only"), row("French only")];
        assert_eq!(tag_rows(&rows, &classifier()), TaggedSections::default());
        assert!(tag_rows(&[], &classifier()).rows.is_empty());
    }

    #[test]
    fn place_of_birth_rows_get_levels() {
        let rows = vec![
            row("Total - Place of birth for the immigrant population"),
            row("Americas"),
            row("United States of America"),
            row("Asia"),
            row("Eastern Asia - China"),
            row("Other places of birth in Asia - Oceania"),
            row("Total - Place of birth for the recent immigrant population"),
            row("Europe"),
            row("Italy"),
            row("Knowledge of official languages"),
            row("English only"),
        ];
        let tagged = tag_rows(&rows, &classifier()).rows;
        let levels: Vec<(&str, Level)> = tagged
            .iter()
            .map(|t| (t.subcategory.as_str(), t.level))
            .collect();

        assert_eq!(
            levels,
            vec![
                ("Americas", Level::Continent),
                ("United States of America", Level::Country),
                ("Asia", Level::Continent),
                ("Eastern Asia - China", Level::Country),
                ("Other places of birth in Asia - Oceania", Level::Continent),
                ("Europe", Level::Continent),
                ("Italy", Level::Country),
                ("English only", Level::None),
            ]
        );
        for t in &tagged {
            assert_eq!(t.category.has_level(), t.level != Level::None);
        }
    }

    #[test]
    fn classify_level_ignores_non_birthplace_categories() {
        assert_eq!(classify_level(Category::Religion, "Asia"), Level::None);
        assert_eq!(classify_level(Category::PlaceOfBirth, " africa "), Level::Continent);
    }

    #[test]
    fn groups_preserve_row_order() {
        let rows = vec![
            row("Religion"),
            row("Buddhist"),
            row("Hindu"),
            row("Knowledge of official languages"),
            row("English only"),
        ];
        let grouped = group_by_category(tag_rows(&rows, &classifier()).rows);

        assert_eq!(grouped.len(), 2);
        assert_eq!(labels(&grouped[&Category::Religion]), vec!["Buddhist", "Hindu"]);
        assert_eq!(labels(&grouped[&Category::OfficialLanguage]), vec!["English only"]);
    }
}
