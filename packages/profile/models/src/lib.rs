#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census profile data model.
//!
//! Types shared by the profile extraction engine and its callers: the
//! closed set of topic categories, raw and tagged worksheet rows, the
//! normalized [`ProfileRecord`] output, and per-area derived summaries.
//! The TOML configuration schema lives in [`config`].

pub mod config;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Stable, externally assigned area identifier.
pub type AreaId = i64;

/// Topic category a profile row belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// Visible minority population groups
    VisibleMinority,
    /// Ethnic or cultural origin
    EthnicOrigin,
    /// First language learned at home and still understood
    MotherTongue,
    /// Knowledge of English and/or French
    OfficialLanguage,
    /// Language spoken most often at home
    HomeLanguage,
    /// Place of birth of the immigrant population
    PlaceOfBirth,
    /// Place of birth of the recent immigrant population
    PlaceOfBirthRecent,
    /// Religious affiliation
    Religion,
    /// Citizenship status
    Citizenship,
    /// Generation status (first, second, third or more)
    GenerationStatus,
}

impl Category {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::VisibleMinority,
            Self::EthnicOrigin,
            Self::MotherTongue,
            Self::OfficialLanguage,
            Self::HomeLanguage,
            Self::PlaceOfBirth,
            Self::PlaceOfBirthRecent,
            Self::Religion,
            Self::Citizenship,
            Self::GenerationStatus,
        ]
    }

    /// Whether rows of this category carry a continent/country [`Level`].
    #[must_use]
    pub const fn has_level(self) -> bool {
        matches!(self, Self::PlaceOfBirth | Self::PlaceOfBirthRecent)
    }
}

/// Geographic level of a place-of-birth row.
///
/// Only place-of-birth categories use [`Level::Continent`] and
/// [`Level::Country`]; every other category stores [`Level::None`],
/// whose string form is empty.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Level {
    /// No level (all non place-of-birth categories).
    #[default]
    #[serde(rename = "")]
    #[strum(serialize = "")]
    None,
    /// Continent aggregate row (e.g. "Asia").
    #[serde(rename = "continent")]
    #[strum(serialize = "continent")]
    Continent,
    /// Individual country row.
    #[serde(rename = "country")]
    #[strum(serialize = "country")]
    Country,
}

/// A canonical geographic area loaded from the boundary reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaIdentity {
    /// Stable area identifier.
    pub area_id: AreaId,
    /// Canonical display name.
    pub area_name: String,
}

impl AreaIdentity {
    /// Creates a new area identity.
    #[must_use]
    pub fn new(area_id: AreaId, area_name: impl Into<String>) -> Self {
        Self {
            area_id,
            area_name: area_name.into(),
        }
    }
}

/// One worksheet row as flattened by the spreadsheet reader.
///
/// `values` maps the free-text area column header to the raw cell text.
/// A missing key is equivalent to a blank cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// Row label. May be a section header, a data row, or a subtotal.
    pub characteristic: String,
    /// Raw cell text keyed by area column label.
    pub values: BTreeMap<String, String>,
}

impl RawRow {
    /// Creates a row from a label and `(column, value)` pairs.
    #[must_use]
    pub fn new<L, V>(
        characteristic: impl Into<String>,
        values: impl IntoIterator<Item = (L, V)>,
    ) -> Self
    where
        L: Into<String>,
        V: Into<String>,
    {
        Self {
            characteristic: characteristic.into(),
            values: values
                .into_iter()
                .map(|(label, value)| (label.into(), value.into()))
                .collect(),
        }
    }

    /// Returns the raw cell text for an area column, if present.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// A data row that survived section tagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRow {
    /// Enclosing section's category.
    pub category: Category,
    /// The row's own characteristic text.
    pub subcategory: String,
    /// Continent/country level for place-of-birth rows.
    pub level: Level,
    /// Raw cell text keyed by area column label.
    pub values: BTreeMap<String, String>,
}

impl TaggedRow {
    /// Returns the raw cell text for an area column, if present.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// Reasons a [`ProfileRecord`] can fail validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRecordError {
    /// The subcategory text was empty.
    #[error("empty subcategory for category {category}")]
    EmptySubcategory {
        /// Category of the rejected record.
        category: Category,
    },
    /// The level does not agree with the category.
    #[error("level {level:?} is not valid for category {category}")]
    LevelMismatch {
        /// Category of the rejected record.
        category: Category,
        /// Offending level.
        level: Level,
    },
}

/// Natural key of a [`ProfileRecord`]: `(area_id, census_year, category,
/// subcategory, level)`.
pub type NaturalKey = (AreaId, u16, Category, String, Level);

/// One normalized profile value for an area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Area identifier.
    pub area_id: AreaId,
    /// Census year stamped by the caller.
    pub census_year: u16,
    /// Topic category.
    pub category: Category,
    /// Row label within the category.
    pub subcategory: String,
    /// Continent/country level (place-of-birth only).
    pub level: Level,
    /// Count, or `None` when suppressed or blank at the source.
    pub count: Option<u64>,
}

impl ProfileRecord {
    /// Builds a record, enforcing the category/level/subcategory invariants.
    ///
    /// # Errors
    ///
    /// * [`InvalidRecordError::EmptySubcategory`] if `subcategory` is blank
    /// * [`InvalidRecordError::LevelMismatch`] if a place-of-birth category
    ///   has no level, or any other category has one
    pub fn new(
        area_id: AreaId,
        census_year: u16,
        category: Category,
        subcategory: impl Into<String>,
        level: Level,
        count: Option<u64>,
    ) -> Result<Self, InvalidRecordError> {
        let subcategory = subcategory.into();
        if subcategory.trim().is_empty() {
            return Err(InvalidRecordError::EmptySubcategory { category });
        }
        if category.has_level() == (level == Level::None) {
            return Err(InvalidRecordError::LevelMismatch { category, level });
        }

        Ok(Self {
            area_id,
            census_year,
            category,
            subcategory,
            level,
            count,
        })
    }

    /// Returns the upsert key for this record.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        (
            self.area_id,
            self.census_year,
            self.category,
            self.subcategory.clone(),
            self.level,
        )
    }
}

/// Derived scalar metrics for one area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSummary {
    /// Area identifier.
    pub area_id: AreaId,
    /// Census year stamped by the caller.
    pub census_year: u16,
    /// Median age interpolated from age-group counts.
    pub median_age: Option<f64>,
    /// Share of private households that are owner-occupied, in percent.
    pub pct_owner_occupied: Option<f64>,
    /// Share of private households that are renter-occupied, in percent.
    pub pct_renter_occupied: Option<f64>,
    /// Share of the population aged 15+ with a bachelor's degree or higher.
    pub pct_bachelors_or_higher: Option<f64>,
    /// Largest subcategory per configured category.
    pub dominant: BTreeMap<Category, String>,
}

/// Aggregate completion signal for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    /// Number of section headers detected.
    pub sections_detected: usize,
    /// Number of rows that survived tagging.
    pub tagged_rows: usize,
    /// Number of records emitted.
    pub records_emitted: usize,
    /// Number of records skipped as invalid or duplicate.
    pub records_skipped: usize,
    /// Number of area columns resolved to an identity.
    pub matched_areas: usize,
    /// Column labels that could not be resolved.
    pub unmatched_labels: Vec<String>,
}
