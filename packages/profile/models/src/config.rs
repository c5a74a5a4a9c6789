//! Profile extraction configuration schema.
//!
//! Deserialized from TOML. Declares the ordered section anchors used to
//! tag rows and the parameters of the two top-K emission policies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Category;

/// Complete extraction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Ordered section anchors. The first anchor contained in a row's
    /// lowercased label wins.
    pub sections: Vec<SectionDefinition>,
    /// City-wide top-K policy.
    pub city_wide_top_k: CityWideTopK,
    /// Per-area top-K policy with always-included subcategories.
    pub per_area_top_k: PerAreaTopK,
    /// Derived-metric options.
    #[serde(default)]
    pub derived: DerivedConfig,
}

/// A section header anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDefinition {
    /// Substring that marks a section header row.
    pub start_anchor: String,
    /// Category assigned to the section's rows.
    pub category: Category,
}

/// Rank subcategories once by their all-area total and keep the top `k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityWideTopK {
    /// Category the policy applies to.
    pub category: Category,
    /// Number of subcategories kept.
    pub k: usize,
}

/// Rank subcategories independently within every area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerAreaTopK {
    /// Category the policy applies to.
    pub category: Category,
    /// Number of ranked subcategories kept per area.
    pub k: usize,
    /// Case-insensitive substrings marking aggregate rows that are never
    /// emitted.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// Case-insensitive exact labels that are always emitted.
    #[serde(default)]
    pub always_include: Vec<String>,
}

/// Derived-metric options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedConfig {
    /// Categories whose largest subcategory is reported per area.
    #[serde(default)]
    pub dominant: Vec<DominantCategory>,
}

/// A category whose largest subcategory is reported per area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominantCategory {
    /// Category to inspect.
    pub category: Category,
    /// Case-insensitive substrings marking aggregate rows of this category
    /// that never count as dominant.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Reasons a [`ProfileConfig`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No sections were declared.
    #[error("no sections defined")]
    NoSections,
    /// A section anchor was blank.
    #[error("section {index} ({category}) has an empty start anchor")]
    EmptyAnchor {
        /// Position in the section list.
        index: usize,
        /// Category of the offending section.
        category: Category,
    },
    /// A top-K policy keeps nothing.
    #[error("top-K for {category} must keep at least one subcategory")]
    ZeroK {
        /// Category of the offending policy.
        category: Category,
    },
    /// Both top-K policies target the same category.
    #[error("{category} cannot use both city-wide and per-area top-K")]
    ConflictingPolicies {
        /// Category named by both policies.
        category: Category,
    },
}

impl ProfileConfig {
    /// Checks the configuration for structural problems and lowercases
    /// anchors and match patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the section list is empty, an anchor is
    /// blank, a `k` is zero, or both policies name the same category.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.sections.is_empty() {
            return Err(ConfigError::NoSections);
        }

        for (index, section) in self.sections.iter_mut().enumerate() {
            section.start_anchor = section.start_anchor.trim().to_lowercase();
            if section.start_anchor.is_empty() {
                return Err(ConfigError::EmptyAnchor {
                    index,
                    category: section.category,
                });
            }
        }

        if self.city_wide_top_k.k == 0 {
            return Err(ConfigError::ZeroK {
                category: self.city_wide_top_k.category,
            });
        }
        if self.per_area_top_k.k == 0 {
            return Err(ConfigError::ZeroK {
                category: self.per_area_top_k.category,
            });
        }
        if self.city_wide_top_k.category == self.per_area_top_k.category {
            return Err(ConfigError::ConflictingPolicies {
                category: self.city_wide_top_k.category,
            });
        }

        let lower = |values: &mut Vec<String>| {
            for value in values.iter_mut() {
                *value = value.trim().to_lowercase();
            }
        };
        lower(&mut self.per_area_top_k.skip_patterns);
        lower(&mut self.per_area_top_k.always_include);
        for dominant in &mut self.derived.dominant {
            lower(&mut dominant.exclude_patterns);
        }

        Ok(self)
    }
}
