//! Area name matching.
//!
//! Census column headers name areas inconsistently ("St. James Town",
//! "St-James Town", "Danforth (Ward 14)"). This module builds a lookup
//! from name variants to canonical [`AreaId`]s and resolves arbitrary
//! labels through progressively looser strategies. Resolution is a
//! heuristic: `None` means "skip this column", never an error.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use census_profile_models::{AreaId, AreaIdentity};
use regex::Regex;

/// Trailing parenthetical qualifier, e.g. `" (Ward 14)"`.
static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("valid regex"));

/// Runs of whitespace.
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Qualifiers stripped from the end of canonical names.
const QUALIFIER_SUFFIXES: &[&str] = &[" neighbourhood", " area", "-"];

/// Number of leading characters compared by the fuzzy fallback.
const FUZZY_PREFIX_CHARS: usize = 10;

/// Normalizes an area name for comparison.
///
/// The pipeline:
/// 1. Lowercase
/// 2. Fold smart quotes, backticks and acute accents to `'`
/// 3. Fold hyphens and dashes to spaces
/// 4. Fold periods to spaces, so "St. James", "St.James" and "St James"
///    coincide
/// 5. Collapse whitespace and trim
#[must_use]
pub fn normalize_name(input: &str) -> String {
    let folded: String = input
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{00B4}' | '`' => '\'',
            '-' | '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '.' => ' ',
            other => other,
        })
        .collect();

    WHITESPACE_RE.replace_all(&folded, " ").trim().to_string()
}

/// Removes trailing qualifier suffixes (`" neighbourhood"`, `" area"`,
/// `"-"`) from a lowercased name. Returns `None` if nothing was removed.
fn strip_qualifiers(lower: &str) -> Option<String> {
    let mut current = lower.trim();
    loop {
        let stripped = QUALIFIER_SUFFIXES
            .iter()
            .find_map(|suffix| current.strip_suffix(suffix))
            .map(str::trim_end);
        match stripped {
            Some(next) if !next.is_empty() => current = next,
            _ => break,
        }
    }

    (current != lower.trim()).then(|| current.to_string())
}

/// Returns the first `n` characters of `s`.
fn char_prefix(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(idx, _)| &s[..idx])
}

/// Strategy that matched a label, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchStrategy {
    /// Lowercased label equals an indexed name.
    Exact,
    /// Normalized label equals an indexed name.
    Normalized,
    /// Matched after removing a trailing parenthetical.
    Parenthetical,
    /// First indexed key sharing a 10-character prefix.
    Prefix,
}

/// Lookup from area name variants to identifiers.
///
/// Variants are registered in priority tiers (exact names for every area,
/// then normalized names, then qualifier-stripped names). When two areas
/// produce the same variant, the first registration wins and the later
/// one is dropped, so a lower-tier variant never displaces a higher-tier
/// one.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: HashMap<String, AreaId>,
    /// Keys in registration order, scanned by the fuzzy fallback.
    keys: Vec<(String, AreaId)>,
}

impl NameIndex {
    /// Number of distinct name variants indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn register(&mut self, key: String, area_id: AreaId) {
        if key.is_empty() {
            return;
        }
        match self.entries.get(&key) {
            Some(&existing) if existing == area_id => {}
            Some(&existing) => {
                log::debug!(
                    "Name variant {key:?} already maps to area {existing}; ignoring area {area_id}"
                );
            }
            None => {
                self.entries.insert(key.clone(), area_id);
                self.keys.push((key, area_id));
            }
        }
    }

    fn lookup(&self, label: &str) -> Option<(AreaId, MatchStrategy)> {
        let exact = label.trim().to_lowercase();
        if let Some(&id) = self.entries.get(&exact) {
            return Some((id, MatchStrategy::Exact));
        }
        self.entries
            .get(&normalize_name(label))
            .map(|&id| (id, MatchStrategy::Normalized))
    }

    /// Resolves a free-text label to an area identifier.
    ///
    /// Tries, in order: exact lowercase match, normalized match, both again
    /// with a trailing parenthetical removed, and finally the first indexed
    /// key that shares a 10-character prefix with the label.
    #[must_use]
    pub fn resolve(&self, label: &str) -> Option<AreaId> {
        self.resolve_match(label).map(|(id, _)| id)
    }

    /// Like [`Self::resolve`], but also reports which strategy matched.
    #[must_use]
    pub fn resolve_match(&self, label: &str) -> Option<(AreaId, MatchStrategy)> {
        if let Some(found) = self.lookup(label) {
            return Some(found);
        }

        let trimmed = label.trim();
        let without_paren = PARENTHETICAL_RE.replace(trimmed, "");
        if without_paren != trimmed {
            if let Some((id, _)) = self.lookup(&without_paren) {
                return Some((id, MatchStrategy::Parenthetical));
            }
        }

        let probe = normalize_name(&without_paren);
        if probe.is_empty() {
            return None;
        }
        let probe_prefix = char_prefix(&probe, FUZZY_PREFIX_CHARS);

        self.keys
            .iter()
            .find(|(key, _)| {
                key.starts_with(probe_prefix)
                    || probe.starts_with(char_prefix(key, FUZZY_PREFIX_CHARS))
            })
            .map(|&(_, id)| (id, MatchStrategy::Prefix))
    }
}

/// Builds a [`NameIndex`] over the given areas.
#[must_use]
pub fn build_name_index(areas: &[AreaIdentity]) -> NameIndex {
    let mut index = NameIndex::default();

    for area in areas {
        index.register(area.area_name.trim().to_lowercase(), area.area_id);
    }
    for area in areas {
        index.register(normalize_name(&area.area_name), area.area_id);
    }
    for area in areas {
        if let Some(stripped) = strip_qualifiers(&area.area_name.to_lowercase()) {
            let normalized = normalize_name(&stripped);
            index.register(stripped, area.area_id);
            index.register(normalized, area.area_id);
        }
    }

    log::debug!(
        "Built name index: {} variants for {} areas",
        index.len(),
        areas.len()
    );

    index
}

/// A worksheet column matched to an area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// Column header as it appears in the worksheet.
    pub label: String,
    /// Matched area.
    pub area_id: AreaId,
}

/// Outcome of matching every worksheet column against the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnResolution {
    /// Matched columns, sorted by label. Each area appears at most once.
    pub columns: Vec<ResolvedColumn>,
    /// Labels no strategy could match.
    pub unmatched: Vec<String>,
}

/// Resolves every distinct column label once.
///
/// When several labels resolve to the same area, the strongest match keeps
/// it (exact before normalized before parenthetical before prefix), with
/// ties going to the label that sorts first. The others are dropped so each
/// area contributes a single column and record keys stay unique. Columns
/// are returned sorted by label.
#[must_use]
pub fn resolve_columns<'a>(
    index: &NameIndex,
    labels: impl IntoIterator<Item = &'a str>,
) -> ColumnResolution {
    let labels: BTreeSet<&str> = labels.into_iter().collect();
    let mut best: HashMap<AreaId, (MatchStrategy, &str)> = HashMap::new();
    let mut resolution = ColumnResolution::default();

    for label in labels {
        let Some((area_id, strategy)) = index.resolve_match(label) else {
            log::warn!("No area matches column {label:?}; skipping");
            resolution.unmatched.push(label.to_string());
            continue;
        };
        match best.get(&area_id) {
            Some(&(held, held_label)) if held <= strategy => {
                log::warn!(
                    "Column {label:?} ({strategy:?}) resolves to area {area_id}, \
                     already matched by {held_label:?} ({held:?}); skipping"
                );
            }
            Some(&(held, held_label)) => {
                log::warn!(
                    "Column {held_label:?} ({held:?}) for area {area_id} replaced by \
                     stronger match {label:?} ({strategy:?})"
                );
                best.insert(area_id, (strategy, label));
            }
            None => {
                best.insert(area_id, (strategy, label));
            }
        }
    }

    resolution.columns = best
        .into_iter()
        .map(|(area_id, (_, label))| ResolvedColumn {
            label: label.to_string(),
            area_id,
        })
        .collect();
    resolution.columns.sort_by(|a, b| a.label.cmp(&b.label));

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn areas() -> Vec<AreaIdentity> {
        vec![
            AreaIdentity::new(74, "St. James Town"),
            AreaIdentity::new(14, "Danforth East York"),
            AreaIdentity::new(95, "Annex"),
            AreaIdentity::new(26, "Downsview-Roding-CFB"),
            AreaIdentity::new(88, "High Park North"),
            AreaIdentity::new(90, "Junction Area"),
            AreaIdentity::new(115, "Mount Dennis neighbourhood"),
            AreaIdentity::new(100, "Yonge-Eglinton"),
            AreaIdentity::new(39, "Bedford Park-Nortown"),
            AreaIdentity::new(102, "Forest Hill North"),
        ]
    }

    #[test]
    fn normalizes_quotes_hyphens_and_periods() {
        assert_eq!(normalize_name("St. James Town"), "st james town");
        assert_eq!(normalize_name("St.James  Town"), "st james town");
        assert_eq!(normalize_name("St-James Town"), "st james town");
        assert_eq!(normalize_name("O\u{2019}Connor-Parkview"), "o'connor parkview");
        assert_eq!(normalize_name("O`Connor"), "o'connor");
    }

    #[test]
    fn strips_qualifier_suffixes() {
        assert_eq!(strip_qualifiers("junction area").as_deref(), Some("junction"));
        assert_eq!(
            strip_qualifiers("mount dennis neighbourhood").as_deref(),
            Some("mount dennis")
        );
        assert_eq!(strip_qualifiers("weston-").as_deref(), Some("weston"));
        assert_eq!(strip_qualifiers("annex"), None);
    }

    #[test]
    fn canonical_names_resolve_to_themselves() {
        let areas = areas();
        let index = build_name_index(&areas);
        for area in &areas {
            assert_eq!(
                index.resolve(&area.area_name),
                Some(area.area_id),
                "{}",
                area.area_name
            );
        }
    }

    #[test]
    fn punctuation_variants_resolve_to_same_area() {
        let index = build_name_index(&areas());
        assert_eq!(index.resolve("St. James Town"), Some(74));
        assert_eq!(index.resolve("St James Town"), Some(74));
        assert_eq!(index.resolve("St-James Town"), Some(74));
        assert_eq!(index.resolve("  ST. JAMES TOWN "), Some(74));
    }

    #[test]
    fn strips_parenthetical_suffix() {
        let index = build_name_index(&areas());
        assert_eq!(index.resolve("Danforth East York (Ward 14)"), Some(14));
        assert_eq!(index.resolve("Annex (95)"), Some(95));
    }

    #[test]
    fn matches_stripped_qualifiers() {
        let index = build_name_index(&areas());
        assert_eq!(index.resolve("Junction"), Some(90));
        assert_eq!(index.resolve("Mount Dennis"), Some(115));
    }

    #[test]
    fn falls_back_to_prefix_match() {
        let index = build_name_index(&areas());
        assert_eq!(index.resolve("Downsview Roding"), Some(26));
        assert_eq!(index.resolve("Bedford Park-Nortown-Lawrence"), Some(39));
    }

    #[test]
    fn unknown_labels_are_unresolved() {
        let index = build_name_index(&areas());
        assert_eq!(index.resolve("City of Toronto"), None);
        assert_eq!(index.resolve(""), None);
        assert_eq!(index.resolve("()"), None);
    }

    #[test]
    fn first_registered_area_wins_collisions() {
        let index = build_name_index(&[
            AreaIdentity::new(1, "Rosedale Area"),
            AreaIdentity::new(2, "Rosedale"),
        ]);
        // Exact names are registered before stripped variants.
        assert_eq!(index.resolve("Rosedale"), Some(2));
        assert_eq!(index.resolve("Rosedale Area"), Some(1));

        let index = build_name_index(&[
            AreaIdentity::new(1, "Weston"),
            AreaIdentity::new(2, "WESTON"),
        ]);
        assert_eq!(index.resolve("weston"), Some(1));
    }

    #[test]
    fn resolve_columns_reports_unmatched_and_duplicates() {
        let index = build_name_index(&areas());
        let resolution = resolve_columns(
            &index,
            ["St-James Town", "City of Toronto", "St. James Town", "Annex", "Annex"],
        );

        assert_eq!(
            resolution.columns,
            vec![
                ResolvedColumn {
                    label: "Annex".to_string(),
                    area_id: 95
                },
                ResolvedColumn {
                    label: "St. James Town".to_string(),
                    area_id: 74
                },
            ]
        );
        assert_eq!(resolution.unmatched, vec!["City of Toronto".to_string()]);
    }

    #[test]
    fn reports_match_strategy() {
        let index = build_name_index(&areas());
        assert_eq!(
            index.resolve_match("ST. JAMES TOWN"),
            Some((74, MatchStrategy::Exact))
        );
        assert_eq!(
            index.resolve_match("St-James Town"),
            Some((74, MatchStrategy::Normalized))
        );
        assert_eq!(
            index.resolve_match("Annex (95)"),
            Some((95, MatchStrategy::Parenthetical))
        );
        assert_eq!(
            index.resolve_match("Downsview Roding"),
            Some((26, MatchStrategy::Prefix))
        );
    }

    #[test]
    fn exact_column_keeps_area_over_prefix_match() {
        let index = build_name_index(&[AreaIdentity::new(7, "Lawrence Park South")]);
        let resolution = resolve_columns(&index, ["Lawrence Park South", "Lawrence Park North"]);

        assert_eq!(
            resolution.columns,
            vec![ResolvedColumn {
                label: "Lawrence Park South".to_string(),
                area_id: 7
            }]
        );
        assert!(resolution.unmatched.is_empty());
    }

    #[test]
    fn equal_strength_matches_keep_first_label() {
        let index = build_name_index(&[AreaIdentity::new(3, "Weston Village")]);
        let resolution = resolve_columns(&index, ["Weston-Village", "Weston Village."]);

        assert_eq!(resolution.columns.len(), 1);
        assert_eq!(resolution.columns[0].label, "Weston Village.");
    }
}
