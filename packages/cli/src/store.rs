//! In-memory upsert of profile records by natural key.

use std::collections::BTreeMap;

use census_profile_models::{NaturalKey, ProfileRecord};

/// Counts from an [`RecordStore::upsert_all`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    /// Records whose key was new.
    pub inserted: usize,
    /// Records that replaced an existing key.
    pub updated: usize,
}

/// Records keyed by `(area_id, census_year, category, subcategory, level)`.
///
/// Inserting a record whose key already exists replaces the stored
/// record, so re-running an extraction is idempotent.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: BTreeMap<NaturalKey, ProfileRecord>,
}

impl RecordStore {
    /// Inserts or replaces a record. Returns `true` if the key was new.
    pub fn upsert(&mut self, record: ProfileRecord) -> bool {
        self.records.insert(record.natural_key(), record).is_none()
    }

    /// Upserts every record.
    pub fn upsert_all(&mut self, records: impl IntoIterator<Item = ProfileRecord>) -> UpsertStats {
        let mut stats = UpsertStats::default();
        for record in records {
            if self.upsert(record) {
                stats.inserted += 1;
            } else {
                stats.updated += 1;
            }
        }
        stats
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Stored records in natural-key order.
    pub fn records(&self) -> impl Iterator<Item = &ProfileRecord> {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_profile_models::{Category, Level};

    fn record(area_id: i64, subcategory: &str, count: Option<u64>) -> ProfileRecord {
        ProfileRecord::new(
            area_id,
            2021,
            Category::Religion,
            subcategory,
            Level::None,
            count,
        )
        .unwrap()
    }

    #[test]
    fn upsert_replaces_existing_key() {
        let mut store = RecordStore::default();
        assert!(store.upsert(record(1, "Buddhist", Some(5))));
        assert!(!store.upsert(record(1, "Buddhist", None)));

        assert_eq!(store.len(), 1);
        assert_eq!(store.records().next().unwrap().count, None);
    }

    #[test]
    fn upsert_all_counts_inserts_and_updates() {
        let mut store = RecordStore::default();
        store.upsert_all([record(1, "Buddhist", Some(1)), record(2, "Buddhist", Some(2))]);
        let stats = store.upsert_all([record(1, "Buddhist", Some(3)), record(1, "Hindu", Some(4))]);

        assert_eq!(
            stats,
            UpsertStats {
                inserted: 1,
                updated: 1,
            }
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn records_iterate_in_key_order() {
        let mut store = RecordStore::default();
        store.upsert_all([
            record(2, "Hindu", None),
            record(1, "Jewish", None),
            record(1, "Hindu", None),
        ]);

        let keys: Vec<(i64, &str)> = store
            .records()
            .map(|r| (r.area_id, r.subcategory.as_str()))
            .collect();
        assert_eq!(keys, vec![(1, "Hindu"), (1, "Jewish"), (2, "Hindu")]);
    }
}
