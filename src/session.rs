//! Persisting browse state across navigation.
//!
//! A browse view saves a [`Snapshot`] into a [`Storage`] when the user navigates away, and restores it on return
//! so the list, filters and scroll position come back without a network round trip.

use crate::{
    error::{EncodeError, SnapshotError},
    meta::{FilterState, Filters, Genre, Order},
    query::InfiniteData,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

/// A key/value store that lives as long as the session it belongs to.
pub trait Storage: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: Vec<u8>);
    /// Removes the value stored under `key`, if any.
    fn remove(&self, key: &str);
}

/// An in-process [`Storage`]. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage(Arc<RwLock<HashMap<String, Vec<u8>>>>);

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.0.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.0.write().insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.0.write().remove(key);
    }
}

/// A list view with its own snapshot slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// The genre list.
    Genre,
    /// The genre list reached from search.
    GenreSearch,
}

impl View {
    /// Returns the storage key the view's snapshot lives under.
    #[inline]
    #[must_use]
    pub const fn storage_key(&self) -> &'static str {
        match self {
            Self::Genre => "webtoonlist",
            Self::GenreSearch => "searchwebtoonlist",
        }
    }
}

/// Everything needed to put a browse view back the way it was left.
///
/// Stored as camelCase JSON:
///
/// ```json
/// {
///   "data": { "pages": [..], "pageParams": [1, 2] },
///   "scroll": 1840,
///   "order": "recent",
///   "genre": "fantasy",
///   "filters": [{ "title": "네이버 웹툰", "value": "naver", "isChecked": true }, ..],
///   "totalCount": 45,
///   "currentPage": 2
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Every page fetched for the saved key.
    pub data: InfiniteData,
    /// Scroll offset of the list, in pixels.
    pub scroll: u32,
    #[allow(missing_docs)]
    pub order: Order,
    #[allow(missing_docs)]
    pub genre: Genre,
    #[allow(missing_docs)]
    pub filters: Filters,
    /// Total count reported by the last page, `0` without pages.
    pub total_count: u32,
    /// Number of pages fetched.
    pub current_page: u32,
}

impl Snapshot {
    /// Returns the genre, order and filters the snapshot was taken with.
    #[must_use]
    pub fn filter_state(&self) -> FilterState {
        FilterState {
            genre: self.genre,
            order: self.order,
            filters: self.filters.clone(),
        }
    }

    /// Writes the snapshot into `view`'s slot, overwriting the previous one.
    pub fn save<S>(&self, storage: &S, view: View) -> Result<(), SnapshotError>
    where
        S: Storage + ?Sized,
    {
        let bytes = serde_json::to_vec(self).map_err(EncodeError)?;
        storage.set(view.storage_key(), bytes);

        tracing::debug!(
            key = view.storage_key(),
            pages = self.data.pages().len(),
            scroll = self.scroll,
            "saved browse snapshot"
        );

        Ok(())
    }

    /// Reads the snapshot in `view`'s slot.
    ///
    /// A missing record is `None`. So is a record that does not decode, or whose `totalCount` and `currentPage`
    /// disagree with its pages, after logging a warning; it is left in place for the next save to overwrite.
    pub fn load<S>(storage: &S, view: View) -> Option<Self>
    where
        S: Storage + ?Sized,
    {
        let bytes = storage.get(view.storage_key())?;

        let snapshot: Self = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(%error, key = view.storage_key(), "ignoring malformed browse snapshot");
                return None;
            }
        };

        if !snapshot.is_consistent() {
            tracing::warn!(
                key = view.storage_key(),
                total_count = snapshot.total_count,
                current_page = snapshot.current_page,
                pages = snapshot.data.pages().len(),
                "ignoring browse snapshot that disagrees with its pages"
            );
            return None;
        }

        Some(snapshot)
    }

    /// Checks the counters against the saved pages.
    fn is_consistent(&self) -> bool {
        let pages = self.data.pages();

        usize::try_from(self.current_page).is_ok_and(|current| current == pages.len())
            && self.data.page_params().len() == pages.len()
            && self.total_count == self.data.total_count().unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{client::ListPage, meta::Filter, webtoon::test::webtoon};
    use pretty_assertions::assert_eq;

    fn snapshot() -> Snapshot {
        Snapshot {
            data: InfiniteData::new(vec![ListPage::new(
                45,
                vec![webtoon(1, "NAVER", "2024-05-01", 10)],
            )]),
            scroll: 1840,
            order: Order::Savings,
            genre: Genre::Fantasy,
            filters: Filters::default().toggled(Filter::Naver),
            total_count: 45,
            current_page: 1,
        }
    }

    #[test]
    fn should_save_and_load_per_view() {
        let storage = MemoryStorage::new();
        let snapshot = snapshot();

        snapshot.save(&storage, View::GenreSearch).unwrap();

        assert_eq!(Some(snapshot), Snapshot::load(&storage, View::GenreSearch));
        assert_eq!(None, Snapshot::load(&storage, View::Genre));
    }

    #[test]
    fn should_store_camel_case_record() {
        let storage = MemoryStorage::new();
        snapshot().save(&storage, View::Genre).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&storage.get("webtoonlist").unwrap()).unwrap();

        assert_eq!(45, json["totalCount"]);
        assert_eq!(1, json["currentPage"]);
        assert_eq!("money", json["order"]);
        assert_eq!("fantasy", json["genre"]);
        assert_eq!(serde_json::json!([1]), json["data"]["pageParams"]);
        assert_eq!(true, json["filters"][0]["isChecked"]);
    }

    #[test]
    fn malformed_record_should_be_ignored_and_kept() {
        let storage = MemoryStorage::new();
        storage.set("webtoonlist", b"{\"data\":".to_vec());

        assert_eq!(None, Snapshot::load(&storage, View::Genre));
        assert!(storage.get("webtoonlist").is_some());
    }

    #[test]
    fn record_disagreeing_with_pages_should_be_ignored() {
        let storage = MemoryStorage::new();

        for (field, value) in [("currentPage", 3), ("totalCount", 20)] {
            let mut json = serde_json::to_value(snapshot()).unwrap();
            json[field] = serde_json::json!(value);
            storage.set("webtoonlist", serde_json::to_vec(&json).unwrap());

            assert_eq!(None, Snapshot::load(&storage, View::Genre), "{field}");
        }

        let mut json = serde_json::to_value(snapshot()).unwrap();
        json["data"]["pageParams"] = serde_json::json!([]);
        storage.set("webtoonlist", serde_json::to_vec(&json).unwrap());
        assert_eq!(None, Snapshot::load(&storage, View::Genre));
    }

    #[test]
    fn memory_storage_clones_should_share_entries() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();

        clone.set("key", vec![1]);
        assert_eq!(Some(vec![1]), storage.get("key"));

        storage.remove("key");
        assert_eq!(None, clone.get("key"));
    }
}
