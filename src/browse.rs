//! The infinite-scroll genre list: filter state, paged results, and session save/restore.

use crate::{
    error::{ClientError, SnapshotError},
    meta::{Filter, FilterState, Genre, Order},
    query::{InfiniteQuery, Outcome, PageFetcher, QueryKey, QueryOptions},
    scroll::LoadMore,
    session::{Snapshot, Storage, View},
    webtoon::Webtoon,
};
use parking_lot::Mutex;
use std::{future::Future, sync::Arc};

/// A browse list view.
///
/// Changing the genre, order, or filters switches the list to a new [`QueryKey`], dropping the pages of the
/// previous one; the next [`load()`](Browse::load()) starts again from page 1. Clones share the same state, so a
/// `Browse` can be handed to a [`ScrollTrigger`](crate::scroll::ScrollTrigger) and kept by the host at once.
///
/// # Example
///
/// ```no_run
/// # use todaytoon::{Client, browse::Browse, meta::{Filter, Genre}, session::{MemoryStorage, View}};
/// # #[tokio::main]
/// # async fn main() -> Result<(), todaytoon::error::SnapshotError> {
/// let storage = MemoryStorage::new();
/// let browse = Browse::new(Client::new(), View::Genre);
///
/// browse.select_genre(Genre::Fantasy);
/// browse.toggle_filter(Filter::Completed);
/// browse.load().await;
///
/// browse.save(&storage, 1840)?;
///
/// let returned = Browse::new(Client::new(), View::Genre);
/// assert_eq!(Some(1840), returned.restore(&storage));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Browse<F> {
    inner: Arc<Inner<F>>,
}

#[derive(Debug)]
struct Inner<F> {
    view: View,
    state: Mutex<FilterState>,
    query: InfiniteQuery<F>,
}

impl<F> Clone for Browse<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F> Browse<F>
where
    F: PageFetcher,
{
    /// Creates a view showing every genre, most recent first, with no filter applied.
    pub fn new(fetcher: F, view: View) -> Self {
        Self::with_options(fetcher, view, QueryOptions::default())
    }

    /// Creates a view with custom query tuning.
    pub fn with_options(fetcher: F, view: View, options: QueryOptions) -> Self {
        let state = FilterState::default();
        let query = InfiniteQuery::new(fetcher, options);
        query.activate(QueryKey::from(&state));

        Self {
            inner: Arc::new(Inner {
                view,
                state: Mutex::new(state),
                query,
            }),
        }
    }

    /// Returns which snapshot slot this view saves to.
    #[inline]
    #[must_use]
    pub fn view(&self) -> View {
        self.inner.view
    }

    /// Returns the current genre, order and filters.
    #[must_use]
    pub fn filter_state(&self) -> FilterState {
        self.inner.state.lock().clone()
    }

    /// Selects `genre`.
    pub fn select_genre(&self, genre: Genre) {
        self.update(|state| state.with_genre(genre));
    }

    /// Selects `order`.
    pub fn select_order(&self, order: Order) {
        self.update(|state| state.with_order(order));
    }

    /// Flips `filter`.
    pub fn toggle_filter(&self, filter: Filter) {
        self.update(|state| state.with_toggled(filter));
    }

    /// Fetches the first page of the current list, unless it is already there.
    pub async fn load(&self) -> Outcome {
        self.inner.query.load().await
    }

    /// Fetches the next page of the current list. Makes no request when there are no more pages.
    pub async fn fetch_next(&self) -> Outcome {
        self.inner.query.fetch_next().await
    }

    /// Returns every webtoon fetched so far, in page order.
    #[must_use]
    pub fn webtoons(&self) -> Vec<Webtoon> {
        self.inner.query.webtoons()
    }

    /// Returns how many webtoons match the current list, `0` until the first page arrives.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.inner.query.total_count().unwrap_or_default()
    }

    /// Returns `true` if there are pages left to fetch.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.inner.query.has_more()
    }

    /// Returns `true` while the first page is being fetched.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.query.is_loading()
    }

    /// Returns `true` while any page is being fetched.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.inner.query.is_fetching()
    }

    /// Returns the error of the last failed fetch, until a fetch succeeds.
    #[must_use]
    pub fn error(&self) -> Option<Arc<ClientError>> {
        self.inner.query.error()
    }

    /// Saves the filters, every fetched page, and the `scroll` offset into this view's slot.
    pub fn save<S>(&self, storage: &S, scroll: u32) -> Result<(), SnapshotError>
    where
        S: Storage + ?Sized,
    {
        let state = self.filter_state();
        let data = self.inner.query.data();

        let snapshot = Snapshot {
            total_count: data.total_count().unwrap_or_default(),
            current_page: u32::try_from(data.pages().len()).unwrap_or(u32::MAX),
            data,
            scroll,
            order: state.order,
            genre: state.genre,
            filters: state.filters,
        };

        snapshot.save(storage, self.inner.view)
    }

    /// Restores this view from its slot, returning the scroll offset for the host to apply.
    ///
    /// The saved pages are put back under the saved key before any request, and [`load()`](Browse::load()) will not
    /// fetch them again. A snapshot taken before the first page arrived only brings back the filters, leaving
    /// `load()` to fetch page 1. A missing or malformed record leaves the view untouched and returns `None`. The
    /// record is never removed, so restoring twice gives the same state.
    pub fn restore<S>(&self, storage: &S) -> Option<u32>
    where
        S: Storage + ?Sized,
    {
        let snapshot = Snapshot::load(storage, self.inner.view)?;
        let state = snapshot.filter_state();
        let key = QueryKey::from(&state);

        let mut current = self.inner.state.lock();
        if snapshot.data.pages().is_empty() {
            self.inner.query.activate(key);
        } else {
            self.inner.query.set_query_data(key, snapshot.data);
        }
        *current = state;

        tracing::debug!(view = ?self.inner.view, scroll = snapshot.scroll, "restored browse snapshot");

        Some(snapshot.scroll)
    }

    fn update<U>(&self, update: U)
    where
        U: FnOnce(&FilterState) -> FilterState,
    {
        let mut state = self.inner.state.lock();
        let next = update(&state);

        if self.inner.query.activate(QueryKey::from(&next)) {
            tracing::debug!(genre = %next.genre, order = %next.order, filter = %next.filters.query_value(), "browse filters changed");
        }

        *state = next;
    }
}

impl<F> LoadMore for Browse<F>
where
    F: PageFetcher + 'static,
{
    fn has_more(&self) -> bool {
        Browse::has_more(self)
    }

    fn is_fetching(&self) -> bool {
        Browse::is_fetching(self)
    }

    fn fetch_next(&self) -> impl Future<Output = Outcome> + Send {
        Browse::fetch_next(self)
    }
}
