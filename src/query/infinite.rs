//! Paginated list caching for the browse views.

use super::{Outcome, QueryKey, QueryOptions, with_retry_while};
use crate::{
    client::{Client, ListPage},
    error::ClientError,
    stdx::math::MathExt,
    webtoon::Webtoon,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, future::Future, sync::Arc};

/// A source of list pages.
///
/// [`Client`] is the real one; anything else, like a canned fetcher in tests, can stand in for it.
pub trait PageFetcher: Send + Sync {
    /// Fetches `page`, 1-based, of the list identified by `key`.
    fn fetch_page(
        &self,
        key: &QueryKey,
        page: u32,
    ) -> impl Future<Output = Result<ListPage, ClientError>> + Send;
}

impl PageFetcher for Client {
    fn fetch_page(
        &self,
        key: &QueryKey,
        page: u32,
    ) -> impl Future<Output = Result<ListPage, ClientError>> + Send {
        let query = key.list_query(page);
        async move { self.list(&query).await }
    }
}

/// The pages fetched so far for one key, together with the page numbers that produced them.
///
/// Serialized as `{ "pages": [..], "pageParams": [..] }`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfiniteData {
    pages: Vec<ListPage>,
    #[serde(default)]
    page_params: Vec<u32>,
}

impl InfiniteData {
    /// Creates data out of pages fetched in order, starting at page 1.
    #[must_use]
    pub fn new(pages: Vec<ListPage>) -> Self {
        let page_params = (1..).take(pages.len()).collect();
        Self { pages, page_params }
    }

    /// Returns the pages in the order they were fetched.
    #[inline]
    #[must_use]
    pub fn pages(&self) -> &[ListPage] {
        &self.pages
    }

    /// Returns the page number each page was fetched with.
    #[inline]
    #[must_use]
    pub fn page_params(&self) -> &[u32] {
        &self.page_params
    }

    /// Returns every webtoon across the pages, in order.
    pub fn webtoons(&self) -> impl Iterator<Item = &Webtoon> {
        self.pages.iter().flat_map(|page| page.results())
    }

    /// Returns the total count reported by the most recent page.
    #[must_use]
    pub fn total_count(&self) -> Option<u32> {
        self.pages.last().map(ListPage::count)
    }

    /// Returns the page to request next, 1-based.
    #[must_use]
    pub fn next_page(&self) -> u32 {
        u32::try_from(self.pages.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }

    /// Returns `true` if fewer pages were fetched than the reported count fills at `page_size` per page.
    ///
    /// Always `false` without any page: the first page is not a "next" page.
    #[must_use]
    pub fn has_more(&self, page_size: u32) -> bool {
        match self.total_count() {
            Some(count) => self.next_page() <= count.buckets_of(page_size),
            None => false,
        }
    }

    fn push(&mut self, page: ListPage, param: u32) {
        self.pages.push(page);
        self.page_params.push(param);
    }
}

#[derive(Debug)]
struct Entry {
    key: QueryKey,
    data: InfiniteData,
    enabled: bool,
    error: Option<Arc<ClientError>>,
}

#[derive(Debug, Default)]
struct State {
    entry: Option<Entry>,
    /// The page being fetched for each key with a request in flight, active or not.
    in_flight: HashMap<QueryKey, u32>,
}

impl State {
    fn replace(&mut self, key: QueryKey, data: InfiniteData, enabled: bool) {
        self.entry = Some(Entry {
            key,
            data,
            enabled,
            error: None,
        });
    }

    /// Returns the active entry if a response for `page` of `key` belongs to it.
    fn current(&mut self, key: &QueryKey, page: u32) -> Option<&mut Entry> {
        self.entry
            .as_mut()
            .filter(|entry| entry.key == *key && entry.data.next_page() == page)
    }

    fn is_current(&self, key: &QueryKey, page: u32) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|entry| entry.key == *key && entry.data.next_page() == page)
    }

    fn is_fetching(&self, entry: &Entry) -> bool {
        self.in_flight.contains_key(&entry.key)
    }
}

/// A paginated list cache over a [`PageFetcher`].
///
/// Only one key is active at a time. Activating a different key throws away the pages of the previous one.
///
/// Every request is tagged with its key and page. There is at most one request in flight per key, even across
/// re-activations: switching away from a key and back while its request is pending picks that request up again
/// instead of sending a second one. A response is stored only if its key is active and its page is the next one;
/// anything else is discarded as [`Outcome::Stale`].
///
/// ```no_run
/// # use todaytoon::{Client, query::{InfiniteQuery, QueryKey, QueryOptions}, meta::{Genre, Order}};
/// # #[tokio::main]
/// # async fn main() {
/// let query = InfiniteQuery::new(Client::new(), QueryOptions::default());
///
/// query.activate(QueryKey::new(Genre::Fantasy, Order::Recent, []));
/// query.load().await;
///
/// while query.has_more() {
///     query.fetch_next().await;
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct InfiniteQuery<F> {
    fetcher: F,
    options: QueryOptions,
    state: Mutex<State>,
}

impl<F> InfiniteQuery<F>
where
    F: PageFetcher,
{
    /// Creates a query with no active key.
    pub fn new(fetcher: F, options: QueryOptions) -> Self {
        Self {
            fetcher,
            options,
            state: Mutex::new(State::default()),
        }
    }

    /// Returns the tuning this query was created with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Makes `key` the active key.
    ///
    /// Returns `false`, keeping everything, if `key` already is the active one. Otherwise the previous key's pages
    /// are dropped and the new key starts empty at page 1. A request still in flight for `key` from an earlier
    /// activation is kept rather than sent again; its response is stored if it is the page `key` needs next.
    pub fn activate(&self, key: QueryKey) -> bool {
        let mut state = self.state.lock();

        if state.entry.as_ref().is_some_and(|entry| entry.key == key) {
            return false;
        }

        match state.in_flight.get(&key) {
            Some(page) => tracing::debug!(?key, page, "activating query key with a request in flight"),
            None => tracing::debug!(?key, "activating query key"),
        }

        state.replace(key, InfiniteData::default(), true);
        true
    }

    /// Stores `data` under `key` as if it had been fetched, making `key` active.
    ///
    /// The automatic initial fetch is disabled for the seeded key: [`load()`](InfiniteQuery::load()) will not
    /// request page 1 again.
    pub fn set_query_data(&self, key: QueryKey, data: InfiniteData) {
        tracing::debug!(?key, pages = data.pages().len(), "seeding query data");
        self.state.lock().replace(key, data, false);
    }

    /// Returns the active key.
    #[must_use]
    pub fn key(&self) -> Option<QueryKey> {
        self.state.lock().entry.as_ref().map(|entry| entry.key.clone())
    }

    /// Returns a copy of the active key's pages.
    #[must_use]
    pub fn data(&self) -> InfiniteData {
        self.state
            .lock()
            .entry
            .as_ref()
            .map(|entry| entry.data.clone())
            .unwrap_or_default()
    }

    /// Returns every webtoon fetched so far for the active key.
    #[must_use]
    pub fn webtoons(&self) -> Vec<Webtoon> {
        self.state
            .lock()
            .entry
            .as_ref()
            .map(|entry| entry.data.webtoons().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the total count from the most recent page of the active key.
    #[must_use]
    pub fn total_count(&self) -> Option<u32> {
        self.state
            .lock()
            .entry
            .as_ref()
            .and_then(|entry| entry.data.total_count())
    }

    /// Returns `true` if the active key has pages left to fetch.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.state
            .lock()
            .entry
            .as_ref()
            .is_some_and(|entry| entry.data.has_more(self.options.page_size))
    }

    /// Returns `true` while a page of the active key is being fetched.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        let state = self.state.lock();
        state
            .entry
            .as_ref()
            .is_some_and(|entry| state.is_fetching(entry))
    }

    /// Returns `true` while the first page of the active key is being fetched.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        let state = self.state.lock();
        state
            .entry
            .as_ref()
            .is_some_and(|entry| state.is_fetching(entry) && entry.data.pages().is_empty())
    }

    /// Returns the error of the last fetch for the active key, unless a later one succeeded.
    #[must_use]
    pub fn error(&self) -> Option<Arc<ClientError>> {
        self.state
            .lock()
            .entry
            .as_ref()
            .and_then(|entry| entry.error.clone())
    }

    /// Fetches page 1 of the active key.
    ///
    /// [`Outcome::Skipped`] if there is no active key, the key already has pages or a request in flight, or it was
    /// seeded with [`set_query_data()`](InfiniteQuery::set_query_data()).
    pub async fn load(&self) -> Outcome {
        {
            let state = self.state.lock();
            let Some(entry) = state.entry.as_ref() else {
                return Outcome::Skipped;
            };

            if !entry.enabled || !entry.data.pages().is_empty() {
                return Outcome::Skipped;
            }
        }

        self.fetch(|_| Some(1)).await
    }

    /// Fetches the next page of the active key.
    ///
    /// Makes no request, returning [`Outcome::Exhausted`], when [`has_more()`](InfiniteQuery::has_more()) is
    /// `false`.
    pub async fn fetch_next(&self) -> Outcome {
        let page_size = self.options.page_size;

        self.fetch(|data| data.has_more(page_size).then(|| data.next_page()))
            .await
    }

    /// Fetches the page `page_of` picks for the active key's data; `None` means there is nothing to fetch.
    async fn fetch<P>(&self, page_of: P) -> Outcome
    where
        P: FnOnce(&InfiniteData) -> Option<u32>,
    {
        let (key, page) = {
            let mut state = self.state.lock();
            let Some(entry) = state.entry.as_ref() else {
                return Outcome::Skipped;
            };

            if state.is_fetching(entry) {
                return Outcome::Skipped;
            }

            let Some(page) = page_of(&entry.data) else {
                return Outcome::Exhausted;
            };

            let key = entry.key.clone();
            state.in_flight.insert(key.clone(), page);
            (key, page)
        };

        let _in_flight = InFlight {
            state: &self.state,
            key: key.clone(),
        };

        let result = with_retry_while(
            &self.options,
            || self.state.lock().is_current(&key, page),
            || self.fetcher.fetch_page(&key, page),
        )
        .await;

        let mut state = self.state.lock();
        let Some(entry) = state.current(&key, page) else {
            tracing::debug!(?key, page, "discarding stale page");
            return Outcome::Stale;
        };

        match result {
            Ok(list) => {
                entry.data.push(list, page);
                entry.error = None;
                Outcome::Committed
            }
            Err(error) => {
                tracing::warn!(%error, ?key, page, "failed to fetch page");
                let error = Arc::new(error);
                entry.error = Some(Arc::clone(&error));
                Outcome::Failed(error)
            }
        }
    }
}

/// Marks the request for `key` as over, including when its future is dropped midway.
struct InFlight<'a> {
    state: &'a Mutex<State>,
    key: QueryKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight.remove(&self.key);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        meta::{Filter, Genre, Order},
        query::test::client_error,
        webtoon::test::webtoon,
    };
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    fn page(count: u32, ids: std::ops::Range<u32>) -> ListPage {
        ListPage::new(
            count,
            ids.map(|id| webtoon(id, "NAVER", "2024-05-01", 10)).collect(),
        )
    }

    fn key() -> QueryKey {
        QueryKey::new(Genre::All, Order::Recent, [])
    }

    fn options() -> QueryOptions {
        QueryOptions {
            retry_delay: Duration::from_millis(1),
            ..QueryOptions::default()
        }
    }

    /// Serves `count` webtoons, 20 per page, and records every requested page.
    struct Catalog {
        count: u32,
        requests: Mutex<Vec<(QueryKey, u32)>>,
    }

    impl Catalog {
        fn new(count: u32) -> Self {
            Self {
                count,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requested_pages(&self) -> Vec<u32> {
            self.requests.lock().iter().map(|(_, page)| *page).collect()
        }
    }

    impl PageFetcher for Catalog {
        fn fetch_page(
            &self,
            key: &QueryKey,
            page: u32,
        ) -> impl Future<Output = Result<ListPage, ClientError>> + Send {
            self.requests.lock().push((key.clone(), page));
            let start = (page - 1) * 20;
            let end = (page * 20).min(self.count);
            let page = self::page(self.count, start..end);
            async move { Ok(page) }
        }
    }

    /// Fails the first `failures` requests, then serves a single full page.
    struct Flaky {
        failures: AtomicU32,
        calls: AtomicU32,
    }

    impl PageFetcher for Flaky {
        fn fetch_page(
            &self,
            _key: &QueryKey,
            _page: u32,
        ) -> impl Future<Output = Result<ListPage, ClientError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();

            async move {
                if fail {
                    Err(client_error().await)
                } else {
                    Ok(page(1, 0..1))
                }
            }
        }
    }

    /// Serves like the inner [`Catalog`], but holds every response until the gate is opened.
    struct Held {
        catalog: Catalog,
        gate: Arc<tokio::sync::Notify>,
    }

    impl PageFetcher for Held {
        fn fetch_page(
            &self,
            key: &QueryKey,
            page: u32,
        ) -> impl Future<Output = Result<ListPage, ClientError>> + Send {
            let response = self.catalog.fetch_page(key, page);
            let gate = Arc::clone(&self.gate);
            async move {
                gate.notified().await;
                response.await
            }
        }
    }

    #[tokio::test]
    async fn should_page_through_45_webtoons() {
        let query = InfiniteQuery::new(Catalog::new(45), options());
        query.activate(key());

        assert!(!query.has_more());
        assert!(query.load().await.is_committed());
        assert!(query.has_more());
        assert!(query.fetch_next().await.is_committed());
        assert!(query.has_more());
        assert!(query.fetch_next().await.is_committed());
        assert!(!query.has_more());

        assert!(matches!(query.fetch_next().await, Outcome::Exhausted));
        assert_eq!(vec![1, 2, 3], query.fetcher.requested_pages());
        assert_eq!(&[1, 2, 3], query.data().page_params());
        assert_eq!(45, query.webtoons().len());
        assert_eq!(Some(45), query.total_count());
    }

    #[tokio::test]
    async fn load_should_not_refetch_loaded_or_seeded_key() {
        let query = InfiniteQuery::new(Catalog::new(45), options());
        query.activate(key());

        assert!(query.load().await.is_committed());
        assert!(matches!(query.load().await, Outcome::Skipped));

        let seeded = QueryKey::new(Genre::Daily, Order::Old, [Filter::Kakao]);
        query.set_query_data(seeded.clone(), InfiniteData::default());
        assert!(matches!(query.load().await, Outcome::Skipped));
        assert!(!query.activate(seeded));

        assert_eq!(vec![1], query.fetcher.requested_pages());
    }

    #[tokio::test]
    async fn activating_a_new_key_should_restart_at_page_one() {
        let query = InfiniteQuery::new(Catalog::new(45), options());
        query.activate(key());
        query.load().await;
        query.fetch_next().await;

        let other = QueryKey::new(Genre::Action, Order::Recent, [Filter::Naver]);
        assert!(query.activate(other.clone()));
        assert!(query.webtoons().is_empty());
        assert_eq!(None, query.total_count());

        query.load().await;

        let requests = query.fetcher.requests.lock().clone();
        assert_eq!(Some(&(other, 1)), requests.last());
        assert_eq!(20, query.webtoons().len());
    }

    #[tokio::test]
    async fn should_retry_once_and_keep_error() {
        let query = InfiniteQuery::new(
            Flaky {
                failures: AtomicU32::new(2),
                calls: AtomicU32::new(0),
            },
            options(),
        );
        query.activate(key());

        assert!(query.load().await.error().is_some());
        assert_eq!(2, query.fetcher.calls.load(Ordering::SeqCst));
        assert!(query.error().is_some());
        assert!(!query.is_fetching());

        assert!(query.load().await.is_committed());
        assert!(query.error().is_none());
    }

    #[tokio::test]
    async fn late_response_for_old_key_should_be_stale() {
        struct Gated {
            gates: Mutex<VecDeque<Arc<tokio::sync::Notify>>>,
        }

        impl PageFetcher for Gated {
            fn fetch_page(
                &self,
                key: &QueryKey,
                _page: u32,
            ) -> impl Future<Output = Result<ListPage, ClientError>> + Send {
                let gate = self.gates.lock().pop_front();
                let count = u32::try_from(key.filters().len()).unwrap();
                async move {
                    if let Some(gate) = gate {
                        gate.notified().await;
                    }
                    Ok(page(count, 0..count))
                }
            }
        }

        let gate = Arc::new(tokio::sync::Notify::new());
        let query = Arc::new(InfiniteQuery::new(
            Gated {
                gates: Mutex::new(VecDeque::from([Arc::clone(&gate)])),
            },
            options(),
        ));

        query.activate(QueryKey::new(Genre::All, Order::Recent, [Filter::Naver]));
        let first = tokio::spawn({
            let query = Arc::clone(&query);
            async move { query.load().await }
        });

        while !query.is_fetching() {
            tokio::task::yield_now().await;
        }

        query.activate(QueryKey::new(
            Genre::All,
            Order::Recent,
            [Filter::Naver, Filter::Kakao],
        ));
        assert!(!query.is_fetching());
        assert!(query.load().await.is_committed());

        gate.notify_one();
        assert!(matches!(first.await.unwrap(), Outcome::Stale));

        assert_eq!(Some(2), query.total_count());
        assert_eq!(2, query.webtoons().len());
    }

    #[tokio::test]
    async fn switching_back_should_reuse_pending_request() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let catalog = Catalog::new(45);
        let query = Arc::new(InfiniteQuery::new(
            Held {
                catalog,
                gate: Arc::clone(&gate),
            },
            options(),
        ));

        let a = QueryKey::new(Genre::Fantasy, Order::Recent, [Filter::Naver]);
        let b = QueryKey::new(Genre::Drama, Order::Recent, []);

        query.activate(a.clone());
        let pending = tokio::spawn({
            let query = Arc::clone(&query);
            async move { query.load().await }
        });
        while !query.is_fetching() {
            tokio::task::yield_now().await;
        }

        query.activate(b);
        assert!(!query.is_fetching());

        query.activate(a.clone());
        assert!(query.is_fetching());
        assert!(query.is_loading());
        assert!(matches!(query.load().await, Outcome::Skipped));

        gate.notify_one();
        assert!(pending.await.unwrap().is_committed());

        assert_eq!(vec![(a, 1)], query.fetcher.catalog.requests.lock().clone());
        assert_eq!(20, query.webtoons().len());
        assert!(!query.is_fetching());
    }

    #[tokio::test]
    async fn should_not_retry_for_a_deactivated_key() {
        let query = Arc::new(InfiniteQuery::new(
            Flaky {
                failures: AtomicU32::new(2),
                calls: AtomicU32::new(0),
            },
            QueryOptions {
                retry_delay: Duration::from_millis(200),
                ..QueryOptions::default()
            },
        ));
        query.activate(key());

        let pending = tokio::spawn({
            let query = Arc::clone(&query);
            async move { query.load().await }
        });
        while query.fetcher.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        query.activate(QueryKey::new(Genre::Action, Order::Recent, []));

        assert!(matches!(pending.await.unwrap(), Outcome::Stale));
        assert_eq!(1, query.fetcher.calls.load(Ordering::SeqCst));
        assert!(query.error().is_none());
    }

    #[test]
    fn data_should_serialize_with_page_params() {
        let data = InfiniteData::new(vec![page(1, 0..0)]);

        assert_eq!(
            serde_json::json!({ "pages": [{ "count": 1, "results": [] }], "pageParams": [1] }),
            serde_json::to_value(&data).unwrap()
        );
    }

    proptest! {
        #[test]
        fn has_more_should_match_page_arithmetic(count in 0u32..500, fetched in 1usize..30, page_size in 1u32..50) {
            let data = InfiniteData::new((0..fetched).map(|_| page(count, 0..0)).collect());
            let pages = u32::try_from(fetched).unwrap();

            prop_assert_eq!(pages < count.div_ceil(page_size), data.has_more(page_size));
        }
    }
}
