//! Request de-duplication, bounded retry, and caching on top of the [`Client`](crate::Client).
//!
//! [`InfiniteQuery`] drives the paginated browse lists. [`Query`] applies the same in-flight guard, retry policy,
//! and error retention to single-value requests, like the home lists.

pub mod infinite;

pub use infinite::{InfiniteData, InfiniteQuery, PageFetcher};

use crate::{
    client::ListQuery,
    error::ClientError,
    meta::{Filter, FilterState, Genre, Order},
    stdx::cache::Cache,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc, time::Duration};

/// Identifies one browse list: its genre, order, and active filters.
///
/// Two states that would send the same request share a key, so unchecked toggles play no part in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct QueryKey {
    genre: Genre,
    order: Order,
    filters: Vec<Filter>,
}

impl QueryKey {
    /// Creates a key out of a genre, an order, and the active filters in toggle order.
    pub fn new<I>(genre: Genre, order: Order, filters: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        Self {
            genre,
            order,
            filters: filters.into_iter().collect(),
        }
    }

    /// Returns the selected genre.
    #[inline]
    #[must_use]
    pub fn genre(&self) -> Genre {
        self.genre
    }

    /// Returns the selected order.
    #[inline]
    #[must_use]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Returns the active filters, in toggle order.
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the request parameters for `page` of this list.
    #[must_use]
    pub fn list_query(&self, page: u32) -> ListQuery {
        ListQuery::new(self.genre, self.order, &self.filters, page)
    }
}

impl From<&FilterState> for QueryKey {
    fn from(state: &FilterState) -> Self {
        Self::new(state.genre, state.order, state.filters.active())
    }
}

/// Tuning shared by every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How many webtoons the API puts on a full page.
    pub page_size: u32,
    /// How many times a failed request is retried before the error is kept.
    pub retries: u32,
    /// How long to wait before each retry.
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            retries: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// What became of a fetch.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The response was stored.
    Committed,
    /// Nothing was requested: a request for the same data was already in flight, or the data was already there.
    Skipped,
    /// Nothing was requested: there are no more pages.
    Exhausted,
    /// The response arrived after its key stopped being the active one and was thrown away.
    Stale,
    /// Every attempt failed. The error is also kept by the query until the next success.
    Failed(Arc<ClientError>),
}

impl Outcome {
    /// Returns `true` if the response was stored.
    #[inline]
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Returns the error, if every attempt failed.
    #[must_use]
    pub fn error(&self) -> Option<&Arc<ClientError>> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Runs `request`, retrying up to `options.retries` times with `options.retry_delay` between attempts.
pub(crate) async fn with_retry<T, F, Fut>(options: &QueryOptions, request: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    with_retry_while(options, || true, request).await
}

/// Like [`with_retry()`], but gives up on retrying, returning the last error, as soon as `wanted` is `false`.
///
/// `wanted` is checked before and after each delay, so a response nobody will use costs no further request.
pub(crate) async fn with_retry_while<T, W, F, Fut>(
    options: &QueryOptions,
    wanted: W,
    mut request: F,
) -> Result<T, ClientError>
where
    W: Fn() -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < options.retries && wanted() => {
                attempt += 1;
                tracing::warn!(%error, attempt, delay = ?options.retry_delay, "request failed, retrying");
                tokio::time::sleep(options.retry_delay).await;

                if !wanted() {
                    tracing::debug!("response no longer wanted, not retrying");
                    return Err(error);
                }
            }
            Err(error) => return Err(error),
        }
    }
}

#[derive(Debug, Default)]
struct Status {
    fetching: bool,
    error: Option<Arc<ClientError>>,
}

/// A cached, non-paginated request.
///
/// Only one fetch runs at a time; a fetch started while another is in flight is [`Outcome::Skipped`]. The last
/// error is kept until a later fetch succeeds, and the previous value stays available in the meantime.
#[derive(Debug)]
pub struct Query<T> {
    data: Cache<T>,
    status: Mutex<Status>,
    options: QueryOptions,
}

impl<T> Query<T>
where
    T: Clone,
{
    /// Creates an empty query.
    #[must_use]
    pub fn new(options: QueryOptions) -> Self {
        Self {
            data: Cache::empty(),
            status: Mutex::new(Status::default()),
            options,
        }
    }

    /// Returns the cached value, if any.
    #[must_use]
    pub fn data(&self) -> Option<T> {
        self.data.get().into_option()
    }

    /// Stores `value` as if it had been fetched.
    pub fn set_data(&self, value: T) {
        self.data.insert(value);
    }

    /// Returns `true` while a fetch is in flight.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.status.lock().fetching
    }

    /// Returns `true` while the first fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_fetching() && self.data.is_empty()
    }

    /// Returns the error of the last fetch, unless a later one succeeded.
    #[must_use]
    pub fn error(&self) -> Option<Arc<ClientError>> {
        self.status.lock().error.clone()
    }

    /// Fetches a new value with `request`, replacing the cached one.
    pub async fn fetch<F, Fut>(&self, request: F) -> Outcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        self.fetch_with(request, |_, value| value).await
    }

    /// Fetches with `request`, then stores what `merge` makes of the cached value, if any, and the response.
    pub async fn fetch_with<U, F, Fut, M>(&self, request: F, merge: M) -> Outcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<U, ClientError>>,
        M: FnOnce(Option<T>, U) -> T,
    {
        {
            let mut status = self.status.lock();
            if status.fetching {
                return Outcome::Skipped;
            }
            status.fetching = true;
        }

        let _in_flight = InFlight(&self.status);

        match with_retry(&self.options, request).await {
            Ok(value) => {
                self.data.update(|store| merge(store.into_option(), value));
                self.status.lock().error = None;
                Outcome::Committed
            }
            Err(error) => {
                tracing::warn!(%error, "request failed");
                let error = Arc::new(error);
                self.status.lock().error = Some(Arc::clone(&error));
                Outcome::Failed(error)
            }
        }
    }
}

/// Clears the in-flight flag once the fetch is over, including when its future is dropped midway.
struct InFlight<'a>(&'a Mutex<Status>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().fetching = false;
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::{error::RequestError, meta::Filters};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A `ClientError` without going over the network.
    pub(crate) async fn client_error() -> ClientError {
        let error = reqwest::Client::new()
            .get("http://[::1]:0/")
            .send()
            .await
            .unwrap_err();

        ClientError::RequestFailed(RequestError(error))
    }

    fn options() -> QueryOptions {
        QueryOptions {
            retry_delay: Duration::from_millis(10),
            ..QueryOptions::default()
        }
    }

    #[test]
    fn key_should_ignore_unchecked_toggles() {
        let state = FilterState {
            genre: Genre::Drama,
            order: Order::Likes,
            filters: Filters::default()
                .toggled(Filter::Completed)
                .toggled(Filter::Kakao),
        };

        let key = QueryKey::from(&state);

        assert_eq!(&[Filter::Kakao, Filter::Completed], key.filters());
        assert_eq!("kakao,completed", key.list_query(3).filter());
        assert_eq!(3, key.list_query(3).page());
    }

    #[tokio::test]
    async fn should_retry_once_then_keep_error() {
        let error = Arc::new(Mutex::new(Some(client_error().await)));
        let calls = AtomicU32::new(0);
        let query: Query<u32> = Query::new(options());

        let outcome = query
            .fetch(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                let error = Arc::clone(&error);
                async move {
                    match error.lock().take() {
                        Some(error) => Err(error),
                        None => Ok(7),
                    }
                }
            })
            .await;

        assert!(outcome.is_committed());
        assert_eq!(2, calls.load(Ordering::SeqCst));
        assert_eq!(Some(7), query.data());
        assert!(query.error().is_none());
    }

    #[tokio::test]
    async fn should_stop_retrying_once_response_is_unwanted() {
        let wanted = std::sync::atomic::AtomicBool::new(true);
        let calls = AtomicU32::new(0);

        let result: Result<u32, ClientError> = with_retry_while(
            &options(),
            || wanted.load(Ordering::SeqCst),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                wanted.store(false, Ordering::SeqCst);
                async { Err(client_error().await) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn should_surface_error_after_retries_run_out() {
        let query: Query<u32> = Query::new(options());
        query.set_data(1);

        let calls = AtomicU32::new(0);
        let outcome = query
            .fetch(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(client_error().await) }
            })
            .await;

        assert!(outcome.error().is_some());
        assert_eq!(2, calls.load(Ordering::SeqCst));
        assert!(query.error().is_some());
        assert!(!query.is_fetching());
        assert_eq!(Some(1), query.data());

        assert!(query.fetch(|| async { Ok(2) }).await.is_committed());
        assert!(query.error().is_none());
    }

    #[tokio::test]
    async fn should_skip_while_in_flight() {
        let query: Arc<Query<u32>> = Arc::new(Query::new(options()));
        let release = Arc::new(tokio::sync::Notify::new());

        let first = tokio::spawn({
            let query = Arc::clone(&query);
            let release = Arc::clone(&release);
            async move {
                query
                    .fetch(|| {
                        let release = Arc::clone(&release);
                        async move {
                            release.notified().await;
                            Ok(1)
                        }
                    })
                    .await
            }
        });

        tokio::task::yield_now().await;
        while !query.is_fetching() {
            tokio::task::yield_now().await;
        }
        assert!(query.is_loading());

        let second = query.fetch(|| async { Ok(2) }).await;
        assert!(matches!(second, Outcome::Skipped));

        release.notify_one();
        assert!(first.await.unwrap().is_committed());
        assert_eq!(Some(1), query.data());
    }

    #[tokio::test]
    async fn fetch_with_should_merge_into_previous_value() {
        let query: Query<Vec<u32>> = Query::new(options());

        for page in [vec![1, 2], vec![3]] {
            let outcome = query
                .fetch_with(
                    || {
                        let page = page.clone();
                        async move { Ok(page) }
                    },
                    |list, page| {
                        let mut list = list.unwrap_or_default();
                        list.extend(page);
                        list
                    },
                )
                .await;
            assert!(outcome.is_committed());
        }

        assert_eq!(Some(vec![1, 2, 3]), query.data());
    }
}
