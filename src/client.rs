//! Represents a client abstraction for the paywall calendar API.

mod api;

use crate::{
    error::{ClientBuilderError, ClientError, RequestError},
    meta::{Filter, Genre, Order},
    stdx::http::{DEFAULT_USER_AGENT, IFetch},
    webtoon::Webtoon,
};
use api::{RawListResponse, RawResultsResponse, RecentlyPaidQuery, SearchQuery};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// The API base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

/// The environment variable [`ClientBuilder::from_env()`] reads the API base URL from.
pub const BASE_URL_ENV: &str = "TODAYTOON_API_BASE_URL";

/// A builder for configuring and creating instances of [`Client`] with custom settings.
///
/// The `ClientBuilder` lets the API base URL and user agent be changed before the [`Client`] is built. It enables
/// a more controlled construction of the `Client` when the default configuration isn't sufficient.
///
/// # Example
///
/// ```
/// # use todaytoon::ClientBuilder;
/// let client = ClientBuilder::new()
///     .base_url("https://api.todaytoon.me/api")
///     .user_agent("custom-agent/1.0")
///     .build()?;
/// # Ok::<(), todaytoon::error::ClientBuilderError>(())
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    builder: reqwest::ClientBuilder,
    base_url: String,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    ///
    /// This includes a default user agent (`$CARGO_PKG_NAME/$CARGO_PKG_VERSION`) and [`DEFAULT_BASE_URL`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let builder = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .use_rustls_tls()
            .brotli(true);

        Self {
            builder,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// Creates a new `ClientBuilder`, taking the API base URL from the `TODAYTOON_API_BASE_URL` environment
    /// variable when it is set and not blank.
    ///
    /// # Example
    ///
    /// ```
    /// # use todaytoon::ClientBuilder;
    /// let client = ClientBuilder::from_env().build()?;
    /// # Ok::<(), todaytoon::error::ClientBuilderError>(())
    /// ```
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(base_url) if !base_url.trim().is_empty() => Self::new().base_url(base_url.trim()),
            _ => Self::new(),
        }
    }

    /// Sets the API base URL every endpoint path is appended to, e.g. `https://api.todaytoon.me/api`.
    ///
    /// The URL is validated on [`build()`](ClientBuilder::build()).
    #[inline]
    #[must_use]
    pub fn base_url(self, base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            ..self
        }
    }

    /// Sets a custom `User-Agent` header for the [`Client`].
    ///
    /// By default, the user agent is set to (`$CARGO_PKG_NAME/$CARGO_PKG_VERSION`), but this can be overridden using this method.
    ///
    /// # Example
    ///
    /// ```
    /// # use todaytoon::ClientBuilder;
    /// let builder = ClientBuilder::new().user_agent("custom-agent/1.0");
    /// ```
    #[inline]
    #[must_use]
    pub fn user_agent(self, user_agent: &str) -> Self {
        let builder = self.builder.user_agent(user_agent);
        Self { builder, ..self }
    }

    /// Consumes the `ClientBuilder` and returns a fully-configured [`Client`].
    ///
    /// # Errors
    ///
    /// - [`ClientBuilderError::InvalidBaseUrl`] if the base URL is not an absolute `http` or `https` URL.
    /// - [`ClientBuilderError::BuildFailed`] if the underlying HTTP client could not be built, such as when TLS
    ///   initialization fails.
    pub fn build(self) -> Result<Client, ClientBuilderError> {
        let url = Url::parse(&self.base_url).map_err(|_err| ClientBuilderError::InvalidBaseUrl)?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ClientBuilderError::InvalidBaseUrl);
        }

        Ok(Client {
            http: self
                .builder
                .build()
                .map_err(|_err| ClientBuilderError::BuildFailed)?,
            base: Arc::from(self.base_url.trim_end_matches('/')),
        })
    }
}

/// A high-level, asynchronous client for the paywall calendar API.
///
/// The `Client` is cheap to clone and internally manages connection pooling. It performs no retries and no caching:
/// every call is one `GET`, and every failure, be it transport, a non-success status, or an unexpected body, is
/// reported as [`ClientError::RequestFailed`]. Retry and caching live in [`query`](crate::query).
///
/// # Example
///
/// ```no_run
/// # use todaytoon::Client;
/// # #[tokio::main]
/// # async fn main() -> Result<(), todaytoon::error::ClientError> {
/// let client = Client::new();
///
/// for webtoon in client.to_be_paid().await? {
///     println!("{}", webtoon.title());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base: Arc<str>,
}

// Creation impls
impl Client {
    /// Instantiates a new [`Client`] against [`DEFAULT_BASE_URL`] with the default user agent.
    ///
    /// # Panics
    ///
    /// This function will panic if the TLS backend cannot be initialized. For a safer alternative that returns a
    /// `Result` instead of panicking, consider using the [`ClientBuilder`].
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        #[expect(
            clippy::expect_used,
            reason = "it is documented that this can panic and that `ClientBuilder` should be used instead for a `Result`"
        )]
        ClientBuilder::new().build().expect("Client::new()")
    }

    /// Creates a [`ClientBuilder`] for configuring a [`Client`].
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the API base URL, without a trailing `/`.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }
}

impl Default for Client {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

// Endpoints
impl Client {
    /// Fetches one page of the browse list.
    ///
    /// `GET {base}/list?genre=..&order=..&filter=..&page=..`
    pub async fn list(&self, query: &ListQuery) -> Result<ListPage, ClientError> {
        let url = self.endpoint("list");

        tracing::debug!(%url, genre = %query.genre, order = %query.order, filter = %query.filter, page = query.page, "fetching list page");

        let response: RawListResponse = self
            .http
            .get(&url)
            .query(query)
            .fetch()
            .json()
            .await
            .map_err(RequestError)?;

        Ok(response.data)
    }

    /// Searches webtoons by title.
    ///
    /// An empty or whitespace-only keyword returns an empty list without making a request.
    ///
    /// `GET {base}/list?search=..`
    pub async fn search(&self, keyword: &str) -> Result<Vec<Webtoon>, ClientError> {
        if keyword.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint("list");

        tracing::debug!(%url, keyword, "searching webtoons");

        let response: RawListResponse = self
            .http
            .get(&url)
            .query(&SearchQuery { search: keyword })
            .fetch()
            .json()
            .await
            .map_err(RequestError)?;

        Ok(response.data.results)
    }

    /// Fetches the webtoons going behind the paywall soon.
    ///
    /// `GET {base}/list/to-be-paid`
    pub async fn to_be_paid(&self) -> Result<Vec<Webtoon>, ClientError> {
        let url = self.endpoint("list/to-be-paid");

        tracing::debug!(%url, "fetching to-be-paid webtoons");

        let response: RawResultsResponse = self
            .http
            .get(&url)
            .fetch()
            .json()
            .await
            .map_err(RequestError)?;

        Ok(response.data.results)
    }

    /// Fetches a page of the webtoons that recently went behind the paywall. `page` is 1-based.
    ///
    /// An empty list means there are no more pages.
    ///
    /// `GET {base}/list/recently-paid?page=..`
    pub async fn recently_paid(&self, page: u32) -> Result<Vec<Webtoon>, ClientError> {
        let url = self.endpoint("list/recently-paid");

        tracing::debug!(%url, page, "fetching recently-paid webtoons");

        let response: RawResultsResponse = self
            .http
            .get(&url)
            .query(&RecentlyPaidQuery { page })
            .fetch()
            .json()
            .await
            .map_err(RequestError)?;

        Ok(response.data.results)
    }

    /// Fetches a single webtoon by id.
    ///
    /// An unknown id is answered by the API with a non-success status, and so is an error.
    ///
    /// `GET {base}/list/{id}`
    pub async fn webtoon(&self, id: u32) -> Result<Webtoon, ClientError> {
        let url = self.endpoint(&format!("list/{id}"));

        tracing::debug!(%url, id, "fetching webtoon");

        let webtoon = self
            .http
            .get(&url)
            .fetch()
            .json()
            .await
            .map_err(RequestError)?;

        Ok(webtoon)
    }
}

// Internal only impls
impl Client {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base)
    }
}

/// Query parameters of a browse list request.
///
/// Serialized as `genre`, `order`, `filter` (active filter slugs, comma-joined in toggle order, possibly empty),
/// and the 1-based `page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    genre: Genre,
    order: Order,
    filter: String,
    page: u32,
}

impl ListQuery {
    /// Creates the query for `page` of the list selected by `genre`, `order`, and the active `filters`.
    #[must_use]
    pub fn new(genre: Genre, order: Order, filters: &[Filter], page: u32) -> Self {
        let filter = filters
            .iter()
            .map(|filter| filter.as_slug())
            .collect::<Vec<_>>()
            .join(",");

        Self {
            genre,
            order,
            filter,
            page,
        }
    }

    /// Returns the requested page, 1-based.
    #[inline]
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Returns the `filter` parameter value.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// One page of a browse list: the total number of matching webtoons and this page's results.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ListPage {
    count: u32,
    #[serde(default)]
    results: Vec<Webtoon>,
}

impl ListPage {
    /// Creates a page out of a total `count` and the `results` it holds.
    #[must_use]
    pub fn new(count: u32, results: Vec<Webtoon>) -> Self {
        Self { count, results }
    }

    /// Returns how many webtoons match the query across every page.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns the webtoons on this page.
    #[inline]
    #[must_use]
    pub fn results(&self) -> &[Webtoon] {
        &self.results
    }
}
