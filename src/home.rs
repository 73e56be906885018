//! The home screen: the paywall calendar and the recently-paid list.

use crate::{
    client::Client,
    error::ClientError,
    query::{Outcome, Query, QueryOptions},
    webtoon::{
        Webtoon,
        calendar::{self, CalendarEntry, CalendarGroup},
    },
};
use chrono::NaiveDate;
use std::sync::Arc;

/// The recently-paid webtoons fetched so far.
#[derive(Debug, Clone, Default, PartialEq)]
struct RecentlyPaid {
    webtoons: Vec<Webtoon>,
    page: u32,
    exhausted: bool,
}

/// Data behind the home screen.
///
/// The to-be-paid list feeds the calendar and the slider; the recently-paid list grows a page at a time through
/// [`more_recently_paid()`](Home::more_recently_paid()) until the API answers with an empty page.
#[derive(Debug)]
pub struct Home {
    client: Client,
    to_be_paid: Query<Vec<Webtoon>>,
    recently_paid: Query<RecentlyPaid>,
}

impl Home {
    /// Creates an empty home screen backed by `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_options(client, QueryOptions::default())
    }

    /// Creates an empty home screen with custom query tuning.
    #[must_use]
    pub fn with_options(client: Client, options: QueryOptions) -> Self {
        Self {
            client,
            to_be_paid: Query::new(options),
            recently_paid: Query::new(options),
        }
    }

    /// Fetches the to-be-paid list and the first recently-paid page together.
    ///
    /// Returns the outcome of each, in that order.
    pub async fn load(&self) -> (Outcome, Outcome) {
        let to_be_paid = self.to_be_paid.fetch(|| self.client.to_be_paid());

        let recently_paid = self.recently_paid.fetch(|| async {
            let webtoons = self.client.recently_paid(1).await?;
            Ok::<_, ClientError>(RecentlyPaid {
                exhausted: webtoons.is_empty(),
                webtoons,
                page: 1,
            })
        });

        futures::join!(to_be_paid, recently_paid)
    }

    /// Fetches the next recently-paid page and appends it.
    ///
    /// Returns [`Outcome::Exhausted`] without a request once a page came back empty.
    pub async fn more_recently_paid(&self) -> Outcome {
        let current = self.recently_paid.data().unwrap_or_default();

        if current.exhausted {
            return Outcome::Exhausted;
        }

        let page = current.page + 1;

        self.recently_paid
            .fetch_with(
                || self.client.recently_paid(page),
                |previous, webtoons| {
                    let mut list = previous.unwrap_or_default();
                    list.exhausted = webtoons.is_empty();
                    list.webtoons.extend(webtoons);
                    list.page = page;
                    list
                },
            )
            .await
    }

    /// Returns the to-be-paid webtoons placed on the calendar as seen on `today`.
    #[must_use]
    pub fn calendar_entries(&self, today: NaiveDate) -> Vec<CalendarEntry> {
        calendar::entries(self.to_be_paid.data().unwrap_or_default(), today)
    }

    /// Returns the calendar as seen on `today`, grouped by paywall date.
    #[must_use]
    pub fn calendar(&self, today: NaiveDate) -> Vec<CalendarGroup> {
        calendar::group_by_paid_date(&self.calendar_entries(today))
    }

    /// Returns the slider picks as seen on `today`. See [`calendar::slider()`].
    #[must_use]
    pub fn slider(&self, today: NaiveDate, rng: &mut fastrand::Rng) -> Vec<CalendarEntry> {
        calendar::slider(&self.calendar_entries(today), rng)
    }

    /// Returns the recently-paid webtoons fetched so far.
    #[must_use]
    pub fn recently_paid(&self) -> Vec<Webtoon> {
        self.recently_paid
            .data()
            .map(|list| list.webtoons)
            .unwrap_or_default()
    }

    /// Returns `false` once a recently-paid page came back empty.
    #[must_use]
    pub fn has_more_recently_paid(&self) -> bool {
        self.recently_paid
            .data()
            .is_some_and(|list| !list.exhausted)
    }

    /// Returns `true` while either list is being fetched.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.to_be_paid.is_fetching() || self.recently_paid.is_fetching()
    }

    /// Returns the error of the last failed to-be-paid fetch.
    #[must_use]
    pub fn to_be_paid_error(&self) -> Option<Arc<ClientError>> {
        self.to_be_paid.error()
    }

    /// Returns the error of the last failed recently-paid fetch.
    #[must_use]
    pub fn recently_paid_error(&self) -> Option<Arc<ClientError>> {
        self.recently_paid.error()
    }
}
