//! Represents a webtoon as listed by the paywall calendar API.

pub mod calendar;

use crate::meta::{Genre, Platform};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Represents a webtoon with its paywall runs.
///
/// This type is not constructed directly, instead it is gotten through a [`Client`](crate::Client) via one of the
/// list endpoints or [`Client::webtoon()`](crate::Client::webtoon()).
///
/// Display values that depend on the current date, like the days left until the paywall, are not part of a
/// `Webtoon`. See [`CalendarEntry`](calendar::CalendarEntry) and [`Detail`](crate::detail::Detail).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Webtoon {
    id: u32,
    title: String,
    author: String,
    #[serde(default)]
    drawer: Option<String>,
    platform: Platform,
    #[serde(default)]
    origin_genre: String,
    #[serde(default)]
    zfind_genre: String,
    #[serde(default)]
    days: Option<String>,
    #[serde(default)]
    source_id: String,
    #[serde(default)]
    is_censored: bool,
    #[serde(flatten)]
    thumbnail: Thumbnail,
    #[serde(default)]
    description: String,
    #[serde(default)]
    simple_description: Option<String>,
    #[serde(default)]
    webtoon_url: String,
    #[serde(default)]
    webtoon_data: Vec<Run>,
}

impl Webtoon {
    /// Returns the id of this `Webtoon`.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the title of this `Webtoon`.
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the writer of this `Webtoon`.
    #[inline]
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the artist of this `Webtoon`, when credited separately from the writer.
    #[inline]
    #[must_use]
    pub fn drawer(&self) -> Option<&str> {
        self.drawer.as_deref().filter(|drawer| !drawer.is_empty())
    }

    /// Returns the credits as shown on the detail page: `author` or `author / drawer`.
    #[must_use]
    pub fn credits(&self) -> String {
        match self.drawer() {
            Some(drawer) => format!("{} / {drawer}", self.author),
            None => self.author.clone(),
        }
    }

    /// Returns the [`Platform`] the webtoon is serialized on.
    #[inline]
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Returns the genre as labeled by its platform.
    #[inline]
    #[must_use]
    pub fn origin_genre(&self) -> &str {
        &self.origin_genre
    }

    /// Returns the normalized [`Genre`], if it is one of the browsable ones.
    #[must_use]
    pub fn genre(&self) -> Option<Genre> {
        Genre::from_str(&self.zfind_genre).ok()
    }

    /// Returns the serialization days as given by the platform, e.g. `"월,목"`.
    #[inline]
    #[must_use]
    pub fn days(&self) -> Option<&str> {
        self.days.as_deref()
    }

    /// Returns the id of the webtoon on its platform.
    #[inline]
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Returns `true` if the webtoon is restricted to adult readers.
    #[inline]
    #[must_use]
    pub fn is_censored(&self) -> bool {
        self.is_censored
    }

    /// Returns the layered thumbnail.
    #[inline]
    #[must_use]
    pub fn thumbnail(&self) -> &Thumbnail {
        &self.thumbnail
    }

    /// Returns the long description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the one-line description, if any.
    #[inline]
    #[must_use]
    pub fn simple_description(&self) -> Option<&str> {
        self.simple_description.as_deref()
    }

    /// Returns the URL of the webtoon on its platform.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.webtoon_url
    }

    /// Returns every paywall run, current one first.
    #[inline]
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.webtoon_data
    }

    /// Returns the current paywall run.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<&Run> {
        self.webtoon_data.first()
    }
}

/// Represents one free-to-paid run of a webtoon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Run {
    #[serde(default)]
    like_count: Option<u64>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    paid_status: String,
    #[serde(default, deserialize_with = "crate::stdx::serde::optional_date")]
    paid_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "crate::stdx::serde::optional_timestamp")]
    published_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::stdx::serde::optional_timestamp")]
    ended_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::stdx::serde::optional_timestamp")]
    last_crawled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    series_count: u32,
    #[serde(default)]
    webtoon: u32,
}

impl Run {
    /// Returns the like count, if the platform exposes one.
    #[inline]
    #[must_use]
    pub fn likes(&self) -> Option<u64> {
        self.like_count
    }

    /// Returns the view count, if the platform exposes one.
    #[inline]
    #[must_use]
    pub fn views(&self) -> Option<u64> {
        self.view_count
    }

    /// Returns the rating, if the platform exposes one.
    #[inline]
    #[must_use]
    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    /// Returns `true` if the webtoon has finished serialization.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Returns the raw paid status text, e.g. `"NONE"` or `"무료"`.
    #[inline]
    #[must_use]
    pub fn paid_status(&self) -> &str {
        &self.paid_status
    }

    /// Returns the date the webtoon goes, or went, behind the paywall.
    #[inline]
    #[must_use]
    pub fn paid_date(&self) -> Option<NaiveDate> {
        self.paid_date
    }

    /// Returns when serialization started.
    #[inline]
    #[must_use]
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    /// Returns when serialization ended.
    #[inline]
    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Returns when the run was last crawled.
    #[inline]
    #[must_use]
    pub fn last_crawled_at(&self) -> Option<DateTime<Utc>> {
        self.last_crawled_at
    }

    /// Returns the total episode count.
    #[inline]
    #[must_use]
    pub fn episodes(&self) -> u32 {
        self.series_count
    }

    /// Returns the id of the webtoon this run belongs to.
    #[inline]
    #[must_use]
    pub fn webtoon_id(&self) -> u32 {
        self.webtoon
    }
}

/// Represents the layered thumbnail of a webtoon: up to three images drawn over a background color.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Thumbnail {
    #[serde(rename = "thumbnail_first_layer", default)]
    first: String,
    #[serde(rename = "thumbnail_second_layer", default)]
    second: Option<String>,
    #[serde(rename = "thumbnail_third_layer", default)]
    third: Option<String>,
    #[serde(rename = "thumbnail_bg_color", default)]
    background: Option<String>,
}

impl Thumbnail {
    /// Returns the non-empty image layers, bottom first.
    pub fn layers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.first.as_str())
            .chain(self.second.as_deref())
            .chain(self.third.as_deref())
            .filter(|layer| !layer.is_empty())
    }

    /// Returns the bottom image layer.
    #[inline]
    #[must_use]
    pub fn first(&self) -> &str {
        &self.first
    }

    /// Returns the background color as a CSS color value.
    ///
    /// The API stores this either as a declaration, `background-color:#f5e6d3`, or as the bare value. Only the value
    /// is returned, e.g. `#f5e6d3`.
    #[must_use]
    pub fn background(&self) -> Option<&str> {
        let raw = self.background.as_deref()?;

        let value = match raw.split_once(':') {
            Some((_, value)) => value,
            None => raw,
        };

        let value = value.trim().trim_end_matches(';').trim();

        (!value.is_empty()).then_some(value)
    }
}
