//! Contains the metadata the paywall calendar browses by: platforms, genres, sort orders and filters.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// Represents the platform a webtoon is serialized on.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    /// `comic.naver.com`
    Naver,
    /// `page.kakao.com` and `webtoon.kakao.com`
    Kakao,
}

impl Platform {
    /// Converts a [`Platform`] into its lowercase slug.
    ///
    /// Example:
    /// - `Platform::Naver => "naver"`,
    /// - `Platform::Kakao => "kakao"`,
    #[inline]
    #[must_use]
    pub const fn as_slug(&self) -> &'static str {
        match self {
            Self::Naver => "naver",
            Self::Kakao => "kakao",
        }
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NAVER" | "naver" => Ok(Self::Naver),
            "KAKAO" | "kakao" => Ok(Self::Kakao),
            _ => bail!("`{s}` is not a valid platform. Expected one of `NAVER` or `KAKAO`"),
        }
    }
}

/// Represents a genre chip of the browse views.
///
/// The slugs are the values the API expects in the `genre` query parameter.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Genre {
    /// Every genre.
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "fantasy")]
    #[allow(missing_docs)]
    Fantasy,
    /// Romance, sent as `pure`.
    #[serde(rename = "pure")]
    Romance,
    /// Action and martial arts.
    #[serde(rename = "action")]
    Action,
    #[serde(rename = "drama")]
    #[allow(missing_docs)]
    Drama,
    /// Horror and thriller, sent as `thrill`.
    #[serde(rename = "thrill")]
    Thriller,
    /// Slice of life and comedy, sent as `daily`.
    #[serde(rename = "daily")]
    Daily,
}

impl Genre {
    /// Every genre in the order the chips are shown.
    pub const ALL: [Self; 7] = [
        Self::All,
        Self::Fantasy,
        Self::Romance,
        Self::Action,
        Self::Drama,
        Self::Thriller,
        Self::Daily,
    ];

    /// Converts a [`Genre`] into the slug used by the API.
    ///
    /// Example:
    /// - `Genre::Romance => "pure"`,
    /// - `Genre::Thriller => "thrill"`,
    #[inline]
    #[must_use]
    pub const fn as_slug(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Fantasy => "fantasy",
            Self::Romance => "pure",
            Self::Action => "action",
            Self::Drama => "drama",
            Self::Thriller => "thrill",
            Self::Daily => "daily",
        }
    }

    /// Returns the label shown on the genre chip.
    #[inline]
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::All => "전체",
            Self::Fantasy => "판타지",
            Self::Romance => "로맨스",
            Self::Action => "액션/무협",
            Self::Drama => "드라마",
            Self::Thriller => "공포/스릴러",
            Self::Daily => "일상/개그",
        }
    }
}

/// An error that can happen when parsing a string into a [`Genre`].
#[derive(Debug, Error)]
#[error("failed to parse `{0}` into a known genre")]
pub struct ParseGenreError(String);

impl FromStr for Genre {
    type Err = ParseGenreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "fantasy" => Ok(Self::Fantasy),
            "pure" | "romance" => Ok(Self::Romance),
            "action" => Ok(Self::Action),
            "drama" => Ok(Self::Drama),
            "thrill" | "thriller" => Ok(Self::Thriller),
            "daily" => Ok(Self::Daily),
            _ => Err(ParseGenreError(s.to_owned())),
        }
    }
}

impl Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

/// Represents sorting options for the browse views.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Most recently paywalled first.
    #[default]
    Recent,
    /// Least recently paywalled first.
    Old,
    /// Largest savings first, sent as `money`.
    #[serde(rename = "money")]
    Savings,
    /// Most liked first, sent as `like`.
    #[serde(rename = "like")]
    Likes,
}

impl Order {
    /// Every order in the order the select lists them.
    pub const ALL: [Self; 4] = [Self::Recent, Self::Old, Self::Savings, Self::Likes];

    /// Returns the value sent in the `order` query parameter.
    #[inline]
    #[must_use]
    pub const fn as_slug(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Old => "old",
            Self::Savings => "money",
            Self::Likes => "like",
        }
    }

    /// Returns the label shown in the order select.
    #[inline]
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Recent => "최신순",
            Self::Old => "오래된순",
            Self::Savings => "절약금액순",
            Self::Likes => "좋아요순",
        }
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

/// A single toggle of the filter sheet.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Only webtoons on Naver.
    Naver,
    /// Only webtoons on Kakao.
    Kakao,
    /// Only webtoons still being serialized.
    Updating,
    /// Only completed webtoons.
    Completed,
}

impl Filter {
    /// Every filter in the order the sheet lists them.
    pub const ALL: [Self; 4] = [Self::Naver, Self::Kakao, Self::Updating, Self::Completed];

    /// Returns the value sent, comma-joined, in the `filter` query parameter.
    #[inline]
    #[must_use]
    pub const fn as_slug(&self) -> &'static str {
        match self {
            Self::Naver => "naver",
            Self::Kakao => "kakao",
            Self::Updating => "updating",
            Self::Completed => "completed",
        }
    }

    /// Returns the label shown in the filter sheet.
    #[inline]
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Naver => "네이버 웹툰",
            Self::Kakao => "카카오 웹툰",
            Self::Updating => "연재작품",
            Self::Completed => "완결작품",
        }
    }
}

/// A filter and whether it is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "RawToggle", into = "RawToggle")]
pub struct Toggle {
    filter: Filter,
    checked: bool,
}

impl Toggle {
    /// Returns the filter this toggle is for.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Returns `true` if the filter is applied.
    #[inline]
    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

/// Stored shape of a [`Toggle`]: `{ "title": "네이버 웹툰", "value": "naver", "isChecked": false }`.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawToggle {
    #[serde(default)]
    title: String,
    value: Filter,
    is_checked: bool,
}

impl From<RawToggle> for Toggle {
    fn from(raw: RawToggle) -> Self {
        Self {
            filter: raw.value,
            checked: raw.is_checked,
        }
    }
}

impl From<Toggle> for RawToggle {
    fn from(toggle: Toggle) -> Self {
        Self {
            title: toggle.filter.label().to_owned(),
            value: toggle.filter,
            is_checked: toggle.checked,
        }
    }
}

/// The ordered, immutable list of filter toggles.
///
/// Toggling never mutates in place: [`toggled()`](Filters::toggled()) hands back a new list, so a value that
/// was already rendered or stored cannot change underneath its holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Filters(Vec<Toggle>);

impl Default for Filters {
    fn default() -> Self {
        Filter::ALL
            .into_iter()
            .map(|filter| Toggle {
                filter,
                checked: false,
            })
            .collect()
    }
}

impl FromIterator<Toggle> for Filters {
    fn from_iter<I: IntoIterator<Item = Toggle>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Filters {
    /// Returns a new list where `filter` is flipped. Filters not present in the list are appended as checked.
    #[must_use]
    pub fn toggled(&self, filter: Filter) -> Self {
        let mut toggles = self.0.to_vec();

        match toggles.iter_mut().find(|toggle| toggle.filter == filter) {
            Some(toggle) => toggle.checked = !toggle.checked,
            None => toggles.push(Toggle {
                filter,
                checked: true,
            }),
        }

        Self(toggles)
    }

    /// Returns `true` if `filter` is checked.
    #[must_use]
    pub fn is_checked(&self, filter: Filter) -> bool {
        self.0
            .iter()
            .any(|toggle| toggle.filter == filter && toggle.checked)
    }

    /// Returns every toggle in display order.
    #[must_use]
    pub fn toggles(&self) -> &[Toggle] {
        &self.0
    }

    /// Returns the checked filters in display order.
    pub fn active(&self) -> impl Iterator<Item = Filter> + '_ {
        self.0
            .iter()
            .filter(|toggle| toggle.checked)
            .map(|toggle| toggle.filter)
    }

    /// Returns the checked filters joined by commas, as sent in the `filter` query parameter.
    #[must_use]
    pub fn query_value(&self) -> String {
        self.active()
            .map(|filter| filter.as_slug())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Everything the user picked in a browse view: genre, order and filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
    /// Selected genre chip.
    pub genre: Genre,
    /// Selected sort order.
    pub order: Order,
    /// Filter sheet toggles.
    pub filters: Filters,
}

impl FilterState {
    /// Returns a copy with `genre` selected.
    #[must_use]
    pub fn with_genre(&self, genre: Genre) -> Self {
        Self {
            genre,
            ..self.clone()
        }
    }

    /// Returns a copy with `order` selected.
    #[must_use]
    pub fn with_order(&self, order: Order) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }

    /// Returns a copy with `filter` flipped.
    #[must_use]
    pub fn with_toggled(&self, filter: Filter) -> Self {
        Self {
            filters: self.filters.toggled(filter),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn should_parse_genres_from_str() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(Genre::Romance, Genre::from_str("pure")?);
        assert_eq!(Genre::Thriller, Genre::from_str("thrill")?);
        assert!(Genre::from_str("isekai").is_err());

        for genre in Genre::ALL {
            assert_eq!(genre, Genre::from_str(genre.as_slug())?);
        }

        Ok(())
    }

    #[test]
    fn should_parse_platform() -> anyhow::Result<()> {
        assert_eq!(Platform::Naver, Platform::from_str("NAVER")?);
        assert_eq!(Platform::Kakao, Platform::from_str("kakao")?);
        assert!(Platform::from_str("LEZHIN").is_err());
        Ok(())
    }

    #[test]
    fn toggling_should_leave_previous_value_unchanged() {
        let filters = Filters::default();
        let toggled = filters.toggled(Filter::Kakao);

        assert!(!filters.is_checked(Filter::Kakao));
        assert!(toggled.is_checked(Filter::Kakao));
        assert_eq!(filters, toggled.toggled(Filter::Kakao));
    }

    #[test]
    fn query_value_should_follow_display_order() {
        let filters = Filters::default()
            .toggled(Filter::Completed)
            .toggled(Filter::Naver);

        assert_eq!("naver,completed", filters.query_value());
        assert_eq!("", Filters::default().query_value());
    }

    #[test]
    fn filters_should_serialize_as_toggle_objects() -> Result<(), serde_json::Error> {
        let filters = Filters::default().toggled(Filter::Updating);
        let json = serde_json::to_value(&filters)?;

        assert_eq!(
            serde_json::json!([
                { "title": "네이버 웹툰", "value": "naver", "isChecked": false },
                { "title": "카카오 웹툰", "value": "kakao", "isChecked": false },
                { "title": "연재작품", "value": "updating", "isChecked": true },
                { "title": "완결작품", "value": "completed", "isChecked": false },
            ]),
            json
        );

        assert_eq!(filters, serde_json::from_value::<Filters>(json)?);

        Ok(())
    }

    #[test]
    fn order_should_serialize_as_api_value() -> Result<(), serde_json::Error> {
        for order in Order::ALL {
            assert_eq!(
                serde_json::Value::String(order.as_slug().to_owned()),
                serde_json::to_value(order)?
            );
        }
        Ok(())
    }
}
