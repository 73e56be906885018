//! The per-webtoon detail view.

use crate::{client::Client, error::ClientError, meta::Platform, webtoon::Webtoon};
use chrono::NaiveDate;

/// What reading one episode before the paywall saves, in won.
pub const SAVINGS_PER_EPISODE: u32 = 100;

/// Base of every share link.
pub const SHARE_BASE_URL: &str = "https://todaytoon.me";

/// The reader age a webtoon is rated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeRating {
    /// Open to every reader.
    All,
    /// Adults only, as rated by Naver.
    Over18,
    /// Adults only, as rated by Kakao.
    Over19,
}

impl AgeRating {
    /// Returns the rating label, e.g. `만 18세 이상`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::All => "전체연령가",
            Self::Over18 => "만 18세 이상",
            Self::Over19 => "만 19세 이상",
        }
    }
}

/// Whether a webtoon is still being serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    #[allow(missing_docs)]
    Ongoing,
    #[allow(missing_docs)]
    Completed,
}

impl Status {
    /// Returns the status label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ongoing => "연재중",
            Self::Completed => "완결",
        }
    }
}

/// A webtoon as shown on its detail page on a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    webtoon: Webtoon,
    days_until_paywall: Option<i64>,
}

impl Detail {
    /// Fetches webtoon `id` and lays it out as seen on `today`.
    ///
    /// # Errors
    ///
    /// Any failed request, including an unknown `id`, is a [`ClientError::RequestFailed`].
    pub async fn fetch(client: &Client, id: u32, today: NaiveDate) -> Result<Self, ClientError> {
        let webtoon = client.webtoon(id).await?;
        Ok(Self::new(webtoon, today))
    }

    /// Lays out `webtoon` as seen on `today`.
    #[must_use]
    pub fn new(webtoon: Webtoon, today: NaiveDate) -> Self {
        let days_until_paywall = webtoon
            .current()
            .and_then(|run| run.paid_date())
            .map(|paid_date| (paid_date - today).num_days());

        Self {
            webtoon,
            days_until_paywall,
        }
    }

    /// Returns the webtoon.
    #[inline]
    #[must_use]
    pub fn webtoon(&self) -> &Webtoon {
        &self.webtoon
    }

    /// Returns how many days are left until the paywall, negative once it passed.
    #[inline]
    #[must_use]
    pub fn days_until_paywall(&self) -> Option<i64> {
        self.days_until_paywall
    }

    /// Returns what reading every episode now would save, in won.
    ///
    /// Only `Some` while the paywall date is still ahead.
    #[must_use]
    pub fn savings(&self) -> Option<u32> {
        if !self.days_until_paywall.is_some_and(|days| days > 0) {
            return None;
        }

        self.webtoon
            .current()
            .map(|run| run.episodes().saturating_mul(SAVINGS_PER_EPISODE))
    }

    /// Returns the reader age rating.
    #[must_use]
    pub fn age_rating(&self) -> AgeRating {
        match (self.webtoon.is_censored(), self.webtoon.platform()) {
            (false, _) => AgeRating::All,
            (true, Platform::Naver) => AgeRating::Over18,
            (true, Platform::Kakao) => AgeRating::Over19,
        }
    }

    /// Returns whether the current run has finished.
    #[must_use]
    pub fn status(&self) -> Status {
        match self.webtoon.current() {
            Some(run) if run.is_completed() => Status::Completed,
            _ => Status::Ongoing,
        }
    }

    /// Returns the credits line, `author` or `author / drawer`.
    #[must_use]
    pub fn credits(&self) -> String {
        self.webtoon.credits()
    }

    /// Returns the link shared for this webtoon, e.g. `https://todaytoon.me/42`.
    #[must_use]
    pub fn share_url(&self) -> String {
        format!("{SHARE_BASE_URL}/{}", self.webtoon.id())
    }

    /// Returns the text shared alongside the link.
    ///
    /// Mentions the savings while the paywall is still ahead.
    #[must_use]
    pub fn share_title(&self) -> String {
        match self.savings() {
            Some(savings) => format!("오늘 보면 {}원 아낄 수 있는 웹툰 알려드림", grouped(savings)),
            None => "이 웹툰 재질 걍 미쳤음 꼭 보세요".to_owned(),
        }
    }

    /// Returns a Twitter intent URL sharing [`share_title()`](Detail::share_title()) and
    /// [`share_url()`](Detail::share_url()).
    #[must_use]
    pub fn twitter_intent_url(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("text", &self.share_title())
            .append_pair("url", &self.share_url())
            .finish();

        format!("https://twitter.com/intent/tweet?{query}")
    }
}

/// Formats `n` with a comma every three digits, e.g. `12,300`.
fn grouped(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }

    out
}
