//! Paywall calendar values derived from a [`Webtoon`] and the current date.
//!
//! Nothing here is fetched: every value is recomputed each time a list is processed, and the date it is computed
//! against is always passed in.

use super::Webtoon;
use crate::meta::Platform;
use chrono::{Datelike, NaiveDate};

/// What a cookie costs per episode, in won.
pub const COOKIE_PRICE_PER_EPISODE: u32 = 200;

/// How many webtoons the home slider shows at most.
pub const SLIDER_SIZE: usize = 3;

/// A webtoon with a known paywall date, as placed on the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    webtoon: Webtoon,
    paid_date: NaiveDate,
    days_until_paywall: i64,
    cookie_price: u32,
}

impl CalendarEntry {
    /// Places `webtoon` on the calendar as seen on `today`.
    ///
    /// Returns `None` if the webtoon has no current run, or the run has no paywall date.
    #[must_use]
    pub fn new(webtoon: Webtoon, today: NaiveDate) -> Option<Self> {
        let run = webtoon.current()?;
        let paid_date = run.paid_date()?;
        let cookie_price = run.episodes().saturating_mul(COOKIE_PRICE_PER_EPISODE);

        Some(Self {
            days_until_paywall: (paid_date - today).num_days(),
            paid_date,
            cookie_price,
            webtoon,
        })
    }

    /// Returns the webtoon.
    #[inline]
    #[must_use]
    pub fn webtoon(&self) -> &Webtoon {
        &self.webtoon
    }

    /// Returns the paywall date.
    #[inline]
    #[must_use]
    pub fn paid_date(&self) -> NaiveDate {
        self.paid_date
    }

    /// Returns the paywall date split into zero padded `[year, month, day]`, e.g. `["2024", "05", "01"]`.
    #[must_use]
    pub fn paid_date_parts(&self) -> [String; 3] {
        [
            format!("{:04}", self.paid_date.year()),
            format!("{:02}", self.paid_date.month()),
            format!("{:02}", self.paid_date.day()),
        ]
    }

    /// Returns how many days are left until the paywall.
    ///
    /// `0` is today; a negative number means the webtoon already went behind the paywall.
    #[inline]
    #[must_use]
    pub fn days_until_paywall(&self) -> i64 {
        self.days_until_paywall
    }

    /// Returns `true` if the webtoon already went behind the paywall.
    #[inline]
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.days_until_paywall < 0
    }

    /// Returns what reading every episode with cookies would cost, in won.
    #[inline]
    #[must_use]
    pub fn cookie_price(&self) -> u32 {
        self.cookie_price
    }
}

/// Webtoons going behind the paywall on the same day.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarGroup {
    paid_date: NaiveDate,
    days_until_paywall: i64,
    entries: Vec<CalendarEntry>,
}

impl CalendarGroup {
    /// Returns the shared paywall date.
    #[inline]
    #[must_use]
    pub fn paid_date(&self) -> NaiveDate {
        self.paid_date
    }

    /// Returns `true` if the group goes behind the paywall today.
    #[inline]
    #[must_use]
    pub fn is_today(&self) -> bool {
        self.days_until_paywall == 0
    }

    /// Returns the entries in the order they were listed.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[CalendarEntry] {
        &self.entries
    }

    /// Returns the group heading, e.g. `오늘 유료화 예정` or `3일 뒤에 유료화`.
    #[must_use]
    pub fn heading(&self) -> String {
        match self.days_until_paywall {
            0 => "오늘 유료화 예정".to_owned(),
            days if days > 0 => format!("{days}일 뒤에 유료화"),
            days => format!("{}일 전에 유료화", -days),
        }
    }
}

/// Places every webtoon on the calendar, skipping those without a paywall date.
#[must_use]
pub fn entries(webtoons: Vec<Webtoon>, today: NaiveDate) -> Vec<CalendarEntry> {
    webtoons
        .into_iter()
        .filter_map(|webtoon| CalendarEntry::new(webtoon, today))
        .collect()
}

/// Groups entries by paywall date. Groups, and the entries in them, keep the order they were first seen in.
#[must_use]
pub fn group_by_paid_date(entries: &[CalendarEntry]) -> Vec<CalendarGroup> {
    let mut groups: Vec<CalendarGroup> = Vec::new();

    for entry in entries {
        match groups
            .iter_mut()
            .find(|group| group.paid_date == entry.paid_date)
        {
            Some(group) => group.entries.push(entry.clone()),
            None => groups.push(CalendarGroup {
                paid_date: entry.paid_date,
                days_until_paywall: entry.days_until_paywall,
                entries: vec![entry.clone()],
            }),
        }
    }

    groups
}

/// Picks the webtoons for the home slider.
///
/// Kakao webtoons come before Naver ones, each grouped by paywall date, before the whole list is shuffled with
/// `rng` and cut to [`SLIDER_SIZE`]. A seeded `rng` always picks the same webtoons in the same order.
#[must_use]
pub fn slider(entries: &[CalendarEntry], rng: &mut fastrand::Rng) -> Vec<CalendarEntry> {
    let of = |platform: Platform| {
        let listed: Vec<CalendarEntry> = entries
            .iter()
            .filter(|entry| entry.webtoon.platform() == platform)
            .cloned()
            .collect();

        group_by_paid_date(&listed)
            .into_iter()
            .flat_map(|group| group.entries)
    };

    let mut picks: Vec<CalendarEntry> = of(Platform::Kakao).chain(of(Platform::Naver)).collect();

    rng.shuffle(&mut picks);
    picks.truncate(SLIDER_SIZE);

    picks
}
