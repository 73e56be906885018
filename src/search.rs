//! Title search with debounced input, and the genre covers shown before anything is typed.

use crate::{
    client::Client,
    error::ClientError,
    meta::Genre,
    query::{Outcome, QueryOptions, with_retry_while},
    webtoon::Webtoon,
};
use parking_lot::Mutex;
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

/// How long input has to settle before a search is sent.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

/// Something that can search webtoons by title.
pub trait Searcher: Send + Sync {
    /// Returns the webtoons matching `keyword`.
    fn search(&self, keyword: &str)
    -> impl Future<Output = Result<Vec<Webtoon>, ClientError>> + Send;
}

impl Searcher for Client {
    fn search(
        &self,
        keyword: &str,
    ) -> impl Future<Output = Result<Vec<Webtoon>, ClientError>> + Send {
        Client::search(self, keyword)
    }
}

#[derive(Debug, Default)]
struct State {
    keyword: String,
    searching: bool,
    results: Vec<Webtoon>,
    error: Option<Arc<ClientError>>,
}

/// A search box.
///
/// Every keystroke goes through [`input()`](Search::input()). A search is only sent once input has been quiet for
/// the debounce delay, and only for the latest keyword: earlier inputs end as [`Outcome::Stale`], as does a search
/// whose keyword was replaced while it was in flight.
#[derive(Debug)]
pub struct Search<S> {
    searcher: S,
    debounce: Duration,
    options: QueryOptions,
    generation: AtomicU64,
    state: Mutex<State>,
}

impl<S> Search<S>
where
    S: Searcher,
{
    /// Creates a search box with [`DEFAULT_DEBOUNCE`].
    pub fn new(searcher: S) -> Self {
        Self::with_debounce(searcher, DEFAULT_DEBOUNCE)
    }

    /// Creates a search box waiting `debounce` after the last input.
    pub fn with_debounce(searcher: S, debounce: Duration) -> Self {
        Self::with_options(searcher, debounce, QueryOptions::default())
    }

    /// Creates a search box waiting `debounce` after the last input, with custom retry tuning.
    ///
    /// Only the retry count and delay of `options` apply.
    pub fn with_options(searcher: S, debounce: Duration, options: QueryOptions) -> Self {
        Self {
            searcher,
            debounce,
            options,
            generation: AtomicU64::new(0),
            state: Mutex::new(State::default()),
        }
    }

    /// Takes `keyword` as the new input, and searches for it once input settles.
    ///
    /// An empty or whitespace-only keyword clears the results without a request.
    pub async fn input(&self, keyword: &str) -> Outcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut state = self.state.lock();
            state.keyword = keyword.to_owned();
            state.searching = true;
        }

        tokio::time::sleep(self.debounce).await;

        if !self.is_latest(generation) {
            return Outcome::Stale;
        }

        let result = if keyword.trim().is_empty() {
            Ok(Vec::new())
        } else {
            tracing::debug!(keyword, "searching");
            with_retry_while(
                &self.options,
                || self.is_latest(generation),
                || self.searcher.search(keyword),
            )
            .await
        };

        if !self.is_latest(generation) {
            tracing::debug!(keyword, "discarding superseded search results");
            return Outcome::Stale;
        }

        let mut state = self.state.lock();
        state.searching = false;

        match result {
            Ok(results) => {
                state.results = results;
                state.error = None;
                Outcome::Committed
            }
            Err(error) => {
                tracing::warn!(%error, keyword, "search failed");
                let error = Arc::new(error);
                state.error = Some(Arc::clone(&error));
                Outcome::Failed(error)
            }
        }
    }

    /// Returns the latest input.
    #[must_use]
    pub fn keyword(&self) -> String {
        self.state.lock().keyword.clone()
    }

    /// Returns `true` from an input until its search settles.
    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.state.lock().searching
    }

    /// Returns the results of the latest settled search.
    #[must_use]
    pub fn results(&self) -> Vec<Webtoon> {
        self.state.lock().results.clone()
    }

    /// Returns the error of the latest settled search, if it failed.
    #[must_use]
    pub fn error(&self) -> Option<Arc<ClientError>> {
        self.state.lock().error.clone()
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Picks one cover webtoon per genre out of `candidates`, never the same webtoon twice.
///
/// Genres keep their order. A genre whose candidates were all taken by earlier genres gets no cover.
#[must_use]
pub fn pick_covers(
    candidates: &[(Genre, Vec<Webtoon>)],
    rng: &mut fastrand::Rng,
) -> Vec<(Genre, Webtoon)> {
    let mut picks: Vec<(Genre, Webtoon)> = Vec::with_capacity(candidates.len());

    for (genre, webtoons) in candidates {
        let mut shuffled: Vec<&Webtoon> = webtoons.iter().collect();
        rng.shuffle(&mut shuffled);

        let pick = shuffled
            .into_iter()
            .find(|webtoon| picks.iter().all(|(_, picked)| picked.id() != webtoon.id()));

        if let Some(webtoon) = pick {
            picks.push((*genre, webtoon.clone()));
        }
    }

    picks
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::webtoon::test::webtoon;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Recorder {
        keywords: Mutex<Vec<String>>,
    }

    impl Searcher for Recorder {
        fn search(
            &self,
            keyword: &str,
        ) -> impl Future<Output = Result<Vec<Webtoon>, ClientError>> + Send {
            self.keywords.lock().push(keyword.to_owned());
            let id = u32::try_from(keyword.len()).unwrap();
            async move { Ok(vec![webtoon(id, "NAVER", "2024-05-01", 10)]) }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_only_search_settled_input() {
        let search = Arc::new(Search::new(Recorder::default()));

        let first = tokio::spawn({
            let search = Arc::clone(&search);
            async move { search.input("나").await }
        });
        tokio::time::sleep(Duration::from_millis(300)).await;

        let second = tokio::spawn({
            let search = Arc::clone(&search);
            async move { search.input("나혼").await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(search.is_searching());

        assert!(matches!(first.await.unwrap(), Outcome::Stale));
        assert!(second.await.unwrap().is_committed());

        assert_eq!(vec!["나혼".to_owned()], *search.searcher.keywords.lock());
        assert_eq!("나혼", search.keyword());
        assert!(!search.is_searching());
        assert_eq!(1, search.results().len());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_input_should_clear_without_request() {
        let search = Search::new(Recorder::default());

        assert!(search.input("나혼자").await.is_committed());
        assert_eq!(1, search.results().len());

        assert!(search.input("  ").await.is_committed());
        assert!(search.results().is_empty());
        assert_eq!(1, search.searcher.keywords.lock().len());
    }

    /// Fails every search, counting attempts.
    #[derive(Default)]
    struct Down {
        calls: std::sync::atomic::AtomicU32,
    }

    impl Searcher for Down {
        fn search(
            &self,
            _keyword: &str,
        ) -> impl Future<Output = Result<Vec<Webtoon>, ClientError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async { Err(crate::query::test::client_error().await) }
        }
    }

    #[tokio::test]
    async fn failed_search_should_follow_retry_options() {
        let search = Search::with_options(
            Down::default(),
            Duration::ZERO,
            QueryOptions {
                retries: 0,
                ..QueryOptions::default()
            },
        );

        assert!(search.input("나혼자").await.error().is_some());
        assert_eq!(1, search.searcher.calls.load(Ordering::SeqCst));
        assert!(search.error().is_some());
        assert!(!search.is_searching());
    }

    #[test]
    fn covers_should_be_distinct_and_seeded() {
        let shared = webtoon(1, "NAVER", "2024-05-01", 10);
        let other = webtoon(2, "KAKAO", "2024-05-01", 10);
        let candidates = vec![
            (Genre::All, vec![shared.clone()]),
            (Genre::Fantasy, vec![shared.clone(), other.clone()]),
            (Genre::Drama, vec![other.clone(), shared.clone()]),
        ];

        for seed in 0..16 {
            let picks = pick_covers(&candidates, &mut fastrand::Rng::with_seed(seed));

            assert_eq!(
                vec![(Genre::All, shared.clone()), (Genre::Fantasy, other.clone())],
                picks,
                "seed {seed}"
            );
        }
    }

    #[test]
    fn covers_should_repeat_for_the_same_seed() {
        let candidates: Vec<(Genre, Vec<Webtoon>)> = Genre::ALL
            .iter()
            .map(|genre| {
                let webtoons = (0..8)
                    .map(|id| webtoon(id, "NAVER", "2024-05-01", 10))
                    .collect();
                (*genre, webtoons)
            })
            .collect();

        let picks = pick_covers(&candidates, &mut fastrand::Rng::with_seed(11));
        let again = pick_covers(&candidates, &mut fastrand::Rng::with_seed(11));

        assert_eq!(picks, again);
        assert_eq!(Genre::ALL.len(), picks.len());

        let ids: HashSet<u32> = picks.iter().map(|(_, webtoon)| webtoon.id()).collect();
        assert_eq!(picks.len(), ids.len());
    }
}
