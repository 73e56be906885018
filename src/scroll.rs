//! Loading the next page when the end of a list scrolls into view.

use crate::query::Outcome;
use std::future::Future;
use tokio::task::JoinHandle;

/// A list that can be extended one page at a time.
pub trait LoadMore: Clone + Send + Sync + 'static {
    /// Returns `true` if there are pages left.
    fn has_more(&self) -> bool;

    /// Returns `true` while a page is being fetched.
    fn is_fetching(&self) -> bool;

    /// Fetches the next page.
    fn fetch_next(&self) -> impl Future<Output = Outcome> + Send;
}

/// Watches a sentinel placed after the last item of a list.
///
/// The host reports the sentinel's visibility with [`visibility_changed()`](ScrollTrigger::visibility_changed()).
/// Each time it goes from hidden to visible while the list has more pages and nothing is being fetched, the next
/// page is requested on a spawned task. Staying visible does not request again.
#[derive(Debug)]
pub struct ScrollTrigger<T> {
    target: Option<T>,
    visible: bool,
}

impl<T> ScrollTrigger<T>
where
    T: LoadMore,
{
    /// Starts watching for `target`, with the sentinel hidden.
    pub fn new(target: T) -> Self {
        Self {
            target: Some(target),
            visible: false,
        }
    }

    /// Returns `true` until [`detach()`](ScrollTrigger::detach()) or
    /// [`sentinel_removed()`](ScrollTrigger::sentinel_removed()) is called.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    /// Reports whether the sentinel is in the viewport.
    ///
    /// Returns the handle of the spawned fetch, if one was started. Must be called within a tokio runtime.
    pub fn visibility_changed(&mut self, visible: bool) -> Option<JoinHandle<Outcome>> {
        let appeared = visible && !self.visible;
        self.visible = visible;

        let target = self.target.as_ref()?;

        if !appeared || !target.has_more() || target.is_fetching() {
            return None;
        }

        tracing::debug!("sentinel became visible, fetching next page");

        let target = target.clone();
        Some(tokio::spawn(async move { target.fetch_next().await }))
    }

    /// The sentinel left the page; later visibility reports do nothing.
    pub fn sentinel_removed(&mut self) {
        self.detach();
    }

    /// Stops watching; later visibility reports do nothing.
    pub fn detach(&mut self) {
        self.target = None;
        self.visible = false;
    }
}
