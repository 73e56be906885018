use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Cache<T>(Arc<RwLock<Store<T>>>);

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Store<T> {
    #[default]
    Empty,
    Value(T),
}

impl<T> Store<T> {
    #[inline]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Empty => None,
            Self::Value(value) => Some(value),
        }
    }
}

impl<T> Cache<T> {
    #[inline]
    pub fn empty() -> Self {
        Self(Arc::new(RwLock::new(Store::Empty)))
    }

    #[inline]
    pub fn insert(&self, item: T) {
        *self.0.write() = Store::Value(item);
    }

    /// Replaces the stored value with whatever `f` makes of the current one.
    #[inline]
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Store<T>) -> T,
    {
        let mut store = self.0.write();
        let current = std::mem::replace(&mut *store, Store::Empty);
        *store = Store::Value(f(current));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(*self.0.read(), Store::Empty)
    }

    #[inline]
    pub fn get(&self) -> Store<T>
    where
        T: Clone,
    {
        self.0.read().clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_start_empty_and_hold_last_insert() {
        let cache = Cache::empty();
        assert!(cache.is_empty());

        cache.insert(1);
        cache.insert(2);

        pretty_assertions::assert_eq!(Store::Value(2), cache.get());
    }

    #[test]
    fn update_should_see_previous_value() {
        let cache: Cache<Vec<u32>> = Cache::empty();

        cache.update(|store| {
            let mut list = store.into_option().unwrap_or_default();
            list.push(1);
            list
        });
        cache.update(|store| {
            let mut list = store.into_option().unwrap_or_default();
            list.push(2);
            list
        });

        pretty_assertions::assert_eq!(Some(vec![1, 2]), cache.get().into_option());
    }
}
