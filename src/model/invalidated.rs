/// Cached value tagged stale or fresh.
///
/// Every lazily recomputed cache in the model goes through this wrapper so
/// the points that drop a cache are explicit `invalidate()` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Invalidated<T> {
    value: Option<T>,
}

impl<T> Default for Invalidated<T> {
    fn default() -> Self {
        Self::stale()
    }
}

impl<T> Invalidated<T> {
    #[must_use]
    pub const fn stale() -> Self {
        Self { value: None }
    }

    #[must_use]
    pub const fn fresh(value: T) -> Self {
        Self { value: Some(value) }
    }

    pub fn invalidate(&mut self) {
        self.value = None;
    }

    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.value.is_some()
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: T) -> &T {
        self.value.insert(value)
    }

    pub fn get_or_update(&mut self, recompute: impl FnOnce() -> T) -> &T {
        self.value.get_or_insert_with(recompute)
    }
}
