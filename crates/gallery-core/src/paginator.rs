/// Snapshot of the pagination state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageState {
    /// 0-based index of the next page to request.
    pub current_page: usize,
    pub page_size: usize,
    pub is_loading: bool,
    pub has_more: bool,
}

/// A fetch the paginator has committed to. Settle it with [`Paginator::finish`] or
/// [`Paginator::fail`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
    epoch: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageOutcome {
    pub page: usize,
    pub fetched: usize,
    pub has_more: bool,
}

/// Backpressure-gated page cursor.
///
/// `begin` flips `is_loading` synchronously, so every trigger that arrives before the request
/// settles is a no-op. Requests issued before a [`Paginator::reset`] are stale and their results
/// are rejected.
#[derive(Clone, Debug)]
pub struct Paginator {
    state: PageState,
    epoch: u64,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: PageState {
                current_page: 0,
                page_size: page_size.max(1),
                is_loading: false,
                has_more: true,
            },
            epoch: 0,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    pub fn begin(&mut self) -> Option<PageRequest> {
        if self.state.is_loading || !self.state.has_more {
            return None;
        }
        self.state.is_loading = true;
        Some(PageRequest {
            page: self.state.current_page,
            page_size: self.state.page_size,
            epoch: self.epoch,
        })
    }

    pub fn is_current(&self, request: &PageRequest) -> bool {
        self.state.is_loading && request.epoch == self.epoch
    }

    /// Settles a successful fetch of `fetched` items. Returns `None` for stale requests.
    pub fn finish(&mut self, request: PageRequest, fetched: usize) -> Option<PageOutcome> {
        if !self.is_current(&request) {
            return None;
        }
        self.state.is_loading = false;
        self.state.current_page += 1;
        if fetched < request.page_size {
            self.state.has_more = false;
        }
        Some(PageOutcome {
            page: request.page,
            fetched,
            has_more: self.state.has_more,
        })
    }

    /// Settles a failed fetch; `has_more` and the page cursor are left untouched.
    pub fn fail(&mut self, request: PageRequest) -> bool {
        if !self.is_current(&request) {
            return false;
        }
        self.state.is_loading = false;
        true
    }

    /// Abandons the outstanding request without touching the page cursor or `has_more`.
    pub fn cancel(&mut self) {
        if self.state.is_loading {
            self.epoch += 1;
            self.state.is_loading = false;
        }
    }

    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = PageState {
            current_page: 0,
            page_size: self.state.page_size,
            is_loading: false,
            has_more: true,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_gate_suppresses_reentrant_begins() {
        let mut p = Paginator::new(24);
        let first = p.begin().unwrap();
        assert!(p.is_loading());
        assert_eq!(p.begin(), None);
        assert_eq!(p.begin(), None);

        let outcome = p.finish(first, 24).unwrap();
        assert_eq!(outcome.page, 0);
        assert!(outcome.has_more);
        assert!(!p.is_loading());
        assert_eq!(p.begin().map(|r| r.page), Some(1));
    }

    #[test]
    fn short_page_exhausts_until_reset() {
        let mut p = Paginator::new(24);
        let req = p.begin().unwrap();
        assert!(!p.finish(req, 10).unwrap().has_more);
        assert_eq!(p.begin(), None);

        p.reset();
        assert_eq!(
            p.state(),
            PageState {
                current_page: 0,
                page_size: 24,
                is_loading: false,
                has_more: true
            }
        );
        assert!(p.begin().is_some());
    }

    #[test]
    fn failure_keeps_page_and_has_more() {
        let mut p = Paginator::new(5);
        let req = p.begin().unwrap();
        assert!(p.fail(req));
        let state = p.state();
        assert_eq!(state.current_page, 0);
        assert!(state.has_more);
        assert!(!state.is_loading);
    }

    #[test]
    fn results_from_before_a_reset_are_stale() {
        let mut p = Paginator::new(5);
        let old = p.begin().unwrap();
        p.reset();
        let new = p.begin().unwrap();
        assert_eq!(p.finish(old, 5), None);
        assert!(!p.fail(old));
        assert!(p.is_loading());
        assert!(p.finish(new, 5).is_some());
    }

    #[test]
    fn cancel_releases_the_gate_and_keeps_the_cursor() {
        let mut p = Paginator::new(5);
        let first = p.begin().unwrap();
        p.finish(first, 5);
        let second = p.begin().unwrap();
        p.cancel();
        assert!(!p.is_loading());
        assert_eq!(p.finish(second, 5), None);
        assert_eq!(p.state().current_page, 1);
        assert_eq!(p.begin().map(|r| r.page), Some(1));
    }
}
