use gallery_core::observer::Listener;
use gallery_core::observer::ListenerSet;
use gallery_core::observer::Subscription;
use gallery_core::observer::ViewportObserver;
use std::cell::Cell;
use std::time::Instant;

/// Vertical scroll state in terminal rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewportState {
    pub y: u32,
    pub viewport_w: u16,
    pub viewport_h: u16,
    pub content_h: u32,
}

impl ViewportState {
    pub fn set_viewport(&mut self, w: u16, h: u16) {
        self.viewport_w = w;
        self.viewport_h = h;
        self.clamp();
    }

    pub fn set_content_height(&mut self, h: u32) {
        self.content_h = h;
        self.clamp();
    }

    pub fn clamp(&mut self) {
        self.y = self.y.min(self.max_y());
    }

    pub fn scroll_y_by(&mut self, delta: i32) {
        let next = self.y as i64 + delta as i64;
        self.y = next.clamp(0, self.max_y() as i64) as u32;
    }

    pub fn page_down(&mut self) {
        self.scroll_y_by(self.viewport_h.saturating_sub(1) as i32);
    }

    pub fn page_up(&mut self) {
        self.scroll_y_by(-(self.viewport_h.saturating_sub(1) as i32));
    }

    pub fn to_top(&mut self) {
        self.y = 0;
    }

    pub fn to_bottom(&mut self) {
        self.y = self.max_y();
    }

    pub fn percent_y(&self) -> Option<u8> {
        if self.content_h == 0 || self.viewport_h == 0 || self.content_h <= self.viewport_h as u32 {
            return None;
        }
        let visible_bottom = self.y.saturating_add(self.viewport_h as u32) as f64;
        let pct = (visible_bottom / self.content_h as f64 * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }

    pub fn max_y(&self) -> u32 {
        self.content_h.saturating_sub(self.viewport_h as u32)
    }
}

/// A terminal scroll container the gallery can observe.
///
/// Every change that moves `y` notifies scroll listeners; viewport size changes notify resize
/// listeners. Listeners receive the caller's timestamp.
#[derive(Debug, Default)]
pub struct TerminalViewport {
    state: Cell<ViewportState>,
    scroll: ListenerSet,
    resize: ListenerSet,
}

impl TerminalViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewportState {
        self.state.get()
    }

    /// Sets the size without notifying anyone. Used before the first mount.
    pub fn init_viewport(&self, w: u16, h: u16) {
        let mut state = self.state.get();
        state.set_viewport(w, h);
        self.state.set(state);
    }

    /// Returns `true` when the size changed.
    pub fn set_viewport(&self, w: u16, h: u16, now: Instant) -> bool {
        let before = self.state.get();
        if before.viewport_w == w && before.viewport_h == h {
            return false;
        }
        let mut next = before;
        next.set_viewport(w, h);
        self.state.set(next);
        self.resize.emit(now);
        if next.y != before.y {
            self.scroll.emit(now);
        }
        true
    }

    pub fn set_content_height(&self, h: u32, now: Instant) {
        self.update(now, |state| state.set_content_height(h));
    }

    /// Applies `f` to the state and notifies scroll listeners if the offset moved.
    pub fn update(&self, now: Instant, f: impl FnOnce(&mut ViewportState)) -> bool {
        let before = self.state.get();
        let mut next = before;
        f(&mut next);
        next.clamp();
        self.state.set(next);
        if next.y != before.y {
            self.scroll.emit(now);
            true
        } else {
            false
        }
    }
}

impl ViewportObserver for TerminalViewport {
    fn on_scroll(&self, listener: Listener) -> Subscription {
        self.scroll.add(listener)
    }

    fn on_resize(&self, listener: Listener) -> Subscription {
        self.resize.add(listener)
    }

    fn current_offset(&self) -> f64 {
        self.state.get().y as f64
    }

    fn viewport_extent(&self) -> f64 {
        self.state.get().viewport_h as f64
    }

    fn container_width(&self) -> f64 {
        self.state.get().viewport_w as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn viewport_clamps_offset() {
        let mut s = ViewportState::default();
        s.set_viewport(10, 5);
        s.set_content_height(6);
        s.y = 99;
        s.clamp();
        assert_eq!(s.y, 1);
        s.to_top();
        s.page_down();
        assert_eq!(s.y, 1);
    }

    #[test]
    fn percent_is_none_when_everything_fits() {
        let mut s = ViewportState::default();
        s.set_viewport(10, 10);
        s.set_content_height(8);
        assert_eq!(s.percent_y(), None);
        s.set_content_height(40);
        s.y = 30;
        assert_eq!(s.percent_y(), Some(100));
    }

    #[test]
    fn only_real_changes_notify() {
        let viewport = TerminalViewport::new();
        let scrolls = Rc::new(Cell::new(0));
        let resizes = Rc::new(Cell::new(0));
        let s = scrolls.clone();
        let _scroll = viewport.on_scroll(Box::new(move |_| s.set(s.get() + 1)));
        let r = resizes.clone();
        let _resize = viewport.on_resize(Box::new(move |_| r.set(r.get() + 1)));

        let now = Instant::now();
        viewport.init_viewport(20, 10);
        viewport.set_content_height(100, now);
        assert_eq!(scrolls.get(), 0);

        assert!(viewport.update(now, |s| s.scroll_y_by(5)));
        assert!(viewport.update(now, |s| s.scroll_y_by(-10)));
        assert_eq!(viewport.state().y, 0);
        assert!(!viewport.update(now, |s| s.to_top()));
        assert_eq!(scrolls.get(), 2);

        assert!(!viewport.set_viewport(20, 10, now));
        assert!(viewport.set_viewport(30, 10, now));
        assert_eq!(resizes.get(), 1);
        assert_eq!(viewport.container_width(), 30.0);
    }
}
