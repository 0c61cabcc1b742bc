//! Fixed-row virtualization with a recycled element pool.
//!
//! Rows all share one height, so the visible range is plain arithmetic. Instead of creating and
//! destroying an element per row, a pool sized to the viewport is kept alive and each slot is
//! re-pointed at a new row index as the list scrolls. Row `i` always lands in slot
//! `i % pool_size`, so a one-row scroll re-renders exactly one slot.

use std::ops::Range;

/// Rows to materialize: the viewport's rows plus `overscan` on each side, clamped to `[0, count)`.
pub fn visible_rows(
    scroll_offset: f64,
    viewport_extent: f64,
    row_height: f64,
    overscan: usize,
    count: usize,
) -> Range<usize> {
    if count == 0 || row_height <= 0.0 || !row_height.is_finite() {
        return 0..0;
    }
    let scroll_offset = scroll_offset.max(0.0);
    let first = (scroll_offset / row_height).floor() as usize;
    let last = ((scroll_offset + viewport_extent.max(0.0)) / row_height).ceil() as usize;
    let start = first.saturating_sub(overscan).min(count);
    let end = last.saturating_add(overscan).min(count);
    start..end.max(start)
}

/// Number of pooled elements needed to cover any scroll position.
pub fn pool_size(viewport_extent: f64, row_height: f64, overscan: usize, count: usize) -> usize {
    if count == 0 || row_height <= 0.0 || !row_height.is_finite() {
        return 0;
    }
    let rows = (viewport_extent.max(0.0) / row_height).ceil() as usize;
    (rows + 1 + 2 * overscan).min(count)
}

/// Element lifecycle for pooled rows.
pub trait RowHost {
    type Element;

    fn create(&mut self) -> Self::Element;

    fn place(&mut self, element: &mut Self::Element, top: f64);

    fn hide(&mut self, element: &mut Self::Element);

    fn destroy(&mut self, element: Self::Element);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    pub destroyed: usize,
    pub rendered: usize,
}

#[derive(Debug)]
struct Slot<E> {
    element: E,
    index: Option<usize>,
}

#[derive(Debug)]
pub struct RowPool<E> {
    slots: Vec<Slot<E>>,
    row_height: f64,
    overscan: usize,
    range: Range<usize>,
    stale: bool,
}

impl<E> RowPool<E> {
    pub fn new(row_height: f64, overscan: usize) -> Self {
        Self {
            slots: Vec::new(),
            row_height,
            overscan,
            range: 0..0,
            stale: false,
        }
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.overscan = overscan;
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn pool_len(&self) -> usize {
        self.slots.len()
    }

    pub fn content_height(&self, count: usize) -> f64 {
        count as f64 * self.row_height
    }

    /// Forces every slot to be rendered again on the next sync.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Element currently showing row `index`.
    pub fn element_for(&self, index: usize) -> Option<&E> {
        if !self.range.contains(&index) || self.slots.is_empty() {
            return None;
        }
        let slot = &self.slots[index % self.slots.len()];
        (slot.index == Some(index)).then_some(&slot.element)
    }

    /// Visible rows in index order with their elements.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &E)> {
        self.range
            .clone()
            .filter_map(move |index| self.element_for(index).map(|e| (index, e)))
    }

    /// Brings the pool in line with the scroll position. `render_row` runs only for slots whose
    /// row changed, or for all slots after [`RowPool::invalidate`].
    pub fn sync<H, F>(
        &mut self,
        host: &mut H,
        scroll_offset: f64,
        viewport_extent: f64,
        count: usize,
        mut render_row: F,
    ) -> SyncStats
    where
        H: RowHost<Element = E>,
        F: FnMut(&mut E, usize),
    {
        let mut stats = SyncStats::default();
        let wanted = pool_size(viewport_extent, self.row_height, self.overscan, count);

        if wanted != self.slots.len() {
            while self.slots.len() > wanted {
                if let Some(slot) = self.slots.pop() {
                    host.destroy(slot.element);
                    stats.destroyed += 1;
                }
            }
            while self.slots.len() < wanted {
                self.slots.push(Slot {
                    element: host.create(),
                    index: None,
                });
                stats.created += 1;
            }
            // Slot assignment depends on the pool length.
            for slot in &mut self.slots {
                if slot.index.take().is_some() {
                    host.hide(&mut slot.element);
                }
            }
        }

        self.range = visible_rows(
            scroll_offset,
            viewport_extent,
            self.row_height,
            self.overscan,
            count,
        );
        let stale = std::mem::take(&mut self.stale);
        let len = self.slots.len();
        if len == 0 {
            return stats;
        }

        let mut assigned = vec![None; len];
        for index in self.range.clone() {
            assigned[index % len] = Some(index);
        }

        for (slot, target) in self.slots.iter_mut().zip(assigned) {
            match target {
                Some(index) => {
                    if slot.index != Some(index) || stale {
                        host.place(&mut slot.element, index as f64 * self.row_height);
                        render_row(&mut slot.element, index);
                        stats.rendered += 1;
                    }
                    slot.index = Some(index);
                }
                None => {
                    if slot.index.is_some() {
                        host.hide(&mut slot.element);
                    }
                    slot.index = None;
                }
            }
        }

        stats
    }

    pub fn clear<H>(&mut self, host: &mut H)
    where
        H: RowHost<Element = E>,
    {
        for slot in self.slots.drain(..) {
            host.destroy(slot.element);
        }
        self.range = 0..0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Rows {
        next: usize,
        live: usize,
    }

    #[derive(Debug)]
    struct Row {
        serial: usize,
        top: f64,
        shown: Option<usize>,
    }

    impl RowHost for Rows {
        type Element = Row;

        fn create(&mut self) -> Row {
            self.next += 1;
            self.live += 1;
            Row {
                serial: self.next,
                top: 0.0,
                shown: None,
            }
        }

        fn place(&mut self, element: &mut Row, top: f64) {
            element.top = top;
        }

        fn hide(&mut self, element: &mut Row) {
            element.shown = None;
        }

        fn destroy(&mut self, _element: Row) {
            self.live -= 1;
        }
    }

    fn show(row: &mut Row, index: usize) {
        row.shown = Some(index);
    }

    #[test]
    fn range_formula_with_overscan_and_clamping() {
        assert_eq!(visible_rows(0.0, 100.0, 20.0, 2, 1000), 0..7);
        assert_eq!(visible_rows(205.0, 100.0, 20.0, 2, 1000), 8..18);
        assert_eq!(visible_rows(19_990.0, 100.0, 20.0, 2, 1000), 997..1000);
        assert_eq!(visible_rows(0.0, 100.0, 20.0, 2, 0), 0..0);
        assert_eq!(pool_size(100.0, 20.0, 2, 1000), 10);
        assert_eq!(pool_size(100.0, 20.0, 2, 3), 3);
    }

    #[test]
    fn scrolling_recycles_without_creating() {
        let mut host = Rows::default();
        let mut pool = RowPool::new(20.0, 2);
        let first = pool.sync(&mut host, 0.0, 100.0, 100_000, show);
        assert_eq!(first.created, 10);
        assert_eq!(first.rendered, 7);
        let serials: Vec<usize> = pool.visible().map(|(_, r)| r.serial).collect();
        assert_eq!(serials.len(), 7);

        for step in 1..500 {
            let stats = pool.sync(&mut host, step as f64 * 20.0, 100.0, 100_000, show);
            assert_eq!(stats.created, 0);
            assert_eq!(stats.destroyed, 0);
            if step > 2 {
                assert_eq!(stats.rendered, 1, "one row enters per step");
            }
        }
        assert_eq!(host.live, 10);
        assert_eq!(pool.range(), 497..506);
        let mut recycled: Vec<usize> = pool.visible().map(|(_, r)| r.serial).collect();
        recycled.sort_unstable();
        assert!(recycled.iter().all(|s| *s <= 10));
        for (index, row) in pool.visible() {
            assert_eq!(row.shown, Some(index));
            assert_eq!(row.top, index as f64 * 20.0);
        }
    }

    #[test]
    fn invalidate_rerenders_every_visible_slot() {
        let mut host = Rows::default();
        let mut pool = RowPool::new(10.0, 0);
        pool.sync(&mut host, 0.0, 50.0, 100, show);
        assert_eq!(pool.sync(&mut host, 0.0, 50.0, 100, show).rendered, 0);
        pool.invalidate();
        assert_eq!(pool.sync(&mut host, 0.0, 50.0, 100, show).rendered, 5);
    }

    #[test]
    fn pool_shrinks_with_the_collection() {
        let mut host = Rows::default();
        let mut pool = RowPool::new(10.0, 1);
        pool.sync(&mut host, 0.0, 50.0, 100, show);
        assert_eq!(pool.pool_len(), 8);
        let stats = pool.sync(&mut host, 0.0, 50.0, 3, show);
        assert_eq!(stats.destroyed, 5);
        assert_eq!(pool.range(), 0..3);
        assert_eq!(host.live, 3);
        pool.clear(&mut host);
        assert_eq!(host.live, 0);
    }
}
