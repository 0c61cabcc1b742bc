use crate::input::InputEvent;
use crate::input::KeyCode;
use crate::input::KeyEvent;
use crate::input::MouseEventKind;
use crate::render;
use crate::theme::Theme;
use crate::viewport::ViewportState;
use gallery_core::fixed_list::RowHost;
use gallery_core::fixed_list::RowPool;
use gallery_core::fixed_list::SyncStats;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixedListAction {
    None,
    Redraw,
    Activated(usize),
    SelectionChanged,
}

#[derive(Clone, Debug)]
pub struct FixedListViewOptions {
    pub show_scrollbar: bool,
    pub overscan: usize,
    /// Rows per item; every item has the same height.
    pub row_height: u16,
    pub style: Style,
    pub scrollbar_style: Style,
    pub cursor_style: Style,
    pub selected_style: Style,
    pub selection_follows_cursor: bool,
    pub multi_select: bool,
}

impl Default for FixedListViewOptions {
    fn default() -> Self {
        Self {
            show_scrollbar: true,
            overscan: 2,
            row_height: 1,
            style: Style::default(),
            scrollbar_style: Style::default(),
            cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            selected_style: Style::default().add_modifier(Modifier::BOLD),
            selection_follows_cursor: true,
            multi_select: false,
        }
    }
}

/// A pooled row. Its text is produced once per index it is pointed at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowSlot {
    pub top: u32,
    pub text: String,
    pub shown: bool,
}

#[derive(Debug, Default)]
struct SlotHost {
    created: usize,
}

impl RowHost for SlotHost {
    type Element = RowSlot;

    fn create(&mut self) -> RowSlot {
        self.created += 1;
        RowSlot::default()
    }

    fn place(&mut self, element: &mut RowSlot, top: f64) {
        element.top = top.max(0.0) as u32;
        element.shown = true;
    }

    fn hide(&mut self, element: &mut RowSlot) {
        element.shown = false;
        element.text.clear();
    }

    fn destroy(&mut self, _element: RowSlot) {}
}

/// Keyboard-driven list over `count` equally tall rows, drawn from a recycled pool.
pub struct FixedListView {
    pub viewport: ViewportState,
    options: FixedListViewOptions,
    pool: RowPool<RowSlot>,
    host: SlotHost,

    cursor: Option<usize>,
    selection: BTreeSet<usize>,
    selection_anchor: Option<usize>,
    last_sync: SyncStats,
}

impl Default for FixedListView {
    fn default() -> Self {
        Self::with_options(FixedListViewOptions::default())
    }
}

impl FixedListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FixedListViewOptions) -> Self {
        Self {
            viewport: ViewportState::default(),
            pool: RowPool::new(options.row_height.max(1) as f64, options.overscan),
            options,
            host: SlotHost::default(),
            cursor: None,
            selection: BTreeSet::new(),
            selection_anchor: None,
            last_sync: SyncStats::default(),
        }
    }

    pub fn options(&self) -> &FixedListViewOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: FixedListViewOptions) {
        if options.row_height != self.options.row_height {
            self.pool.clear(&mut self.host);
            self.pool = RowPool::new(options.row_height.max(1) as f64, options.overscan);
        } else {
            self.pool.set_overscan(options.overscan);
            self.pool.invalidate();
        }
        self.options = options;
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.selection_anchor = None;
    }

    /// Number of pooled row elements.
    pub fn pool_len(&self) -> usize {
        self.pool.pool_len()
    }

    /// Row elements created since the view was built.
    pub fn rows_created(&self) -> usize {
        self.host.created
    }

    /// What the last render had to do.
    pub fn last_sync(&self) -> SyncStats {
        self.last_sync
    }

    /// Re-renders every pooled row on the next frame, e.g. after the data changed in place.
    pub fn invalidate(&mut self) {
        self.pool.invalidate();
    }

    pub fn set_cursor(&mut self, cursor: Option<usize>, count: usize) {
        self.cursor = clamp_cursor(cursor, count);
        if !self.options.multi_select && self.options.selection_follows_cursor {
            self.selection.clear();
            if let Some(c) = self.cursor {
                self.selection.insert(c);
                self.selection_anchor = Some(c);
            } else {
                self.selection_anchor = None;
            }
        }
        self.ensure_cursor_visible(count);
    }

    pub fn ensure_cursor_visible(&mut self, count: usize) {
        self.sync_viewport(count);
        let Some(cursor) = self.cursor else {
            return;
        };
        let row_h = self.row_height();
        let top = (cursor as u32).saturating_mul(row_h);
        let bottom = top.saturating_add(row_h);
        let view_h = self.viewport.viewport_h as u32;
        if top < self.viewport.y {
            self.viewport.y = top;
        } else if bottom > self.viewport.y.saturating_add(view_h) {
            self.viewport.y = bottom.saturating_sub(view_h);
        }
        self.viewport.clamp();
    }

    pub fn handle_event(&mut self, event: InputEvent, count: usize) -> FixedListAction {
        match event {
            InputEvent::Key(key) => self.handle_key(key, count),
            InputEvent::Mouse(mouse) => {
                let delta = match mouse.kind {
                    MouseEventKind::ScrollUp => -3,
                    MouseEventKind::ScrollDown => 3,
                    MouseEventKind::Click => return FixedListAction::None,
                };
                self.sync_viewport(count);
                let before = self.viewport.y;
                self.viewport.scroll_y_by(delta);
                if self.viewport.y == before {
                    FixedListAction::None
                } else {
                    FixedListAction::Redraw
                }
            }
        }
    }

    /// Draws the visible rows. `render_row` is only asked for rows that were not already showing.
    pub fn render<F>(
        &mut self,
        area: Rect,
        buf: &mut Buffer,
        theme: &Theme,
        count: usize,
        mut render_row: F,
    ) where
        F: FnMut(usize) -> String,
    {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let (content_area, scrollbar_x) = if self.options.show_scrollbar && area.width >= 2 {
            (
                Rect::new(area.x, area.y, area.width - 1, area.height),
                Some(area.x + area.width - 1),
            )
        } else {
            (area, None)
        };

        self.viewport
            .set_viewport(content_area.width, content_area.height);
        self.sync_viewport(count);
        if count == 0 {
            self.cursor = None;
        }

        self.last_sync = self.pool.sync(
            &mut self.host,
            self.viewport.y as f64,
            content_area.height as f64,
            count,
            |slot, index| slot.text = render_row(index),
        );

        let base_style = if self.options.style == Style::default() {
            theme.text_primary
        } else {
            self.options.style
        };
        buf.set_style(content_area, base_style);

        let cursor_style = self.options.cursor_style.patch(theme.accent);
        let selected_style = self.options.selected_style.patch(theme.accent);
        let row_h = self.row_height();
        let scroll = self.viewport.y as i64;

        for (index, slot) in self.pool.visible() {
            let rel = slot.top as i64 - scroll;
            let clip_top = (-rel).max(0) as u32;
            if rel >= content_area.height as i64 || clip_top >= row_h {
                continue;
            }
            let y = content_area.y + rel.max(0) as u16;
            let visible_h = (row_h - clip_top).min((content_area.bottom() - y) as u32) as u16;
            let row_area = Rect::new(content_area.x, y, content_area.width, visible_h);

            let style = if self.cursor == Some(index) {
                cursor_style
            } else if self.selection.contains(&index) {
                selected_style
            } else {
                base_style
            };
            buf.set_style(row_area, style);
            if clip_top == 0 {
                render::render_str_clipped(
                    row_area.x,
                    row_area.y,
                    0,
                    row_area.width,
                    buf,
                    &slot.text,
                    style,
                );
            }
        }

        if let Some(sb_x) = scrollbar_x {
            render::render_scrollbar(
                Rect::new(sb_x, area.y, 1, area.height),
                buf,
                &self.viewport,
                self.options.scrollbar_style,
            );
        }
    }

    fn handle_key(&mut self, key: KeyEvent, count: usize) -> FixedListAction {
        if count == 0 {
            self.cursor = None;
            self.clear_selection();
            self.viewport.y = 0;
            return FixedListAction::None;
        }

        self.sync_viewport(count);

        if key.modifiers.ctrl && !key.modifiers.alt {
            match key.code {
                KeyCode::Char('d') => {
                    self.viewport.page_down();
                    self.set_cursor_from_scroll(count);
                    return FixedListAction::Redraw;
                }
                KeyCode::Char('u') => {
                    self.viewport.page_up();
                    self.set_cursor_from_scroll(count);
                    return FixedListAction::Redraw;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                if self.move_cursor_by(1, count, key.modifiers.shift) {
                    FixedListAction::Redraw
                } else {
                    FixedListAction::None
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.move_cursor_by(-1, count, key.modifiers.shift) {
                    FixedListAction::Redraw
                } else {
                    FixedListAction::None
                }
            }
            KeyCode::PageDown => {
                self.viewport.page_down();
                self.set_cursor_from_scroll(count);
                FixedListAction::Redraw
            }
            KeyCode::PageUp => {
                self.viewport.page_up();
                self.set_cursor_from_scroll(count);
                FixedListAction::Redraw
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.jump_to(0, count);
                FixedListAction::Redraw
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.jump_to(count - 1, count);
                FixedListAction::Redraw
            }
            KeyCode::Enter => self
                .cursor
                .map(FixedListAction::Activated)
                .unwrap_or(FixedListAction::None),
            KeyCode::Char(' ') => self.toggle_selection(),
            _ => FixedListAction::None,
        }
    }

    fn jump_to(&mut self, index: usize, count: usize) {
        self.cursor = Some(index);
        self.selection_anchor = Some(index);
        if !self.options.multi_select && self.options.selection_follows_cursor {
            self.selection.clear();
            self.selection.insert(index);
        }
        self.ensure_cursor_visible(count);
    }

    fn toggle_selection(&mut self) -> FixedListAction {
        let Some(cursor) = self.cursor else {
            return FixedListAction::None;
        };
        let before = self.selection.contains(&cursor);
        if self.options.multi_select {
            if before {
                self.selection.remove(&cursor);
            } else {
                self.selection.insert(cursor);
                self.selection_anchor = Some(cursor);
            }
        } else {
            self.selection.clear();
            self.selection.insert(cursor);
            self.selection_anchor = Some(cursor);
        }
        if before != self.selection.contains(&cursor) {
            FixedListAction::SelectionChanged
        } else {
            FixedListAction::Redraw
        }
    }

    fn move_cursor_by(&mut self, delta: i32, count: usize, shift: bool) -> bool {
        let cur = self.cursor.unwrap_or(0);
        let next = (cur as i64 + delta as i64).clamp(0, count.saturating_sub(1) as i64) as usize;
        if Some(next) == self.cursor {
            return false;
        }
        self.cursor = Some(next);

        if self.options.multi_select && shift {
            let anchor = self.selection_anchor.unwrap_or(cur);
            self.selection_anchor = Some(anchor);
            let (a, b) = if anchor <= next {
                (anchor, next)
            } else {
                (next, anchor)
            };
            self.selection.extend(a..=b);
        } else if !self.options.multi_select && self.options.selection_follows_cursor {
            self.selection.clear();
            self.selection.insert(next);
            self.selection_anchor = Some(next);
        } else {
            self.selection_anchor = Some(next);
        }

        self.ensure_cursor_visible(count);
        true
    }

    fn set_cursor_from_scroll(&mut self, count: usize) {
        let index = (self.viewport.y / self.row_height()) as usize;
        if index < count {
            self.cursor = Some(index);
            if !self.options.multi_select && self.options.selection_follows_cursor {
                self.selection.clear();
                self.selection.insert(index);
                self.selection_anchor = Some(index);
            }
        }
    }

    fn sync_viewport(&mut self, count: usize) {
        let content_h = self.pool.content_height(count).min(u32::MAX as f64) as u32;
        self.viewport.set_content_height(content_h);
    }

    fn row_height(&self) -> u32 {
        self.options.row_height.max(1) as u32
    }
}

fn clamp_cursor(cursor: Option<usize>, count: usize) -> Option<usize> {
    match cursor {
        None => None,
        Some(_) if count == 0 => None,
        Some(i) => Some(i.min(count - 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyModifiers;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent::new(code))
    }

    fn key_shift(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent::new(code).with_modifiers(KeyModifiers {
            shift: true,
            ctrl: false,
            alt: false,
        }))
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (buf.area.left()..buf.area.right())
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn cursor_moves_and_stays_visible() {
        let mut v = FixedListView::new();
        v.viewport.set_viewport(10, 3);
        v.set_cursor(Some(0), 100);
        assert_eq!(v.cursor(), Some(0));
        assert_eq!(v.viewport.y, 0);

        v.handle_event(key(KeyCode::Down), 100);
        v.handle_event(key(KeyCode::Down), 100);
        v.handle_event(key(KeyCode::Down), 100);
        assert_eq!(v.cursor(), Some(3));
        assert_eq!(v.viewport.y, 1);

        v.handle_event(key(KeyCode::End), 100);
        assert_eq!(v.cursor(), Some(99));
        assert_eq!(v.viewport.y, 97);
    }

    #[test]
    fn shift_extends_selection_in_multi_mode() {
        let mut v = FixedListView::with_options(FixedListViewOptions {
            multi_select: true,
            selection_follows_cursor: false,
            ..Default::default()
        });
        v.viewport.set_viewport(10, 5);
        v.set_cursor(Some(5), 20);
        v.clear_selection();
        v.selection_anchor = Some(5);

        v.handle_event(key_shift(KeyCode::Down), 20);
        v.handle_event(key_shift(KeyCode::Down), 20);
        assert_eq!(
            v.selected().iter().copied().collect::<Vec<_>>(),
            vec![5, 6, 7]
        );
    }

    #[test]
    fn scrolling_reuses_pooled_rows() {
        let mut v = FixedListView::with_options(FixedListViewOptions {
            show_scrollbar: false,
            ..Default::default()
        });
        let theme = Theme::default();
        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        let mut asked = Vec::new();

        v.render(area, &mut buf, &theme, 10_000, |i| {
            asked.push(i);
            format!("row {i}")
        });
        assert_eq!(v.pool_len(), 10);
        assert_eq!(v.rows_created(), 10);
        assert_eq!(row_text(&buf, 0), "row 0");
        assert_eq!(row_text(&buf, 4), "row 4");

        for _ in 0..200 {
            v.handle_event(key(KeyCode::Down), 10_000);
            v.render(area, &mut buf, &theme, 10_000, |i| format!("row {i}"));
        }
        assert_eq!(v.rows_created(), 10);
        assert_eq!(v.cursor(), Some(200));
        assert_eq!(v.last_sync().rendered, 1);
        assert_eq!(row_text(&buf, 4), "row 200");
        assert_eq!(asked, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn taller_rows_are_clipped_at_the_top() {
        let mut v = FixedListView::with_options(FixedListViewOptions {
            row_height: 2,
            show_scrollbar: false,
            ..Default::default()
        });
        let theme = Theme::default();
        let area = Rect::new(0, 0, 12, 4);
        let mut buf = Buffer::empty(area);
        v.render(area, &mut buf, &theme, 50, |i| format!("item {i}"));
        assert_eq!(row_text(&buf, 0), "item 0");
        assert_eq!(row_text(&buf, 2), "item 1");

        v.viewport.y = 3;
        buf = Buffer::empty(area);
        v.render(area, &mut buf, &theme, 50, |i| format!("item {i}"));
        assert_eq!(row_text(&buf, 0), "");
        assert_eq!(row_text(&buf, 1), "item 2");
    }
}
