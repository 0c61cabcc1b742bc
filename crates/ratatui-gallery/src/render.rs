use gallery_core::packer::Position;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use unicode_width::UnicodeWidthChar;

use crate::viewport::ViewportState;

pub fn render_scrollbar(area: Rect, buf: &mut Buffer, state: &ViewportState, style: Style) {
    buf.set_style(area, style);
    if area.height == 0 {
        return;
    }
    if state.content_h <= state.viewport_h as u32 || state.content_h == 0 {
        for dy in 0..area.height {
            buf.set_stringn(area.x, area.y + dy, " ", 1, style);
        }
        return;
    }

    let track_h = area.height as f64;
    let thumb_h = ((state.viewport_h as f64 / state.content_h as f64) * track_h)
        .round()
        .clamp(1.0, track_h) as u16;

    let max_y = state.max_y().max(1) as f64;
    let thumb_top = ((state.y as f64 / max_y) * (track_h - thumb_h as f64))
        .round()
        .clamp(0.0, (track_h - thumb_h as f64).max(0.0)) as u16;

    for dy in 0..area.height {
        let ch = if dy >= thumb_top && dy < thumb_top + thumb_h {
            "█"
        } else {
            " "
        };
        buf.set_stringn(area.x, area.y + dy, ch, 1, style);
    }
}

/// Writes `input` starting at display column `start_col`, stopping after `max_cols` columns.
/// Wide characters that would straddle either edge are skipped.
pub fn render_str_clipped(
    x: u16,
    y: u16,
    start_col: u32,
    max_cols: u16,
    buf: &mut Buffer,
    input: &str,
    style: Style,
) {
    if max_cols == 0 {
        return;
    }

    let start_col = start_col as usize;
    let max_cols = max_cols as usize;
    let mut col = 0usize;
    let mut out_cols = 0usize;
    let mut dx = 0u16;

    let mut tmp = [0u8; 4];

    for ch in input.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w == 0 {
            continue;
        }
        if col < start_col {
            col += w;
            continue;
        }
        if out_cols + w > max_cols {
            return;
        }

        let s = ch.encode_utf8(&mut tmp);
        if let Some(cell) = buf.cell_mut((x + dx, y)) {
            cell.set_style(style);
            cell.set_symbol(s);
        }
        dx += 1;
        out_cols += 1;
        col += w;

        if w == 2 {
            if let Some(cell) = buf.cell_mut((x + dx, y)) {
                cell.set_style(style);
                cell.set_symbol("");
            }
            dx += 1;
            out_cols += 1;
        }
    }
}

/// The part of a laid-out box visible in `area` when scrolled to `scroll_y`. Boxes are clipped on
/// the right and bottom by the area and on the top by the scroll offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClippedBox {
    pub rect: Rect,
    pub clip_top: u32,
    /// Full size of the box in cells.
    pub width: u32,
    pub height: u32,
}

pub fn clip_box(area: Rect, scroll_y: u32, position: &Position) -> Option<ClippedBox> {
    let left = position.left.max(0.0).round() as u64;
    let top = position.top.max(0.0).round() as u64;
    let width = position.width.max(0.0).round().min(u32::MAX as f64) as u32;
    let height = position.height.max(0.0).round().min(u32::MAX as f64) as u32;

    let (rows, clip_top) = clipped_span(area.y, area.height, scroll_y as u64, top, height);
    let (cols, _) = clipped_span(area.x, area.width, 0, left, width);
    let (y, h) = rows?;
    let (x, w) = cols?;
    Some(ClippedBox {
        rect: Rect::new(x, y, w, h),
        clip_top,
        width,
        height,
    })
}

/// Clips `[start, start + size)` in content space to a track of `len` cells at `origin`.
fn clipped_span(
    origin: u16,
    len: u16,
    scroll: u64,
    start: u64,
    size: u32,
) -> (Option<(u16, u16)>, u32) {
    let rel = start as i64 - scroll as i64;
    let clip = (-rel).max(0).min(u32::MAX as i64) as u32;
    if rel >= len as i64 {
        return (None, clip);
    }
    let offset = rel.max(0) as u16;
    let max = len.saturating_sub(offset);
    let visible = size.saturating_sub(clip).min(max as u32) as u16;
    if visible == 0 {
        return (None, clip);
    }
    (Some((origin + offset, visible)), clip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(left: f64, top: f64, width: f64, height: f64) -> Position {
        Position {
            left,
            top,
            width,
            height,
        }
    }

    #[test]
    fn boxes_are_clipped_to_the_scrolled_area() {
        let area = Rect::new(2, 1, 40, 10);
        let full = clip_box(area, 0, &pos(5.0, 3.0, 10.0, 4.0)).unwrap();
        assert_eq!(full.rect, Rect::new(7, 4, 10, 4));
        assert_eq!(full.clip_top, 0);

        let top = clip_box(area, 5, &pos(0.0, 3.0, 10.0, 4.0)).unwrap();
        assert_eq!(top.rect, Rect::new(2, 1, 10, 2));
        assert_eq!(top.clip_top, 2);

        let bottom = clip_box(area, 0, &pos(0.0, 8.0, 10.0, 6.0)).unwrap();
        assert_eq!(bottom.rect.height, 2);

        let wide = clip_box(area, 0, &pos(35.0, 0.0, 10.0, 2.0)).unwrap();
        assert_eq!(wide.rect.width, 5);

        assert_eq!(clip_box(area, 20, &pos(0.0, 3.0, 10.0, 4.0)), None);
        assert_eq!(clip_box(area, 0, &pos(0.0, 10.0, 10.0, 4.0)), None);
    }

    #[test]
    fn clipped_string_respects_width() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 6, 1));
        render_str_clipped(0, 0, 0, 4, &mut buf, "abcdef", Style::default());
        let row: String = (0..6).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert_eq!(row, "abcd  ");
    }
}
