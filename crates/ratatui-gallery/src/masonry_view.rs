//! Terminal rendering for [`Gallery`].
//!
//! Layout units are terminal cells: a `base_unit` of 12 makes a 1×1 tile 12 columns wide and 12
//! rows tall. Tiles are plain structs; the gallery decides which ones exist and the view draws
//! whatever is inside the visible area on each frame.

use crate::input::InputEvent;
use crate::input::MouseEventKind;
use crate::render;
use crate::render::ClippedBox;
use crate::scroll::ScrollBindings;
use crate::theme::Theme;
use crate::viewport::TerminalViewport;
use crate::viewport::ViewportState;
use futures::task::LocalSpawn;
use gallery_core::config::GalleryConfig;
use gallery_core::error::AssetError;
use gallery_core::event::GalleryEvent;
use gallery_core::gallery::DataSource;
use gallery_core::gallery::Gallery;
use gallery_core::item::Item;
use gallery_core::item::ItemId;
use gallery_core::packer::Position;
use gallery_core::paginator::PageState;
use gallery_core::window::AssetLoad;
use gallery_core::window::AssetState;
use gallery_core::window::RenderHost;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use std::rc::Rc;
use std::time::Instant;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MasonryAction {
    None,
    Redraw,
    Activated(ItemId),
}

#[derive(Clone, Debug)]
pub struct MasonryViewOptions {
    pub show_scrollbar: bool,
    pub scrollbar_style: Style,
    pub bindings: ScrollBindings,
}

impl Default for MasonryViewOptions {
    fn default() -> Self {
        Self {
            show_scrollbar: true,
            scrollbar_style: Style::default(),
            bindings: ScrollBindings::default(),
        }
    }
}

/// A materialized tile.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub id: ItemId,
    pub label: String,
    pub position: Position,
    pub failure: Option<String>,
}

type LabelFn<T> = Box<dyn Fn(&T) -> String>;
type LoaderFn<T> = Box<dyn Fn(&Item<T>) -> Option<AssetLoad>>;

/// [`RenderHost`] that turns items into [`Tile`]s.
pub struct TileHost<T> {
    label: LabelFn<T>,
    loader: Option<LoaderFn<T>>,
    live: usize,
}

impl<T> TileHost<T> {
    pub fn new(label: impl Fn(&T) -> String + 'static) -> Self {
        Self {
            label: Box::new(label),
            loader: None,
            live: 0,
        }
    }

    pub fn set_asset_loader(&mut self, loader: impl Fn(&Item<T>) -> Option<AssetLoad> + 'static) {
        self.loader = Some(Box::new(loader));
    }

    /// Tiles currently alive.
    pub fn live(&self) -> usize {
        self.live
    }
}

impl<T> RenderHost<T> for TileHost<T> {
    type Element = Tile;

    fn create(&mut self, item: &Item<T>, position: Position) -> Tile {
        self.live += 1;
        Tile {
            id: item.id.clone(),
            label: (self.label)(&item.payload),
            position,
            failure: None,
        }
    }

    fn reposition(&mut self, element: &mut Tile, position: Position) {
        element.position = position;
    }

    fn destroy(&mut self, _element: Tile) {
        self.live = self.live.saturating_sub(1);
    }

    fn load_asset(&mut self, item: &Item<T>) -> Option<AssetLoad> {
        self.loader.as_ref().and_then(|load| load(item))
    }

    fn asset_failed(&mut self, element: &mut Tile, error: &AssetError) {
        element.failure = Some(error.0.clone());
    }
}

pub struct MasonryView<T: 'static> {
    gallery: Gallery<T, TileHost<T>>,
    viewport: Rc<TerminalViewport>,
    options: MasonryViewOptions,
    content_area: Rect,
    mounted: bool,
}

impl<T: 'static> MasonryView<T> {
    pub fn new(
        config: &GalleryConfig,
        spawner: impl LocalSpawn + 'static,
        source: impl DataSource<T> + 'static,
        label: impl Fn(&T) -> String + 'static,
    ) -> Self {
        let gallery = Gallery::new(config, TileHost::new(label), spawner).with_data_source(source);
        Self {
            gallery,
            viewport: Rc::new(TerminalViewport::new()),
            options: MasonryViewOptions::default(),
            content_area: Rect::default(),
            mounted: false,
        }
    }

    pub fn with_options(mut self, options: MasonryViewOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_asset_loader(
        self,
        loader: impl Fn(&Item<T>) -> Option<AssetLoad> + 'static,
    ) -> Self {
        self.gallery.host_mut().set_asset_loader(loader);
        self
    }

    pub fn options(&self) -> &MasonryViewOptions {
        &self.options
    }

    pub fn gallery(&self) -> &Gallery<T, TileHost<T>> {
        &self.gallery
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport.state()
    }

    pub fn page_state(&self) -> PageState {
        self.gallery.page_state()
    }

    pub fn refresh(&self) {
        self.gallery.refresh();
        self.viewport.update(Instant::now(), |state| state.to_top());
    }

    pub fn drain_events(&self) -> Vec<GalleryEvent> {
        self.gallery.drain_events()
    }

    pub fn handle_event(&mut self, event: InputEvent, now: Instant) -> MasonryAction {
        let bindings = &self.options.bindings;
        let moved = match event {
            InputEvent::Key(key) => match bindings.action_for(&key) {
                Some(action) => self
                    .viewport
                    .update(now, |state| bindings.apply(state, action)),
                None => return MasonryAction::None,
            },
            InputEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => self
                    .viewport
                    .update(now, |state| state.scroll_y_by(-bindings.wheel_step)),
                MouseEventKind::ScrollDown => self
                    .viewport
                    .update(now, |state| state.scroll_y_by(bindings.wheel_step)),
                MouseEventKind::Click => {
                    return self
                        .tile_at(mouse.x, mouse.y)
                        .map(MasonryAction::Activated)
                        .unwrap_or(MasonryAction::None);
                }
            },
        };
        if moved {
            MasonryAction::Redraw
        } else {
            MasonryAction::None
        }
    }

    /// The tile drawn at terminal cell `(x, y)` in the last frame.
    pub fn tile_at(&self, x: u16, y: u16) -> Option<ItemId> {
        let scroll_y = self.viewport.state().y;
        let window = self.gallery.window();
        let hit = window
            .elements()
            .find(|(_, tile)| {
                render::clip_box(self.content_area, scroll_y, &tile.position)
                    .is_some_and(|clip| clip.rect.contains((x, y).into()))
            })
            .map(|(id, _)| id.clone());
        hit
    }

    /// Advances the gallery to `now` and draws the visible tiles.
    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme, now: Instant) {
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
        self.content_area = content_area;

        if self.mounted {
            self.viewport
                .set_viewport(content_area.width, content_area.height, now);
        } else {
            self.viewport
                .init_viewport(content_area.width, content_area.height);
            self.gallery.mount(self.viewport.clone());
            self.mounted = true;
        }

        self.gallery.tick(now);
        let canvas_h = self.gallery.canvas_height().max(0.0).ceil();
        self.viewport
            .set_content_height(canvas_h.min(u32::MAX as f64) as u32, now);

        buf.set_style(content_area, theme.text_primary);
        let scroll_y = self.viewport.state().y;
        let window = self.gallery.window();
        for (id, tile) in window.elements() {
            let Some(clip) = render::clip_box(content_area, scroll_y, &tile.position) else {
                continue;
            };
            let asset = window.asset_state(id).unwrap_or(AssetState::None);
            draw_tile(buf, clip, tile, asset, theme);
        }
        drop(window);

        if let Some(sb_x) = scrollbar_x {
            render::render_scrollbar(
                Rect::new(sb_x, area.y, 1, area.height),
                buf,
                &self.viewport.state(),
                self.options.scrollbar_style,
            );
        }
    }
}

fn draw_tile(buf: &mut Buffer, clip: ClippedBox, tile: &Tile, asset: AssetState, theme: &Theme) {
    let style = match asset {
        AssetState::Pending => theme.tile_loading,
        AssetState::Failed => theme.tile_failed,
        AssetState::None | AssetState::Loaded => theme.tile,
    };
    buf.set_style(clip.rect, style);
    if clip.width < 2 || clip.height < 2 {
        return;
    }

    let inner = (clip.width - 2) as usize;
    let status = match asset {
        AssetState::Pending => Some("loading…"),
        AssetState::Failed => Some(tile.failure.as_deref().unwrap_or("failed")),
        AssetState::None | AssetState::Loaded => None,
    };

    for dy in 0..clip.rect.height {
        let row = clip.clip_top + dy as u32;
        let y = clip.rect.y + dy;
        let frame = if row == 0 {
            format!("┌{}┐", "─".repeat(inner))
        } else if row + 1 == clip.height {
            format!("└{}┘", "─".repeat(inner))
        } else {
            format!("│{}│", " ".repeat(inner))
        };
        render::render_str_clipped(clip.rect.x, y, 0, clip.rect.width, buf, &frame, style);

        let text = match row {
            1 => Some(tile.label.as_str()),
            2 => status,
            _ => None,
        };
        if let Some(text) = text.filter(|_| row + 1 < clip.height) {
            let max = (clip.rect.width.saturating_sub(2)).min(inner as u16);
            render::render_str_clipped(clip.rect.x + 1, y, 0, max, buf, text, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyCode;
    use crate::input::KeyEvent;
    use crate::input::MouseEvent;
    use futures::FutureExt;
    use futures::executor::LocalPool;
    use futures::future;
    use gallery_core::gallery::PageFuture;
    use std::time::Duration;

    fn config() -> GalleryConfig {
        GalleryConfig {
            base_unit: 8.0,
            gap: 1.0,
            page_size: 6,
            buffer_extent: 4.0,
            near_bottom_threshold: 10.0,
            ..GalleryConfig::default()
        }
    }

    fn tiles(page: usize, size: usize) -> PageFuture<String> {
        let items = (page * size..(page + 1) * size)
            .map(|n| Item::new(format!("t{n}"), format!("tile-{n}")))
            .collect();
        future::ready(Ok(items)).boxed_local()
    }

    fn text(buf: &Buffer) -> String {
        let area = buf.area;
        let mut out = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn first_frames_mount_load_and_draw_tiles() {
        let mut pool = LocalPool::new();
        let mut view = MasonryView::new(&config(), pool.spawner(), tiles, |s: &String| s.clone());
        let theme = Theme::default();
        let area = Rect::new(0, 0, 37, 12);
        let mut buf = Buffer::empty(area);
        let t0 = Instant::now();

        view.render(area, &mut buf, &theme, t0);
        assert!(view.page_state().is_loading);
        pool.run_until_stalled();

        buf = Buffer::empty(area);
        view.render(area, &mut buf, &theme, t0);
        assert_eq!(view.gallery().layout().columns(), 4);
        let screen = text(&buf);
        assert!(screen.contains("tile-0"), "{screen}");
        assert!(screen.contains("┌"));
        assert_eq!(view.viewport().content_h, 45);
        assert_eq!(view.gallery().host().live(), view.gallery().rendered_ids().len());
    }

    #[test]
    fn scrolling_to_the_end_requests_the_next_page() {
        let mut pool = LocalPool::new();
        let mut view = MasonryView::new(&config(), pool.spawner(), tiles, |s: &String| s.clone());
        let theme = Theme::default();
        let area = Rect::new(0, 0, 37, 12);
        let mut buf = Buffer::empty(area);
        let t0 = Instant::now();
        view.render(area, &mut buf, &theme, t0);
        pool.run_until_stalled();
        view.render(area, &mut buf, &theme, t0);

        let action = view.handle_event(InputEvent::Key(KeyEvent::new(KeyCode::End)), t0);
        assert_eq!(action, MasonryAction::Redraw);
        assert_eq!(view.viewport().y, 33);

        view.render(area, &mut buf, &theme, t0 + Duration::from_millis(20));
        assert!(view.page_state().is_loading);
        pool.run_until_stalled();
        assert_eq!(view.gallery().item_count(), 12);
        assert_eq!(view.page_state().current_page, 2);
    }

    #[test]
    fn clicking_a_tile_activates_it() {
        let mut pool = LocalPool::new();
        let mut view = MasonryView::new(&config(), pool.spawner(), tiles, |s: &String| s.clone());
        let theme = Theme::default();
        let area = Rect::new(0, 0, 37, 12);
        let mut buf = Buffer::empty(area);
        let t0 = Instant::now();
        view.render(area, &mut buf, &theme, t0);
        pool.run_until_stalled();
        view.render(area, &mut buf, &theme, t0);

        let click = |x, y| {
            InputEvent::Mouse(MouseEvent {
                x,
                y,
                kind: MouseEventKind::Click,
            })
        };
        assert_eq!(
            view.handle_event(click(2, 2), t0),
            MasonryAction::Activated(ItemId::from("t0"))
        );
        assert_eq!(
            view.handle_event(click(36, 11), t0),
            MasonryAction::None
        );
    }

    #[test]
    fn failed_assets_are_drawn_with_their_error() {
        let mut pool = LocalPool::new();
        let mut view = MasonryView::new(&config(), pool.spawner(), tiles, |s: &String| s.clone())
            .with_asset_loader(|item: &Item<String>| {
                let result = if item.id.as_str() == "t0" {
                    Err(AssetError("404".into()))
                } else {
                    Ok(())
                };
                Some(future::ready(result).boxed_local())
            });
        let theme = Theme::default();
        let area = Rect::new(0, 0, 37, 12);
        let mut buf = Buffer::empty(area);
        let t0 = Instant::now();
        view.render(area, &mut buf, &theme, t0);
        pool.run_until_stalled();
        view.render(area, &mut buf, &theme, t0);

        let window = view.gallery().window();
        assert_eq!(window.asset_state(&ItemId::from("t0")), Some(AssetState::Failed));
        assert_eq!(window.asset_state(&ItemId::from("t1")), Some(AssetState::Loaded));
        drop(window);
        assert!(text(&buf).contains("404"));
    }
}
