use crossterm::event::DisableMouseCapture;
use crossterm::event::EnableMouseCapture;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEventKind;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::LocalPool;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Constraint;
use ratatui::layout::Direction;
use ratatui::layout::Layout;
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui_gallery::crossterm_input::input_event_from_crossterm;
use ratatui_gallery::gallery_core::config::GalleryConfig;
use ratatui_gallery::gallery_core::error::AssetError;
use ratatui_gallery::gallery_core::error::FetchError;
use ratatui_gallery::gallery_core::event::GalleryEvent;
use ratatui_gallery::gallery_core::gallery::PageFuture;
use ratatui_gallery::gallery_core::item::Item;
use ratatui_gallery::gallery_core::window::AssetLoad;
use ratatui_gallery::masonry_view::MasonryAction;
use ratatui_gallery::masonry_view::MasonryView;
use ratatui_gallery::theme::Theme;
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const TOTAL_PHOTOS: usize = 500;

#[derive(Clone, Debug)]
struct Photo {
    number: usize,
    title: String,
}

/// Pretends to be a paged HTTP endpoint.
fn fetch_photos(page: usize, page_size: usize) -> PageFuture<Photo> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(350));
        let start = page * page_size;
        let end = (start + page_size).min(TOTAL_PHOTOS);
        let photos: Vec<Item<Photo>> = (start..end)
            .map(|number| {
                Item::new(
                    format!("photo-{number}"),
                    Photo {
                        number,
                        title: format!("Photo #{number}"),
                    },
                )
            })
            .collect();
        let _ = tx.send(photos);
    });
    async move { rx.await.map_err(|err| FetchError::from_error(&err)) }.boxed_local()
}

/// Every 13th photo is broken; the rest take a while to "download".
fn load_thumbnail(item: &Item<Photo>) -> Option<AssetLoad> {
    let number = item.payload.number;
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150 + (number % 7) as u64 * 90));
        let result = if number % 13 == 0 {
            Err(AssetError(format!("thumbnail {number} unavailable")))
        } else {
            Ok(())
        };
        let _ = tx.send(result);
    });
    Some(
        async move {
            rx.await
                .unwrap_or_else(|_| Err(AssetError("loader went away".into())))
        }
        .boxed_local(),
    )
}

fn init_logging() -> io::Result<()> {
    let Ok(path) = std::env::var("GALLERY_LOG") else {
        return Ok(());
    };
    let file = std::fs::File::create(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gallery_core=debug,ratatui_gallery=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_config() -> io::Result<GalleryConfig> {
    match std::env::var("GALLERY_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(path)?;
            GalleryConfig::from_json_str(&raw).map_err(io::Error::other)
        }
        Err(_) => Ok(GalleryConfig {
            base_unit: 12.0,
            gap: 1.0,
            buffer_extent: 24.0,
            near_bottom_threshold: 36.0,
            ..GalleryConfig::default()
        }),
    }
}

fn main() -> io::Result<()> {
    init_logging()?;
    let config = load_config()?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let theme = Theme::default();
    let mut pool = LocalPool::new();
    let mut view = MasonryView::new(&config, pool.spawner(), fetch_photos, |photo: &Photo| {
        photo.title.clone()
    })
    .with_asset_loader(load_thumbnail);

    let res = run(&mut terminal, &theme, &mut pool, &mut view);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

fn run<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    theme: &Theme,
    pool: &mut LocalPool,
    view: &mut MasonryView<Photo>,
) -> io::Result<()> {
    let mut status = String::from("loading…");
    loop {
        pool.run_until_stalled();
        for event in view.drain_events() {
            match event {
                GalleryEvent::PageLoaded {
                    page, total_items, ..
                } => status = format!("page {page} loaded, {total_items} photos"),
                GalleryEvent::LoadError { error, page } => {
                    status = format!("page {page} failed: {error} (scroll to retry)")
                }
                GalleryEvent::ItemEnteredViewport { .. } | GalleryEvent::ItemLeftViewport { .. } => {}
            }
        }

        terminal.draw(|f| {
            let area = f.area();
            let [main, footer] = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(1), Constraint::Length(1)])
                .areas(area);

            let block = Block::default()
                .title("MasonryView (j/k, ↑/↓, PgUp/PgDn, g/G, wheel, click, r refresh, q)")
                .borders(Borders::ALL);
            let inner = block.inner(main);
            f.render_widget(block, main);

            let buf = f.buffer_mut();
            view.render(inner, buf, theme, Instant::now());

            let state = view.page_state();
            let pct = view.viewport().percent_y().unwrap_or(0);
            let rendered = view.gallery().rendered_ids().len();
            let more = if state.has_more { "" } else { "  (end)" };
            let line = format!(
                "{status}  tiles={rendered}  scroll={pct}%{}{more}",
                if state.is_loading { "  fetching…" } else { "" }
            );
            buf.set_span(footer.x, footer.y, &Span::styled(line, Style::default()), footer.width);
        })?;

        if crossterm::event::poll(Duration::from_millis(16))? {
            let event = crossterm::event::read()?;
            if let Event::Key(key) = &event {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('r') => {
                            view.refresh();
                            status = String::from("refreshing…");
                            continue;
                        }
                        _ => {}
                    }
                }
            }
            if let Some(input) = input_event_from_crossterm(event) {
                if let MasonryAction::Activated(id) = view.handle_event(input, Instant::now()) {
                    status = format!("selected {id}");
                }
            }
        }
    }
}
