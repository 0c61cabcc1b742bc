use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEventKind;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
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
use ratatui_gallery::fixed_list_view::FixedListAction;
use ratatui_gallery::fixed_list_view::FixedListView;
use ratatui_gallery::fixed_list_view::FixedListViewOptions;
use ratatui_gallery::theme::Theme;
use std::io;
use std::time::Duration;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let theme = Theme::default();
    let items: Vec<String> = (0..200_000)
        .map(|i| format!("{i:06}  The quick brown fox jumps over the lazy dog"))
        .collect();

    let mut list = FixedListView::with_options(FixedListViewOptions {
        multi_select: true,
        selection_follows_cursor: false,
        ..Default::default()
    });
    list.set_cursor(Some(0), items.len());

    let res = run(&mut terminal, &theme, &items, &mut list);

    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

fn run<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    theme: &Theme,
    items: &[String],
    list: &mut FixedListView,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| {
            let area = f.area();
            let [main, status] = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(1), Constraint::Length(1)])
                .areas(area);

            let block = Block::default()
                .title("FixedListView (j/k, ↑/↓, PgUp/PgDn, g/G, Space, Enter, q)")
                .borders(Borders::ALL);
            let inner = block.inner(main);
            f.render_widget(block, main);

            let buf = f.buffer_mut();
            list.render(inner, buf, theme, items.len(), |index| {
                items.get(index).cloned().unwrap_or_default()
            });

            let cursor = list.cursor().unwrap_or(0);
            let pct = list.viewport.percent_y().unwrap_or(0);
            let sel = list.selected().len();
            let pooled = list.pool_len();
            let status_line =
                format!("cursor={cursor}  selected={sel}  scroll={pct}%  pooled rows={pooled}");
            let status_span = Span::styled(status_line, Style::default());
            buf.set_span(status.x, status.y, &status_span, status.width);
        })?;

        if crossterm::event::poll(Duration::from_millis(50))? {
            let event = crossterm::event::read()?;
            if let Event::Key(key) = &event {
                if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Char('q')) {
                    return Ok(());
                }
            }

            if let Some(ev) = input_event_from_crossterm(event) {
                match list.handle_event(ev, items.len()) {
                    FixedListAction::Activated(idx) => {
                        if let Some(s) = items.get(idx) {
                            tracing::info!(item = %s, "activated");
                        }
                    }
                    FixedListAction::Redraw
                    | FixedListAction::SelectionChanged
                    | FixedListAction::None => {}
                }
            }
        }
    }
}
