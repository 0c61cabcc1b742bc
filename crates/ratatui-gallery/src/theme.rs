use ratatui::style::Style;

#[derive(Clone, Debug)]
pub struct Theme {
    pub text_primary: Style,
    pub text_muted: Style,
    pub accent: Style,
    pub danger: Style,
    pub tile: Style,
    pub tile_loading: Style,
    pub tile_failed: Style,
}

impl Default for Theme {
    fn default() -> Self {
        use ratatui::style::Stylize;

        Self {
            text_primary: Style::default(),
            text_muted: Style::default().dark_gray(),
            accent: Style::default().cyan(),
            danger: Style::default().red(),
            tile: Style::default().white(),
            tile_loading: Style::default().dark_gray(),
            tile_failed: Style::default().red(),
        }
    }
}
