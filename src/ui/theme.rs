use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Overall background color to paint the full frame
    pub background_color: Color,
    pub text_style: Style,

    // Chrome
    pub title_style: Style,
    pub border_style: Style,
    pub error_style: Style,
    pub notice_style: Style,

    // Dataset editor: header row and alternating cells
    pub dsv_header_even: Style,
    pub dsv_header_odd: Style,
    pub dsv_cell_even: Style,
    pub dsv_cell_odd: Style,

    // Markdown
    pub md_heading: Style,
    pub md_emphasis: Style,
    pub md_strong: Style,
    pub md_strikethrough: Style,
    pub md_code: Style,
    pub md_link: Style,
    pub md_quote: Style,
    pub md_rule: Style,

    // Typewriter: freshly revealed characters and the cursor marker
    pub glyph_fresh: Style,
    pub cursor_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Black,
            text_style: Style::default().fg(Color::White),

            title_style: Style::default().fg(Color::Gray),
            border_style: Style::default().fg(Color::DarkGray),
            error_style: Style::default().fg(Color::LightRed),
            notice_style: Style::default().fg(Color::Yellow),

            dsv_header_even: Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
            dsv_header_odd: Style::default()
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD),
            dsv_cell_even: Style::default().fg(Color::Cyan),
            dsv_cell_odd: Style::default().fg(Color::Magenta),

            md_heading: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            md_emphasis: Style::default().add_modifier(Modifier::ITALIC),
            md_strong: Style::default().add_modifier(Modifier::BOLD),
            md_strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            md_code: Style::default().fg(Color::LightYellow),
            md_link: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
            md_quote: Style::default().fg(Color::Gray),
            md_rule: Style::default().fg(Color::DarkGray),

            glyph_fresh: Style::default().add_modifier(Modifier::DIM),
            cursor_style: Style::default().fg(Color::Gray),
        }
    }

    pub fn light() -> Self {
        Theme {
            background_color: Color::White,
            text_style: Style::default().fg(Color::Black),

            title_style: Style::default().fg(Color::DarkGray),
            border_style: Style::default().fg(Color::Gray),
            error_style: Style::default().fg(Color::Red),
            notice_style: Style::default().fg(Color::Rgb(0x99, 0x66, 0x00)),

            dsv_header_even: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            dsv_header_odd: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            dsv_cell_even: Style::default().fg(Color::Blue),
            dsv_cell_odd: Style::default().fg(Color::Magenta),

            md_heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            md_emphasis: Style::default().add_modifier(Modifier::ITALIC),
            md_strong: Style::default().add_modifier(Modifier::BOLD),
            md_strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            md_code: Style::default().fg(Color::Rgb(0x80, 0x40, 0x00)),
            md_link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            md_quote: Style::default().fg(Color::DarkGray),
            md_rule: Style::default().fg(Color::Gray),

            glyph_fresh: Style::default().add_modifier(Modifier::DIM),
            cursor_style: Style::default().fg(Color::DarkGray),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "dark" | "default" | "default-dark" => Self::dark_default(),
            "light" => Self::light(),
            // Fallback
            _ => Self::dark_default(),
        }
    }

    /// Cell style for column `index` of the header row or a data row.
    pub fn dsv_cell(&self, index: usize, header: bool) -> Style {
        match (header, index % 2 == 0) {
            (true, true) => self.dsv_header_even,
            (true, false) => self.dsv_header_odd,
            (false, true) => self.dsv_cell_even,
            (false, false) => self.dsv_cell_odd,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark_default()
    }
}
