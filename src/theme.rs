use ratatui::style::{Color, Modifier, Style};

/// Colors used by the reader.
#[derive(Clone, Debug)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub title: Color,
    pub status: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
}

/// Deep teal background with solarized-style foregrounds.
pub const LECTERN: Palette = Palette {
    background: Color::Rgb(0x00, 0x28, 0x33),
    foreground: Color::Reset,
    title: Color::Rgb(0x93, 0xa1, 0xa1),
    status: Color::Rgb(0x65, 0x7b, 0x83),
    selection_bg: Color::Rgb(0x07, 0x36, 0x42),
    selection_fg: Color::Rgb(0xb5, 0x89, 0x00),
};

impl Palette {
    pub fn base(&self) -> Style {
        Style::default().bg(self.background).fg(self.foreground)
    }

    pub fn title_style(&self) -> Style {
        self.base().fg(self.title).add_modifier(Modifier::BOLD)
    }

    pub fn status_style(&self) -> Style {
        self.base().fg(self.status)
    }

    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .fg(self.selection_fg)
            .add_modifier(Modifier::BOLD)
    }
}
