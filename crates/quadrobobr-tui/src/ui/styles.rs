use ratatui::style::{Color, Modifier, Style};

// Color palette
pub const BRAND: Color = Color::Rgb(214, 120, 40);
pub const OK: Color = Color::Rgb(96, 160, 96);
pub const ACCENT: Color = Color::Rgb(192, 160, 64);
pub const DANGER: Color = Color::Rgb(192, 64, 64);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const FOCUS_BG: Color = Color::Rgb(48, 48, 64);
pub const STATUS_BG: Color = Color::Rgb(32, 32, 40);

pub fn title_style() -> Style {
    Style::default().fg(BRAND).add_modifier(Modifier::BOLD)
}

pub fn text_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn accent_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn key_hint_style() -> Style {
    accent_style().add_modifier(Modifier::BOLD)
}

pub fn count_style() -> Style {
    Style::default().fg(OK)
}

pub fn error_style() -> Style {
    Style::default().fg(DANGER)
}

/// Login form field or button
pub fn field_style(focused: bool) -> Style {
    if focused {
        Style::default().bg(FOCUS_BG).add_modifier(Modifier::BOLD)
    } else {
        text_style()
    }
}

/// Sidebar entry: the cursor wins over the section currently open.
pub fn menu_item_style(selected: bool, open: bool) -> Style {
    match (selected, open) {
        (true, _) => field_style(true),
        (false, true) => title_style(),
        (false, false) => text_style(),
    }
}

pub fn unread_badge_style() -> Style {
    Style::default()
        .bg(DANGER)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(BRAND)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(STATUS_BG).fg(Color::White)
}
