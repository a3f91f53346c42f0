use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use quadrobobr_core::routes::{Route, Section};

use crate::app::{App, AppState, LoginFocus};

use super::styles;

/// Sidebar width in columns
const SIDEBAR_WIDTH: u16 = 30;

pub fn render(frame: &mut Frame, app: &App) {
    match app.route {
        Route::Login => render_login(frame, app),
        Route::Home | Route::Section(_) => render_layout(frame, app),
    }

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingLogout => render_confirm_overlay(frame, "Sign out of the console?", "sign out"),
        AppState::ConfirmingQuit => render_confirm_overlay(frame, "Are you sure you want to quit?", "quit"),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn logo_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled("           Q U A D R O B O B R", styles::title_style())),
        Line::from(Span::styled("               admin console", styles::muted_style())),
    ]
}

// ============================================================================
// Login
// ============================================================================

fn render_login(frame: &mut Frame, app: &App) {
    // Fixed size dialog - compact
    let height = if app.login_error.is_some() { 13 } else { 11 };
    let area = centered_rect_fixed(46, height, frame.area());

    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));

    let email_focused = app.login_focus == LoginFocus::Email;
    let email_style = styles::field_style(email_focused);
    let email_display = format!("{:<22}", tail(&app.login_email, 22));
    let cursor = if email_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("    "),
        Span::styled("Email:    [", styles::muted_style()),
        Span::styled(format!("{}{}", email_display, cursor), email_style),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let password_style = styles::field_style(password_focused);
    let password_masked: String = "*".repeat(app.login_password.chars().count().min(22));
    let password_display = format!("{:<22}", password_masked);
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("    "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{}{}", password_display, cursor), password_style),
        Span::styled("]", styles::muted_style()),
    ]));

    let button_focused = app.login_focus == LoginFocus::Button;
    let button_style = styles::field_style(button_focused);
    lines.push(Line::from(""));
    let button_label = if button_focused { " ▶ Sign in ◀ " } else { "   Sign in   " };
    lines.push(Line::from(vec![
        Span::raw("               ["),
        Span::styled(button_label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Last `max` characters of `s`, so the cursor end of a long field stays visible
fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(max)).collect()
}

// ============================================================================
// Signed-in layout
// ============================================================================

fn render_layout(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Body
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);

    render_sidebar(frame, app, body[0]);
    render_content(frame, app, body[1]);
    render_status_bar(frame, app, chunks[2]);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Quadrobobr Admin";
    let help_hint = "[?] Help";
    let crumb = match app.route {
        Route::Section(section) => format!(" / {}", section.label()),
        _ => String::new(),
    };
    let used = title.len() + crumb.chars().count() + help_hint.len() + 4;

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::styled(crumb, styles::accent_style()),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used))),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn menu_key(index: usize) -> char {
    char::from_digit(((index + 1) % 10) as u32, 10).unwrap_or(' ')
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(12), Constraint::Length(6)])
        .split(area);

    let mut lines = Vec::with_capacity(Section::ALL.len());
    for (i, section) in Section::ALL.iter().enumerate() {
        let active = app.route == Route::Section(*section);
        let style = styles::menu_item_style(i == app.menu_selection, active);

        let mut spans = vec![
            Span::styled(format!(" [{}] ", menu_key(i)), styles::muted_style()),
            Span::styled(section.label(), style),
        ];
        if *section == Section::Messages {
            if let Some(count) = app.unread_count.filter(|c| *c > 0) {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(format!(" {} ", count), styles::unread_badge_style()));
            }
        }
        lines.push(Line::from(spans));
    }

    let menu = Block::default()
        .borders(Borders::ALL)
        .title(" Menu ")
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(menu), parts[0]);

    // Greeting is read from the session on every draw
    let mut user_lines = Vec::new();
    match app.session.identity() {
        Some(identity) => {
            user_lines.push(Line::from(Span::styled(
                format!(" {}", identity.display_name()),
                styles::text_style(),
            )));
            user_lines.push(Line::from(Span::styled(
                format!(" {}", identity.email),
                styles::muted_style(),
            )));
            if let Some(role) = identity.role {
                user_lines.push(Line::from(Span::styled(format!(" {}", role), styles::muted_style())));
            }
        }
        None => user_lines.push(Line::from(Span::styled(" (no profile)", styles::muted_style()))),
    }
    user_lines.push(Line::from(vec![
        Span::styled(" [l]", styles::key_hint_style()),
        Span::styled(" Sign out", styles::error_style()),
    ]));

    let user = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(user_lines).block(user), parts[1]);
}

fn render_content(frame: &mut Frame, app: &App, area: Rect) {
    let base_url = app.session.api().base_url();

    let (title, lines) = match app.route {
        Route::Section(section) => {
            let mut lines = vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Collection: ", styles::muted_style()),
                    Span::styled(
                        format!("{}{}", base_url, section.api_collection()),
                        styles::accent_style(),
                    ),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "  Records in this section are edited through the REST API above.",
                    styles::text_style(),
                )),
            ];
            if section == Section::Messages {
                let unread = match app.unread_count {
                    Some(count) => count.to_string(),
                    None => "unknown".to_string(),
                };
                lines.push(Line::from(""));
                lines.push(Line::from(vec![
                    Span::styled("  Unread messages: ", styles::muted_style()),
                    Span::styled(unread, styles::count_style()),
                ]));
            }
            (format!(" {} ", section.label()), lines)
        }
        _ => {
            let name = app
                .session
                .identity()
                .map(|identity| identity.display_name())
                .unwrap_or_default();
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(format!("  Welcome, {}", name), styles::title_style())),
                Line::from(""),
                Line::from(Span::styled(
                    "  Choose a section from the menu with ↑/↓ and Enter, or press its number.",
                    styles::text_style(),
                )),
            ];
            (" Dashboard ".to_string(), lines)
        }
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[r]efresh | [l] sign out | [q]uit";

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.session.api().base_url()),
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

// ============================================================================
// Overlays
// ============================================================================

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 14, frame.area());
    frame.render_widget(Clear, area);

    let keys = [
        ("↑/↓ j/k", "Move in menu"),
        ("Enter", "Open section"),
        ("1-9, 0", "Jump to section"),
        ("h", "Dashboard"),
        ("r", "Refresh unread count"),
        ("l", "Sign out"),
        ("q", "Quit"),
        ("?/Esc", "Close help"),
    ];

    let mut lines = vec![
        Line::from(Span::styled("  Keyboard shortcuts", styles::title_style())),
        Line::from(""),
    ];
    for (key, desc) in keys {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<10}", key), styles::key_hint_style()),
            Span::styled(desc, styles::text_style()),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_confirm_overlay(frame: &mut Frame, question: &str, action: &str) {
    // Fixed size dialog matching the login view
    let area = centered_rect_fixed(46, 9, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(format!("   {}", question), styles::accent_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::key_hint_style()),
            Span::styled(format!(" to {}, ", action), styles::muted_style()),
            Span::styled("[N]", styles::key_hint_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
