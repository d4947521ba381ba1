use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Popup};
use crate::shell::Action;

const TITLE: &str = "Full Stack Test Client";

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(4), // Title + description
            Constraint::Length(3), // Buttons
            Constraint::Min(5),    // Output
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_header(f, app, chunks[0]);
    draw_buttons(f, app, chunks[1]);
    draw_output(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);

    if app.popup == Popup::Help {
        draw_help_popup(f, app);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            TITLE,
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Exercises the backend at ", Style::default().fg(theme.text_dim)),
            Span::styled(app.origin.as_str(), Style::default().fg(theme.ping)),
            Span::styled(
                ", which in turn talks to its database.",
                Style::default().fg(theme.text_dim),
            ),
        ]),
    ])
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(theme.border)),
    )
    .wrap(Wrap { trim: true });

    f.render_widget(header, area);
}

fn draw_buttons(f: &mut Frame, app: &App, area: Rect) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    for (action, cell) in Action::ALL.iter().zip(cells.iter()) {
        let color = app.theme.action(*action);
        let pressed = app.last_action == Some(*action);

        // Amber needs dark text, like the original yellow button
        let label_fg = if *action == Action::GetLatestItem { Color::Black } else { Color::White };
        let (label_style, border_style) = if pressed {
            (
                Style::default().fg(label_fg).bg(color).add_modifier(Modifier::BOLD),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )
        } else {
            (Style::default().fg(color), Style::default().fg(color))
        };

        let button = Paragraph::new(Line::from(Span::styled(action.label(), label_style)))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style),
            );
        f.render_widget(button, *cell);
    }
}

fn draw_output(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    // Borders take one column on each side
    app.output_width.set(area.width.saturating_sub(2));

    let output = Paragraph::new(app.shell.output())
        .style(Style::default().fg(theme.text))
        .block(
            Block::default()
                .title(Span::styled(" Output ", Style::default().fg(theme.text_dim)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.output_scroll, 0));

    f.render_widget(output, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let hints: Vec<(&str, &str)> = vec![
        ("1", "Ping"),
        ("2", "Add"),
        ("3", "Latest"),
        ("↑↓", "Scroll"),
        ("h", "Help"),
        ("q", "Quit"),
    ];

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 50 { 3 } else { hints.len() };

    let mut hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(theme.ping)),
                Span::styled(format!(" {} │ ", action), Style::default().fg(theme.text_dim)),
            ]
        })
        .collect();

    let in_flight = app.shell.in_flight();
    if in_flight > 0 {
        hint_spans.push(Span::styled(
            format!("󰔟 {} pending", in_flight),
            Style::default().fg(theme.get),
        ));
    }

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 90 } else { 60 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().fg(theme.get).add_modifier(Modifier::BOLD),
        ))
    };
    let entry = |key: &'static str, text: &'static str| {
        Line::from(vec![
            Span::styled(key, Style::default().fg(theme.ping)),
            Span::raw(text),
        ])
    };

    let help_text = vec![
        section("═══ Actions ═══"),
        entry("  1 / p     ", "GET  /api/ping"),
        entry("  2 / a     ", "POST /api/add-item with a fresh TestItem name"),
        entry("  3 / g     ", "GET  /api/get-latest-item"),
        Line::from(""),
        section("═══ Output ═══"),
        entry("  ↑/↓ j/k   ", "Scroll one line"),
        entry("  PgUp/PgDn ", "Scroll one page"),
        entry("  Home      ", "Back to top"),
        Line::from(""),
        section("═══ Command Line ═══"),
        entry("  stackprobe --ping           ", "One request, print, exit"),
        entry("  stackprobe --base-url URL   ", "Point at another backend"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(theme.text_dim)),
            Span::styled("h", Style::default().fg(theme.ping)),
            Span::styled("/", Style::default().fg(theme.text_dim)),
            Span::styled("Esc", Style::default().fg(theme.ping)),
            Span::styled(" to close", Style::default().fg(theme.text_dim)),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" stackprobe Help ", Style::default().fg(theme.ping)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.ping)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, Backend, Endpoint};
    use crate::config::AppConfig;
    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::Value;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl Backend for Unreachable {
        async fn call(&self, _endpoint: &Endpoint) -> Result<Value, ApiError> {
            Err(ApiError::Transport("network down".to_string()))
        }
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn test_app() -> App {
        App::with_backend(
            Arc::new(Unreachable),
            "http://localhost:8000".to_string(),
            &AppConfig::default(),
        )
    }

    #[test]
    fn test_draws_buttons_and_greeting() {
        let screen = render(&test_app());

        assert!(screen.contains(TITLE));
        assert!(screen.contains("http://localhost:8000"));
        for action in Action::ALL {
            assert!(screen.contains(action.label()));
        }
        assert!(screen.contains("Click a button to test your full stack!"));
    }

    #[test]
    fn test_records_output_width() {
        let app = test_app();
        render(&app);

        // 100 columns minus the output box borders
        assert_eq!(app.output_width.get(), 98);
    }

    #[test]
    fn test_draws_help_popup() {
        let mut app = test_app();
        app.popup = Popup::Help;

        let screen = render(&app);
        assert!(screen.contains("stackprobe Help"));
    }

    #[tokio::test]
    async fn test_draws_error_output_and_pending_count() {
        let mut app = test_app();
        app.shell.trigger(Action::Ping);
        assert!(render(&app).contains("1 pending"));

        while app.shell.next_completion().await.is_some() {}

        let screen = render(&app);
        assert!(screen.contains("Error pinging backend: network down"));
        assert!(!screen.contains("pending"));
    }
}
