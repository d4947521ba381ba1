use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::cell::Cell;
use std::sync::Arc;

use crate::api::{Backend, HttpBackend, ItemNamer};
use crate::config::AppConfig;
use crate::shell::{Action, Shell};
use crate::theme::Theme;

/// Lines moved by PgUp/PgDn in the output box
const PAGE_SCROLL: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

pub struct App {
    pub shell: Shell,
    pub popup: Popup,
    pub theme: Theme,

    // Backend origin, shown in the header
    pub origin: String,

    // Last button pressed (highlighted until the next press)
    pub last_action: Option<Action>,

    // Output box scroll offset in screen rows, reset whenever the output is replaced
    pub output_scroll: u16,
    seen_revision: u64,

    // Inner width of the output box, recorded by the last draw
    pub output_width: Cell<u16>,
}

impl App {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let backend = HttpBackend::new(&config.base_url)?;
        let origin = backend.origin().as_str().trim_end_matches('/').to_string();
        Ok(Self::with_backend(Arc::new(backend), origin, config))
    }

    pub fn with_backend(backend: Arc<dyn Backend>, origin: String, config: &AppConfig) -> Self {
        let shell = Shell::new(backend, ItemNamer::new(config.item_prefix.clone()))
            .with_discard_stale(config.discard_stale);

        Self {
            shell,
            popup: Popup::None,
            theme: Theme::from_config(&config.theme),
            origin,
            last_action: None,
            output_scroll: 0,
            seen_revision: 0,
            output_width: Cell::new(0),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Handle popups first
        if self.popup == Popup::Help {
            if matches!(
                key.code,
                KeyCode::Esc
                    | KeyCode::Char('?')
                    | KeyCode::Char('h')
                    | KeyCode::Enter
                    | KeyCode::Char('q')
            ) {
                self.popup = Popup::None;
            }
            return;
        }

        match key.code {
            KeyCode::Char('1') | KeyCode::Char('p') => self.trigger(Action::Ping),
            KeyCode::Char('2') | KeyCode::Char('a') => self.trigger(Action::AddItem),
            KeyCode::Char('3') | KeyCode::Char('g') => self.trigger(Action::GetLatestItem),

            // Output scrolling
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::PageDown => self.scroll_by(PAGE_SCROLL as i32),
            KeyCode::PageUp => self.scroll_by(-(PAGE_SCROLL as i32)),
            KeyCode::Home => self.output_scroll = 0,

            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        self.sync_scroll();
    }

    fn trigger(&mut self, action: Action) {
        self.last_action = Some(action);
        self.shell.trigger(action);
    }

    fn scroll_by(&mut self, delta: i32) {
        let rows = wrapped_rows(self.shell.output(), self.output_width.get());
        let max = rows.saturating_sub(1).min(u16::MAX as usize) as i32;
        let next = (self.output_scroll as i32 + delta).clamp(0, max);
        self.output_scroll = next as u16;
    }

    fn sync_scroll(&mut self) {
        if self.shell.revision() != self.seen_revision {
            self.seen_revision = self.shell.revision();
            self.output_scroll = 0;
        }
    }

    /// Apply any responses that arrived since the last tick
    pub fn tick(&mut self) {
        self.shell.poll_completions();
        self.sync_scroll();
    }
}

/// Screen rows `text` takes once word-wrapped to `width` columns.
///
/// Greedy word wrap, words longer than the width are split across rows. A zero
/// width (nothing drawn yet) counts logical lines.
fn wrapped_rows(text: &str, width: u16) -> usize {
    let width = width as usize;
    if width == 0 {
        return text.lines().count();
    }

    text.lines()
        .map(|line| {
            let mut rows = 1;
            let mut col = 0;
            for word in line.split(' ') {
                let len = word.chars().count();
                let needed = if col == 0 { len } else { col + 1 + len };
                if needed <= width {
                    col = needed;
                    continue;
                }
                if col > 0 {
                    rows += 1;
                }
                // Overlong word fills whole rows, remainder starts the next
                rows += len.saturating_sub(1) / width;
                col = len - (len.saturating_sub(1) / width) * width;
            }
            rows
        })
        .sum()
}
