//! Theme colors
//! Defaults follow the classic blue/green/amber button palette; any slot can be
//! overridden from the `[theme]` table in config.toml.

use ratatui::style::Color;

use crate::config::ThemeConfig;
use crate::shell::Action;

/// Theme colors for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub ping: Color,     // Ping button (#007bff)
    pub add: Color,      // Add item button (#28a745)
    pub get: Color,      // Get latest button (#ffc107)
    pub text: Color,     // Output text
    pub text_dim: Color, // Description, hints
    pub border: Color,   // Output box border
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            ping: Color::Rgb(0, 123, 255),
            add: Color::Rgb(40, 167, 69),
            get: Color::Rgb(255, 193, 7),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            border: Color::Rgb(88, 91, 112),
        }
    }
}

impl Theme {
    /// Build the theme from config overrides, keeping defaults for missing or bad values
    pub fn from_config(config: &ThemeConfig) -> Self {
        let defaults = Self::default();
        let pick = |slot: &str, value: &Option<String>, fallback: Color| -> Color {
            match value.as_deref() {
                None => fallback,
                Some(raw) => Self::parse_hex_color(raw).unwrap_or_else(|| {
                    tracing::warn!("Ignoring invalid theme color {} = {:?}", slot, raw);
                    fallback
                }),
            }
        };

        Self {
            ping: pick("ping", &config.ping, defaults.ping),
            add: pick("add", &config.add, defaults.add),
            get: pick("get", &config.get, defaults.get),
            text: pick("text", &config.text, defaults.text),
            text_dim: pick("text_dim", &config.text_dim, defaults.text_dim),
            border: pick("border", &config.border, defaults.border),
        }
    }

    /// Button color for an action
    pub fn action(&self, action: Action) -> Color {
        match action {
            Action::Ping => self.ping,
            Action::AddItem => self.add,
            Action::GetLatestItem => self.get,
        }
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');
        if !s.is_ascii() {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}
