use std::error::Error;

use clap::{Parser, ValueEnum};
use sql_helper_core::escape::{escape_backslash_style, escape_quote_style};

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum EscapeStyle {
    /// Backslash before every quote and backslash
    #[default]
    Backslash,
    /// Double quotes, backslash before backslashes
    Quote,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Escape text for a quoted SQL literal", long_about = None)]
#[must_use]
pub struct Escape {
    #[arg(long, value_enum, default_value_t)]
    style: EscapeStyle,
    text: Vec<String>,
}

impl Escape {
    pub fn run(self) -> Result<(), Box<dyn Error>> {
        for text in &self.text {
            let escaped = match self.style {
                EscapeStyle::Backslash => escape_backslash_style(text),
                EscapeStyle::Quote => escape_quote_style(text),
            };
            println!("{escaped}");
        }
        Ok(())
    }
}
