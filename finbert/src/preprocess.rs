use displaydoc::Display;
use regex::Regex;
use thiserror::Error;

/// A text cleaner for raw news snippets.
///
/// Lowercases the text, strips urls and symbols and trims surrounding whitespace.
pub struct TextCleaner {
    urls: Regex,
    symbols: Regex,
}

/// The potential errors of the text cleaner.
#[derive(Debug, Display, Error)]
pub enum CleanerError {
    /// Failed to compile a cleaning pattern: {0}
    Pattern(#[from] regex::Error),
}

impl TextCleaner {
    /// Creates a text cleaner.
    pub fn new() -> Result<Self, CleanerError> {
        Ok(TextCleaner {
            urls: Regex::new(r"https?://\S+")?,
            symbols: Regex::new(r"[^\w\s]")?,
        })
    }

    /// Cleans the raw text.
    pub fn clean(&self, raw: &str) -> String {
        let clean = raw.to_lowercase();
        let clean = self.urls.replace_all(&clean, "");
        let clean = self.symbols.replace_all(&clean, "");
        clean.trim().to_string()
    }
}
