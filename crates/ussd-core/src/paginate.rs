//! Splitting of replies that exceed the per-message length limit.
//!
//! Lengths are counted in characters, not bytes. A long reply is cut at the
//! last newline that still leaves room for the "more" suffix; the rest is
//! returned as a remainder for the engine to stash on the session.

/// Result of paginating one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Text to send now (suffix included when there is a remainder).
    pub visible: String,
    /// Text withheld for the next page.
    pub remainder: Option<String>,
}

/// Message paginator with a fixed character budget.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    max_chars: usize,
}

impl Paginator {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Paginate `text`, appending `more_suffix` to the visible part when a
    /// remainder is withheld.
    ///
    /// Text without a usable newline is returned unmodified even when it is
    /// over the limit: it is never cut mid-word.
    pub fn paginate(&self, text: &str, more_suffix: &str) -> Page {
        if text.chars().count() <= self.max_chars {
            return Page {
                visible: text.to_string(),
                remainder: None,
            };
        }

        let budget = self.max_chars.saturating_sub(more_suffix.chars().count());
        // A newline at char index <= budget leaves at most `budget` visible chars.
        let cut = text
            .char_indices()
            .take(budget + 1)
            .filter(|(_, c)| *c == '\n')
            .map(|(byte_idx, _)| byte_idx)
            .last();

        let Some(byte_idx) = cut else {
            return Page {
                visible: text.to_string(),
                remainder: None,
            };
        };

        let head = &text[..byte_idx];
        let rest = &text[byte_idx + 1..];
        if rest.trim().is_empty() {
            return Page {
                visible: head.to_string(),
                remainder: None,
            };
        }

        Page {
            visible: format!("{head}{more_suffix}"),
            remainder: Some(rest.to_string()),
        }
    }
}
