//! Report rendering helpers and the output-size guard.
//!
//! Every tool renders its result as either a Markdown report or a
//! pretty-printed JSON document, selected by the shared `response_format`
//! parameter. Rendered output is capped at [`CHARACTER_LIMIT`] characters.
//! Listings shrink by re-rendering the first half of their items with a
//! trailing note ([`shrink_listing`]); free-form reports are clipped at the
//! tail with a bracketed hint ([`clip_tail`]). Neither path ever drops a
//! result to zero items.

/// Maximum number of characters a tool response may contain.
pub const CHARACTER_LIMIT: usize = 25_000;

/// The output representation a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Human-readable Markdown report (the default).
    #[default]
    Markdown,
    /// Machine-readable pretty-printed JSON.
    Json,
}

impl ResponseFormat {
    /// Parse the wire value of the `response_format` parameter.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "markdown" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Shorten free text to at most `max_chars` characters, appending `...`
/// when anything was cut. Used for notes and descriptions inside listings.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Render a listing, shrinking it to fit the character limit.
///
/// `render` produces the full report for a slice of items; the `bool` flag
/// tells it the listing was truncated (so it can mark the title). If the
/// full render exceeds [`CHARACTER_LIMIT`], the listing is re-rendered once
/// with the first `max(1, n / 2)` items and `note(kept, total)` appended.
/// A single oversized item is kept rather than dropped.
pub fn shrink_listing<T>(
    items: &[T],
    render: impl Fn(&[T], bool) -> String,
    note: impl Fn(usize, usize) -> String,
) -> String {
    let full = render(items, false);
    if items.is_empty() || full.chars().count() <= CHARACTER_LIMIT {
        return full;
    }
    let kept = std::cmp::max(1, items.len() / 2);
    let mut out = render(&items[..kept], true);
    out.push_str(&note(kept, items.len()));
    out
}

/// Clip an oversized free-form report at the tail.
///
/// The result is at most [`CHARACTER_LIMIT`] characters and ends with a
/// bracketed note carrying `hint`, a suggestion for how the caller can
/// shrink the next request.
pub fn clip_tail(text: String, hint: &str) -> String {
    if text.chars().count() <= CHARACTER_LIMIT {
        return text;
    }
    let note =
        format!("\n\n[Response truncated - exceeded {CHARACTER_LIMIT} character limit. {hint}]");
    let kept = CHARACTER_LIMIT.saturating_sub(note.chars().count());
    let mut out: String = text.chars().take(kept).collect();
    out.push_str(&note);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_formats() {
        assert_eq!(ResponseFormat::parse("markdown"), Some(ResponseFormat::Markdown));
        assert_eq!(ResponseFormat::parse("json"), Some(ResponseFormat::Json));
        assert_eq!(ResponseFormat::parse("yaml"), None);
    }

    #[test]
    fn preview_keeps_short_text_intact() {
        assert_eq!(preview("hello", 200), "hello");
    }

    #[test]
    fn preview_cuts_long_text_with_ellipsis() {
        let long = "x".repeat(250);
        let cut = preview(&long, 200);
        assert_eq!(cut.chars().count(), 203);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn small_listing_is_untouched() {
        let items: Vec<u32> = (0..10).collect();
        let out = shrink_listing(
            &items,
            |slice, truncated| {
                assert!(!truncated);
                format!("{} items", slice.len())
            },
            |_, _| unreachable!("note must not be rendered"),
        );
        assert_eq!(out, "10 items");
    }

    #[test]
    fn oversized_listing_keeps_half_the_items() {
        let items: Vec<u32> = (0..10).collect();
        let out = shrink_listing(
            &items,
            |slice, truncated| {
                if truncated {
                    format!("{} items", slice.len())
                } else {
                    "y".repeat(CHARACTER_LIMIT + 1)
                }
            },
            |kept, total| format!("\n\n**Note**: Showing {kept} of {total} items."),
        );
        assert_eq!(out, "5 items\n\n**Note**: Showing 5 of 10 items.");
    }

    #[test]
    fn single_oversized_item_is_kept() {
        let items = vec![0u32];
        let out = shrink_listing(
            &items,
            |slice, truncated| {
                if truncated {
                    format!("{} item", slice.len())
                } else {
                    "y".repeat(CHARACTER_LIMIT + 1)
                }
            },
            |kept, total| format!(" ({kept}/{total})"),
        );
        assert_eq!(out, "1 item (1/1)");
    }

    #[test]
    fn clip_tail_caps_length_and_appends_hint() {
        let text = "z".repeat(CHARACTER_LIMIT + 500);
        let out = clip_tail(text, "Try reducing max_results.");
        assert_eq!(out.chars().count(), CHARACTER_LIMIT);
        assert!(out.ends_with("Try reducing max_results.]"));
    }

    #[test]
    fn clip_tail_leaves_small_text_alone() {
        let out = clip_tail("short".to_string(), "unused");
        assert_eq!(out, "short");
    }
}
