//! Description linkification
//!
//! Splits free text into plain-text and link segments. The presentation
//! layer renders each segment itself, so user text is never interpolated
//! into markup.
//!
//! # Example
//!
//! ```
//! use taskboard_shared::linkify::{linkify, Segment};
//!
//! let segments = linkify("Docs at https://example.com today");
//! assert_eq!(segments.len(), 3);
//! assert!(matches!(&segments[1], Segment::Link { href, .. } if href == "https://example.com"));
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One piece of a linkified description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Literal text
    Text { text: String },

    /// A bare URL; `text` is what gets displayed
    Link { href: String, text: String },
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("valid URL pattern"))
}

/// Tokenizes `input` into text and link segments
///
/// URLs are `http://` or `https://` followed by any run of non-whitespace.
/// Empty input yields no segments.
pub fn linkify(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for found in url_pattern().find_iter(input) {
        if found.start() > cursor {
            segments.push(Segment::Text {
                text: input[cursor..found.start()].to_string(),
            });
        }
        segments.push(Segment::Link {
            href: found.as_str().to_string(),
            text: found.as_str().to_string(),
        });
        cursor = found.end();
    }

    if cursor < input.len() {
        segments.push(Segment::Text {
            text: input[cursor..].to_string(),
        });
    }

    segments
}
