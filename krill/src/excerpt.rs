use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_MAX_LENGTH: usize = 300;

static LEADING_PARTIAL_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S*\s*").expect("static regex"));
static TRAILING_PARTIAL_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\S*$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    pub text: String,
    pub clipped_left: bool,
    pub clipped_right: bool,
}

/// A window of at most `max_length` characters, centered on the first match
/// of `pattern` when one is given and found. Clipped ends are cut back to a
/// word boundary. A match longer than the window is returned whole.
pub fn excerpt(text: &str, pattern: Option<&Regex>, max_length: usize) -> Excerpt {
    let len = text.chars().count();
    if len <= max_length {
        return Excerpt {
            text: text.to_string(),
            clipped_left: false,
            clipped_right: false,
        };
    }

    // offsets[i] is the byte offset of char i; the last entry is text.len()
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_index = |byte: usize| offsets.binary_search(&byte).unwrap_or_else(|i| i);

    let Some(found) = pattern.and_then(|p| p.find(text)) else {
        return Excerpt {
            text: clip_right(&text[..offsets[max_length]]),
            clipped_left: false,
            clipped_right: true,
        };
    };

    let start = char_index(found.start());
    let end = char_index(found.end());
    let match_length = end - start;
    if match_length >= max_length {
        return Excerpt {
            text: found.as_str().to_string(),
            clipped_left: start > 0,
            clipped_right: end < len,
        };
    }

    let remaining = max_length - match_length;
    let mut window_start = start.saturating_sub(remaining / 2);
    let window_end = (end + (remaining - (start - window_start))).min(len);
    // Shift left when the text after the match was too short
    window_start = window_end.saturating_sub(max_length);

    let clipped_left = window_start > 0;
    let clipped_right = window_end < len;

    // Only the context around the match is cut back, never the match itself
    let mut before = text[offsets[window_start]..offsets[start]].to_string();
    let mut after = text[offsets[end]..offsets[window_end]].to_string();
    if clipped_left {
        before = LEADING_PARTIAL_WORD.replace(&before, "").into_owned();
    }
    if clipped_right {
        after = clip_right(&after);
    }
    let clipped = format!("{}{}{}", before, found.as_str(), after);

    Excerpt {
        text: clipped,
        clipped_left,
        clipped_right,
    }
}

fn clip_right(text: &str) -> String {
    TRAILING_PARTIAL_WORD.replace(text, "").into_owned()
}
