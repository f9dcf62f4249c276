//! Text normalisation for scraped content.

/// Maximum number of characters kept from a single scraped item.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Normalise scraped text before it is validated or stored.
///
/// Whitespace runs (including line breaks and tabs) collapse to a single
/// space, control and zero-width characters are dropped, the result is
/// trimmed and truncated to [`MAX_CONTENT_CHARS`] characters.
#[must_use]
pub fn sanitize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_CONTENT_CHARS * 4));
    let mut pending_space = false;
    let mut kept = 0usize;

    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if c.is_control() || is_invisible(c) {
            continue;
        }
        if pending_space {
            if kept + 1 >= MAX_CONTENT_CHARS {
                break;
            }
            out.push(' ');
            kept += 1;
            pending_space = false;
        }
        if kept >= MAX_CONTENT_CHARS {
            break;
        }
        out.push(c);
        kept += 1;
    }

    out
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}')
}
