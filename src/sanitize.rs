//! Title to filename sanitization.

/// Maximum length of a sanitized base name, in characters, before the extension.
pub const MAX_BASE_LEN: usize = 120;

/// Longest file name most Linux filesystems accept, in bytes.
pub const NAME_MAX: usize = 255;

/// Bytes left free for the `(n)` or `_<secs>_<n>` suffix a collision may add.
pub const SUFFIX_RESERVE: usize = 24;

/// Label used when a title sanitizes down to nothing.
pub const FALLBACK_LABEL: &str = "pixabay_audio";

/// Characters that are never allowed in the output.
pub const UNSAFE_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

const SUBSTITUTE: char = '_';
const SEPARATOR: char = '_';

/// Builds a lower-case, filesystem-safe file name from a free-text title.
///
/// - Replaces `\ / * ? : " < > |`, NUL and control characters with `_`
/// - Trims surrounding whitespace and dots, collapses inner whitespace runs to `_`
/// - Appends `_<hash_hint>` when given, then limits the base to [`MAX_BASE_LEN`] chars
///   and the whole name to [`NAME_MAX`] bytes minus [`SUFFIX_RESERVE`]
/// - Falls back to [`FALLBACK_LABEL`] when nothing usable is left
///
/// `extension` may be given with or without its leading dot; an empty one
/// yields a name without extension.
pub fn safe_filename(title: &str, extension: &str, hash_hint: Option<&str>) -> String {
    let mut base = sanitize_title(title);
    if let Some(hint) = hash_hint.map(sanitize_title).filter(|h| h != FALLBACK_LABEL) {
        base.push(SEPARATOR);
        base.push_str(&hint);
    }

    // Lower-case first: case mapping can change the char count.
    let base = truncate_chars(&base.to_lowercase(), MAX_BASE_LEN);
    let ext = normalize_extension(extension);
    let byte_budget = NAME_MAX.saturating_sub(SUFFIX_RESERVE + ext.len());
    format!("{}{ext}", truncate_bytes(&base, byte_budget))
}

/// Sanitizes a title on its own, without extension, hash or length bound.
pub fn sanitize_title(title: &str) -> String {
    let trimmed = title.trim_matches(|c: char| c.is_whitespace() || c == '.');

    let mut out = String::with_capacity(trimmed.len());
    let mut in_whitespace = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push(SEPARATOR);
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if UNSAFE_CHARS.contains(&c) || c.is_control() {
            out.push(SUBSTITUTE);
        } else {
            out.push(c);
        }
    }

    if out.chars().all(|c| c == SUBSTITUTE || c == SEPARATOR || c == '.') {
        FALLBACK_LABEL.to_string()
    } else {
        out
    }
}

/// Lower-cases an extension and guarantees a single leading dot.
pub fn normalize_extension(extension: &str) -> String {
    let ext = extension.trim().trim_start_matches('.');
    if ext.is_empty() {
        String::new()
    } else {
        format!(".{}", ext.to_lowercase())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Cuts `s` to at most `max` bytes without splitting a character.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}
