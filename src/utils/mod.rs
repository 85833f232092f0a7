//! Small string helpers shared by channels and the CLI.

/// Longest prefix of `s` that fits in `max_bytes` without splitting a
/// UTF-8 character.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Single-line excerpt for log output: line breaks become spaces and the
/// text is cut to `max_bytes` with a trailing ellipsis.
pub fn preview(s: &str, max_bytes: usize) -> String {
    let flat = s.replace(['\r', '\n'], " ");
    let cut = truncate_str(&flat, max_bytes);
    if cut.len() < flat.len() {
        format!("{}…", cut)
    } else {
        flat
    }
}
