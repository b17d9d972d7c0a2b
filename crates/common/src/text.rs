/// Lower-cased `title + " " + body`, the haystack keyword rules search.
pub fn searchable_text(title: &str, body: &str) -> String {
    let mut buf = String::with_capacity(title.len() + body.len() + 1);
    buf.push_str(title);
    buf.push(' ');
    buf.push_str(body);
    buf.to_lowercase()
}

/// Parses the final path segment of an API url as a number,
/// e.g. `.../issues/42` -> 42.
pub fn trailing_number(url: &str) -> Option<i64> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<i64>().ok())
}

pub fn preview(body: &[u8], limit: usize) -> String {
    if body.is_empty() {
        return String::new();
    }
    let text = String::from_utf8_lossy(body);
    let mut truncated: String = text.chars().take(limit).collect();
    if truncated.len() < text.len() {
        truncated.push('…');
    }
    truncated
}
