use scraper::ElementRef;

pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>()
}

/// Text of `node` with every text piece trimmed, empty pieces dropped and the
/// rest joined by single spaces.
pub fn extract_trimmed_text(node: ElementRef) -> String {
    node.text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes spaces used as thousands separators ("12 345" and "12\u{a0}345").
pub fn strip_digit_separators(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}' && *c != '\u{202f}')
        .collect()
}

/// Last run of ASCII digits in `text`, parsed.
pub fn last_digit_run(text: &str) -> Option<u64> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .next_back()
        .and_then(|run| run.parse().ok())
}

/// Final path segment of a URL, ignoring a trailing slash, query and fragment.
pub fn last_path_segment(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
