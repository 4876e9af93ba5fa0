//! Text helpers for rendering cards and building prompts.

/// Marker appended to a truncated product title
pub const ELLIPSIS: &str = "...";

/// First `max_chars` characters of `text` (counted as chars, not bytes).
pub fn take_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Card title: first `max_chars` characters plus the ellipsis marker.
/// The marker is appended unconditionally, short names included.
pub fn truncate_title(name: &str, max_chars: usize) -> String {
    format!("{}{}", take_chars(name, max_chars), ELLIPSIS)
}

/// Yen label with thousands separators, e.g. `¥12,800`.
pub fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    out.push('¥');

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}
