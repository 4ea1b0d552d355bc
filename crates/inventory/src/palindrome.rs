//! Palindrome classification of item names.

/// Returns `true` when `text` reads the same forwards and backwards.
///
/// Comparison is case-insensitive and ignores every character outside
/// `[A-Za-z0-9]`. Text with nothing left after stripping is **not** a palindrome.
pub fn is_palindrome(text: &str) -> bool {
    let cleaned: Vec<u8> = text
        .bytes()
        .filter(u8::is_ascii_alphanumeric)
        .map(|b| b.to_ascii_lowercase())
        .collect();

    if cleaned.is_empty() {
        return false;
    }

    cleaned.iter().eq(cleaned.iter().rev())
}

/// Display label used next to an item name, e.g. `"Palindrome: YES"`.
pub fn palindrome_status(text: &str) -> &'static str {
    if is_palindrome(text) {
        "Palindrome: YES"
    } else {
        "Palindrome: NO"
    }
}
