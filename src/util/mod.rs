//! Small byte/char helpers shared across the tokenizer and parser,
//! grounded on `html5ever/src/util/str.rs`.

/// Is the character an ASCII alphanumeric character?
#[inline]
pub fn is_ascii_alnum(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Case-insensitive ASCII byte comparison, for `BufferQueue::eat` patterns.
#[inline]
pub fn ascii_ci_eq(buffered: u8, pattern_lower: u8) -> bool {
    buffered.to_ascii_lowercase() == pattern_lower
}

/// Exact byte comparison, for case-sensitive `BufferQueue::eat` patterns.
#[inline]
pub fn ascii_eq(buffered: u8, pattern: u8) -> bool {
    buffered == pattern
}

/// Lowercase an ASCII string; non-ASCII characters are left untouched.
pub fn lowercase_ascii(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}
