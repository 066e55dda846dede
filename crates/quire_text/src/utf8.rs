//! Cursor stepping over possibly malformed UTF-8
//!
//! A step covers one decoded code point if the bytes form a valid sequence
//! and exactly one byte otherwise.

/// Byte offset one character after `position`, `None` at the end of `text`
pub fn next_char(text: &[u8], position: usize) -> Option<usize> {
    if position >= text.len() {
        return None;
    }
    let step = text[position..]
        .utf8_chunks()
        .next()
        .and_then(|chunk| chunk.valid().chars().next())
        .map_or(1, char::len_utf8);
    Some(position + step)
}

/// Byte offset one character before `position`, `None` at the start of
/// `text`
pub fn prev_char(text: &[u8], position: usize) -> Option<usize> {
    let position = position.min(text.len());
    if position == 0 {
        return None;
    }
    // The shortest valid suffix is always exactly one code point
    for len in 1..=position.min(4) {
        if std::str::from_utf8(&text[position - len..position]).is_ok() {
            return Some(position - len);
        }
    }
    Some(position - 1)
}
