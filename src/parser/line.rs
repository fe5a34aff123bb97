//! Normalization of raw config lines before classification.

use itertools::Itertools;

const COMMENT: char = '#';
const QUOTE: char = '"';

/// Strip the comment, pad `=` with single spaces and collapse whitespace.
///
/// A `#` inside double quotes is literal; an unterminated quote protects
/// the rest of the line.
pub fn normalize(raw: &str) -> String {
    let mut content = String::with_capacity(raw.len() + 4);
    let mut quoted = false;
    for ch in raw.chars() {
        match ch {
            QUOTE => {
                quoted = !quoted;
                content.push(ch);
            }
            COMMENT if !quoted => break,
            '=' => content.push_str(" = "),
            _ => content.push(ch),
        }
    }
    content.split_whitespace().join(" ")
}
