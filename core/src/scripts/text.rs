//! Small text helpers shared by the HTML and document scrapers.

use regex::Regex;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"))
}

fn space_pattern() -> &'static Regex {
    static SPACE: OnceLock<Regex> = OnceLock::new();
    SPACE.get_or_init(|| Regex::new(r"[ \t\r\n]+").expect("static regex"))
}

/// Remove every markup tag.
pub fn strip_tags(markup: &str) -> String {
    tag_pattern().replace_all(markup, "").into_owned()
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn squash_whitespace(text: &str) -> String {
    space_pattern().replace_all(text, " ").trim().to_string()
}

/// Decode the named entities HTML and WordprocessingML actually emit plus
/// numeric character references.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            decode_entity(entity).map(|ch| (ch, end + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nested_markup() {
        assert_eq!(strip_tags("<b>bold <i>and</i></b> plain"), "bold and plain");
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry &#8217;s &#x41; &lt;3"), "Tom & Jerry \u{2019}s A <3");
        assert_eq!(decode_entities("AT&T & co"), "AT&T & co");
    }

    #[test]
    fn squashes_whitespace() {
        assert_eq!(squash_whitespace("  a \n\t b  "), "a b");
    }
}
