//! Markup helpers for user text and engine highlight fragments.

/// Removes markup tags from `text`.
///
/// A `<` only opens a tag when it is followed by a letter, `/`, `!` or `?`,
/// so comparisons such as `a < b` survive. An unterminated tag swallows the
/// rest of the input.
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }
        let opens_tag = matches!(chars.peek(), Some(n) if n.is_alphabetic() || matches!(n, '/' | '!' | '?'));
        if !opens_tag {
            out.push(c);
            continue;
        }
        for inner in chars.by_ref() {
            if inner == '>' {
                break;
            }
        }
    }
    out
}

/// Decodes the named entities engines emit in highlight fragments, plus
/// decimal and hex character references. Unknown entities are left as-is.
pub fn decode_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let Some(end) = candidate.find(';').filter(|end| *end <= 10) else {
            out.push('&');
            rest = &candidate[1..];
            continue;
        };
        match decode_entity(&candidate[1..end]) {
            Some(decoded) => {
                out.push(decoded);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_tags() {
        assert_eq!(strip_tags("<b>hello</b> world"), "hello world");
        assert_eq!(strip_tags("<script>alert(1)</script>x"), "alert(1)x");
    }

    #[test]
    fn keeps_lone_angle_brackets() {
        assert_eq!(strip_tags("a < b and c > d"), "a < b and c > d");
    }

    #[test]
    fn unterminated_tag_drops_tail() {
        assert_eq!(strip_tags("keep <em never closed"), "keep ");
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(decode_html_entities("caf&eacute; &amp; th&#233; &#x41;"), "caf&eacute; & thé A");
        assert_eq!(decode_html_entities("&lt;term&gt;"), "<term>");
        assert_eq!(decode_html_entities("fish & chips"), "fish & chips");
    }
}
