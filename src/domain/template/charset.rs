// URI character classes (RFC 3986) shared by every operator

use std::borrow::Cow;

/// One unreserved character or a pct-encoded octet
pub const UNRESERVED_PATTERN: &str = r"(?:[A-Za-z0-9\-._~]|%[0-9A-Fa-f]{2})";

/// One gen-delim or sub-delim
pub const RESERVED_PATTERN: &str = r"[:/?\#\[\]@!$\&'()*+,;=]";

const RESERVED: &str = ":/?#[]@!$&'()*+,;=";

/// Regex fragment matching exactly one allowed character (or pct-triplet)
pub fn character_pattern(allow_reserved: bool) -> String {
    if allow_reserved {
        format!("(?:{}|{})", UNRESERVED_PATTERN, RESERVED_PATTERN)
    } else {
        format!("(?:{})", UNRESERVED_PATTERN)
    }
}

pub fn is_unreserved(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '~')
}

pub fn is_reserved(ch: char) -> bool {
    RESERVED.contains(ch)
}

/// Whether `ch` may appear inside a captured value. `%` is accepted because
/// captured spans have already been checked for well-formed triplets.
pub fn is_allowed(ch: char, allow_reserved: bool) -> bool {
    is_unreserved(ch) || ch == '%' || (allow_reserved && is_reserved(ch))
}

pub fn all_allowed(text: &str, allow_reserved: bool) -> bool {
    text.chars().all(|ch| is_allowed(ch, allow_reserved))
}

/// Percent-encode everything outside the operator's allowed set.
///
/// With `allow_reserved`, reserved characters and existing pct-triplets
/// pass through unchanged.
pub fn encode(text: &str, allow_reserved: bool) -> Cow<'_, str> {
    if !allow_reserved {
        return urlencoding::encode(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        if is_pct_triplet(rest) {
            out.push_str(&rest[..3]);
            rest = &rest[3..];
            continue;
        }

        if is_unreserved(ch) || is_reserved(ch) {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
        rest = &rest[ch.len_utf8()..];
    }
    Cow::Owned(out)
}

/// Percent-decode captured text. Octets that do not form valid UTF-8 are
/// replaced rather than rejected.
pub fn decode(text: &str) -> String {
    match urlencoding::decode(text) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(text.as_bytes())).into_owned(),
    }
}

/// First `max_chars` characters of `text`
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn is_pct_triplet(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 3
        && bytes[0] == b'%'
        && bytes[1].is_ascii_hexdigit()
        && bytes[2].is_ascii_hexdigit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_encode_unreserved_only() {
        assert_eq!(encode("Hello World!", false), "Hello%20World%21");
        assert_eq!(encode("/foo/bar", false), "%2Ffoo%2Fbar");
        assert_eq!(encode("a-b.c_d~e", false), "a-b.c_d~e");
    }

    #[test]
    fn test_encode_allows_reserved() {
        assert_eq!(encode("Hello World!", true), "Hello%20World!");
        assert_eq!(encode("/foo/bar", true), "/foo/bar");
        assert_eq!(encode("50%", true), "50%25");
        assert_eq!(encode("caf%C3%A9", true), "caf%C3%A9");
        assert_eq!(encode("café", true), "caf%C3%A9");
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("Hello%20World%21"), "Hello World!");
        assert_eq!(decode("caf%C3%A9"), "café");
        assert_eq!(decode("%FF"), "\u{FFFD}");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("value", 3), "val");
        assert_eq!(truncate("value", 30), "value");
        assert_eq!(truncate("ééé", 2), "éé");
    }

    #[test]
    fn test_character_patterns_compile() {
        let unreserved = Regex::new(&format!("^{}*$", character_pattern(false))).unwrap();
        assert!(unreserved.is_match("abc-._~%2F"));
        assert!(!unreserved.is_match("a/b"));
        assert!(!unreserved.is_match("%G1"));

        let reserved = Regex::new(&format!("^{}*$", character_pattern(true))).unwrap();
        assert!(reserved.is_match("/foo/bar?x=1&y=[2]#frag"));
        assert!(!reserved.is_match("a b"));
    }
}
