//! Field encoding for `key=value` translation lines.
//!
//! Escapes: `\\`, `\n`, `\r`, `\t` and `\x3D` for `=`. Unknown escapes decode to themselves.

pub const SEPARATOR: char = '=';

pub fn encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '=' => out.push_str("\\x3D"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn decode(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('\\') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx + 1..];
        let (decoded, consumed) = match tail.chars().next() {
            Some('\\') => (Some('\\'), 1),
            Some('n') => (Some('\n'), 1),
            Some('r') => (Some('\r'), 1),
            Some('t') => (Some('\t'), 1),
            Some('x') => match tail
                .get(1..3)
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                Some(byte) if byte.is_ascii() => (Some(char::from(byte)), 3),
                _ => (None, 0),
            },
            _ => (None, 0),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('\\');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Splits a line into a decoded `(key, value)` pair.
///
/// Lines without exactly one separator, or with an empty side after decoding, yield `None`.
pub fn split_entry(line: &str) -> Option<(String, String)> {
    let mut parts = line.split(SEPARATOR);
    let key = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let key = decode(key);
    let value = decode(value);
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

pub fn encode_entry(key: &str, value: &str) -> String {
    let mut line = encode(key);
    line.push(SEPARATOR);
    line.push_str(&encode(value));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_inverts_encode() {
        for s in [
            "a=b",
            "line1\nline2\r\n",
            r"C:\path\n",
            "\\x3D literal",
            "tab\there",
            "",
        ] {
            assert_eq!(decode(&encode(s)), s, "input {s:?}");
        }
    }

    #[test]
    fn encoded_fields_never_contain_separator() {
        assert!(!encode("1+1=2").contains('='));
    }

    #[test]
    fn unknown_escapes_are_kept() {
        assert_eq!(decode(r"\q\x4"), r"\q\x4");
        assert_eq!(decode("end\\"), "end\\");
    }

    #[test]
    fn split_entry_rejects_malformed_lines() {
        assert_eq!(
            split_entry("Hello=Bonjour"),
            Some(("Hello".to_string(), "Bonjour".to_string()))
        );
        assert_eq!(
            split_entry(r"a\x3Db=c\nd"),
            Some(("a=b".to_string(), "c\nd".to_string()))
        );
        assert_eq!(split_entry("no separator"), None);
        assert_eq!(split_entry("a=b=c"), None);
        assert_eq!(split_entry("=value"), None);
        assert_eq!(split_entry("key="), None);
    }

    #[test]
    fn entry_line_round_trip() {
        let line = encode_entry("x=y", "multi\nline");
        assert_eq!(
            split_entry(&line),
            Some(("x=y".to_string(), "multi\nline".to_string()))
        );
    }
}
