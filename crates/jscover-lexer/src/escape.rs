//! Literal decoding: numeric values and escape sequences

/// Numeric value of a `Number` token
pub fn parse_number(text: &str) -> Option<f64> {
    let text: String = text.chars().filter(|c| *c != '_').collect();
    let radix = match text.get(..2) {
        Some("0x") | Some("0X") => 16,
        Some("0o") | Some("0O") => 8,
        Some("0b") | Some("0B") => 2,
        _ => {
            // Legacy octal literals are not supported; `017` reads as 17
            return text.parse::<f64>().ok();
        }
    };
    let digits = &text[2..];
    if digits.is_empty() {
        return None;
    }
    // Fold manually so values beyond u64 keep their f64 approximation
    digits.chars().try_fold(0.0f64, |acc, c| {
        c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
    })
}

/// Value of a quoted `String` token
pub fn string_value(text: &str) -> Option<String> {
    if text.len() < 2 {
        return None;
    }
    unescape(&text[1..text.len() - 1])
}

/// Process escape sequences. Returns `None` for malformed escapes, which is
/// an error in strings and an uncooked quasi in templates.
pub fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\r' {
            // Template text normalizes CRLF and CR to LF
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
            continue;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars.next()?;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().map_or(false, |c| c.is_ascii_digit()) => out.push('\0'),
            '1'..='9' | '0' => return None,
            'x' => {
                let hi = chars.next()?.to_digit(16)?;
                let lo = chars.next()?.to_digit(16)?;
                out.push(char::from_u32(hi * 16 + lo)?);
            }
            'u' => {
                let code = read_unicode_escape(&mut chars)?;
                if (0xD800..0xDC00).contains(&code) {
                    // High surrogate, try to pair it with a following `\uXXXX`
                    let mut lookahead = chars.clone();
                    let low = match (lookahead.next(), lookahead.next()) {
                        (Some('\\'), Some('u')) => read_unicode_escape(&mut lookahead),
                        _ => None,
                    };
                    match low {
                        Some(low) if (0xDC00..0xE000).contains(&low) => {
                            chars = lookahead;
                            let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                            out.push(char::from_u32(combined)?);
                        }
                        _ => out.push(char::REPLACEMENT_CHARACTER),
                    }
                } else {
                    out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
            }
            // Line continuation
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }

    Some(out)
}

fn read_unicode_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u32> {
    if chars.peek() == Some(&'{') {
        chars.next();
        let mut code = 0u32;
        let mut digits = 0;
        loop {
            let c = chars.next()?;
            if c == '}' {
                break;
            }
            code = code.checked_mul(16)?.checked_add(c.to_digit(16)?)?;
            digits += 1;
        }
        if digits == 0 || code > 0x10FFFF {
            return None;
        }
        Some(code)
    } else {
        let mut code = 0;
        for _ in 0..4 {
            code = code * 16 + chars.next()?.to_digit(16)?;
        }
        Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_escapes() {
        assert_eq!(unescape(r"a\nb\t\\\'").as_deref(), Some("a\nb\t\\'"));
        assert_eq!(string_value(r#""q\"""#).as_deref(), Some("q\""));
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(unescape(r"\x41B\u{43}").as_deref(), Some("ABC"));
        assert_eq!(unescape(r"\uD83D\uDE00").as_deref(), Some("\u{1F600}"));
        assert_eq!(unescape(r"\uD83D").as_deref(), Some("\u{FFFD}"));
    }

    #[test]
    fn test_malformed_escapes() {
        assert_eq!(unescape(r"\u00G0"), None);
        assert_eq!(unescape(r"\x4"), None);
        assert_eq!(unescape(r"\1"), None);
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(unescape("a\\\nb").as_deref(), Some("ab"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_number("1_000"), Some(1000.0));
        assert_eq!(parse_number("0xff"), Some(255.0));
        assert_eq!(parse_number("1e-3"), Some(0.001));
        assert_eq!(parse_number("5."), Some(5.0));
        assert_eq!(parse_number("0x"), None);
    }
}
