//! Escaping of text destined for a quoted SQL literal.
//!
//! Every character is looked up in a fixed table that marks it as quote-like,
//! backslash-like or neither. The sets cover the ASCII characters as well as
//! the Unicode look-alikes that some server encodings fold back into them.
//!
//! Prefer binding parameters through [`crate::command::Command`]. These
//! functions exist for callers that still have to produce literal SQL text.

use std::borrow::Cow;

const BACKSLASH_CHARS: &[char] = &[
    '\u{005c}', '\u{00a5}', '\u{0160}', '\u{20a9}', '\u{2216}', '\u{fe68}', '\u{ff3c}',
];

const QUOTE_CHARS: &[char] = &[
    '\u{0022}', '\u{0027}', '\u{0060}', '\u{00b4}', '\u{02b9}', '\u{02ba}', '\u{02bb}', '\u{02bc}',
    '\u{02c8}', '\u{02ca}', '\u{02cb}', '\u{02d9}', '\u{0300}', '\u{0301}', '\u{2018}', '\u{2019}',
    '\u{201a}', '\u{2032}', '\u{2035}', '\u{275b}', '\u{275c}', '\u{ff07}',
];

const TABLE_SIZE: usize = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    None,
    Quote,
    Backslash,
}

static CHAR_CLASSES: [CharClass; TABLE_SIZE] = build_char_classes();

const fn build_char_classes() -> [CharClass; TABLE_SIZE] {
    let mut table = [CharClass::None; TABLE_SIZE];
    let mut idx = 0;
    while idx < BACKSLASH_CHARS.len() {
        table[BACKSLASH_CHARS[idx] as usize] = CharClass::Backslash;
        idx += 1;
    }
    let mut idx = 0;
    while idx < QUOTE_CHARS.len() {
        table[QUOTE_CHARS[idx] as usize] = CharClass::Quote;
        idx += 1;
    }
    table
}

/// Class of a single character. Characters outside the Basic Multilingual
/// Plane are never special.
pub fn classify(character: char) -> CharClass {
    CHAR_CLASSES
        .get(character as usize)
        .copied()
        .unwrap_or(CharClass::None)
}

pub fn needs_escaping(text: &str) -> bool {
    text.chars().any(|character| classify(character) != CharClass::None)
}

/// Puts a backslash in front of every quote-like and backslash-like
/// character.
///
/// ```
/// use sql_helper_core::escape::escape_backslash_style;
///
/// assert_eq!(escape_backslash_style("O'Brien"), "O\\'Brien");
/// assert_eq!(escape_backslash_style("plain"), "plain");
/// ```
pub fn escape_backslash_style(text: &str) -> Cow<'_, str> {
    if !needs_escaping(text) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for character in text.chars() {
        if classify(character) != CharClass::None {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    Cow::Owned(escaped)
}

/// Doubles quote-like characters and puts a backslash in front of
/// backslash-like ones.
///
/// ```
/// use sql_helper_core::escape::escape_quote_style;
///
/// assert_eq!(escape_quote_style("O'Brien"), "O''Brien");
/// ```
pub fn escape_quote_style(text: &str) -> Cow<'_, str> {
    if !needs_escaping(text) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for character in text.chars() {
        match classify(character) {
            CharClass::Quote => escaped.push(character),
            CharClass::Backslash => escaped.push('\\'),
            CharClass::None => {}
        }
        escaped.push(character);
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use crate::escape::{
        BACKSLASH_CHARS, CharClass, QUOTE_CHARS, classify, escape_backslash_style,
        escape_quote_style, needs_escaping,
    };

    const PLAIN: &[&str] = &[
        "",
        "plain",
        "select 1",
        "Grüße aus Köln",
        "日本語のテキスト",
        "emoji 🦀 outside the table",
        "tabs\tand\nnewlines",
    ];

    #[test]
    fn classifies_every_listed_character() {
        for &character in BACKSLASH_CHARS {
            assert_eq!(classify(character), CharClass::Backslash, "{character:?}");
        }
        for &character in QUOTE_CHARS {
            assert_eq!(classify(character), CharClass::Quote, "{character:?}");
        }
    }

    #[test]
    fn unlisted_characters_are_plain() {
        let special = BACKSLASH_CHARS.len() + QUOTE_CHARS.len();
        let plain = (0..=0xffff_u32)
            .filter_map(char::from_u32)
            .filter(|&character| classify(character) == CharClass::None)
            .count();
        // 2048 surrogate code points have no char representation.
        assert_eq!(plain + special, 0x10000 - 0x800);
        assert_eq!(classify('\u{1f980}'), CharClass::None);
        assert_eq!(classify('\u{10ffff}'), CharClass::None);
    }

    #[test]
    fn plain_text_is_returned_unchanged() {
        for &text in PLAIN {
            assert!(!needs_escaping(text));
            assert!(matches!(escape_backslash_style(text), Cow::Borrowed(out) if out == text));
            assert!(matches!(escape_quote_style(text), Cow::Borrowed(out) if out == text));
        }
    }

    #[test]
    fn needs_escaping_matches_identity() {
        let samples = PLAIN
            .iter()
            .copied()
            .chain(["O'Brien", "back\\slash", "\u{2018}curly\u{2019}", "¥100", "x\u{0301}"]);
        for text in samples {
            assert_eq!(!needs_escaping(text), escape_backslash_style(text) == text);
        }
    }

    #[test]
    fn backslash_style() {
        assert_eq!(escape_backslash_style("O'Brien"), "O\\'Brien");
        assert_eq!(escape_backslash_style("back\\slash"), "back\\\\slash");
        assert_eq!(escape_backslash_style("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_backslash_style("\u{20a9}5"), "\\\u{20a9}5");
        assert_eq!(escape_backslash_style("\u{2018}a\u{2019}"), "\\\u{2018}a\\\u{2019}");
    }

    #[test]
    fn quote_style() {
        assert_eq!(escape_quote_style("O'Brien"), "O''Brien");
        assert_eq!(escape_quote_style("back\\slash"), "back\\\\slash");
        assert_eq!(escape_quote_style("`tick`"), "``tick``");
        assert_eq!(escape_quote_style("\u{ff07}\u{ff3c}"), "\u{ff07}\u{ff07}\\\u{ff3c}");
    }

    #[test]
    fn every_special_character_is_escaped_once() {
        for &character in BACKSLASH_CHARS {
            let text = character.to_string();
            assert_eq!(escape_backslash_style(&text), format!("\\{character}"));
            assert_eq!(escape_quote_style(&text), format!("\\{character}"));
        }
        for &character in QUOTE_CHARS {
            let text = character.to_string();
            assert_eq!(escape_backslash_style(&text), format!("\\{character}"));
            assert_eq!(escape_quote_style(&text), format!("{character}{character}"));
        }
    }

    #[test]
    fn escaping_twice_escapes_again() {
        let once = escape_backslash_style("O'Brien").into_owned();
        let twice = escape_backslash_style(&once).into_owned();
        assert_eq!(twice, "O\\\\\\'Brien");
        assert_ne!(once, twice);

        let once = escape_quote_style("O'Brien").into_owned();
        let twice = escape_quote_style(&once).into_owned();
        assert_eq!(twice, "O''''Brien");
    }
}
