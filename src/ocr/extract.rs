use regex::Regex;
use std::sync::OnceLock;

/// First maximal run of ASCII digits.
const NUMBER_PATTERN: &str = r"[0-9]+";

/// One to three digits, optionally followed by a percent sign.
const PERCENT_PATTERN: &str = r"([0-9]{1,3})\s*%?";

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NUMBER_PATTERN).expect("NUMBER_PATTERN is valid"))
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PERCENT_PATTERN).expect("PERCENT_PATTERN is valid"))
}

/// Maps glyphs OCR commonly confuses with digits onto those digits.
///
/// `O`/`o` become `0`, `I`/`l` become `1`. Idempotent.
pub fn normalize_ocr_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'I' | 'l' => '1',
            other => other,
        })
        .collect()
}

/// Returns the first run of digits in `text`, ignoring everything after it.
///
/// `"12/45"` yields 12. Runs too long for a `u32` yield `None`.
pub fn extract_first_integer(text: &str) -> Option<u32> {
    number_regex()
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses a percentage, rejecting anything outside 0-100.
pub fn parse_percent_text(text: &str) -> Option<u32> {
    let caps = percent_regex().captures(text)?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    (value <= 100).then_some(value)
}
