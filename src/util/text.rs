use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;

const NUMBER_ESCAPE_CHAR: &[char] = &['¥', '%', ',', ' ', '"', '\n', '\r'];

/// Converts a GBK encoded byte slice to a UTF-8 `String`.
///
/// The quote and search endpoints answer in GBK. Malformed sequences are replaced
/// with U+FFFD instead of failing, so a single broken name never discards a quote.
pub fn gbk_2_utf8(data: &[u8]) -> String {
    let (text, _, _) = encoding_rs::GBK.decode(data);
    text.into_owned()
}

/// 是否剛好為 6 個 ASCII 數字
pub fn is_six_digits(s: &str) -> bool {
    s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a `f64` from a string after removing escape characters.
///
/// # Arguments
///
/// * `s`: The text to parse, e.g. `"1,690.00"`.
/// * `escape_chars`: Extra characters to drop before parsing.
pub fn parse_f64(s: &str, escape_chars: Option<Vec<char>>) -> Result<f64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    f64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as f64 because {:?}", cleaned, why))
}

/// Parses a `Decimal` from a string after removing escape characters.
pub fn parse_decimal(s: &str, escape_chars: Option<Vec<char>>) -> Result<Decimal> {
    let cleaned = clean_escape_chars(s, escape_chars);
    Decimal::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as Decimal because {:?}", cleaned, why))
}

/// Parses a `u64` from a string after removing escape characters.
pub fn parse_u64(s: &str, escape_chars: Option<Vec<char>>) -> Result<u64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    u64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as u64 because {:?}", cleaned, why))
}

/// Removes the default number escape characters plus `escape_chars` from `s`.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}
