//! Human-readable size tokens
//!
//! Sizes and offsets are given as plain decimal (`4096`), hexadecimal
//! (`0x1000`), or either one followed by a binary multiplier suffix
//! (`16M`, `16MiB`, `16MB`, `0x10k`). Multipliers are always powers of 1024.

use byte_unit::{Byte, UnitType};

use crate::error::{JtagImageError, Result};

/// One kibibyte
pub const KIB: u64 = 1024;
/// One mebibyte
pub const MIB: u64 = 1024 * KIB;
/// One gibibyte
pub const GIB: u64 = 1024 * MIB;

/// Suffix letters in increasing multiplier order; the empty entry is "no suffix".
const UNITS: [(&str, u64); 4] = [("", 1), ("K", KIB), ("M", MIB), ("G", GIB)];

/// Parse a size token into a byte count.
///
/// Candidates are tried without a suffix first, then K, M and G, with the
/// decimal reading attempted before the hexadecimal one at every step. The
/// first match wins, so `0x1B` is 27 bytes rather than one byte with a `B`
/// suffix.
pub fn parse_size(token: &str) -> Result<u64> {
    for (unit, multiplier) in UNITS {
        let Some(number) = strip_unit(token, unit) else {
            continue;
        };

        let value = parse_decimal(number).or_else(|| parse_hex(number));
        if let Some(value) = value {
            return value
                .checked_mul(multiplier)
                .ok_or_else(|| JtagImageError::invalid_size(format!("'{token}' overflows")));
        }
    }

    Err(JtagImageError::invalid_size(format!("'{token}'")))
}

/// Parse a size token that has to fit into a 32-bit header field.
pub fn parse_size_u32(token: &str) -> Result<u32> {
    let value = parse_size(token)?;
    u32::try_from(value).map_err(|_| {
        JtagImageError::invalid_size(format!(
            "'{token}' ({value:#x}) exceeds the 32-bit address space"
        ))
    })
}

/// Render a byte count for progress output, e.g. `14 MiB`.
pub fn format_size(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{adjusted}")
}

/// Remove `unit` and its optional `i`/`iB`/`B` tail, ignoring case.
fn strip_unit<'a>(token: &'a str, unit: &str) -> Option<&'a str> {
    if unit.is_empty() {
        return Some(token);
    }

    [
        format!("{unit}iB"),
        format!("{unit}i"),
        format!("{unit}B"),
        unit.to_string(),
    ]
    .iter()
    .find_map(|suffix| {
        let split = token.len().checked_sub(suffix.len())?;
        let tail = token.get(split..)?;
        if tail.eq_ignore_ascii_case(suffix) {
            token.get(..split)
        } else {
            None
        }
    })
}

fn parse_decimal(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_hex(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
