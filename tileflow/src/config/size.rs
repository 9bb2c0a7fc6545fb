//! Byte sizes written as `64MB`, `512K`, `1GB` or plain byte counts.

use thiserror::Error;

const KB: usize = 1024;
const MB: usize = 1024 * KB;
const GB: usize = 1024 * MB;

/// Longest suffixes first so `MB` wins over `B`.
const SUFFIXES: [(&str, usize); 7] = [
    ("GB", GB),
    ("G", GB),
    ("MB", MB),
    ("M", MB),
    ("KB", KB),
    ("K", KB),
    ("B", 1),
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{0}', expected e.g. '64MB', '512KB' or a byte count")]
pub struct SizeParseError(String);

/// Parse a size string into bytes. Suffixes are case-insensitive and use
/// binary multiples.
pub fn parse_size(input: &str) -> Result<usize, SizeParseError> {
    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|rest| (rest.trim(), *mult)))
        .unwrap_or((upper.as_str(), 1));

    digits
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| SizeParseError(trimmed.to_string()))
}

/// Render bytes with the largest suffix that divides them exactly.
pub fn format_size(bytes: usize) -> String {
    match bytes {
        0 => "0".to_string(),
        b if b % GB == 0 => format!("{}GB", b / GB),
        b if b % MB == 0 => format!("{}MB", b / MB),
        b if b % KB == 0 => format!("{}KB", b / KB),
        b => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("2K").unwrap(), 2048);
        assert_eq!(parse_size("64MB").unwrap(), 64 * MB);
        assert_eq!(parse_size(" 1 gb ").unwrap(), GB);
        assert_eq!(parse_size("10B").unwrap(), 10);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-5MB").is_err());
        assert!(parse_size("99999999999999999999GB").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(64 * MB), "64MB");
        assert_eq!(format_size(3 * KB), "3KB");
        assert_eq!(format_size(1000), "1000");
        assert_eq!(parse_size(&format_size(5 * GB)).unwrap(), 5 * GB);
    }
}
