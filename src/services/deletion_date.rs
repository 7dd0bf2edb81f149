//! Expected deletion dates encoded in filenames.
//!
//! A few storage directories hold documents whose filename stem ends in an
//! eight digit `YYYYMMDD` date, the date the document is due to be removed.
//! This is a convention, not a format: anything that does not match simply
//! yields no date.

use chrono::NaiveDate;
use std::path::Path;

/// Directories whose uploads carry a deletion date suffix.
pub const DELETE_ON_DIRECTORIES: [i64; 6] = [87, 200, 208, 209, 230, 231];

const DATE_SUFFIX_LEN: usize = 8;

/// Infer the UTC deletion date for `filename` uploaded into `directory_id`.
pub fn infer_deletion_date(directory_id: i64, filename: &str) -> Option<NaiveDate> {
    if !DELETE_ON_DIRECTORIES.contains(&directory_id) {
        return None;
    }

    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let chars: Vec<char> = stem.chars().collect();
    if chars.len() < DATE_SUFFIX_LEN {
        return None;
    }
    let suffix: String = chars[chars.len() - DATE_SUFFIX_LEN..].iter().collect();
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year = suffix[0..4].parse::<i32>().ok()?;
    let month = suffix[4..6].parse::<u32>().ok()?;
    let day = suffix[6..8].parse::<u32>().ok()?;
    // Out-of-range parts (month 13, day 40) yield no date rather than rolling
    // over into a later month, so a malformed suffix never sets a deletion date.
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_suffix_on_listed_directory() {
        assert_eq!(
            infer_deletion_date(87, "ITEM20240115"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_extension_is_ignored() {
        assert_eq!(
            infer_deletion_date(230, "report_20251231.pdf"),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
    }

    #[test]
    fn test_non_digit_suffix() {
        assert_eq!(infer_deletion_date(87, "ITEMABCDEF12"), None);
    }

    #[test]
    fn test_unlisted_directory() {
        assert_eq!(infer_deletion_date(1, "ITEM20240115"), None);
    }

    #[test]
    fn test_short_stem() {
        assert_eq!(infer_deletion_date(87, "2024011.pdf"), None);
        assert_eq!(infer_deletion_date(87, ""), None);
    }

    #[test]
    fn test_exact_eight_digit_stem() {
        assert_eq!(
            infer_deletion_date(208, "20240229.png"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_impossible_date() {
        assert_eq!(infer_deletion_date(87, "ITEM20241340"), None);
        assert_eq!(infer_deletion_date(87, "ITEM20230229"), None);
    }

    #[test]
    fn test_multibyte_stem() {
        assert_eq!(
            infer_deletion_date(209, "überprüfung20240301"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }
}
