//! PDF header sniffing.
//!
//! Runs before the document is handed to lopdf so that obviously wrong input
//! (HTML, images, empty uploads) fails fast with a readable message.

use crate::error::{Error, Result};

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Some producers put junk before the header; readers accept it within the first KiB.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Detect the PDF version declared in the file header.
///
/// # Returns
/// * `Ok(version)` such as `"1.7"` if the data starts with a PDF header
/// * `Err(Error::DocumentOpen)` otherwise
pub fn detect_pdf_version(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = window
        .windows(PDF_MAGIC_LEN)
        .position(|w| w == PDF_MAGIC)
        .ok_or_else(|| Error::DocumentOpen("missing %PDF- header".to_string()))?;

    let version_start = start + PDF_MAGIC_LEN;
    let version_bytes = data
        .get(version_start..version_start + VERSION_LEN)
        .ok_or_else(|| Error::DocumentOpen("truncated PDF header".to_string()))?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::DocumentOpen(format!(
            "unsupported PDF version: {}",
            version
        )));
    }

    Ok(version)
}

/// Check if bytes carry a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_pdf_version(data).is_ok()
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    let chars: Vec<char> = version.chars().collect();
    chars.len() == 3 && chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_pdf() {
        let data = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3";
        assert_eq!(detect_pdf_version(data).unwrap(), "1.7");
    }

    #[test]
    fn test_detect_header_after_junk() {
        let data = b"\xef\xbb\xbfjunk%PDF-1.4\n";
        assert_eq!(detect_pdf_version(data).unwrap(), "1.4");
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = detect_pdf_version(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::DocumentOpen(_))));
    }

    #[test]
    fn test_detect_too_short() {
        assert!(matches!(
            detect_pdf_version(b"%PDF-1"),
            Err(Error::DocumentOpen(_))
        ));
        assert!(!is_pdf_bytes(b""));
    }

    #[test]
    fn test_version_validation() {
        assert!(is_valid_version("1.0"));
        assert!(is_valid_version("2.0"));
        assert!(!is_valid_version("10.0"));
        assert!(!is_valid_version("abc"));
    }
}
