//! Reading of LC-3 object images.
//!
//! Format: big-endian `u16` words, the first one is the origin address where the remaining words
//! are loaded contiguously.
use crate::errors::LoadProgramError;
use std::fs;
use std::path::Path;

/// Reads the image at `path` and returns its words including the origin header.
///
/// # Errors
/// - File is missing or unreadable
/// - File does not contain an origin header
pub fn read_image_file(path: &Path) -> Result<Vec<u16>, LoadProgramError> {
    let bytes = fs::read(path).map_err(|e| LoadProgramError::ImageLoadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_image(&bytes)
}

/// Converts big-endian `bytes` to words, a trailing odd byte is ignored.
///
/// # Errors
/// - Less than one complete word for the origin header
pub fn parse_image(bytes: &[u8]) -> Result<Vec<u16>, LoadProgramError> {
    if bytes.len() < 2 {
        return Err(LoadProgramError::ProgramMissingOrigHeader);
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use std::io::Write;

    #[gtest]
    pub fn test_parse_image_big_endian() {
        let words = parse_image(&[0x30, 0x00, 0xE0, 0x02, 0xF0, 0x22, 0xFF]).unwrap();
        expect_that!(words, eq(&vec![0x3000, 0xE002, 0xF022]));
    }
    #[gtest]
    pub fn test_parse_image_without_header() {
        expect_that!(
            parse_image(&[]),
            err(eq(&LoadProgramError::ProgramMissingOrigHeader))
        );
        expect_that!(
            parse_image(&[0x30]),
            err(eq(&LoadProgramError::ProgramMissingOrigHeader))
        );
    }
    #[gtest]
    pub fn test_read_image_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x30, 0x00, 0xF0, 0x25]).unwrap();
        let words = read_image_file(file.path()).unwrap();
        expect_that!(words, eq(&vec![0x3000, 0xF025]));
    }
    #[gtest]
    pub fn test_read_image_file_missing() {
        let res = read_image_file(Path::new("does/not/exist.obj"));
        expect_that!(
            res.unwrap_err().to_string(),
            starts_with("failed to load image: does/not/exist.obj: ")
        );
    }
}
