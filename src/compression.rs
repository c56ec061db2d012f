//! Gzip handling for volume files
//!
//! `.nii.gz`, `.hdr.gz` and `.img.gz` files are gzip streams, sometimes with
//! several members (as written by parallel compressors). Whether a stream is
//! compressed is decided from its first two bytes, so a mislabelled file
//! still loads.
//!
//! # Examples
//!
//! ```
//! use nifti_mpr::compression::{gzip, inflate_if_needed, CompressionLevel, CompressionType};
//!
//! # fn main() -> Result<(), nifti_mpr::VolumeError> {
//! let data = vec![7u8; 4096];
//! let packed = gzip(&data, CompressionLevel::Fast)?;
//! assert_eq!(CompressionType::detect(&packed), CompressionType::Gzip);
//! assert_eq!(inflate_if_needed(packed)?, data);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, VolumeError};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Encoding of a volume byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
}

impl CompressionType {
    /// Classify a stream by its leading bytes
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(&GZIP_MAGIC) {
            CompressionType::Gzip
        } else {
            CompressionType::None
        }
    }

    /// Encoding suggested by a `.gz` suffix
    pub fn from_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => CompressionType::Gzip,
            _ => CompressionType::None,
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompressionType::None => "raw",
            CompressionType::Gzip => "gzip",
        })
    }
}

/// Effort spent by [`gzip`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    Fast,
    #[default]
    Default,
    Best,
}

impl From<CompressionLevel> for flate2::Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Fast => flate2::Compression::fast(),
            CompressionLevel::Default => flate2::Compression::default(),
            CompressionLevel::Best => flate2::Compression::best(),
        }
    }
}

/// Gzip `data` into a single-member stream
pub fn gzip(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), level.into());
    encoder.write_all(data)?;
    let packed = encoder.finish()?;
    debug!(raw = data.len(), packed = packed.len(), "Gzip stream written");
    Ok(packed)
}

/// Fully decode a gzip stream, following every member
fn gunzip(reader: impl Read, size_hint: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size_hint);
    MultiGzDecoder::new(reader)
        .read_to_end(&mut out)
        .map_err(|e| VolumeError::Format(format!("corrupt gzip stream: {}", e)))?;
    Ok(out)
}

/// Inflate `data` if it is a gzip stream, otherwise return it unchanged
pub fn inflate_if_needed(data: Vec<u8>) -> Result<Vec<u8>> {
    match CompressionType::detect(&data) {
        CompressionType::None => Ok(data),
        CompressionType::Gzip => gunzip(data.as_slice(), data.len().saturating_mul(4)),
    }
}

/// Read a whole file, inflating it when its content is gzip
///
/// # Errors
///
/// - [`VolumeError::Io`] - File missing or unreadable
/// - [`VolumeError::Format`] - Gzip content is truncated or corrupt
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let on_disk = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    let mut reader = BufReader::new(file);

    let kind = CompressionType::detect(reader.fill_buf()?);
    if kind != CompressionType::from_path(path) {
        warn!(
            path = %path.display(),
            content = %kind,
            "File extension does not match its compression"
        );
    }

    let bytes = match kind {
        CompressionType::Gzip => gunzip(reader, on_disk.saturating_mul(4))?,
        CompressionType::None => {
            let mut bytes = Vec::with_capacity(on_disk);
            reader.read_to_end(&mut bytes)?;
            bytes
        }
    };
    debug!(
        path = %path.display(),
        compression = %kind,
        on_disk,
        decoded = bytes.len(),
        "Volume file read"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(CompressionType::detect(&348i32.to_le_bytes()), CompressionType::None);
        assert_eq!(CompressionType::detect(&[]), CompressionType::None);
        assert_eq!(CompressionType::detect(&[0x1f]), CompressionType::None);
        assert_eq!(CompressionType::detect(&[0x1f, 0x8b, 0x08]), CompressionType::Gzip);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(CompressionType::from_path(Path::new("a.nii.gz")), CompressionType::Gzip);
        assert_eq!(CompressionType::from_path(Path::new("a.IMG.GZ")), CompressionType::Gzip);
        assert_eq!(CompressionType::from_path(Path::new("a.nii")), CompressionType::None);
    }

    #[test]
    fn test_gzip_inflate() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i % 7) as u8).collect();
        let packed = gzip(&data, CompressionLevel::Best).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(inflate_if_needed(packed).unwrap(), data);
    }

    #[test]
    fn test_inflate_passthrough() {
        let data = vec![5u8, 6, 7];
        assert_eq!(inflate_if_needed(data.clone()).unwrap(), data);
    }

    #[test]
    fn test_multi_member_stream() {
        let mut packed = gzip(b"first ", CompressionLevel::Fast).unwrap();
        packed.extend(gzip(b"second", CompressionLevel::Fast).unwrap());
        assert_eq!(inflate_if_needed(packed).unwrap(), b"first second".to_vec());
    }

    #[test]
    fn test_truncated_stream_is_format_error() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        let packed = gzip(&data, CompressionLevel::Default).unwrap();

        for cut in [packed.len() / 2, packed.len() - 4] {
            let truncated = packed[..cut].to_vec();
            assert!(matches!(
                inflate_if_needed(truncated),
                Err(VolumeError::Format(_))
            ));
        }

        let mut corrupt = packed;
        corrupt[2] = 0xff;
        assert!(matches!(inflate_if_needed(corrupt), Err(VolumeError::Format(_))));
    }

    #[test]
    fn test_read_file_sniffs_content() {
        let dir = tempfile::tempdir().unwrap();
        // Gzip content behind a plain name still inflates
        let path = dir.path().join("mislabelled.nii");
        std::fs::write(&path, gzip(b"payload", CompressionLevel::Default).unwrap()).unwrap();
        assert_eq!(read_file(&path).unwrap(), b"payload".to_vec());

        let raw = dir.path().join("raw.nii");
        std::fs::write(&raw, b"plain").unwrap();
        assert_eq!(read_file(&raw).unwrap(), b"plain".to_vec());

        assert!(matches!(
            read_file(&dir.path().join("absent.nii")),
            Err(VolumeError::Io(_))
        ));
    }
}
