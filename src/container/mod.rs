// src/container/mod.rs
//! Packaged-extension container parsing
//!
//! Extensions are distributed in a binary container: a 4-byte magic
//! tag, a little-endian format version, then two length-prefixed
//! sections (public key, signature), followed by the embedded zip
//! payload which runs to the end of the stream.
//!
//! ```text
//! offset 0   magic "Cr24"
//! offset 4   u32 LE  version
//! offset 8   u32 LE  public key length K
//! offset 12  u32 LE  signature length S
//! offset 16  K bytes public key
//! offset 16+K  S bytes signature
//! offset 16+K+S  embedded zip payload, to end of stream
//! ```
//!
//! [`ContainerFile::parse`] materializes the key and signature;
//! [`strip_header`] consumes the same prelude but discards the
//! section bytes, for callers that only want the payload. Both share
//! one prelude routine so the header layout cannot drift apart.
//!
//! Section lengths are trusted as given and nothing is verified
//! cryptographically; signature checking is the consumer's concern.

use std::io::{self, Read};
use thiserror::Error;

/// Magic tag identifying the container format
pub const CONTAINER_MAGIC: [u8; 4] = *b"Cr24";

/// Container-parsing errors
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("not an extension container (bad magic)")]
    NotContainer,

    #[error("container truncated while reading {0}")]
    Truncated(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Fixed-size container prelude, validated once and immutable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub version: u32,
    pub public_key_len: u32,
    pub signature_len: u32,
}

/// A parsed container: header and section bytes in memory, payload
/// left un-consumed on the underlying stream
pub struct ContainerFile<R> {
    pub header: ContainerHeader,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
    payload: R,
}

impl<R: Read> ContainerFile<R> {
    /// Parse the container prelude from `reader`
    ///
    /// Only the header, public key, and signature are read; the
    /// remainder of the stream is the embedded payload and stays on
    /// `reader` without buffering or copying.
    pub fn parse(mut reader: R) -> Result<Self, ContainerError> {
        let header = read_header(&mut reader)?;
        let public_key = read_section(&mut reader, header.public_key_len, "public key")?;
        let signature = read_section(&mut reader, header.signature_len, "signature")?;

        Ok(Self {
            header,
            public_key,
            signature,
            payload: reader,
        })
    }

    /// The embedded zip payload: everything after the signature
    pub fn payload(&mut self) -> &mut R {
        &mut self.payload
    }

    /// Consume the container, returning the payload stream
    pub fn into_payload(self) -> R {
        self.payload
    }
}

/// Consume the container prelude, discarding the key and signature
///
/// Companion to [`ContainerFile::parse`] for callers that only want
/// the embedded payload: after this returns, `reader` is positioned
/// at the first payload byte. Section bytes are skipped without being
/// materialized.
pub fn strip_header<R: Read>(reader: &mut R) -> Result<ContainerHeader, ContainerError> {
    let header = read_header(reader)?;
    skip_section(reader, header.public_key_len, "public key")?;
    skip_section(reader, header.signature_len, "signature")?;
    Ok(header)
}

fn read_header<R: Read>(reader: &mut R) -> Result<ContainerHeader, ContainerError> {
    let mut magic = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut magic) {
        // A stream too short to hold the magic is not a container.
        return Err(match e.kind() {
            io::ErrorKind::UnexpectedEof => ContainerError::NotContainer,
            _ => ContainerError::Io(e),
        });
    }
    if magic != CONTAINER_MAGIC {
        return Err(ContainerError::NotContainer);
    }

    Ok(ContainerHeader {
        version: read_u32_le(reader, "version")?,
        public_key_len: read_u32_le(reader, "public key length")?,
        signature_len: read_u32_le(reader, "signature length")?,
    })
}

fn read_u32_le<R: Read>(reader: &mut R, field: &'static str) -> Result<u32, ContainerError> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| truncated_or_io(e, field))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_section<R: Read>(
    reader: &mut R,
    len: u32,
    section: &'static str,
) -> Result<Vec<u8>, ContainerError> {
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .map_err(|e| truncated_or_io(e, section))?;
    Ok(buf)
}

fn skip_section<R: Read>(
    reader: &mut R,
    len: u32,
    section: &'static str,
) -> Result<(), ContainerError> {
    let skipped = io::copy(&mut reader.by_ref().take(u64::from(len)), &mut io::sink())?;
    if skipped != u64::from(len) {
        return Err(ContainerError::Truncated(section));
    }
    Ok(())
}

fn truncated_or_io(e: io::Error, section: &'static str) -> ContainerError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => ContainerError::Truncated(section),
        _ => ContainerError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn container_bytes(version: u32, key: &[u8], signature: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&CONTAINER_MAGIC);
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(signature.len() as u32).to_le_bytes());
        bytes.extend_from_slice(key);
        bytes.extend_from_slice(signature);
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_parse_empty_sections() {
        // "Cr24" + version 2 + K=0 + S=0 + zip bytes: empty key and
        // signature, payload identical to the zip bytes.
        let zip = b"PK\x03\x04not really a zip";
        let bytes = container_bytes(2, b"", b"", zip);

        let mut container = ContainerFile::parse(Cursor::new(bytes)).unwrap();
        assert_eq!(container.header.version, 2);
        assert!(container.public_key.is_empty());
        assert!(container.signature.is_empty());

        let mut payload = Vec::new();
        container.payload().read_to_end(&mut payload).unwrap();
        assert_eq!(payload, zip);
    }

    #[test]
    fn test_parse_materializes_sections() {
        let key = [0x11u8; 32];
        let signature = [0x22u8; 64];
        let bytes = container_bytes(2, &key, &signature, b"payload");

        let mut container = ContainerFile::parse(Cursor::new(bytes)).unwrap();
        assert_eq!(container.header.public_key_len, 32);
        assert_eq!(container.header.signature_len, 64);
        assert_eq!(container.public_key, key);
        assert_eq!(container.signature, signature);

        let mut payload = Vec::new();
        container.payload().read_to_end(&mut payload).unwrap();
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_parse_consumes_exactly_the_container() {
        let key = [0xAAu8; 7];
        let signature = [0xBBu8; 3];
        let payload = b"0123456789";
        let bytes = container_bytes(3, &key, &signature, payload);
        let total = bytes.len() as u64;

        let mut cursor = Cursor::new(bytes);
        let mut container = ContainerFile::parse(&mut cursor).unwrap();
        let mut drained = Vec::new();
        container.payload().read_to_end(&mut drained).unwrap();
        assert_eq!(drained, payload);

        // 16 + K + S + len(payload) bytes and no more.
        assert_eq!(cursor.position(), total);
        assert_eq!(total, 16 + 7 + 3 + 10);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = container_bytes(2, b"", b"", b"payload");
        bytes[0] = b'X';
        let result = ContainerFile::parse(Cursor::new(bytes));
        assert!(matches!(result, Err(ContainerError::NotContainer)));
    }

    #[test]
    fn test_short_stream_is_not_container() {
        // Shorter than the magic itself: still NotContainer, never
        // Truncated.
        let result = ContainerFile::parse(Cursor::new(b"Cr".to_vec()));
        assert!(matches!(result, Err(ContainerError::NotContainer)));

        let result = ContainerFile::parse(Cursor::new(Vec::new()));
        assert!(matches!(result, Err(ContainerError::NotContainer)));
    }

    #[test]
    fn test_truncated_fixed_field() {
        // Valid magic, then the stream dies inside the version field.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&CONTAINER_MAGIC);
        bytes.extend_from_slice(&[0x02, 0x00]);
        let result = ContainerFile::parse(Cursor::new(bytes));
        assert!(matches!(result, Err(ContainerError::Truncated("version"))));
    }

    #[test]
    fn test_truncated_section() {
        // K declares 100 bytes but only 50 are supplied: Truncated,
        // not a garbage key.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&CONTAINER_MAGIC);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 50]);

        let result = ContainerFile::parse(Cursor::new(bytes));
        assert!(matches!(result, Err(ContainerError::Truncated("public key"))));
    }

    #[test]
    fn test_strip_header_agrees_with_parse() {
        let key = [0x55u8; 16];
        let signature = [0x66u8; 8];
        let bytes = container_bytes(2, &key, &signature, b"embedded zip");

        let mut cursor = Cursor::new(bytes.clone());
        let header = strip_header(&mut cursor).unwrap();
        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();

        let parsed = ContainerFile::parse(Cursor::new(bytes)).unwrap();
        assert_eq!(header, parsed.header);
        assert_eq!(rest, b"embedded zip");
    }

    #[test]
    fn test_strip_header_truncated_section() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&CONTAINER_MAGIC);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(&[0u8; 2]);

        let result = strip_header(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ContainerError::Truncated("signature"))));
    }

    #[test]
    fn test_strip_header_bad_magic() {
        let result = strip_header(&mut Cursor::new(b"ZIP!rest".to_vec()));
        assert!(matches!(result, Err(ContainerError::NotContainer)));
    }
}
