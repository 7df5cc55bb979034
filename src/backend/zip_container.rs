//! Zip-of-XML-parts container backend.

use super::{
    BackendKind, DecodeError, ElementTree, EncodeError, FormatBackend, decode_member,
    encode_member,
};
use std::io::{Cursor, Read, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

/// Local file header signature.
const LOCAL_HEADER: &[u8; 4] = b"PK\x03\x04";
/// End of central directory signature (an archive with no members).
const EMPTY_ARCHIVE: &[u8; 4] = b"PK\x05\x06";
/// Upper bound on the buffer reserved from a member's declared size.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// Buffer to reserve for a member; the declared size comes from the archive
/// and is not trusted beyond [`MAX_PREALLOCATION`].
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATION) as usize
}

/// Backend for ZIP packages. Every member is written Deflate-compressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipBackend;

impl FormatBackend for ZipBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Zip
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(LOCAL_HEADER) || bytes.starts_with(EMPTY_ARCHIVE)
    }

    fn decode(&self, bytes: &[u8]) -> Result<ElementTree, DecodeError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut tree = ElementTree::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(initial_capacity(file.size()));
            file.read_to_end(&mut data).map_err(|e| {
                DecodeError::Truncated(format!("member '{name}' could not be read: {e}"))
            })?;
            let payload = decode_member(&name, data)?;
            tree.push(name, payload);
        }

        Ok(tree)
    }

    fn encode(&self, tree: &ElementTree) -> Result<Vec<u8>, EncodeError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        // Fixed timestamps keep output bytes reproducible
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for entry in tree.entries() {
            let data = encode_member(entry)?;
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&data)?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}
