//! Compound file writer.
//!
//! Streams are registered by storage path and the file is laid out in one
//! pass: large stream chains, the mini stream, the directory, the MiniFAT,
//! then the FAT and DIFAT sectors describing all of them.
//!
//! # Example
//!
//! ```
//! use docsplit::backend::cfb::CompoundFileWriter;
//!
//! let mut writer = CompoundFileWriter::new();
//! writer.create_stream(&["word", "document.xml"], b"<w:document/>".to_vec())?;
//! let bytes = writer.into_bytes()?;
//! assert!(docsplit::backend::cfb::is_compound_file(&bytes));
//! # Ok::<(), docsplit::backend::cfb::CfbError>(())
//! ```

mod allocation;
mod directory;
mod header;


use super::CfbError;
use super::consts::*;
use allocation::{FatBuilder, MiniStreamBuilder, difat_bytes, table_sector_counts};
use directory::DirectoryBuilder;
use header::HeaderBuilder;
use std::io::Write;

const SECTOR_SIZE: usize = SECTOR_SIZE_V3;

/// Builds a version 3 compound file.
#[derive(Debug)]
pub struct CompoundFileWriter {
    directory: DirectoryBuilder,
    /// (directory sid, data) in registration order
    streams: Vec<(u32, Vec<u8>)>,
}

impl Default for CompoundFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CompoundFileWriter {
    pub fn new() -> Self {
        Self {
            directory: DirectoryBuilder::new(),
            streams: Vec::new(),
        }
    }

    /// Register a stream; missing storages along `path` are created.
    pub fn create_stream(&mut self, path: &[&str], data: Vec<u8>) -> Result<(), CfbError> {
        for segment in path {
            validate_name(segment)?;
        }
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        let sid = self.directory.add_stream(&path)?;
        self.streams.push((sid, data));
        Ok(())
    }

    /// Lay out and write the file.
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> Result<(), CfbError> {
        let mut fat = FatBuilder::new();
        let mut mini = MiniStreamBuilder::new();
        let mut large: Vec<usize> = Vec::new();

        for (index, (sid, data)) in self.streams.iter().enumerate() {
            let size = data.len() as u64;
            let start = if data.len() < MINI_STREAM_CUTOFF as usize {
                mini.push(data)
            } else {
                large.push(index);
                fat.allocate_chain(data.len().div_ceil(SECTOR_SIZE))
            };
            self.directory.set_stream_location(*sid, start, size);
        }

        if !mini.is_empty() {
            let start = fat.allocate_chain(mini.data().len().div_ceil(SECTOR_SIZE));
            self.directory.set_mini_stream(start, mini.data().len() as u64);
        }

        let directory_bytes = self.directory.to_bytes(SECTOR_SIZE);
        let mut header = HeaderBuilder {
            first_dir_sector: fat.allocate_chain(directory_bytes.len() / SECTOR_SIZE),
            ..Default::default()
        };

        let minifat_bytes = mini.minifat_bytes(SECTOR_SIZE);
        if !minifat_bytes.is_empty() {
            let sectors = minifat_bytes.len() / SECTOR_SIZE;
            header.first_minifat_sector = fat.allocate_chain(sectors);
            header.num_minifat_sectors = sectors as u32;
        }

        let (num_fat, num_difat) = table_sector_counts(fat.sector_count(), SECTOR_SIZE);
        let first_fat = fat.allocate_special(num_fat, FATSECT);
        header.fat_sectors = (first_fat..first_fat + num_fat as u32).collect();
        if num_difat > 0 {
            header.first_difat_sector = fat.allocate_special(num_difat, DIFSECT);
            header.num_difat_sectors = num_difat as u32;
        }

        let mut fat_bytes = fat.to_bytes(SECTOR_SIZE);
        if fat_bytes.len() > num_fat * SECTOR_SIZE {
            return Err(CfbError::Corrupted("FAT outgrew its reserved sectors".to_string()));
        }
        fat_bytes.resize(num_fat * SECTOR_SIZE, 0xFF);
        let difat = difat_bytes(&header.fat_sectors, header.first_difat_sector, SECTOR_SIZE);

        writer.write_all(&header.generate())?;
        for index in large {
            write_padded(writer, &self.streams[index].1)?;
        }
        write_padded(writer, mini.data())?;
        writer.write_all(&directory_bytes)?;
        writer.write_all(&minifat_bytes)?;
        writer.write_all(&fat_bytes)?;
        writer.write_all(&difat)?;
        writer.flush()?;

        tracing::trace!(
            streams = self.streams.len(),
            sectors = fat.sector_count(),
            "wrote compound file"
        );
        Ok(())
    }

    /// Lay out the file into a fresh buffer.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, CfbError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

fn write_padded<W: Write>(writer: &mut W, data: &[u8]) -> Result<(), CfbError> {
    writer.write_all(data)?;
    let remainder = data.len() % SECTOR_SIZE;
    if remainder != 0 {
        writer.write_all(&[0u8; SECTOR_SIZE][..SECTOR_SIZE - remainder])?;
    }
    Ok(())
}

/// Check one storage or stream name.
pub fn validate_name(name: &str) -> Result<(), CfbError> {
    let invalid = |reason: &str| CfbError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if name.encode_utf16().count() > MAX_NAME_UNITS {
        return Err(invalid("longer than 31 UTF-16 code units"));
    }
    if name.contains(['/', '\\', ':', '!']) {
        return Err(invalid("contains a reserved character"));
    }
    Ok(())
}
