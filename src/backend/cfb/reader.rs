//! Compound file reader.
//!
//! Parses the header, follows the DIFAT to assemble the FAT, loads the
//! MiniFAT and the directory, and reads streams through either allocation
//! table. Every chain walk is bounded so a corrupted table cannot loop.

use super::CfbError;
use super::consts::*;
use fixedbitset::FixedBitSet;
use std::io::{Read, Seek, SeekFrom};
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// On-disk compound file header (first 512 bytes).
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    major_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    difat: [U32<LE>; HEADER_DIFAT_SLOTS],
}

/// On-disk directory entry (128 bytes).
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// A decoded directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Index in the directory
    pub sid: u32,
    pub name: String,
    pub entry_type: u8,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    pub start_sector: u32,
    pub size: u64,
}

impl DirectoryEntry {
    #[inline]
    pub fn is_stream(&self) -> bool {
        self.entry_type == STGTY_STREAM
    }

    #[inline]
    pub fn is_storage(&self) -> bool {
        self.entry_type == STGTY_STORAGE || self.entry_type == STGTY_ROOT
    }
}

/// A compound file opened for reading.
#[derive(Debug)]
pub struct CompoundFile<R: Read + Seek> {
    reader: R,
    file_size: u64,
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u32,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    entries: Vec<DirectoryEntry>,
    /// Mini stream data (loaded on first small-stream read)
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> CompoundFile<R> {
    /// Open and parse a compound file.
    pub fn open(mut reader: R) -> Result<Self, CfbError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_FILE_SIZE as u64 {
            return Err(CfbError::NotCompoundFile);
        }

        let mut raw = [0u8; 512];
        reader.read_exact(&mut raw)?;
        let header = RawHeader::read_from_bytes(&raw[..])
            .map_err(|_| CfbError::InvalidFormat("unreadable header".to_string()))?;

        if &header.magic != MAGIC {
            return Err(CfbError::NotCompoundFile);
        }
        if header.byte_order.get() != 0xFFFE {
            return Err(CfbError::InvalidFormat("invalid byte order".to_string()));
        }

        let sector_size = match (header.major_version.get(), header.sector_shift.get()) {
            (3, 9) => SECTOR_SIZE_V3,
            (4, 12) => SECTOR_SIZE_V4,
            (major, shift) => {
                return Err(CfbError::InvalidFormat(format!(
                    "unsupported version {major} with sector shift {shift}"
                )));
            },
        };
        let mini_sector_shift = header.mini_sector_shift.get();
        if mini_sector_shift >= 16 {
            return Err(CfbError::InvalidFormat(format!(
                "mini sector shift {mini_sector_shift} out of range"
            )));
        }

        let mut file = CompoundFile {
            reader,
            file_size,
            sector_size,
            mini_sector_size: 1usize << mini_sector_shift,
            mini_stream_cutoff: header.mini_stream_cutoff.get(),
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            ministream: None,
        };

        file.load_fat(&header)?;
        file.load_directory(header.first_dir_sector.get())?;
        if header.num_minifat_sectors.get() > 0 {
            file.load_minifat(header.first_minifat_sector.get())?;
        }

        Ok(file)
    }

    /// Assemble the FAT from the header slots and the DIFAT chain.
    fn load_fat(&mut self, header: &RawHeader) -> Result<(), CfbError> {
        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .map(|id| id.get())
            .take_while(|&id| id != FREESECT && id != ENDOFCHAIN)
            .collect();

        let ids_per_difat = self.sector_size / 4 - 1;
        let mut difat_sector = header.first_difat_sector.get();
        for _ in 0..header.num_difat_sectors.get() {
            if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                break;
            }
            let data = self.read_sector(difat_sector)?;
            let words = read_u32s(&data);
            fat_sectors.extend(
                words[..ids_per_difat]
                    .iter()
                    .copied()
                    .take_while(|&id| id != FREESECT && id != ENDOFCHAIN),
            );
            difat_sector = words[ids_per_difat];
        }

        if fat_sectors.len() != header.num_fat_sectors.get() as usize {
            tracing::debug!(
                declared = header.num_fat_sectors.get(),
                found = fat_sectors.len(),
                "FAT sector count differs from header"
            );
        }

        self.fat.reserve(fat_sectors.len() * self.sector_size / 4);
        for sector_id in fat_sectors {
            let data = self.read_sector(sector_id)?;
            self.fat.extend(read_u32s(&data));
        }
        Ok(())
    }

    fn load_minifat(&mut self, first_sector: u32) -> Result<(), CfbError> {
        let data = self.read_chain(first_sector)?;
        self.minifat = read_u32s(&data);
        Ok(())
    }

    fn load_directory(&mut self, first_sector: u32) -> Result<(), CfbError> {
        let data = self.read_chain(first_sector)?;
        let count = data.len() / DIRENTRY_SIZE;
        if count == 0 {
            return Err(CfbError::Corrupted("empty directory".to_string()));
        }

        self.entries = Vec::with_capacity(count);
        for (sid, chunk) in data.chunks_exact(DIRENTRY_SIZE).enumerate() {
            let raw = RawDirectoryEntry::read_from_bytes(chunk)
                .map_err(|_| CfbError::InvalidFormat("unreadable directory entry".to_string()))?;
            self.entries.push(self.decode_entry(&raw, sid as u32));
        }

        if self.entries[0].entry_type != STGTY_ROOT {
            return Err(CfbError::Corrupted("first directory entry is not the root".to_string()));
        }
        Ok(())
    }

    fn decode_entry(&self, raw: &RawDirectoryEntry, sid: u32) -> DirectoryEntry {
        let name_len = (raw.name_len.get() as usize).saturating_sub(2).min(64);
        let units: Vec<u16> = raw.name[..name_len]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let name = String::from_utf16_lossy(&units)
            .trim_end_matches('\0')
            .to_string();

        // Version 3 files only define the low 32 bits of the size
        let size = if self.sector_size == SECTOR_SIZE_V3 {
            raw.stream_size.get() & 0xFFFF_FFFF
        } else {
            raw.stream_size.get()
        };

        DirectoryEntry {
            sid,
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            start_sector: raw.start_sector.get(),
            size,
        }
    }

    /// Read one sector; a short final sector is zero-padded.
    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>, CfbError> {
        if sector_id > MAXREGSECT {
            return Err(CfbError::Corrupted(format!("invalid sector id {sector_id:#x}")));
        }
        let position = (sector_id as u64 + 1) * self.sector_size as u64;
        if position >= self.file_size {
            return Err(CfbError::Truncated(format!(
                "sector {sector_id} lies beyond the end of the file"
            )));
        }
        let available = ((self.file_size - position) as usize).min(self.sector_size);

        self.reader.seek(SeekFrom::Start(position))?;
        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer[..available])?;
        Ok(buffer)
    }

    /// Read a whole FAT chain.
    fn read_chain(&mut self, start_sector: u32) -> Result<Vec<u8>, CfbError> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut steps = 0usize;

        while sector != ENDOFCHAIN {
            if sector as usize >= self.fat.len() {
                return Err(CfbError::Corrupted(format!(
                    "sector {sector} outside the FAT"
                )));
            }
            steps += 1;
            if steps > self.fat.len() {
                return Err(CfbError::Corrupted("cyclic FAT chain".to_string()));
            }
            data.extend_from_slice(&self.read_sector(sector)?);
            sector = self.fat[sector as usize];
        }
        Ok(data)
    }

    /// Read a MiniFAT chain out of the mini stream.
    fn read_mini_chain(&mut self, start_sector: u32, size: u64) -> Result<Vec<u8>, CfbError> {
        if self.ministream.is_none() {
            let root_start = self.entries[0].start_sector;
            let mut data = self.read_chain(root_start)?;
            data.truncate(self.entries[0].size as usize);
            self.ministream = Some(data);
        }
        let ministream = self.ministream.as_deref().unwrap_or_default();

        let mut data = Vec::with_capacity(size as usize);
        let mut sector = start_sector;
        let mut steps = 0usize;

        while sector != ENDOFCHAIN {
            if sector as usize >= self.minifat.len() {
                return Err(CfbError::Corrupted(format!(
                    "mini sector {sector} outside the MiniFAT"
                )));
            }
            steps += 1;
            if steps > self.minifat.len() {
                return Err(CfbError::Corrupted("cyclic MiniFAT chain".to_string()));
            }
            let position = sector as usize * self.mini_sector_size;
            let end = position + self.mini_sector_size;
            if end > ministream.len() {
                return Err(CfbError::Truncated(format!(
                    "mini sector {sector} lies beyond the mini stream"
                )));
            }
            data.extend_from_slice(&ministream[position..end]);
            sector = self.minifat[sector as usize];
        }

        data.truncate(size as usize);
        Ok(data)
    }

    /// All streams with their storage path, in directory order.
    pub fn streams(&self) -> Result<Vec<(Vec<String>, DirectoryEntry)>, CfbError> {
        let mut out = Vec::new();
        let mut visited = FixedBitSet::with_capacity(self.entries.len());
        visited.insert(0);
        let mut path = Vec::new();
        self.collect(self.entries[0].sid_child, &mut path, &mut visited, &mut out)?;
        Ok(out)
    }

    fn collect(
        &self,
        sid: u32,
        path: &mut Vec<String>,
        visited: &mut FixedBitSet,
        out: &mut Vec<(Vec<String>, DirectoryEntry)>,
    ) -> Result<(), CfbError> {
        if sid == NOSTREAM {
            return Ok(());
        }
        let index = sid as usize;
        if index >= self.entries.len() {
            return Err(CfbError::Corrupted(format!("directory entry {sid} out of range")));
        }
        if visited.put(index) {
            return Err(CfbError::Corrupted("cyclic directory tree".to_string()));
        }

        let entry = &self.entries[index];
        self.collect(entry.sid_left, path, visited, out)?;
        if entry.is_stream() {
            let mut full = path.clone();
            full.push(entry.name.clone());
            out.push((full, entry.clone()));
        } else if entry.is_storage() {
            path.push(entry.name.clone());
            self.collect(entry.sid_child, path, visited, out)?;
            path.pop();
        }
        self.collect(entry.sid_right, path, visited, out)
    }

    /// Read the contents of a stream entry.
    pub fn read_stream(&mut self, entry: &DirectoryEntry) -> Result<Vec<u8>, CfbError> {
        if !entry.is_stream() {
            return Err(CfbError::InvalidFormat(format!("'{}' is not a stream", entry.name)));
        }
        if entry.size < self.mini_stream_cutoff as u64 {
            return self.read_mini_chain(entry.start_sector, entry.size);
        }
        let mut data = self.read_chain(entry.start_sector)?;
        if (data.len() as u64) < entry.size {
            return Err(CfbError::Truncated(format!(
                "stream '{}' is shorter than its declared size",
                entry.name
            )));
        }
        data.truncate(entry.size as usize);
        Ok(data)
    }

    /// Read a stream by path (names compare case-insensitively).
    pub fn open_stream(&mut self, path: &[&str]) -> Result<Vec<u8>, CfbError> {
        let entry = self
            .streams()?
            .into_iter()
            .find(|(candidate, _)| {
                candidate.len() == path.len()
                    && candidate
                        .iter()
                        .zip(path)
                        .all(|(a, b)| a.to_lowercase() == b.to_lowercase())
            })
            .map(|(_, entry)| entry)
            .ok_or_else(|| CfbError::StreamNotFound(path.join("/")))?;
        self.read_stream(&entry)
    }
}

fn read_u32s(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Check if data looks like a compound file.
pub fn is_compound_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_FILE_SIZE && data.starts_with(MAGIC)
}
