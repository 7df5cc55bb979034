//! Sector allocation tables.
//!
//! The FAT maps every sector to the next sector of its chain. Streams below
//! the mini stream cutoff are packed into the mini stream instead and
//! chained through the MiniFAT. FAT sectors that do not fit into the header
//! are listed by DIFAT sectors.

use super::super::consts::*;

/// Builds the FAT while sectors are handed out in file order.
#[derive(Debug, Default)]
pub(super) struct FatBuilder {
    fat: Vec<u32>,
}

impl FatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sectors handed out so far.
    #[inline]
    pub fn sector_count(&self) -> usize {
        self.fat.len()
    }

    /// Allocate a contiguous chain of `sectors` sectors.
    ///
    /// Returns ENDOFCHAIN for an empty chain.
    pub fn allocate_chain(&mut self, sectors: usize) -> u32 {
        if sectors == 0 {
            return ENDOFCHAIN;
        }
        let start = self.fat.len() as u32;
        self.fat.reserve(sectors);
        for i in 1..sectors {
            self.fat.push(start + i as u32);
        }
        self.fat.push(ENDOFCHAIN);
        start
    }

    /// Reserve `count` sectors carrying `marker` (FATSECT or DIFSECT).
    pub fn allocate_special(&mut self, count: usize, marker: u32) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }
        let start = self.fat.len() as u32;
        self.fat.extend(std::iter::repeat_n(marker, count));
        start
    }

    /// Serialize the table, padding the last sector with FREESECT.
    pub fn to_bytes(&self, sector_size: usize) -> Vec<u8> {
        to_table_bytes(&self.fat, sector_size)
    }
}

/// Packs small streams into the mini stream.
#[derive(Debug, Default)]
pub(super) struct MiniStreamBuilder {
    minifat: Vec<u32>,
    data: Vec<u8>,
}

impl MiniStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stream and return its first mini sector.
    pub fn push(&mut self, bytes: &[u8]) -> u32 {
        if bytes.is_empty() {
            return ENDOFCHAIN;
        }
        let sectors = bytes.len().div_ceil(MINI_SECTOR_SIZE);
        let start = self.minifat.len() as u32;
        for i in 1..sectors {
            self.minifat.push(start + i as u32);
        }
        self.minifat.push(ENDOFCHAIN);

        self.data.extend_from_slice(bytes);
        self.data.resize(self.minifat.len() * MINI_SECTOR_SIZE, 0);
        start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.minifat.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn minifat_bytes(&self, sector_size: usize) -> Vec<u8> {
        to_table_bytes(&self.minifat, sector_size)
    }
}

fn to_table_bytes(table: &[u32], sector_size: usize) -> Vec<u8> {
    let per_sector = sector_size / 4;
    let padded = table.len().div_ceil(per_sector) * per_sector;
    let mut out = Vec::with_capacity(padded * 4);
    for &value in table {
        out.extend_from_slice(&value.to_le_bytes());
    }
    for _ in table.len()..padded {
        out.extend_from_slice(&FREESECT.to_le_bytes());
    }
    out
}

/// Number of FAT and DIFAT sectors needed to describe `data_sectors`
/// sectors plus the FAT and DIFAT sectors themselves.
pub(super) fn table_sector_counts(data_sectors: usize, sector_size: usize) -> (usize, usize) {
    let ids_per_fat = sector_size / 4;
    let ids_per_difat = ids_per_fat - 1;

    let mut fat = data_sectors.div_ceil(ids_per_fat).max(1);
    loop {
        let difat = fat
            .saturating_sub(HEADER_DIFAT_SLOTS)
            .div_ceil(ids_per_difat);
        let needed = (data_sectors + fat + difat).div_ceil(ids_per_fat);
        if needed <= fat {
            return (fat, difat);
        }
        fat = needed;
    }
}

/// Serialize DIFAT sectors for the FAT sector ids beyond the header slots.
pub(super) fn difat_bytes(fat_sectors: &[u32], first_difat: u32, sector_size: usize) -> Vec<u8> {
    let ids_per_difat = sector_size / 4 - 1;
    let overflow = fat_sectors.get(HEADER_DIFAT_SLOTS..).unwrap_or_default();
    let count = overflow.len().div_ceil(ids_per_difat);

    let mut out = Vec::with_capacity(count * sector_size);
    for (index, chunk) in overflow.chunks(ids_per_difat).enumerate() {
        for &id in chunk {
            out.extend_from_slice(&id.to_le_bytes());
        }
        for _ in chunk.len()..ids_per_difat {
            out.extend_from_slice(&FREESECT.to_le_bytes());
        }
        let next = if index + 1 < count {
            first_difat + index as u32 + 1
        } else {
            ENDOFCHAIN
        };
        out.extend_from_slice(&next.to_le_bytes());
    }
    out
}
