//! Compound file header generation.

use super::super::consts::*;

/// Locations recorded in the 512-byte header.
#[derive(Debug, Clone)]
pub(super) struct HeaderBuilder {
    pub first_dir_sector: u32,
    pub first_minifat_sector: u32,
    pub num_minifat_sectors: u32,
    pub first_difat_sector: u32,
    pub num_difat_sectors: u32,
    pub fat_sectors: Vec<u32>,
}

impl Default for HeaderBuilder {
    fn default() -> Self {
        Self {
            first_dir_sector: ENDOFCHAIN,
            first_minifat_sector: ENDOFCHAIN,
            num_minifat_sectors: 0,
            first_difat_sector: ENDOFCHAIN,
            num_difat_sectors: 0,
            fat_sectors: Vec::new(),
        }
    }
}

impl HeaderBuilder {
    /// Generate a version 3 header (512-byte sectors).
    pub fn generate(&self) -> [u8; SECTOR_SIZE_V3] {
        let mut header = [0u8; SECTOR_SIZE_V3];
        let put_u16 = |header: &mut [u8], at: usize, value: u16| {
            header[at..at + 2].copy_from_slice(&value.to_le_bytes());
        };

        header[0..8].copy_from_slice(MAGIC);
        put_u16(&mut header, 24, 0x003E);
        put_u16(&mut header, 26, 3);
        put_u16(&mut header, 28, 0xFFFE);
        put_u16(&mut header, 30, 9);
        put_u16(&mut header, 32, 6);

        let fields = [
            // csectDir stays zero for 512-byte sectors
            (40, 0),
            (44, self.fat_sectors.len() as u32),
            (48, self.first_dir_sector),
            (52, 0),
            (56, MINI_STREAM_CUTOFF),
            (60, self.first_minifat_sector),
            (64, self.num_minifat_sectors),
            (68, self.first_difat_sector),
            (72, self.num_difat_sectors),
        ];
        for (at, value) in fields {
            header[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }

        for slot in 0..HEADER_DIFAT_SLOTS {
            let id = self.fat_sectors.get(slot).copied().unwrap_or(FREESECT);
            let at = 76 + slot * 4;
            header[at..at + 4].copy_from_slice(&id.to_le_bytes());
        }
        header
    }
}
