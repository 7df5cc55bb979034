//! Directory tree generation.
//!
//! Every storage keeps its children in a red-black tree ordered by name
//! length first and upper-cased name second. Children are built into a
//! balanced tree from their sorted order; nodes on the deepest level are
//! coloured red so every path carries the same number of black nodes.

use super::super::CfbError;
use super::super::consts::*;
use std::cmp::Ordering;

const COLOR_RED: u8 = 0;
const COLOR_BLACK: u8 = 1;

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    entry_type: u8,
    color: u8,
    start_sector: u32,
    size: u64,
    sid_left: u32,
    sid_right: u32,
    sid_child: u32,
    children: Vec<u32>,
}

impl Entry {
    fn new(name: String, entry_type: u8) -> Self {
        Self {
            name,
            entry_type,
            color: COLOR_BLACK,
            start_sector: ENDOFCHAIN,
            size: 0,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
            children: Vec::new(),
        }
    }

    fn to_bytes(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + DIRENTRY_SIZE, 0);
        let buf = &mut out[start..];

        let units: Vec<u16> = self.name.encode_utf16().collect();
        for (i, unit) in units.iter().enumerate() {
            buf[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        let name_len = if units.is_empty() { 0 } else { (units.len() as u16 + 1) * 2 };
        buf[64..66].copy_from_slice(&name_len.to_le_bytes());
        buf[66] = self.entry_type;
        buf[67] = self.color;
        buf[68..72].copy_from_slice(&self.sid_left.to_le_bytes());
        buf[72..76].copy_from_slice(&self.sid_right.to_le_bytes());
        buf[76..80].copy_from_slice(&self.sid_child.to_le_bytes());
        // CLSID, state bits and timestamps stay zero
        buf[116..120].copy_from_slice(&self.start_sector.to_le_bytes());
        buf[120..128].copy_from_slice(&self.size.to_le_bytes());
    }
}

/// Collects storages and streams, then serializes the directory stream.
#[derive(Debug)]
pub(super) struct DirectoryBuilder {
    entries: Vec<Entry>,
}

impl DirectoryBuilder {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::new("Root Entry".to_string(), STGTY_ROOT)],
        }
    }

    /// Number of entries, the root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Add a stream, creating intermediate storages. Returns its sid.
    pub fn add_stream(&mut self, path: &[String]) -> Result<u32, CfbError> {
        let Some((name, storages)) = path.split_last() else {
            return Err(CfbError::InvalidName {
                name: String::new(),
                reason: "empty path".to_string(),
            });
        };

        let mut parent = 0u32;
        for storage in storages {
            parent = match self.find_child(parent, storage) {
                Some(sid) if self.entries[sid as usize].entry_type == STGTY_STORAGE => sid,
                Some(_) => {
                    return Err(CfbError::InvalidName {
                        name: path.join("/"),
                        reason: format!("'{storage}' is already a stream"),
                    });
                },
                None => self.push_child(parent, Entry::new(storage.clone(), STGTY_STORAGE)),
            };
        }

        if self.find_child(parent, name).is_some() {
            return Err(CfbError::InvalidName {
                name: path.join("/"),
                reason: "duplicate entry".to_string(),
            });
        }
        Ok(self.push_child(parent, Entry::new(name.clone(), STGTY_STREAM)))
    }

    /// Record where a stream's data lives.
    pub fn set_stream_location(&mut self, sid: u32, start_sector: u32, size: u64) {
        let entry = &mut self.entries[sid as usize];
        entry.start_sector = start_sector;
        entry.size = size;
    }

    /// Record where the mini stream lives.
    pub fn set_mini_stream(&mut self, start_sector: u32, size: u64) {
        self.set_stream_location(0, start_sector, size);
    }

    fn find_child(&self, parent: u32, name: &str) -> Option<u32> {
        let upper = name.to_uppercase();
        self.entries[parent as usize]
            .children
            .iter()
            .copied()
            .find(|&sid| self.entries[sid as usize].name.to_uppercase() == upper)
    }

    fn push_child(&mut self, parent: u32, entry: Entry) -> u32 {
        let sid = self.entries.len() as u32;
        self.entries.push(entry);
        self.entries[parent as usize].children.push(sid);
        sid
    }

    /// Serialize all entries, padded with empty entries to whole sectors.
    pub fn to_bytes(&mut self, sector_size: usize) -> Vec<u8> {
        for parent in 0..self.entries.len() {
            let mut children = std::mem::take(&mut self.entries[parent].children);
            children.sort_by(|&a, &b| {
                compare_names(&self.entries[a as usize].name, &self.entries[b as usize].name)
            });
            let height = tree_height(children.len());
            let root = self.link(&children, 0, height);
            self.entries[parent].sid_child = root;
            self.entries[parent].children = children;
        }

        let per_sector = sector_size / DIRENTRY_SIZE;
        let padded = self.entries.len().div_ceil(per_sector) * per_sector;
        let mut out = Vec::with_capacity(padded * DIRENTRY_SIZE);
        for entry in &self.entries {
            entry.to_bytes(&mut out);
        }
        let mut empty = Entry::new(String::new(), STGTY_EMPTY);
        empty.start_sector = 0;
        empty.color = COLOR_RED;
        for _ in self.entries.len()..padded {
            empty.to_bytes(&mut out);
        }
        out
    }

    /// Link a sorted slice into a balanced subtree and return its root.
    fn link(&mut self, sorted: &[u32], depth: usize, height: usize) -> u32 {
        if sorted.is_empty() {
            return NOSTREAM;
        }
        let mid = sorted.len() / 2;
        let sid = sorted[mid];
        let left = self.link(&sorted[..mid], depth + 1, height);
        let right = self.link(&sorted[mid + 1..], depth + 1, height);

        let entry = &mut self.entries[sid as usize];
        entry.sid_left = left;
        entry.sid_right = right;
        entry.color = if height > 1 && depth + 1 == height {
            COLOR_RED
        } else {
            COLOR_BLACK
        };
        sid
    }
}

/// Height of the balanced tree built from `count` sorted nodes.
fn tree_height(count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let mid = count / 2;
    1 + tree_height(mid).max(tree_height(count - mid - 1))
}

/// Compound file sibling order: shorter names first, then upper-cased.
fn compare_names(a: &str, b: &str) -> Ordering {
    let len_a = a.encode_utf16().count();
    let len_b = b.encode_utf16().count();
    len_a.cmp(&len_b).then_with(|| a.to_uppercase().cmp(&b.to_uppercase()))
}
