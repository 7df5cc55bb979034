//! Shared resource pools.
//!
//! A pool maps resource ids to definitions that many content nodes share:
//! styles, numbering definitions, shared strings, cell formats, the main
//! part's relationships, and the parts themselves. An entry records what
//! it depends on so the closure of a fragment can be followed transitively.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// Kinds of shared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolKind {
    Style,
    Numbering,
    AbstractNumbering,
    SharedString,
    CellFormat,
    CellStyleFormat,
    Font,
    Fill,
    Border,
    NumberFormat,
    /// Relationships of the main part, by relationship id
    Relationship,
    /// Parts of the package, by part name
    Part,
}

impl PoolKind {
    pub const ALL: [PoolKind; 12] = [
        PoolKind::Style,
        PoolKind::Numbering,
        PoolKind::AbstractNumbering,
        PoolKind::SharedString,
        PoolKind::CellFormat,
        PoolKind::CellStyleFormat,
        PoolKind::Font,
        PoolKind::Fill,
        PoolKind::Border,
        PoolKind::NumberFormat,
        PoolKind::Relationship,
        PoolKind::Part,
    ];

    /// Dense index, for per-pool tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolKind::Style => "style",
            PoolKind::Numbering => "numbering",
            PoolKind::AbstractNumbering => "abstract numbering",
            PoolKind::SharedString => "shared string",
            PoolKind::CellFormat => "cell format",
            PoolKind::CellStyleFormat => "cell style format",
            PoolKind::Font => "font",
            PoolKind::Fill => "fill",
            PoolKind::Border => "border",
            PoolKind::NumberFormat => "number format",
            PoolKind::Relationship => "relationship",
            PoolKind::Part => "part",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference by id into a pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub pool: PoolKind,
    pub id: String,
}

impl ResourceRef {
    pub fn new(pool: PoolKind, id: impl Into<String>) -> Self {
        Self {
            pool,
            id: id.into(),
        }
    }
}

/// Inline storage for the handful of references most nodes carry.
pub type RefList = SmallVec<[ResourceRef; 4]>;

/// One resource definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub id: String,
    /// Resources this definition references
    pub deps: RefList,
}

/// A deduplicated id -> definition map, in definition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedResourcePool {
    kind: PoolKind,
    entries: Vec<PoolEntry>,
    by_id: HashMap<String, usize>,
}

impl SharedResourcePool {
    pub fn new(kind: PoolKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    /// Add a definition. A repeated id keeps the first definition.
    pub fn insert(&mut self, id: impl Into<String>, deps: RefList) {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            tracing::debug!(pool = %self.kind, id = %id, "duplicate definition ignored");
            return;
        }
        self.by_id.insert(id.clone(), self.entries.len());
        self.entries.push(PoolEntry { id, deps });
    }

    /// Record further dependencies of an existing entry.
    pub fn add_deps(&mut self, id: &str, deps: impl IntoIterator<Item = ResourceRef>) {
        if let Some(&pos) = self.by_id.get(id) {
            self.entries[pos].deps.extend(deps);
        }
    }

    /// Drop the dependencies of an existing entry that `keep` rejects.
    pub fn retain_deps(&mut self, id: &str, mut keep: impl FnMut(&ResourceRef) -> bool) {
        if let Some(&pos) = self.by_id.get(id) {
            self.entries[pos].deps.retain(|dep| keep(dep));
        }
    }

    /// Position of an entry, for dense per-entry tables.
    #[inline]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&PoolEntry> {
        self.position(id).map(|pos| &self.entries[pos])
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    #[inline]
    pub fn entry(&self, pos: usize) -> &PoolEntry {
        &self.entries[pos]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PoolEntry> {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One pool per [`PoolKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSet {
    pools: Vec<SharedResourcePool>,
}

impl Default for PoolSet {
    fn default() -> Self {
        Self {
            pools: PoolKind::ALL.iter().map(|&kind| SharedResourcePool::new(kind)).collect(),
        }
    }
}

impl PoolSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, kind: PoolKind) -> &SharedResourcePool {
        &self.pools[kind.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, kind: PoolKind) -> &mut SharedResourcePool {
        &mut self.pools[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedResourcePool> {
        self.pools.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_pool_kind_index_matches_all() {
        for (i, kind) in PoolKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_insert_keeps_first_definition() {
        let mut pool = SharedResourcePool::new(PoolKind::Style);
        pool.insert("Normal", RefList::new());
        pool.insert("Heading1", smallvec![ResourceRef::new(PoolKind::Style, "Normal")]);
        pool.insert("Normal", smallvec![ResourceRef::new(PoolKind::Style, "Other")]);

        assert_eq!(pool.len(), 2);
        assert!(pool.get("Normal").unwrap().deps.is_empty());
        assert_eq!(pool.position("Heading1"), Some(1));
        assert!(!pool.contains("Other"));
    }

    #[test]
    fn test_retain_deps() {
        let mut pool = SharedResourcePool::new(PoolKind::Part);
        pool.insert(
            "/xl/worksheets/sheet1.xml",
            smallvec![
                ResourceRef::new(PoolKind::Part, "/xl/tables/table1.xml"),
                ResourceRef::new(PoolKind::Part, "/xl/drawings/drawing1.xml"),
            ],
        );
        pool.retain_deps("/xl/worksheets/sheet1.xml", |dep| !dep.id.contains("/tables/"));
        pool.retain_deps("/absent.xml", |_| false);

        let deps = &pool.get("/xl/worksheets/sheet1.xml").unwrap().deps;
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].id, "/xl/drawings/drawing1.xml");
    }

    #[test]
    fn test_pool_set_is_keyed_by_kind() {
        let mut pools = PoolSet::new();
        pools.get_mut(PoolKind::Font).insert("0", RefList::new());
        assert_eq!(pools.get(PoolKind::Font).len(), 1);
        assert!(pools.get(PoolKind::Fill).is_empty());
        assert_eq!(pools.get(PoolKind::Fill).kind(), PoolKind::Fill);
    }
}
