//! The main content stream.
//!
//! Content nodes are the addressable units a document is split into
//! (paragraphs and tables, worksheet rows, slides), numbered in document
//! order. Units group nodes into the containers a fragment is rebuilt from
//! (the document body, a worksheet, a slide).

use super::packuri::PackURI;
use super::pool::{PoolKind, PoolSet, RefList, ResourceRef, SharedResourcePool};
use bitflags::bitflags;
use std::ops::Range;

bitflags! {
    /// Split markers a content node carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BreakMarkers: u8 {
        /// A hard page break ends with this node
        const PAGE = 0b0000_0001;
        /// A section ends with this node
        const SECTION = 0b0000_0010;
        /// The node is a heading
        const HEADING = 0b0000_0100;
    }
}

/// One addressable unit of primary content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    /// Position in document order
    pub index: usize,
    /// Unit holding the node
    pub unit: usize,
    pub markers: BreakMarkers,
    /// References into shared pools, in document order
    pub refs: RefList,
    /// Heading or slide title carried by the node
    pub title: Option<String>,
    /// Child position of the node's element within its container
    pub position: usize,
}

/// A container of nodes that is rebuilt as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    /// Sheet or slide name; empty for a document body
    pub name: String,
    /// Part holding the unit's nodes
    pub part: PackURI,
    pub first_node: usize,
    pub node_count: usize,
    /// References made by the unit outside its nodes
    pub refs: RefList,
    /// Child position of the unit's entry in the main part's list
    pub position: usize,
}

impl ContentUnit {
    #[inline]
    pub fn nodes(&self) -> Range<usize> {
        self.first_node..self.first_node + self.node_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.node_count == 0
    }
}

/// Everything a document layout discovers about a package's content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentIndex {
    pub nodes: Vec<ContentNode>,
    pub units: Vec<ContentUnit>,
    pub pools: PoolSet,
    /// Resources every fragment keeps (default styles, required formats)
    pub pinned: Vec<ResourceRef>,
    /// References of the main part outside its content stream
    pub skeleton: Vec<ResourceRef>,
    /// Main-part relationships every fragment keeps
    pub ambient: Vec<ResourceRef>,
}

impl ContentIndex {
    #[inline]
    pub fn pool(&self, kind: PoolKind) -> &SharedResourcePool {
        self.pools.get(kind)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Open a new unit; nodes pushed afterwards belong to it.
    pub fn begin_unit(&mut self, name: impl Into<String>, part: PackURI, refs: RefList, position: usize) {
        self.units.push(ContentUnit {
            name: name.into(),
            part,
            first_node: self.nodes.len(),
            node_count: 0,
            refs,
            position,
        });
    }

    /// Append a node to the current unit and return its index.
    pub fn push_node(
        &mut self,
        markers: BreakMarkers,
        refs: RefList,
        title: Option<String>,
        position: usize,
    ) -> usize {
        let index = self.nodes.len();
        let unit = self.units.len().saturating_sub(1);
        if let Some(current) = self.units.last_mut() {
            current.node_count += 1;
        }
        self.nodes.push(ContentNode {
            index,
            unit,
            markers,
            refs,
            title,
            position,
        });
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_collect_following_nodes() {
        let mut index = ContentIndex::default();
        let part = PackURI::new("/xl/worksheets/sheet1.xml").unwrap();
        index.begin_unit("Sheet1", part.clone(), RefList::new(), 0);
        index.push_node(BreakMarkers::empty(), RefList::new(), None, 0);
        index.push_node(BreakMarkers::PAGE, RefList::new(), None, 1);
        index.begin_unit("Empty", part.clone(), RefList::new(), 1);
        index.begin_unit("Sheet3", part, RefList::new(), 2);
        index.push_node(BreakMarkers::empty(), RefList::new(), None, 0);

        assert_eq!(index.len(), 3);
        assert_eq!(index.units[0].nodes(), 0..2);
        assert!(index.units[1].is_empty());
        assert_eq!(index.units[1].first_node, 2);
        assert_eq!(index.units[2].nodes(), 2..3);
        assert_eq!(index.nodes[2].unit, 2);
    }

    #[test]
    fn test_markers_combine() {
        let both = BreakMarkers::PAGE | BreakMarkers::SECTION;
        assert!(both.intersects(BreakMarkers::SECTION));
        assert!(!both.contains(BreakMarkers::HEADING));
    }
}
