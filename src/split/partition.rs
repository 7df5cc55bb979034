//! Partitioning: turn split points into fragments.

use super::boundary::SplitPoint;
use crate::common::Result;
use crate::package::{ContentIndex, ContentUnit, Package};
use smallvec::SmallVec;
use std::ops::Range;

/// A contiguous run of content nodes, before its resources are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Position in output order
    pub index: usize,
    /// Half-open range of node indices
    pub nodes: Range<usize>,
    /// Units (indices into the content index) the fragment is rebuilt from
    pub units: SmallVec<[usize; 4]>,
    /// First heading or slide title, else the first named unit
    pub title: Option<String>,
}

impl Fragment {
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Partition a package's content stream at `points`.
pub fn partition(package: &Package, points: &[SplitPoint], include_empty: bool) -> Result<Vec<Fragment>> {
    let content = package.content_index()?;
    Ok(partition_index(content, points, include_empty))
}

/// Partition an indexed content stream.
///
/// `n` points give `n + 1` ranges `[b_i, b_{i+1})` between the sentinels
/// `0` and `len`. Empty ranges are dropped unless `include_empty` is set;
/// without points the whole document is one fragment.
pub fn partition_index(content: &ContentIndex, points: &[SplitPoint], include_empty: bool) -> Vec<Fragment> {
    let len = content.len();
    let mut bounds = Vec::with_capacity(points.len() + 2);
    bounds.push(0);
    bounds.extend(points.iter().map(|p| p.0.min(len)));
    bounds.push(len);

    let mut fragments: Vec<Fragment> = bounds
        .windows(2)
        .map(|w| Fragment {
            index: 0,
            nodes: w[0]..w[1].max(w[0]),
            units: SmallVec::new(),
            title: None,
        })
        .collect();
    assign_units(&mut fragments, &content.units);

    if !include_empty && fragments.len() > 1 {
        fragments.retain(|fragment| !fragment.is_empty());
        if fragments.is_empty() {
            fragments.push(Fragment {
                index: 0,
                nodes: 0..len,
                units: (0..content.units.len()).collect(),
                title: None,
            });
        }
    }
    for (index, fragment) in fragments.iter_mut().enumerate() {
        fragment.index = index;
        fragment.title = title_of(content, fragment);
    }
    fragments
}

/// Attach units to fragments.
///
/// A unit with nodes belongs to every fragment overlapping it. An empty unit
/// goes to an empty fragment opened at its position if one is free, else to
/// the fragment holding its position. A fragment left without units borrows
/// the unit its range starts in, so it can still be rebuilt.
fn assign_units(fragments: &mut [Fragment], units: &[ContentUnit]) {
    for (u, unit) in units.iter().enumerate() {
        let range = unit.nodes();
        if !unit.is_empty() {
            for fragment in fragments.iter_mut() {
                if !fragment.is_empty() && fragment.nodes.start < range.end && range.start < fragment.nodes.end {
                    fragment.units.push(u);
                }
            }
            continue;
        }
        let at = unit.first_node;
        let target = fragments
            .iter()
            .position(|f| f.is_empty() && f.nodes.start == at && f.units.is_empty())
            .or_else(|| fragments.iter().position(|f| f.nodes.contains(&at)))
            .or_else(|| fragments.iter().rposition(|f| f.nodes.end == at));
        if let Some(target) = target {
            fragments[target].units.push(u);
        }
    }

    for fragment in fragments.iter_mut() {
        fragment.units.sort_unstable();
        if fragment.units.is_empty() && !units.is_empty() {
            let start = fragment.nodes.start;
            let home = units
                .iter()
                .rposition(|unit| unit.first_node <= start && !unit.is_empty())
                .unwrap_or(0);
            fragment.units.push(home);
        }
    }
}

fn title_of(content: &ContentIndex, fragment: &Fragment) -> Option<String> {
    content.nodes[fragment.nodes.clone()]
        .iter()
        .find_map(|node| node.title.clone())
        .or_else(|| {
            fragment
                .units
                .iter()
                .map(|&u| &content.units[u].name)
                .find(|name| !name.is_empty())
                .cloned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{BreakMarkers, PackURI, RefList};
    use proptest::prelude::*;

    fn body(len: usize) -> ContentIndex {
        let mut content = ContentIndex::default();
        content.begin_unit("", PackURI::new("/word/document.xml").unwrap(), RefList::new(), 0);
        for i in 0..len {
            content.push_node(BreakMarkers::empty(), RefList::new(), None, i);
        }
        content
    }

    fn ranges(fragments: &[Fragment]) -> Vec<Range<usize>> {
        fragments.iter().map(|f| f.nodes.clone()).collect()
    }

    #[test]
    fn test_ranges_between_points() {
        let content = body(10);
        let fragments = partition_index(&content, &[SplitPoint(4), SplitPoint(8)], false);
        assert_eq!(ranges(&fragments), vec![0..4, 4..8, 8..10]);
        assert!(fragments.iter().all(|f| f.units.as_slice() == [0]));
        assert_eq!(fragments[2].index, 2);
    }

    #[test]
    fn test_no_points_is_one_fragment() {
        let content = body(0);
        let fragments = partition_index(&content, &[], false);
        assert_eq!(ranges(&fragments), vec![0..0]);
    }

    #[test]
    fn test_empty_fragments_dropped_or_kept() {
        let content = body(3);
        let points = [SplitPoint(1), SplitPoint(1), SplitPoint(3)];
        assert_eq!(ranges(&partition_index(&content, &points, false)), vec![0..1, 1..3]);
        let kept = partition_index(&content, &points, true);
        assert_eq!(ranges(&kept), vec![0..1, 1..1, 1..3, 3..3]);
        assert_eq!(kept[3].index, 3);
    }

    #[test]
    fn test_empty_sheets_get_their_own_fragment() {
        let mut content = ContentIndex::default();
        let part = PackURI::new("/xl/worksheets/sheet1.xml").unwrap();
        content.begin_unit("A", part.clone(), RefList::new(), 0);
        content.push_node(BreakMarkers::empty(), RefList::new(), None, 0);
        content.begin_unit("B", part.clone(), RefList::new(), 1);
        content.begin_unit("C", part, RefList::new(), 2);
        content.push_node(BreakMarkers::empty(), RefList::new(), None, 0);

        let fragments = partition_index(&content, &[SplitPoint(1), SplitPoint(1)], true);
        assert_eq!(ranges(&fragments), vec![0..1, 1..1, 1..2]);
        assert_eq!(fragments[1].units.as_slice(), [1]);
        assert_eq!(fragments[1].title.as_deref(), Some("B"));
        assert_eq!(fragments[2].units.as_slice(), [2]);
    }

    #[test]
    fn test_title_prefers_node_titles() {
        let mut content = body(0);
        content.push_node(BreakMarkers::empty(), RefList::new(), None, 0);
        content.push_node(BreakMarkers::HEADING, RefList::new(), Some("Results".into()), 1);
        let fragments = partition_index(&content, &[], false);
        assert_eq!(fragments[0].title.as_deref(), Some("Results"));
        // The document body has no name to fall back to
        assert_eq!(partition_index(&body(2), &[], false)[0].title, None);
    }

    proptest! {
        #[test]
        fn prop_fragments_cover_stream(
            len in 0usize..300,
            raw in proptest::collection::vec(0usize..320, 0..30),
            include_empty in any::<bool>(),
        ) {
            let content = body(len);
            let mut points: Vec<SplitPoint> = raw.into_iter().filter(|&p| p > 0 && p <= len).map(SplitPoint).collect();
            points.sort();
            let fragments = partition_index(&content, &points, include_empty);

            prop_assert!(!fragments.is_empty());
            let mut next = 0;
            for (i, fragment) in fragments.iter().enumerate() {
                prop_assert_eq!(fragment.index, i);
                prop_assert_eq!(fragment.nodes.start, next);
                next = fragment.nodes.end;
            }
            prop_assert_eq!(next, len);
            if !include_empty && len > 0 {
                prop_assert!(fragments.iter().all(|f| !f.is_empty()));
            }
        }
    }
}
