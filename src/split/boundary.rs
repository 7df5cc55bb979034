//! Boundary resolution: where a document's fragments begin.

use super::policy::{SplitMode, SplitPolicy};
use crate::common::Result;
use crate::package::{BreakMarkers, ContentIndex, Package};

/// Index of the first node of a fragment other than the first.
///
/// Points are interior: `0 < point <= len`. A point equal to `len` or to its
/// predecessor opens an empty fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SplitPoint(pub usize);

/// Resolve the split points of a package under `policy`.
pub fn resolve(package: &Package, policy: &SplitPolicy) -> Result<Vec<SplitPoint>> {
    policy.validate()?;
    let content = package.content_index()?;
    let points = resolve_index(content, policy);
    tracing::debug!(
        mode = %policy.mode,
        nodes = content.len(),
        boundaries = points.len(),
        "boundaries resolved"
    );
    Ok(points)
}

/// Resolve split points over an already indexed content stream.
pub fn resolve_index(content: &ContentIndex, policy: &SplitPolicy) -> Vec<SplitPoint> {
    let len = content.len();
    match policy.mode {
        SplitMode::PageBreak | SplitMode::SectionBreak | SplitMode::PageOrSectionBreak => {
            let watched = policy.mode.trailing_markers();
            content
                .nodes
                .iter()
                .filter(|node| node.markers.intersects(watched))
                .map(|node| SplitPoint(node.index + 1))
                .collect()
        },
        SplitMode::Heading => content
            .nodes
            .iter()
            .filter(|node| node.index > 0 && node.markers.contains(BreakMarkers::HEADING))
            .map(|node| SplitPoint(node.index))
            .collect(),
        SplitMode::SheetBoundary => content
            .units
            .iter()
            .skip(1)
            .map(|unit| SplitPoint(unit.first_node))
            .filter(|point| point.0 > 0)
            .collect(),
        SplitMode::FixedCount => match policy.fragment_count() {
            Some(count) if len > 0 => fixed_count(len, count),
            _ => Vec::new(),
        },
    }
}

/// Spread `len` nodes over `count` fragments; the first `len % count`
/// fragments take one extra node.
fn fixed_count(len: usize, count: usize) -> Vec<SplitPoint> {
    let base = len / count;
    let extra = len % count;
    (1..count)
        .map(|k| SplitPoint(k * base + k.min(extra)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackURI, RefList};
    use proptest::prelude::*;

    fn stream(markers: &[BreakMarkers]) -> ContentIndex {
        let mut content = ContentIndex::default();
        content.begin_unit("body", PackURI::new("/word/document.xml").unwrap(), RefList::new(), 0);
        for (i, &m) in markers.iter().enumerate() {
            content.push_node(m, RefList::new(), None, i);
        }
        content
    }

    fn points(content: &ContentIndex, policy: &SplitPolicy) -> Vec<usize> {
        resolve_index(content, policy).into_iter().map(|p| p.0).collect()
    }

    #[test]
    fn test_page_breaks_split_after_marked_node() {
        let mut markers = vec![BreakMarkers::empty(); 10];
        markers[3] = BreakMarkers::PAGE;
        markers[7] = BreakMarkers::PAGE;
        let content = stream(&markers);
        assert_eq!(points(&content, &SplitPolicy::new(SplitMode::PageBreak)), vec![4, 8]);
        assert!(points(&content, &SplitPolicy::new(SplitMode::SectionBreak)).is_empty());
    }

    #[test]
    fn test_coincident_markers_yield_one_point() {
        let mut markers = vec![BreakMarkers::empty(); 5];
        markers[2] = BreakMarkers::PAGE | BreakMarkers::SECTION;
        let content = stream(&markers);
        assert_eq!(
            points(&content, &SplitPolicy::new(SplitMode::PageOrSectionBreak)),
            vec![3]
        );
    }

    #[test]
    fn test_heading_splits_before() {
        let mut markers = vec![BreakMarkers::empty(); 6];
        markers[0] = BreakMarkers::HEADING;
        markers[4] = BreakMarkers::HEADING;
        let content = stream(&markers);
        assert_eq!(points(&content, &SplitPolicy::new(SplitMode::Heading)), vec![4]);
    }

    #[test]
    fn test_fixed_count_is_balanced() {
        assert_eq!(fixed_count(10, 4), vec![SplitPoint(3), SplitPoint(6), SplitPoint(8)]);
        assert_eq!(fixed_count(3, 5), vec![SplitPoint(1), SplitPoint(2), SplitPoint(3), SplitPoint(3)]);
        assert!(fixed_count(7, 1).is_empty());
        let empty = stream(&[]);
        assert!(points(&empty, &SplitPolicy::fixed_count(3)).is_empty());
    }

    #[test]
    fn test_sheet_boundaries_keep_empty_units() {
        let mut content = ContentIndex::default();
        let part = PackURI::new("/xl/worksheets/sheet1.xml").unwrap();
        content.begin_unit("A", part.clone(), RefList::new(), 0);
        content.push_node(BreakMarkers::empty(), RefList::new(), None, 0);
        content.push_node(BreakMarkers::empty(), RefList::new(), None, 1);
        content.begin_unit("B", part.clone(), RefList::new(), 1);
        content.begin_unit("C", part, RefList::new(), 2);
        content.push_node(BreakMarkers::empty(), RefList::new(), None, 0);
        assert_eq!(points(&content, &SplitPolicy::new(SplitMode::SheetBoundary)), vec![2, 2]);
    }

    proptest! {
        #[test]
        fn prop_fixed_count_sizes_differ_by_at_most_one(len in 1usize..500, count in 1usize..40) {
            let mut bounds = vec![0];
            bounds.extend(fixed_count(len, count).into_iter().map(|p| p.0));
            bounds.push(len);
            let sizes: Vec<usize> = bounds.windows(2).map(|w| w[1] - w[0]).collect();
            prop_assert_eq!(sizes.len(), count);
            prop_assert_eq!(sizes.iter().sum::<usize>(), len);
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            prop_assert!(max - min <= 1);
            prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn prop_points_are_interior_and_monotonic(
            raw in proptest::collection::vec(0u8..8, 0..200),
            mode in prop_oneof![
                Just(SplitMode::PageBreak),
                Just(SplitMode::SectionBreak),
                Just(SplitMode::PageOrSectionBreak),
                Just(SplitMode::Heading),
            ],
        ) {
            let markers: Vec<BreakMarkers> = raw.iter().map(|&b| BreakMarkers::from_bits_truncate(b)).collect();
            let content = stream(&markers);
            let points = points(&content, &SplitPolicy::new(mode));
            prop_assert!(points.iter().all(|&p| p > 0 && p <= markers.len()));
            prop_assert!(points.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
