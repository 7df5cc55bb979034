//! Resource closure of a fragment.
//!
//! Starting from a fragment's roots, pool entries are visited breadth-first
//! through their dependencies. Visit order is first-seen order, which makes
//! the closure (and the ids assigned from it) a pure function of the
//! fragment's content.

use crate::common::{ReferentialIntegrityError, Referrer};
use crate::package::{ContentIndex, PoolKind, ResourceRef};
use fixedbitset::FixedBitSet;
use std::collections::VecDeque;

/// The pool entries a fragment needs, per pool, in first-seen order.
#[derive(Debug, Clone)]
pub struct Closure<'a> {
    index: &'a ContentIndex,
    visited: Vec<FixedBitSet>,
    order: Vec<Vec<usize>>,
}

impl<'a> Closure<'a> {
    /// Follow `roots` and everything they transitively depend on.
    ///
    /// A reference to an id its pool does not define fails with the
    /// referrer that made it.
    pub fn compute(
        index: &'a ContentIndex,
        roots: &[(Referrer, ResourceRef)],
    ) -> Result<Self, ReferentialIntegrityError> {
        let mut closure = Closure {
            index,
            visited: PoolKind::ALL
                .iter()
                .map(|&kind| FixedBitSet::with_capacity(index.pool(kind).len()))
                .collect(),
            order: vec![Vec::new(); PoolKind::ALL.len()],
        };
        let mut queue = VecDeque::new();

        for (referrer, root) in roots {
            closure.visit(root, &mut queue, || referrer.clone())?;
        }
        while let Some((kind, pos)) = queue.pop_front() {
            let entry = index.pool(kind).entry(pos);
            for dep in &entry.deps {
                closure.visit(dep, &mut queue, || Referrer::Resource {
                    pool: kind,
                    id: entry.id.clone(),
                })?;
            }
        }
        Ok(closure)
    }

    fn visit(
        &mut self,
        target: &ResourceRef,
        queue: &mut VecDeque<(PoolKind, usize)>,
        referrer: impl FnOnce() -> Referrer,
    ) -> Result<(), ReferentialIntegrityError> {
        let Some(pos) = self.index.pool(target.pool).position(&target.id) else {
            return Err(ReferentialIntegrityError {
                referrer: referrer(),
                pool: target.pool,
                id: target.id.clone(),
            });
        };
        let slot = target.pool.index();
        if !self.visited[slot].put(pos) {
            self.order[slot].push(pos);
            queue.push_back((target.pool, pos));
        }
        Ok(())
    }

    /// Whether the closure holds `id` of `pool`.
    pub fn contains(&self, pool: PoolKind, id: &str) -> bool {
        self.index
            .pool(pool)
            .position(id)
            .is_some_and(|pos| self.visited[pool.index()].contains(pos))
    }

    /// Ids of `pool` in the closure, in first-seen order.
    pub fn members(&self, pool: PoolKind) -> impl Iterator<Item = &'a str> + '_ {
        let entries = self.index.pool(pool);
        self.order[pool.index()]
            .iter()
            .map(move |&pos| entries.entry(pos).id.as_str())
    }

    pub fn len(&self, pool: PoolKind) -> usize {
        self.order[pool.index()].len()
    }

    /// Closure size per non-empty pool, for logging.
    pub fn sizes(&self) -> Vec<(PoolKind, usize)> {
        PoolKind::ALL
            .iter()
            .map(|&kind| (kind, self.len(kind)))
            .filter(|&(_, n)| n > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::RefList;
    use smallvec::smallvec;

    fn style(id: &str) -> ResourceRef {
        ResourceRef::new(PoolKind::Style, id)
    }

    fn index() -> ContentIndex {
        let mut index = ContentIndex::default();
        let styles = index.pools.get_mut(PoolKind::Style);
        styles.insert("Normal", RefList::new());
        styles.insert("Heading1", smallvec![style("Normal"), style("Heading1Char")]);
        styles.insert("Heading1Char", smallvec![style("Heading1")]);
        styles.insert("Unused", RefList::new());
        index
            .pools
            .get_mut(PoolKind::Numbering)
            .insert("1", smallvec![ResourceRef::new(PoolKind::AbstractNumbering, "0")]);
        index
            .pools
            .get_mut(PoolKind::AbstractNumbering)
            .insert("0", smallvec![style("Normal")]);
        index
    }

    #[test]
    fn test_transitive_and_cyclic_dependencies() {
        let index = index();
        let roots = [(Referrer::Node(0), style("Heading1"))];
        let closure = Closure::compute(&index, &roots).unwrap();

        let styles: Vec<&str> = closure.members(PoolKind::Style).collect();
        assert_eq!(styles, vec!["Heading1", "Normal", "Heading1Char"]);
        assert!(!closure.contains(PoolKind::Style, "Unused"));
        assert_eq!(closure.len(PoolKind::Numbering), 0);
    }

    #[test]
    fn test_first_seen_order_across_pools() {
        let index = index();
        let roots = [
            (Referrer::Node(0), ResourceRef::new(PoolKind::Numbering, "1")),
            (Referrer::Node(1), style("Normal")),
        ];
        let closure = Closure::compute(&index, &roots).unwrap();
        assert_eq!(closure.members(PoolKind::Style).collect::<Vec<_>>(), vec!["Normal"]);
        assert_eq!(
            closure.sizes(),
            vec![(PoolKind::Style, 1), (PoolKind::Numbering, 1), (PoolKind::AbstractNumbering, 1)]
        );
    }

    #[test]
    fn test_missing_root_names_the_node() {
        let index = index();
        let roots = [(Referrer::Node(4), style("S9"))];
        let err = Closure::compute(&index, &roots).unwrap_err();
        assert_eq!(err.referrer, Referrer::Node(4));
        assert_eq!(err.pool, PoolKind::Style);
        assert_eq!(err.id, "S9");
    }

    #[test]
    fn test_missing_dependency_names_the_definition() {
        let mut index = index();
        index
            .pools
            .get_mut(PoolKind::Style)
            .insert("Broken", smallvec![style("Gone")]);
        let err = Closure::compute(&index, &[(Referrer::Node(0), style("Broken"))]).unwrap_err();
        assert_eq!(
            err.referrer,
            Referrer::Resource {
                pool: PoolKind::Style,
                id: "Broken".to_string()
            }
        );
    }
}
