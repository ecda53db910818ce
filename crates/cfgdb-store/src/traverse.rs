//! Graph traversal over relations.
//!
//! Every traversal here runs on an explicit work-list, so the depth of the
//! object graph never turns into call-stack depth.

use std::collections::{HashSet, VecDeque};

use cfgdb_types::ObjectRef;
use tracing::debug;

use crate::object::StoredObject;
use crate::store::ObjectStore;

impl ObjectStore {
    /// Existence test with bounded relation checks.
    ///
    /// Returns `true` if `start` is loaded and, for `depth > 0`, every
    /// object reachable from it within `depth` relation hops is loaded too.
    /// Objects already in `visited` are not expanded again; every object
    /// checked is added to it. Never fails: any missing object yields
    /// `false`.
    pub fn test_exists(&self, start: &ObjectRef, depth: usize, visited: &mut HashSet<ObjectRef>) -> bool {
        if !self.contains(start) {
            return false;
        }
        if !visited.insert(start.clone()) || depth == 0 {
            return true;
        }

        let mut queue: VecDeque<(ObjectRef, usize)> = VecDeque::from([(start.clone(), depth)]);
        while let Some((current, remaining)) = queue.pop_front() {
            let Ok(object) = self.get(&current) else {
                return false;
            };
            for (slot, target) in object.outgoing() {
                if !self.contains(target) {
                    debug!(from = %current, slot, missing = %target, "test_exists: missing target");
                    return false;
                }
                if remaining > 1 && visited.insert(target.clone()) {
                    queue.push_back((target.clone(), remaining - 1));
                }
            }
        }
        true
    }

    /// Follow a single-valued relation from `start` until it is unset,
    /// points at an object that is not loaded, or revisits an object.
    pub fn walk<'a>(&'a self, start: &ObjectRef, slot: &'a str) -> RelationWalk<'a> {
        RelationWalk {
            store: self,
            slot,
            next: Some(start.clone()),
            seen: HashSet::new(),
        }
    }

    /// Every loaded object reachable from `roots` through any relation,
    /// within `max_depth` hops (`None` for no bound), in breadth-first order.
    pub fn reachable(&self, roots: &[ObjectRef], max_depth: Option<usize>) -> Vec<&StoredObject> {
        let mut visited: HashSet<&ObjectRef> = HashSet::new();
        let mut queue: VecDeque<(&StoredObject, usize)> = VecDeque::new();
        let mut out = Vec::new();

        for root in roots {
            if let Ok(object) = self.get(root) {
                if visited.insert(object.oref()) {
                    queue.push_back((object, 0));
                }
            }
        }

        while let Some((object, depth)) = queue.pop_front() {
            out.push(object);
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for (_, target) in object.outgoing() {
                if let Ok(next) = self.get(target) {
                    if visited.insert(next.oref()) {
                        queue.push_back((next, depth + 1));
                    }
                }
            }
        }
        out
    }
}

/// Iterator produced by [`ObjectStore::walk`].
#[derive(Debug)]
pub struct RelationWalk<'a> {
    store: &'a ObjectStore,
    slot: &'a str,
    next: Option<ObjectRef>,
    seen: HashSet<ObjectRef>,
}

impl<'a> Iterator for RelationWalk<'a> {
    type Item = &'a StoredObject;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if !self.seen.insert(current.clone()) {
            debug!(object = %current, "walk: cycle detected");
            return None;
        }
        let object = self.store.get(&current).ok()?;
        self.next = object.field(self.slot).and_then(|f| f.as_object()).cloned();
        Some(object)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use cfgdb_types::{Field, Relation};

    use super::*;

    fn r(id: &str) -> ObjectRef {
        ObjectRef::new("Second", id)
    }

    fn obj(id: &str, another: Option<&str>, others: &[&str]) -> StoredObject {
        let mut fields = BTreeMap::new();
        fields.insert(
            "Another".to_string(),
            Field::from(Relation::from(another.map(r))),
        );
        fields.insert(
            "Others".to_string(),
            Field::from(Relation::from(others.iter().map(|o| r(o)).collect::<Vec<_>>())),
        );
        StoredObject::new(r(id), fields, PathBuf::from("/db/t.json"))
    }

    /// `Object-0 <- Object-1 <- ... <- Object-(n-1)` through `Another`.
    fn chain(n: usize) -> ObjectStore {
        let mut store = ObjectStore::new();
        for i in 0..n {
            let prev = (i > 0).then(|| format!("Object-{}", i - 1));
            store
                .insert(obj(&format!("Object-{i}"), prev.as_deref(), &[]))
                .unwrap();
        }
        store
    }

    // ---- test_exists ----

    #[test]
    fn missing_object_is_false() {
        let store = chain(2);
        assert!(!store.test_exists(&r("nope"), 0, &mut HashSet::new()));
        assert!(store.test_exists(&r("Object-1"), 0, &mut HashSet::new()));
    }

    #[test]
    fn depth_bounds_the_check() {
        let mut store = ObjectStore::new();
        store.insert(obj("a", Some("b"), &[])).unwrap();
        store.insert(obj("b", Some("ghost"), &[])).unwrap();

        assert!(store.test_exists(&r("a"), 0, &mut HashSet::new()));
        assert!(store.test_exists(&r("a"), 1, &mut HashSet::new()));
        assert!(!store.test_exists(&r("a"), 2, &mut HashSet::new()));
        assert!(!store.test_exists(&r("b"), 1, &mut HashSet::new()));
    }

    #[test]
    fn multi_valued_targets_are_checked() {
        let mut store = ObjectStore::new();
        store.insert(obj("a", None, &["b", "c"])).unwrap();
        store.insert(obj("b", None, &[])).unwrap();
        assert!(!store.test_exists(&r("a"), 1, &mut HashSet::new()));
        store.insert(obj("c", None, &[])).unwrap();
        assert!(store.test_exists(&r("a"), 1, &mut HashSet::new()));
    }

    #[test]
    fn visited_set_is_filled_and_respected() {
        let store = chain(5);
        let mut visited = HashSet::new();
        assert!(store.test_exists(&r("Object-4"), 10, &mut visited));
        assert_eq!(visited.len(), 5);
        // Already visited: only existence is checked.
        assert!(store.test_exists(&r("Object-4"), 10, &mut visited));
    }

    #[test]
    fn cycles_terminate() {
        let mut store = ObjectStore::new();
        store.insert(obj("a", Some("b"), &[])).unwrap();
        store.insert(obj("b", Some("a"), &[])).unwrap();
        assert!(store.test_exists(&r("a"), usize::MAX, &mut HashSet::new()));
    }

    #[test]
    fn deep_chain_has_no_recursion_limit() {
        let store = chain(20_000);
        assert!(store.test_exists(&r("Object-19999"), usize::MAX, &mut HashSet::new()));
    }

    // ---- walk ----

    #[test]
    fn walk_visits_whole_chain() {
        let store = chain(10_000);
        assert_eq!(store.walk(&r("Object-9999"), "Another").count(), 10_000);
        let last = store.walk(&r("Object-9999"), "Another").last().unwrap();
        assert_eq!(last.id(), "Object-0");
    }

    #[test]
    fn walk_stops_on_cycle_and_missing() {
        let mut store = ObjectStore::new();
        store.insert(obj("a", Some("b"), &[])).unwrap();
        store.insert(obj("b", Some("a"), &[])).unwrap();
        store.insert(obj("c", Some("ghost"), &[])).unwrap();
        assert_eq!(store.walk(&r("a"), "Another").count(), 2);
        assert_eq!(store.walk(&r("c"), "Another").count(), 1);
        assert_eq!(store.walk(&r("ghost"), "Another").count(), 0);
    }

    // ---- reachable ----

    #[test]
    fn reachable_respects_depth() {
        let store = chain(10);
        assert_eq!(store.reachable(&[r("Object-9")], None).len(), 10);
        let near: Vec<_> = store
            .reachable(&[r("Object-9")], Some(2))
            .iter()
            .map(|o| o.id().to_string())
            .collect();
        assert_eq!(near, vec!["Object-9", "Object-8", "Object-7"]);
    }
}
