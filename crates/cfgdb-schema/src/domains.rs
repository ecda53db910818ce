use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::registry::SchemaRegistry;

impl SchemaRegistry {
    /// Partition all classes into inheritance domains.
    ///
    /// Two classes share a domain when one can be reached from the other by
    /// following superclass or subclass links. Classes without any
    /// inheritance form a domain of their own. Domains are returned ordered
    /// by their smallest class name.
    pub fn inheritance_domains(&self) -> Vec<BTreeSet<String>> {
        let mut neighbours: HashMap<&str, Vec<&str>> = HashMap::new();
        for class in self.classes() {
            neighbours.entry(class).or_default();
            for base in self.superclasses(class, false).unwrap_or_default() {
                neighbours.entry(class).or_default().push(base);
                neighbours.entry(base).or_default().push(class);
            }
        }

        let mut assigned: BTreeSet<&str> = BTreeSet::new();
        let mut domains = Vec::new();

        for start in self.classes() {
            if assigned.contains(start) {
                continue;
            }
            let mut domain = BTreeSet::new();
            let mut queue = VecDeque::from([start]);
            assigned.insert(start);
            while let Some(class) = queue.pop_front() {
                domain.insert(class.to_string());
                for next in neighbours.get(class).into_iter().flatten() {
                    if assigned.insert(*next) {
                        queue.push_back(*next);
                    }
                }
            }
            domains.push(domain);
        }
        domains
    }
}
