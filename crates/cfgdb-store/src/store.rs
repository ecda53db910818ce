use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use cfgdb_types::{Field, ObjectRef};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{Handle, StoredObject};

/// `(referrer, slot)` pairs pointing at one target.
type Referrers = BTreeSet<(ObjectRef, String)>;

/// All loaded objects of a session.
///
/// Objects live in an arena and are found through one global index keyed by
/// `(class, id)`; ids are unique per class across every loaded file. A
/// reverse index maps each referenced identity to the objects whose
/// relations point at it. The reverse index also holds entries for targets
/// that are not loaded, which is how dangling references are found.
///
/// Relations store identities, never object copies, so following a
/// relation is one hash lookup.
#[derive(Debug, Default)]
pub struct ObjectStore {
    slots: Vec<Option<StoredObject>>,
    free: Vec<usize>,
    index: HashMap<ObjectRef, Handle>,
    /// Class name -> ids of objects of exactly that class.
    by_class: HashMap<String, BTreeSet<String>>,
    incoming: HashMap<ObjectRef, Referrers>,
}

impl ObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loaded objects.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Drop every object.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn contains(&self, oref: &ObjectRef) -> bool {
        self.index.contains_key(oref)
    }

    // -----------------------------------------------------------------------
    // Insert / lookup
    // -----------------------------------------------------------------------

    /// Add an object. Fails if the identity is already taken.
    pub fn insert(&mut self, object: StoredObject) -> StoreResult<Handle> {
        if self.index.contains_key(&object.oref) {
            return Err(StoreError::AlreadyExists(object.oref));
        }
        let oref = object.oref.clone();
        for (slot, target) in object.outgoing() {
            self.incoming
                .entry(target.clone())
                .or_default()
                .insert((oref.clone(), slot.to_string()));
        }
        let handle = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(object);
                Handle(i)
            }
            None => {
                self.slots.push(Some(object));
                Handle(self.slots.len() - 1)
            }
        };
        self.by_class
            .entry(oref.class.clone())
            .or_default()
            .insert(oref.id.clone());
        self.index.insert(oref, handle);
        Ok(handle)
    }

    pub fn handle(&self, oref: &ObjectRef) -> Option<Handle> {
        self.index.get(oref).copied()
    }

    pub fn by_handle(&self, handle: Handle) -> Option<&StoredObject> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    /// Look up an object by identity.
    pub fn get(&self, oref: &ObjectRef) -> StoreResult<&StoredObject> {
        let handle = self
            .handle(oref)
            .ok_or_else(|| StoreError::NotFound(oref.clone()))?;
        self.by_handle(handle)
            .ok_or_else(|| StoreError::Corrupt(format!("index points at empty slot for {oref}")))
    }

    fn get_mut(&mut self, oref: &ObjectRef) -> StoreResult<&mut StoredObject> {
        let handle = self
            .handle(oref)
            .ok_or_else(|| StoreError::NotFound(oref.clone()))?;
        self.slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| StoreError::Corrupt(format!("index points at empty slot for {oref}")))
    }

    /// Objects of exactly `class`, ordered by id.
    pub fn objects_of(&self, class: &str) -> Vec<&StoredObject> {
        self.by_class
            .get(class)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(&ObjectRef::new(class, id.as_str())).ok())
            .collect()
    }

    /// Number of objects of exactly `class`.
    pub fn count(&self, class: &str) -> usize {
        self.by_class.get(class).map_or(0, BTreeSet::len)
    }

    /// Classes that have at least one object, sorted.
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self
            .by_class
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(c, _)| c.as_str())
            .collect();
        classes.sort_unstable();
        classes
    }

    /// Every loaded object, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredObject> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Objects stored in `file`, ordered by class then id.
    pub fn objects_in(&self, file: &Path) -> Vec<&StoredObject> {
        let mut objects: Vec<&StoredObject> = self.iter().filter(|o| o.file == file).collect();
        objects.sort_by(|a, b| a.oref.cmp(&b.oref));
        objects
    }

    // -----------------------------------------------------------------------
    // References
    // -----------------------------------------------------------------------

    /// Objects whose relations point at `target`, with the slot name,
    /// optionally restricted to one slot. Sorted.
    pub fn referrers(&self, target: &ObjectRef, slot: Option<&str>) -> Vec<(ObjectRef, String)> {
        self.incoming
            .get(target)
            .into_iter()
            .flatten()
            .filter(|(_, s)| slot.map_or(true, |want| want == s))
            .cloned()
            .collect()
    }

    /// Every `(referrer, slot, target)` whose target is not loaded.
    pub fn dangling(&self) -> Vec<(ObjectRef, String, ObjectRef)> {
        let mut out: Vec<_> = self
            .incoming
            .iter()
            .filter(|(target, _)| !self.index.contains_key(*target))
            .flat_map(|(target, refs)| {
                refs.iter()
                    .map(move |(obj, slot)| (obj.clone(), slot.clone(), target.clone()))
            })
            .collect();
        out.sort();
        out
    }

    fn link(&mut self, referrer: &ObjectRef, slot: &str, field: &Field) {
        for target in field.as_objects() {
            self.incoming
                .entry(target.clone())
                .or_default()
                .insert((referrer.clone(), slot.to_string()));
        }
    }

    fn unlink(&mut self, referrer: &ObjectRef, slot: &str, field: &Field) {
        for target in field.as_objects() {
            if let Some(refs) = self.incoming.get_mut(target) {
                refs.remove(&(referrer.clone(), slot.to_string()));
                if refs.is_empty() {
                    self.incoming.remove(target);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Replace the content of one slot and return the previous content. The
    /// slot must already exist.
    pub fn set_field(&mut self, oref: &ObjectRef, name: &str, field: Field) -> StoreResult<Field> {
        let object = self.get_mut(oref)?;
        let slot = object
            .fields
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownField {
                object: oref.clone(),
                field: name.to_string(),
            })?;
        let old = std::mem::replace(slot, field.clone());
        self.unlink(oref, name, &old);
        self.link(oref, name, &field);
        Ok(old)
    }

    /// Move an object to another data file.
    pub fn set_file(&mut self, oref: &ObjectRef, file: PathBuf) -> StoreResult<PathBuf> {
        let object = self.get_mut(oref)?;
        Ok(std::mem::replace(&mut object.file, file))
    }

    /// Remove an object.
    ///
    /// Fails with [`StoreError::DanglingReference`] while any other object
    /// still points at it. References from the object to itself do not
    /// count.
    pub fn remove(&mut self, oref: &ObjectRef) -> StoreResult<StoredObject> {
        if !self.contains(oref) {
            return Err(StoreError::NotFound(oref.clone()));
        }
        let referrers: Vec<_> = self
            .referrers(oref, None)
            .into_iter()
            .filter(|(obj, _)| obj != oref)
            .collect();
        if !referrers.is_empty() {
            return Err(StoreError::DanglingReference {
                target: oref.clone(),
                referrers,
            });
        }
        self.take(oref)
    }

    /// Remove every object stored in `file`, regardless of references from
    /// objects that stay. Returns the removed identities.
    pub fn evict_file(&mut self, file: &Path) -> Vec<ObjectRef> {
        let victims: Vec<ObjectRef> = self
            .iter()
            .filter(|o| o.file == file)
            .map(|o| o.oref.clone())
            .collect();
        for oref in &victims {
            if let Err(e) = self.take(oref) {
                debug!(object = %oref, error = %e, "evict skipped object");
            }
        }
        debug!(file = %file.display(), count = victims.len(), "evicted objects of file");
        victims
    }

    fn take(&mut self, oref: &ObjectRef) -> StoreResult<StoredObject> {
        let handle = self
            .index
            .remove(oref)
            .ok_or_else(|| StoreError::NotFound(oref.clone()))?;
        let object = self
            .slots
            .get_mut(handle.0)
            .and_then(Option::take)
            .ok_or_else(|| StoreError::Corrupt(format!("index points at empty slot for {oref}")))?;
        self.free.push(handle.0);
        if let Some(ids) = self.by_class.get_mut(oref.class()) {
            ids.remove(oref.id());
        }
        for (slot, field) in &object.fields {
            self.unlink(oref, slot, field);
        }
        Ok(object)
    }

    /// Give an object a new id and rewrite every relation that points at
    /// it. Returns the objects whose relations were rewritten.
    pub fn rename(&mut self, oref: &ObjectRef, new_id: &str) -> StoreResult<Vec<ObjectRef>> {
        let renamed = ObjectRef::new(oref.class(), new_id);
        if self.contains(&renamed) {
            return Err(StoreError::AlreadyExists(renamed));
        }
        let referrers = self.referrers(oref, None);

        let mut object = self.take(oref)?;
        object.oref = renamed.clone();
        for field in object.fields.values_mut() {
            if let Field::Relation(rel) = field {
                rel.replace_target(oref, &renamed);
            }
        }
        self.insert(object)?;

        let mut touched = Vec::new();
        for (referrer, slot) in referrers {
            if referrer == *oref {
                continue;
            }
            let Ok(object) = self.get(&referrer) else {
                continue;
            };
            let Some(Field::Relation(rel)) = object.field(&slot) else {
                continue;
            };
            let mut rel = rel.clone();
            rel.replace_target(oref, &renamed);
            self.set_field(&referrer, &slot, Field::Relation(rel))?;
            if touched.last() != Some(&referrer) {
                touched.push(referrer);
            }
        }
        Ok(touched)
    }

    /// Objects grouped by data file.
    pub fn files(&self) -> BTreeMap<&Path, usize> {
        let mut files = BTreeMap::new();
        for object in self.iter() {
            *files.entry(object.file.as_path()).or_insert(0) += 1;
        }
        files
    }
}
