use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use cfgdb_types::{AttrType, Field, ObjectRef, Relation, Value};
use tracing::debug;

use crate::class::{AttributeDef, ClassDef, RelationDef};
use crate::descriptor::SchemaDescriptor;
use crate::error::{SchemaError, SchemaResult};
use crate::validation::{ValidationReport, Violation, ViolationKind};

/// Inherited view of a class, computed once per registry update.
#[derive(Clone, Debug, Default)]
struct ResolvedClass {
    /// Every superclass, nearest first, without duplicates.
    ancestors: Vec<String>,
    /// Effective attributes, base classes first. A redefinition in a
    /// subclass replaces the inherited definition in place.
    attributes: Vec<AttributeDef>,
    relations: Vec<RelationDef>,
}

/// The set of known classes.
///
/// The registry is populated from schema descriptors and is read-mostly
/// afterwards. Updates are all-or-nothing: a batch that fails any check
/// leaves the registry as it was.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    classes: BTreeMap<String, ClassDef>,
    /// Class name -> name of the descriptor that defined it.
    origins: HashMap<String, String>,
    /// Descriptors already merged, by source name.
    sources: BTreeSet<String>,
    resolved: HashMap<String, ResolvedClass>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load descriptor files, following their schema includes.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> SchemaResult<Self> {
        let mut registry = Self::new();
        registry.load_files(paths)?;
        Ok(registry)
    }

    /// Load more descriptor files into this registry. Relative schema
    /// includes resolve against the directory of the including file.
    /// Returns the number of classes added.
    pub fn load_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> SchemaResult<usize> {
        let mut queue: VecDeque<PathBuf> =
            paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
        let mut seen = HashSet::new();
        let mut batch = Vec::new();

        while let Some(path) = queue.pop_front() {
            let path = std::fs::canonicalize(&path).map_err(|source| SchemaError::Io {
                path: path.clone(),
                source,
            })?;
            if !seen.insert(path.clone()) {
                continue;
            }
            let descriptor = SchemaDescriptor::read(&path)?;
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            queue.extend(descriptor.includes.iter().map(|inc| dir.join(inc)));
            batch.push((path.display().to_string(), descriptor));
        }

        self.extend(batch)
    }

    /// Merge a batch of parsed descriptors, keyed by source name.
    ///
    /// Descriptors whose source name was merged before are skipped. Fails on
    /// duplicate class names, unknown base or target classes, malformed
    /// definitions and inheritance cycles.
    pub fn extend<I>(&mut self, descriptors: I) -> SchemaResult<usize>
    where
        I: IntoIterator<Item = (String, SchemaDescriptor)>,
    {
        let mut classes = self.classes.clone();
        let mut origins = self.origins.clone();
        let mut sources = self.sources.clone();
        let mut added = 0;

        for (source, descriptor) in descriptors {
            if sources.contains(&source) {
                debug!(source = %source, "schema already loaded, skipping");
                continue;
            }
            for class in descriptor.classes {
                check_class_shape(&source, &class)?;
                if let Some(first) = origins.get(&class.name) {
                    return Err(SchemaError::DuplicateClass {
                        name: class.name.clone(),
                        first: first.clone(),
                        second: source.clone(),
                    });
                }
                origins.insert(class.name.clone(), source.clone());
                classes.insert(class.name.clone(), class);
                added += 1;
            }
            debug!(source = %source, "schema merged");
            sources.insert(source);
        }

        let resolved = resolve_all(&classes, &origins)?;
        let candidate = Self {
            classes,
            origins,
            sources,
            resolved,
        };
        candidate.check_defaults()?;
        *self = candidate;
        Ok(added)
    }

    /// Returns `true` if a descriptor with this source name was merged.
    pub fn has_source(&self, source: &str) -> bool {
        self.sources.contains(source)
    }

    /// Source names of all merged descriptors.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Look up a class definition.
    pub fn resolve(&self, class: &str) -> SchemaResult<&ClassDef> {
        self.classes
            .get(class)
            .ok_or_else(|| SchemaError::UnknownClass(class.to_string()))
    }

    /// Look up a class that objects can be created in.
    pub fn instantiable(&self, class: &str) -> SchemaResult<&ClassDef> {
        let def = self.resolve(class)?;
        if def.is_abstract {
            return Err(SchemaError::AbstractClass(class.to_string()));
        }
        Ok(def)
    }

    /// The descriptor a class came from.
    pub fn origin(&self, class: &str) -> Option<&str> {
        self.origins.get(class).map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// All class names, sorted.
    pub fn classes(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    /// Direct superclasses, or every ancestor when `all` is set.
    pub fn superclasses(&self, class: &str, all: bool) -> SchemaResult<Vec<&str>> {
        let def = self.resolve(class)?;
        if all {
            Ok(self.resolved_of(class)?.ancestors.iter().map(String::as_str).collect())
        } else {
            Ok(def.superclasses.iter().map(String::as_str).collect())
        }
    }

    /// Direct subclasses, or every descendant when `all` is set. Sorted.
    pub fn subclasses(&self, class: &str, all: bool) -> SchemaResult<Vec<&str>> {
        self.resolve(class)?;
        let subs = self
            .classes
            .iter()
            .filter(|(name, def)| {
                if all {
                    self.resolved
                        .get(name.as_str())
                        .is_some_and(|r| r.ancestors.iter().any(|a| a == class))
                } else {
                    def.superclasses.iter().any(|s| s == class)
                }
            })
            .map(|(name, _)| name.as_str())
            .collect();
        Ok(subs)
    }

    /// Attributes declared by the class, or the effective set including
    /// inherited ones when `all` is set.
    pub fn attributes(&self, class: &str, all: bool) -> SchemaResult<Vec<&AttributeDef>> {
        if all {
            Ok(self.resolved_of(class)?.attributes.iter().collect())
        } else {
            Ok(self.resolve(class)?.attributes.iter().collect())
        }
    }

    /// Relations declared by the class, or the effective set including
    /// inherited ones when `all` is set.
    pub fn relations(&self, class: &str, all: bool) -> SchemaResult<Vec<&RelationDef>> {
        if all {
            Ok(self.resolved_of(class)?.relations.iter().collect())
        } else {
            Ok(self.resolve(class)?.relations.iter().collect())
        }
    }

    /// Effective attribute definition by name.
    pub fn attribute(&self, class: &str, name: &str) -> Option<&AttributeDef> {
        self.resolved
            .get(class)?
            .attributes
            .iter()
            .find(|a| a.name == name)
    }

    /// Effective relation definition by name.
    pub fn relation(&self, class: &str, name: &str) -> Option<&RelationDef> {
        self.resolved
            .get(class)?
            .relations
            .iter()
            .find(|r| r.name == name)
    }

    /// Returns `true` if `sub` is `base` or inherits from it.
    pub fn is_subclass_of(&self, sub: &str, base: &str) -> bool {
        if sub == base {
            return self.contains(sub);
        }
        self.resolved
            .get(sub)
            .is_some_and(|r| r.ancestors.iter().any(|a| a == base))
    }

    fn resolved_of(&self, class: &str) -> SchemaResult<&ResolvedClass> {
        self.resolved
            .get(class)
            .ok_or_else(|| SchemaError::UnknownClass(class.to_string()))
    }

    // -----------------------------------------------------------------------
    // Object checks
    // -----------------------------------------------------------------------

    /// Every field of a new object of `class`, set to its initial value:
    /// the attribute default, the first enum value, or the type's zero value;
    /// relations start empty.
    pub fn initial_fields(&self, class: &str) -> SchemaResult<BTreeMap<String, Field>> {
        let resolved = self.resolved_of(class)?;
        let mut fields = BTreeMap::new();
        for attr in &resolved.attributes {
            let value = match &attr.default {
                Some(default) => self.coerce_attribute(class, attr, default)?,
                None if attr.multi_value => Value::List(Vec::new()),
                None if attr.ty == AttrType::Enum && !attr.values.is_empty() => {
                    Value::from(attr.values[0].as_str())
                }
                None => attr.ty.zero_value(),
            };
            fields.insert(attr.name.clone(), Field::Attribute(value));
        }
        for rel in &resolved.relations {
            fields.insert(rel.name.clone(), Field::Relation(rel.cardinality.empty_relation()));
        }
        Ok(fields)
    }

    /// Type-check a value assigned to a field and return it in canonical
    /// form. Cardinality lower bounds and not-null rules are left to
    /// [`check_object`](Self::check_object).
    pub fn coerce_field(&self, class: &str, name: &str, field: &Field) -> SchemaResult<Field> {
        let resolved = self.resolved_of(class)?;
        if let Some(attr) = resolved.attributes.iter().find(|a| a.name == name) {
            return match field {
                Field::Attribute(value) => {
                    Ok(Field::Attribute(self.coerce_attribute(class, attr, value)?))
                }
                Field::Relation(_) => Err(SchemaError::invalid_value(
                    class,
                    name,
                    "attribute assigned an object reference",
                )),
            };
        }
        if let Some(rel) = resolved.relations.iter().find(|r| r.name == name) {
            return match field {
                Field::Relation(relation) => {
                    Ok(Field::Relation(self.coerce_relation(class, rel, relation)?))
                }
                Field::Attribute(_) => Err(SchemaError::invalid_value(
                    class,
                    name,
                    "relation assigned a plain value",
                )),
            };
        }
        Err(SchemaError::UnknownField {
            class: class.to_string(),
            field: name.to_string(),
        })
    }

    fn coerce_attribute(&self, class: &str, attr: &AttributeDef, value: &Value) -> SchemaResult<Value> {
        if attr.multi_value {
            let items = value.as_list().ok_or_else(|| {
                SchemaError::invalid_value(class, &attr.name, "multi-value attribute needs a list")
            })?;
            let items = items
                .iter()
                .map(|v| self.coerce_scalar(class, attr, v))
                .collect::<SchemaResult<Vec<_>>>()?;
            Ok(Value::List(items))
        } else {
            self.coerce_scalar(class, attr, value)
        }
    }

    fn coerce_scalar(&self, class: &str, attr: &AttributeDef, value: &Value) -> SchemaResult<Value> {
        let value = attr.ty.coerce(value).map_err(|source| SchemaError::Type {
            class: class.to_string(),
            field: attr.name.clone(),
            source,
        })?;
        let text = value.as_str().unwrap_or_default();
        match attr.ty {
            AttrType::Enum if !attr.values.iter().any(|v| v == text) => {
                Err(SchemaError::invalid_value(
                    class,
                    &attr.name,
                    format!("{text:?} is not one of {:?}", attr.values),
                ))
            }
            AttrType::Class if !text.is_empty() && !self.contains(text) => Err(
                SchemaError::invalid_value(class, &attr.name, format!("{text:?} is not a known class")),
            ),
            _ => Ok(value),
        }
    }

    fn coerce_relation(&self, class: &str, rel: &RelationDef, relation: &Relation) -> SchemaResult<Relation> {
        let relation = match relation {
            Relation::Multi(targets) if !rel.cardinality.is_multi() => match targets.as_slice() {
                [] => Relation::Single(None),
                [one] => Relation::Single(Some(one.clone())),
                _ => {
                    return Err(SchemaError::invalid_value(
                        class,
                        &rel.name,
                        format!("relation holds at most one object ({})", rel.cardinality),
                    ))
                }
            },
            Relation::Single(target) if rel.cardinality.is_multi() => {
                Relation::Multi(target.iter().cloned().collect())
            }
            other => other.clone(),
        };
        if let Some(bad) = relation
            .targets()
            .iter()
            .find(|t| !self.is_subclass_of(&t.class, &rel.class))
        {
            return Err(SchemaError::invalid_value(
                class,
                &rel.name,
                format!("{bad} is not an object of class {}", rel.class),
            ));
        }
        Ok(relation)
    }

    /// Check an object's fields against its class and collect every
    /// violation. Referential integrity (whether targets exist) is not
    /// checked here.
    pub fn check_object(&self, object: &ObjectRef, fields: &BTreeMap<String, Field>) -> Vec<Violation> {
        let mut violations = Vec::new();
        let class = object.class();

        let Some(def) = self.classes.get(class) else {
            violations.push(Violation::new(
                object,
                None,
                ViolationKind::UnknownClass,
                format!("unknown class {class}"),
            ));
            return violations;
        };
        if def.is_abstract {
            violations.push(Violation::new(
                object,
                None,
                ViolationKind::AbstractClass,
                format!("class {class} is abstract"),
            ));
        }
        let Some(resolved) = self.resolved.get(class) else {
            return violations;
        };

        for name in fields.keys() {
            let known = resolved.attributes.iter().any(|a| &a.name == name)
                || resolved.relations.iter().any(|r| &r.name == name);
            if !known {
                violations.push(Violation::new(
                    object,
                    Some(name),
                    ViolationKind::UnknownField,
                    format!("class {class} has no field {name}"),
                ));
            }
        }

        for attr in &resolved.attributes {
            let Some(field) = fields.get(&attr.name) else {
                if attr.not_null {
                    violations.push(Violation::new(
                        object,
                        Some(&attr.name),
                        ViolationKind::NotNull,
                        "value is missing",
                    ));
                }
                continue;
            };
            let value = match field {
                Field::Attribute(value) => value,
                Field::Relation(_) => {
                    violations.push(Violation::new(
                        object,
                        Some(&attr.name),
                        ViolationKind::InvalidValue,
                        "attribute holds object references",
                    ));
                    continue;
                }
            };
            if let Err(e) = self.coerce_attribute(class, attr, value) {
                violations.push(Violation::new(
                    object,
                    Some(&attr.name),
                    ViolationKind::InvalidValue,
                    e.to_string(),
                ));
                continue;
            }
            let empty = match value {
                Value::List(items) => items.is_empty(),
                Value::String(s) => s.is_empty(),
                _ => false,
            };
            if attr.not_null && empty {
                violations.push(Violation::new(
                    object,
                    Some(&attr.name),
                    ViolationKind::NotNull,
                    "value must not be empty",
                ));
            }
        }

        for rel in &resolved.relations {
            let relation = match fields.get(&rel.name) {
                Some(Field::Relation(relation)) => Some(relation),
                Some(Field::Attribute(_)) => {
                    violations.push(Violation::new(
                        object,
                        Some(&rel.name),
                        ViolationKind::InvalidValue,
                        "relation holds a plain value",
                    ));
                    continue;
                }
                None => None,
            };
            let count = relation.map_or(0, Relation::len);
            if rel.cardinality.is_required() && count == 0 {
                violations.push(Violation::new(
                    object,
                    Some(&rel.name),
                    ViolationKind::Cardinality,
                    format!("relation requires at least one object ({})", rel.cardinality),
                ));
            }
            if !rel.cardinality.is_multi() && count > 1 {
                violations.push(Violation::new(
                    object,
                    Some(&rel.name),
                    ViolationKind::Cardinality,
                    format!("relation holds {count} objects ({})", rel.cardinality),
                ));
            }
            for target in relation.map_or(&[][..], Relation::targets) {
                if !self.is_subclass_of(&target.class, &rel.class) {
                    violations.push(Violation::new(
                        object,
                        Some(&rel.name),
                        ViolationKind::TargetClass,
                        format!("{target} is not an object of class {}", rel.class),
                    ));
                }
            }
        }

        violations
    }

    /// Check one object and report the outcome as a result.
    pub fn validate_object(
        &self,
        object: &ObjectRef,
        fields: &BTreeMap<String, Field>,
    ) -> Result<(), ValidationReport> {
        let violations = self.check_object(object, fields);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationReport {
                objects_checked: 1,
                violations,
            })
        }
    }

    fn check_defaults(&self) -> SchemaResult<()> {
        for (name, def) in &self.classes {
            for attr in &def.attributes {
                let Some(default) = &attr.default else {
                    continue;
                };
                self.coerce_attribute(name, attr, default).map_err(|e| {
                    SchemaError::malformed(
                        self.origin(name).unwrap_or("<unknown>"),
                        format!("bad default for {name}.{}: {e}", attr.name),
                    )
                })?;
            }
        }
        Ok(())
    }
}

/// Structural checks on a single class definition.
fn check_class_shape(source: &str, class: &ClassDef) -> SchemaResult<()> {
    let name = &class.name;
    if name.is_empty() || name.contains('@') || name.chars().any(char::is_whitespace) {
        return Err(SchemaError::malformed(source, format!("invalid class name {name:?}")));
    }

    let mut bases = HashSet::new();
    for base in &class.superclasses {
        if base == name {
            return Err(SchemaError::InheritanceCycle(name.clone()));
        }
        if !bases.insert(base) {
            return Err(SchemaError::malformed(
                source,
                format!("class {name} lists superclass {base} twice"),
            ));
        }
    }

    let mut fields = HashSet::new();
    let names = class
        .attributes
        .iter()
        .map(|a| &a.name)
        .chain(class.relations.iter().map(|r| &r.name));
    for field in names {
        if field.is_empty() {
            return Err(SchemaError::malformed(source, format!("class {name} has an unnamed field")));
        }
        if !fields.insert(field) {
            return Err(SchemaError::malformed(
                source,
                format!("class {name} defines field {field} twice"),
            ));
        }
    }

    for attr in &class.attributes {
        if attr.ty == AttrType::Enum && attr.values.is_empty() {
            return Err(SchemaError::malformed(
                source,
                format!("enum attribute {name}.{} has no values", attr.name),
            ));
        }
    }
    Ok(())
}

/// Check references between classes and compute the inherited view of each.
///
/// Classes are processed in topological order (bases before subclasses);
/// anything left over after the sort sits on an inheritance cycle.
fn resolve_all(
    classes: &BTreeMap<String, ClassDef>,
    origins: &HashMap<String, String>,
) -> SchemaResult<HashMap<String, ResolvedClass>> {
    let mut pending: HashMap<&str, usize> = HashMap::with_capacity(classes.len());
    let mut direct_subs: HashMap<&str, Vec<&str>> = HashMap::new();

    for (name, def) in classes {
        for base in &def.superclasses {
            if !classes.contains_key(base) {
                return Err(SchemaError::UnknownBaseClass {
                    class: name.clone(),
                    base: base.clone(),
                });
            }
            direct_subs.entry(base.as_str()).or_default().push(name.as_str());
        }
        for rel in &def.relations {
            if !classes.contains_key(&rel.class) {
                return Err(SchemaError::UnknownRelationTarget {
                    class: name.clone(),
                    relation: rel.name.clone(),
                    target: rel.class.clone(),
                });
            }
        }
        pending.insert(name.as_str(), def.superclasses.len());
    }

    let mut queue: VecDeque<&str> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut resolved: HashMap<String, ResolvedClass> = HashMap::with_capacity(classes.len());

    while let Some(name) = queue.pop_front() {
        let def = &classes[name];
        let mut out = ResolvedClass::default();

        for base in &def.superclasses {
            let inherited = &resolved[base.as_str()];
            for ancestor in std::iter::once(base).chain(inherited.ancestors.iter()) {
                if !out.ancestors.contains(ancestor) {
                    out.ancestors.push(ancestor.clone());
                }
            }
            for attr in &inherited.attributes {
                if !out.attributes.iter().any(|a| a.name == attr.name) {
                    out.attributes.push(attr.clone());
                }
            }
            for rel in &inherited.relations {
                if !out.relations.iter().any(|r| r.name == rel.name) {
                    out.relations.push(rel.clone());
                }
            }
        }
        for attr in &def.attributes {
            match out.attributes.iter_mut().find(|a| a.name == attr.name) {
                Some(slot) => *slot = attr.clone(),
                None => out.attributes.push(attr.clone()),
            }
        }
        for rel in &def.relations {
            match out.relations.iter_mut().find(|r| r.name == rel.name) {
                Some(slot) => *slot = rel.clone(),
                None => out.relations.push(rel.clone()),
            }
        }
        if let Some(clash) = out
            .attributes
            .iter()
            .find(|a| out.relations.iter().any(|r| r.name == a.name))
        {
            let source = origins.get(name).map(String::as_str).unwrap_or("<unknown>");
            return Err(SchemaError::malformed(
                source,
                format!("class {name} inherits {} as both attribute and relation", clash.name),
            ));
        }
        resolved.insert(name.to_string(), out);

        for sub in direct_subs.get(name).into_iter().flatten() {
            if let Some(n) = pending.get_mut(sub) {
                *n -= 1;
                if *n == 0 {
                    queue.push_back(*sub);
                }
            }
        }
    }

    if resolved.len() < classes.len() {
        let stuck = classes
            .keys()
            .find(|name| !resolved.contains_key(name.as_str()))
            .cloned()
            .unwrap_or_default();
        return Err(SchemaError::InheritanceCycle(stuck));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgdb_types::Cardinality;

    fn descriptor(classes: Vec<ClassDef>) -> SchemaDescriptor {
        let mut d = SchemaDescriptor::new();
        d.classes = classes;
        d
    }

    /// Dummy and Second, as used throughout the session tests, plus a small
    /// hierarchy.
    fn registry() -> SchemaRegistry {
        let mut r = SchemaRegistry::new();
        r.extend([(
            "test.schema.json".to_string(),
            descriptor(vec![
                ClassDef::new("Dummy")
                    .with_attribute(AttributeDef::new("bool", AttrType::Bool))
                    .with_attribute(AttributeDef::new("u8", AttrType::U8).with_default(7u32))
                    .with_attribute(
                        AttributeDef::new("mode", AttrType::Enum).with_values(["on", "off"]),
                    )
                    .with_attribute(AttributeDef::new("tags", AttrType::String).multi_value())
                    .with_attribute(AttributeDef::new("label", AttrType::String).not_null()),
                ClassDef::new("Second")
                    .with_superclass("Dummy")
                    .with_relation(RelationDef::new("Another", "Dummy", Cardinality::ZeroOrOne))
                    .with_relation(RelationDef::new("Others", "Second", Cardinality::ZeroOrMany)),
                ClassDef::new("Third")
                    .with_superclass("Second")
                    .with_relation(RelationDef::new("Must", "Dummy", Cardinality::One)),
                ClassDef::new("Base").abstract_class(),
                ClassDef::new("Leaf").with_superclass("Base"),
            ]),
        )])
        .unwrap();
        r
    }

    fn fields(r: &SchemaRegistry, class: &str) -> BTreeMap<String, Field> {
        r.initial_fields(class).unwrap()
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    #[test]
    fn extend_counts_classes() {
        let r = registry();
        assert_eq!(r.len(), 5);
        assert_eq!(r.classes(), vec!["Base", "Dummy", "Leaf", "Second", "Third"]);
        assert_eq!(r.origin("Dummy"), Some("test.schema.json"));
    }

    #[test]
    fn duplicate_class_rejected() {
        let mut r = registry();
        let err = r
            .extend([("other.schema.json".to_string(), descriptor(vec![ClassDef::new("Dummy")]))])
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateClass { ref name, .. } if name == "Dummy"));
    }

    #[test]
    fn same_source_is_skipped() {
        let mut r = registry();
        let added = r
            .extend([("test.schema.json".to_string(), descriptor(vec![ClassDef::new("Dummy")]))])
            .unwrap();
        assert_eq!(added, 0);
    }

    #[test]
    fn unknown_base_rejected() {
        let mut r = SchemaRegistry::new();
        let err = r
            .extend([(
                "s".to_string(),
                descriptor(vec![ClassDef::new("A").with_superclass("Missing")]),
            )])
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownBaseClass { ref base, .. } if base == "Missing"));
    }

    #[test]
    fn unknown_relation_target_rejected() {
        let mut r = SchemaRegistry::new();
        let err = r
            .extend([(
                "s".to_string(),
                descriptor(vec![ClassDef::new("A").with_relation(RelationDef::new(
                    "r",
                    "Nope",
                    Cardinality::One,
                ))]),
            )])
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRelationTarget { .. }));
    }

    #[test]
    fn inheritance_cycle_rejected() {
        let mut r = SchemaRegistry::new();
        let err = r
            .extend([(
                "s".to_string(),
                descriptor(vec![
                    ClassDef::new("A").with_superclass("C"),
                    ClassDef::new("B").with_superclass("A"),
                    ClassDef::new("C").with_superclass("B"),
                    ClassDef::new("D"),
                ]),
            )])
            .unwrap_err();
        assert!(matches!(err, SchemaError::InheritanceCycle(_)));
        assert!(r.is_empty());
    }

    #[test]
    fn failed_extend_leaves_registry_untouched() {
        let mut r = registry();
        let bad = descriptor(vec![
            ClassDef::new("Fresh"),
            ClassDef::new("Broken").with_superclass("Missing"),
        ]);
        assert!(r.extend([("bad".to_string(), bad)]).is_err());
        assert!(!r.contains("Fresh"));
        assert!(!r.has_source("bad"));
    }

    #[test]
    fn malformed_definitions_rejected() {
        let cases = vec![
            ClassDef::new("has space"),
            ClassDef::new("A")
                .with_attribute(AttributeDef::new("x", AttrType::U8))
                .with_relation(RelationDef::new("x", "A", Cardinality::One)),
            ClassDef::new("A").with_attribute(AttributeDef::new("e", AttrType::Enum)),
            ClassDef::new("A").with_attribute(AttributeDef::new("n", AttrType::U8).with_default(300u32)),
        ];
        for class in cases {
            let mut r = SchemaRegistry::new();
            let err = r.extend([("s".to_string(), descriptor(vec![class]))]).unwrap_err();
            assert!(matches!(err, SchemaError::Malformed { .. }), "{err}");
        }
    }

    #[test]
    fn load_files_follows_includes() {
        let dir = tempfile::tempdir().unwrap();
        let core = SchemaDescriptor::new().with_class(ClassDef::new("Core"));
        let mut top = SchemaDescriptor::new().with_class(ClassDef::new("Top").with_superclass("Core"));
        top.includes.push("core.schema.json".into());
        std::fs::write(dir.path().join("core.schema.json"), core.to_json_string().unwrap()).unwrap();
        std::fs::write(dir.path().join("top.schema.json"), top.to_json_string().unwrap()).unwrap();

        let r = SchemaRegistry::load(&[dir.path().join("top.schema.json")]).unwrap();
        assert!(r.is_subclass_of("Top", "Core"));
        assert_eq!(r.sources().count(), 2);
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    #[test]
    fn superclasses_direct_and_all() {
        let r = registry();
        assert_eq!(r.superclasses("Third", false).unwrap(), vec!["Second"]);
        assert_eq!(r.superclasses("Third", true).unwrap(), vec!["Second", "Dummy"]);
        assert!(r.superclasses("Dummy", true).unwrap().is_empty());
        assert!(matches!(r.superclasses("Nope", true), Err(SchemaError::UnknownClass(_))));
    }

    #[test]
    fn subclasses_direct_and_all() {
        let r = registry();
        assert_eq!(r.subclasses("Dummy", false).unwrap(), vec!["Second"]);
        assert_eq!(r.subclasses("Dummy", true).unwrap(), vec!["Second", "Third"]);
        assert!(r.subclasses("Third", true).unwrap().is_empty());
    }

    #[test]
    fn inherited_fields() {
        let r = registry();
        assert!(r.attributes("Second", false).unwrap().is_empty());
        let all: Vec<_> = r.attributes("Second", true).unwrap().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(all, vec!["bool", "u8", "mode", "tags", "label"]);
        let rels: Vec<_> = r.relations("Third", true).unwrap().iter().map(|x| x.name.as_str()).collect();
        assert_eq!(rels, vec!["Another", "Others", "Must"]);
        assert!(r.relation("Third", "Another").is_some());
        assert!(r.attribute("Third", "Another").is_none());
    }

    #[test]
    fn subclass_relation() {
        let r = registry();
        assert!(r.is_subclass_of("Third", "Dummy"));
        assert!(r.is_subclass_of("Dummy", "Dummy"));
        assert!(!r.is_subclass_of("Dummy", "Second"));
        assert!(!r.is_subclass_of("Nope", "Nope"));
    }

    #[test]
    fn diamond_inheritance_lists_ancestor_once() {
        let mut r = SchemaRegistry::new();
        r.extend([(
            "s".to_string(),
            descriptor(vec![
                ClassDef::new("Root").with_attribute(AttributeDef::new("x", AttrType::S32)),
                ClassDef::new("L").with_superclass("Root"),
                ClassDef::new("R").with_superclass("Root"),
                ClassDef::new("Bottom").with_superclass("L").with_superclass("R"),
            ]),
        )])
        .unwrap();
        assert_eq!(r.superclasses("Bottom", true).unwrap(), vec!["L", "Root", "R"]);
        assert_eq!(r.attributes("Bottom", true).unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Object checks
    // -----------------------------------------------------------------------

    #[test]
    fn initial_fields_cover_every_slot() {
        let r = registry();
        let f = fields(&r, "Third");
        assert_eq!(f.len(), 8);
        assert_eq!(f["u8"], Field::Attribute(Value::UInt(7)));
        assert_eq!(f["mode"], Field::Attribute(Value::from("on")));
        assert_eq!(f["tags"], Field::Attribute(Value::List(Vec::new())));
        assert_eq!(f["Another"], Field::Relation(Relation::Single(None)));
        assert_eq!(f["Others"], Field::Relation(Relation::Multi(Vec::new())));
    }

    #[test]
    fn coerce_field_checks_types() {
        let r = registry();
        let ok = r.coerce_field("Dummy", "u8", &Field::from(Value::Int(200))).unwrap();
        assert_eq!(ok, Field::Attribute(Value::UInt(200)));
        assert!(matches!(
            r.coerce_field("Dummy", "u8", &Field::from(Value::Int(256))),
            Err(SchemaError::Type { .. })
        ));
        assert!(r.coerce_field("Dummy", "mode", &Field::from(Value::from("maybe"))).is_err());
        assert!(r.coerce_field("Dummy", "tags", &Field::from(Value::from("x"))).is_err());
        assert!(matches!(
            r.coerce_field("Dummy", "nope", &Field::from(Value::Bool(true))),
            Err(SchemaError::UnknownField { .. })
        ));
    }

    #[test]
    fn coerce_relation_checks_target_class_and_shape() {
        let r = registry();
        let third = ObjectRef::new("Third", "t");
        let dummy = ObjectRef::new("Dummy", "d");
        assert!(r
            .coerce_field("Second", "Another", &Field::from(Relation::from(third.clone())))
            .is_ok());
        let err = r
            .coerce_field("Second", "Others", &Field::from(Relation::from(vec![dummy.clone()])))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(r
            .coerce_field("Second", "Another", &Field::from(Relation::from(vec![dummy.clone(), dummy])))
            .is_err());
        let widened = r
            .coerce_field("Second", "Others", &Field::from(Relation::from(third.clone())))
            .unwrap();
        assert_eq!(widened, Field::Relation(Relation::Multi(vec![third])));
    }

    #[test]
    fn check_object_reports_all_violations() {
        let r = registry();
        let obj = ObjectRef::new("Third", "t");
        let mut f = fields(&r, "Third");
        f.insert("bogus".into(), Field::from(Value::Bool(true)));
        let violations = r.check_object(&obj, &f);
        let kinds: Vec<_> = violations.iter().map(|v| v.kind).collect();
        assert!(kinds.contains(&ViolationKind::UnknownField));
        assert!(kinds.contains(&ViolationKind::NotNull));
        assert!(kinds.contains(&ViolationKind::Cardinality));
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn check_object_accepts_valid_object() {
        let r = registry();
        let obj = ObjectRef::new("Third", "t");
        let mut f = fields(&r, "Third");
        f.insert("label".into(), Field::from(Value::from("x")));
        f.insert("Must".into(), Field::from(Relation::from(ObjectRef::new("Dummy", "d"))));
        assert!(r.validate_object(&obj, &f).is_ok());
    }

    #[test]
    fn abstract_and_unknown_classes() {
        let r = registry();
        assert!(matches!(r.instantiable("Base"), Err(SchemaError::AbstractClass(_))));
        assert!(r.instantiable("Leaf").is_ok());
        let report = r
            .validate_object(&ObjectRef::new("Ghost", "g"), &BTreeMap::new())
            .unwrap_err();
        assert_eq!(report.count_of(ViolationKind::UnknownClass), 1);
    }
}
