use std::fmt;

use cfgdb_types::ObjectRef;

/// A single constraint violation found while checking an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub object: ObjectRef,
    /// The attribute or relation concerned, if any.
    pub field: Option<String>,
    pub kind: ViolationKind,
    pub description: String,
}

impl Violation {
    pub fn new(
        object: &ObjectRef,
        field: Option<&str>,
        kind: ViolationKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            object: object.clone(),
            field: field.map(str::to_string),
            kind,
            description: description.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}: {}", self.object, field, self.description),
            None => write!(f, "{}: {}", self.object, self.description),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    UnknownClass,
    AbstractClass,
    UnknownField,
    InvalidValue,
    NotNull,
    Cardinality,
    TargetClass,
    /// A relation points at an object that does not exist.
    DanglingReference,
}

/// Outcome of checking a set of objects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub objects_checked: usize,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no violation was recorded.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Merge another report into this one.
    pub fn absorb(&mut self, other: ValidationReport) {
        self.objects_checked += other.objects_checked;
        self.violations.extend(other.violations);
    }

    /// Number of violations of the given kind.
    pub fn count_of(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.as_slice() {
            [] => write!(f, "{} object(s) checked, no violations", self.objects_checked),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}

impl std::error::Error for ValidationReport {}
