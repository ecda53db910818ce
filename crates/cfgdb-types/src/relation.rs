use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::ObjectRef;

/// Cardinality of a relation slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ZeroOrOne,
    One,
    ZeroOrMany,
    OneOrMany,
}

impl Cardinality {
    /// Returns `true` if the slot holds a list of references.
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::ZeroOrMany | Self::OneOrMany)
    }

    /// Returns `true` if at least one reference must be set at commit.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::One | Self::OneOrMany)
    }

    /// An empty slot of the right shape.
    pub fn empty_relation(&self) -> Relation {
        if self.is_multi() {
            Relation::Multi(Vec::new())
        } else {
            Relation::Single(None)
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroOrOne => write!(f, "0..1"),
            Self::One => write!(f, "1"),
            Self::ZeroOrMany => write!(f, "0..*"),
            Self::OneOrMany => write!(f, "1..*"),
        }
    }
}

/// Content of a relation slot.
///
/// Serialized untagged: `null` or `{class, id}` for single slots, an array
/// for multi-valued ones. `Multi` is listed first so arrays never get
/// mistaken for a struct in sequence form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation {
    Multi(Vec<ObjectRef>),
    Single(Option<ObjectRef>),
}

impl Relation {
    /// All referenced objects, in slot order.
    pub fn targets(&self) -> &[ObjectRef] {
        match self {
            Self::Multi(refs) => refs,
            Self::Single(Some(r)) => std::slice::from_ref(r),
            Self::Single(None) => &[],
        }
    }

    /// Number of referenced objects.
    pub fn len(&self) -> usize {
        self.targets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets().is_empty()
    }

    /// Returns `true` for a multi-valued slot.
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// The single target, if this is a set single-valued slot.
    pub fn as_single(&self) -> Option<&ObjectRef> {
        match self {
            Self::Single(r) => r.as_ref(),
            Self::Multi(_) => None,
        }
    }

    /// Returns `true` if `target` appears in this slot.
    pub fn contains(&self, target: &ObjectRef) -> bool {
        self.targets().contains(target)
    }

    /// Replace every occurrence of `old` with `new`. Returns the number of
    /// replacements.
    pub fn replace_target(&mut self, old: &ObjectRef, new: &ObjectRef) -> usize {
        match self {
            Self::Single(Some(r)) if r == old => {
                *r = new.clone();
                1
            }
            Self::Single(_) => 0,
            Self::Multi(refs) => {
                let mut n = 0;
                for r in refs.iter_mut().filter(|r| *r == old) {
                    *r = new.clone();
                    n += 1;
                }
                n
            }
        }
    }
}

impl From<ObjectRef> for Relation {
    fn from(r: ObjectRef) -> Self {
        Self::Single(Some(r))
    }
}

impl From<Option<ObjectRef>> for Relation {
    fn from(r: Option<ObjectRef>) -> Self {
        Self::Single(r)
    }
}

impl From<Vec<ObjectRef>> for Relation {
    fn from(refs: Vec<ObjectRef>) -> Self {
        Self::Multi(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: &str) -> ObjectRef {
        ObjectRef::new("Second", id)
    }

    #[test]
    fn targets_of_each_shape() {
        assert!(Relation::Single(None).targets().is_empty());
        assert_eq!(Relation::from(r("a")).targets(), &[r("a")]);
        assert_eq!(Relation::from(vec![r("a"), r("b")]).len(), 2);
    }

    #[test]
    fn replace_target_in_multi() {
        let mut rel = Relation::from(vec![r("a"), r("b"), r("a")]);
        assert_eq!(rel.replace_target(&r("a"), &r("c")), 2);
        assert_eq!(rel.targets(), &[r("c"), r("b"), r("c")]);
    }

    #[test]
    fn replace_target_in_single() {
        let mut rel = Relation::from(r("a"));
        assert_eq!(rel.replace_target(&r("x"), &r("c")), 0);
        assert_eq!(rel.replace_target(&r("a"), &r("c")), 1);
        assert_eq!(rel.as_single(), Some(&r("c")));
    }

    #[test]
    fn untagged_json_shapes() {
        let rel: Relation = serde_json::from_str("null").unwrap();
        assert_eq!(rel, Relation::Single(None));
        let rel: Relation = serde_json::from_str(r#"{"class":"Second","id":"a"}"#).unwrap();
        assert_eq!(rel, Relation::from(r("a")));
        let rel: Relation = serde_json::from_str(r#"[{"class":"Second","id":"a"}]"#).unwrap();
        assert_eq!(rel, Relation::from(vec![r("a")]));
        let rel: Relation = serde_json::from_str("[]").unwrap();
        assert_eq!(rel, Relation::Multi(Vec::new()));
    }

    #[test]
    fn cardinality_flags() {
        assert!(Cardinality::OneOrMany.is_multi());
        assert!(Cardinality::OneOrMany.is_required());
        assert!(!Cardinality::ZeroOrOne.is_multi());
        assert!(!Cardinality::ZeroOrOne.is_required());
        assert_eq!(Cardinality::One.empty_relation(), Relation::Single(None));
        assert_eq!(Cardinality::ZeroOrMany.to_string(), "0..*");
    }
}
