use cfgdb_types::{AttrType, Cardinality, Value};
use serde::{Deserialize, Serialize};

/// A class definition as written in a schema descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Direct base classes, in declaration order.
    #[serde(default)]
    pub superclasses: Vec<String>,
    /// Attributes declared by this class (inherited ones are not repeated).
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    /// Relations declared by this class (inherited ones are not repeated).
    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

impl ClassDef {
    /// A concrete class with no base classes and no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_abstract: false,
            superclasses: Vec::new(),
            attributes: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn with_superclass(mut self, base: impl Into<String>) -> Self {
        self.superclasses.push(base.into());
        self
    }

    pub fn with_attribute(mut self, attr: AttributeDef) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn with_relation(mut self, rel: RelationDef) -> Self {
        self.relations.push(rel);
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

/// An attribute definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttrType,
    #[serde(default)]
    pub multi_value: bool,
    #[serde(default)]
    pub not_null: bool,
    /// Initial value for new objects. For multi-value attributes this is a
    /// list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values of an `enum` attribute.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, ty: AttrType) -> Self {
        Self {
            name: name.into(),
            ty,
            multi_value: false,
            not_null: false,
            default: None,
            values: Vec::new(),
            description: String::new(),
        }
    }

    pub fn multi_value(mut self) -> Self {
        self.multi_value = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// A relation slot definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    /// Target class; objects of any subclass are accepted as well.
    pub class: String,
    pub cardinality: Cardinality,
    /// The referencing object owns its targets. Informational only.
    #[serde(default)]
    pub composite: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl RelationDef {
    pub fn new(name: impl Into<String>, class: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            cardinality,
            composite: false,
            description: String::new(),
        }
    }

    pub fn composite(mut self) -> Self {
        self.composite = true;
        self
    }
}
