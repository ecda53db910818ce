//! Shared fixture for the integration tests: a temporary directory holding
//! one schema file and the path of a data file not yet created.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cfgdb::{
    AttrType, AttributeDef, Cardinality, ClassDef, Configuration, DbConfig, RelationDef,
    SchemaDescriptor,
};
use tempfile::TempDir;

pub const SCHEMA: &str = "test.schema.json";
pub const DATA: &str = "test.data.json";

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let schema = test_schema().to_json_string().unwrap();
        std::fs::write(dir.path().join(SCHEMA), schema).unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn data(&self) -> PathBuf {
        self.path(DATA)
    }

    /// The data file path as a load spec argument.
    pub fn data_str(&self) -> String {
        self.data().display().to_string()
    }

    pub fn config(&self) -> DbConfig {
        DbConfig::default()
            .with_author("tester")
            .with_search_path(self.dir.path())
    }

    /// An unloaded handle.
    pub fn open(&self) -> Configuration {
        Configuration::open_with("jsonfile", self.config()).unwrap()
    }

    /// A handle on a new, uncommitted database including the schema.
    pub fn create(&self) -> Configuration {
        self.create_at(DATA)
    }

    pub fn create_at(&self, name: &str) -> Configuration {
        let mut db = self.open();
        db.create_db(self.path(name), &[SCHEMA]).unwrap();
        db
    }

    /// A handle loading the committed database.
    pub fn reload(&self) -> Configuration {
        let spec = format!("jsonfile:{}", self.data_str());
        Configuration::open_with(&spec, self.config()).unwrap()
    }
}

/// `Dummy` carries one attribute of most primitive types. `Second` links to
/// other `Second` objects. `Strict` has a not-null attribute and a
/// mandatory relation, so a fresh instance fails the commit checks.
pub fn test_schema() -> SchemaDescriptor {
    SchemaDescriptor::new()
        .with_class(
            ClassDef::new("Dummy")
                .with_attribute(AttributeDef::new("flag", AttrType::Bool))
                .with_attribute(AttributeDef::new("level", AttrType::S32))
                .with_attribute(AttributeDef::new("small", AttrType::U8))
                .with_attribute(AttributeDef::new("ratio", AttrType::Double))
                .with_attribute(AttributeDef::new("label", AttrType::String))
                .with_attribute(
                    AttributeDef::new("colour", AttrType::Enum)
                        .with_values(["red", "green", "blue"]),
                )
                .with_attribute(AttributeDef::new("tags", AttrType::String).multi_value())
                .with_attribute(AttributeDef::new("since", AttrType::Date)),
        )
        .with_class(
            ClassDef::new("Second")
                .with_attribute(AttributeDef::new("name", AttrType::String))
                .with_relation(RelationDef::new("Another", "Second", Cardinality::ZeroOrOne))
                .with_relation(RelationDef::new("Others", "Second", Cardinality::ZeroOrMany))
                .with_relation(RelationDef::new("Dummy", "Dummy", Cardinality::ZeroOrOne)),
        )
        .with_class(
            ClassDef::new("Strict")
                .with_attribute(AttributeDef::new("name", AttrType::String).not_null())
                .with_relation(RelationDef::new("Owner", "Second", Cardinality::One)),
        )
}

/// Lines of a file containing `needle`.
pub fn lines_containing(path: &Path, needle: &str) -> usize {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| line.contains(needle))
        .count()
}
