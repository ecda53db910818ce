use std::collections::BTreeMap;

use cfgdb_types::{Field, ObjectRef, Relation, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FileError, FileResult};

/// Value of the `format` field that marks a data file.
pub const DATA_FORMAT: &str = "cfgdb-data";

/// Current data file version.
pub const DATA_VERSION: u32 = 1;

/// Whether `comment` lands in the `"comment": "..."` line exactly as given.
///
/// JSON escapes `"`, `\` and anything below U+0020, so a comment holding
/// one of those would not appear verbatim in the file.
pub fn is_verbatim_comment(comment: &str) -> bool {
    !comment
        .chars()
        .any(|c| c == '"' || c == '\\' || c < ' ')
}

/// A data file as stored on disk.
///
/// Serialized as pretty-printed JSON with the header fields first, so the
/// commit comment always sits on its own `"comment": "..."` line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub format: String,
    pub version: u32,
    /// Annotation given to the commit that wrote this file.
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub committed_at: Option<DateTime<Utc>>,
    /// Included schema and data files, as declared.
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
}

impl DataFile {
    /// An empty data file with the given includes.
    pub fn new(includes: Vec<String>) -> Self {
        Self {
            format: DATA_FORMAT.to_string(),
            version: DATA_VERSION,
            comment: String::new(),
            author: String::new(),
            committed_at: None,
            includes,
            objects: Vec::new(),
        }
    }

    /// Stamp the commit header.
    pub fn annotate(&mut self, comment: &str, author: &str, at: DateTime<Utc>) {
        self.comment = comment.to_string();
        self.author = author.to_string();
        self.committed_at = Some(at);
    }

    /// Serialize to the on-disk form.
    pub fn to_bytes(&self) -> FileResult<Vec<u8>> {
        let mut bytes =
            serde_json::to_vec_pretty(self).map_err(|e| FileError::Serialization(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// One object inside a data file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub class: String,
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub relations: BTreeMap<String, Relation>,
}

impl ObjectRecord {
    /// Split an object's fields into attributes and relations.
    pub fn from_fields(oref: &ObjectRef, fields: &BTreeMap<String, Field>) -> Self {
        let mut attributes = BTreeMap::new();
        let mut relations = BTreeMap::new();
        for (name, field) in fields {
            match field {
                Field::Attribute(v) => {
                    attributes.insert(name.clone(), v.clone());
                }
                Field::Relation(r) => {
                    relations.insert(name.clone(), r.clone());
                }
            }
        }
        Self {
            class: oref.class.clone(),
            id: oref.id.clone(),
            attributes,
            relations,
        }
    }

    pub fn oref(&self) -> ObjectRef {
        ObjectRef::new(self.class.as_str(), self.id.as_str())
    }

    /// All fields, attributes and relations merged by name.
    pub fn into_fields(self) -> (ObjectRef, BTreeMap<String, Field>) {
        let oref = ObjectRef::new(self.class, self.id);
        let fields = self
            .attributes
            .into_iter()
            .map(|(k, v)| (k, Field::Attribute(v)))
            .chain(
                self.relations
                    .into_iter()
                    .map(|(k, r)| (k, Field::Relation(r))),
            )
            .collect();
        (oref, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFile {
        let mut file = DataFile::new(vec!["test.schema.json".into()]);
        let mut fields = BTreeMap::new();
        fields.insert("level".to_string(), Field::from(Value::Int(3)));
        fields.insert(
            "Another".to_string(),
            Field::from(Relation::from(ObjectRef::new("Second", "b"))),
        );
        file.objects
            .push(ObjectRecord::from_fields(&ObjectRef::new("Second", "a"), &fields));
        file
    }

    #[test]
    fn header_comes_first_and_comment_is_one_line() {
        let mut file = sample();
        file.annotate("My test comment", "tester", Utc::now());
        let text = String::from_utf8(file.to_bytes().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1].trim(), r#""format": "cfgdb-data","#);
        assert_eq!(lines[2].trim(), r#""version": 1,"#);
        assert_eq!(lines[3].trim(), r#""comment": "My test comment","#);
        assert_eq!(text.lines().filter(|l| l.contains("My test comment")).count(), 1);
    }

    #[test]
    fn multi_line_comment_stays_on_one_line() {
        let mut file = sample();
        file.annotate("first\nsecond", "tester", Utc::now());
        let text = String::from_utf8(file.to_bytes().unwrap()).unwrap();
        assert!(text.lines().any(|l| l.trim() == r#""comment": "first\nsecond","#));
    }

    #[test]
    fn verbatim_comments() {
        assert!(is_verbatim_comment("My test comment"));
        assert!(is_verbatim_comment("Ünïcode ✓ and 'single' quotes"));
        assert!(is_verbatim_comment(""));
        assert!(!is_verbatim_comment(r#"fix "quoted" thing"#));
        assert!(!is_verbatim_comment(r"C:\path"));
        assert!(!is_verbatim_comment("first\nsecond"));
        assert!(!is_verbatim_comment("tab\there"));
    }

    #[test]
    fn verbatim_comment_appears_as_given() {
        let comment = "Ünïcode ✓ and 'single' quotes";
        let mut file = sample();
        file.annotate(comment, "tester", Utc::now());
        let text = String::from_utf8(file.to_bytes().unwrap()).unwrap();
        assert_eq!(text.lines().filter(|l| l.contains(comment)).count(), 1);
    }

    #[test]
    fn record_fields_split_and_merge() {
        let file = sample();
        let record = file.objects[0].clone();
        assert_eq!(record.attributes.len(), 1);
        assert_eq!(record.relations.len(), 1);
        let (oref, fields) = record.into_fields();
        assert_eq!(oref, ObjectRef::new("Second", "a"));
        assert_eq!(
            fields["Another"].as_object(),
            Some(&ObjectRef::new("Second", "b"))
        );
    }

    #[test]
    fn parse_back() {
        let mut file = sample();
        file.annotate("c", "me", Utc::now());
        let parsed: DataFile = serde_json::from_slice(&file.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, file);
    }
}
