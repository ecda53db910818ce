use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::class::ClassDef;
use crate::error::{SchemaError, SchemaResult};

/// Value of the `format` field that marks a schema descriptor.
pub const SCHEMA_FORMAT: &str = "cfgdb-schema";

/// A parsed schema descriptor file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub format: String,
    /// Other schema files this one depends on, as written.
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ClassDef>,
}

impl SchemaDescriptor {
    /// An empty descriptor.
    pub fn new() -> Self {
        Self {
            format: SCHEMA_FORMAT.to_string(),
            includes: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: ClassDef) -> Self {
        self.classes.push(class);
        self
    }

    /// Parse a descriptor from JSON text. `source_name` is only used in
    /// error messages.
    pub fn from_json_str(source_name: &str, text: &str) -> SchemaResult<Self> {
        let descriptor: Self = serde_json::from_str(text)
            .map_err(|e| SchemaError::malformed(source_name, e.to_string()))?;
        if descriptor.format != SCHEMA_FORMAT {
            return Err(SchemaError::malformed(
                source_name,
                format!(
                    "expected format {SCHEMA_FORMAT:?}, found {:?}",
                    descriptor.format
                ),
            ));
        }
        Ok(descriptor)
    }

    /// Read and parse a descriptor file.
    pub fn read(path: &Path) -> SchemaResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&path.display().to_string(), &text)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> SchemaResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SchemaError::malformed("<descriptor>", e.to_string()))
    }
}

impl Default for SchemaDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
