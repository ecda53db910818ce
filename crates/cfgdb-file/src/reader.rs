use std::path::{Path, PathBuf};

use cfgdb_schema::{SchemaDescriptor, SCHEMA_FORMAT};
use serde::Deserialize;
use tracing::debug;

use crate::data::{DataFile, DATA_FORMAT, DATA_VERSION};
use crate::digest::Digest;
use crate::error::{FileError, FileResult};

/// Kind of a configuration file, taken from its `format` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Schema,
    Data,
}

/// Parsed content of a configuration file.
#[derive(Clone, Debug)]
pub enum FileContent {
    Schema(SchemaDescriptor),
    Data(DataFile),
}

/// A file read from disk, with the digest of the bytes that were parsed.
#[derive(Clone, Debug)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub digest: Digest,
    pub content: FileContent,
}

impl LoadedFile {
    pub fn kind(&self) -> FileKind {
        match self.content {
            FileContent::Schema(_) => FileKind::Schema,
            FileContent::Data(_) => FileKind::Data,
        }
    }

    /// Declared includes, whatever the kind.
    pub fn includes(&self) -> &[String] {
        match &self.content {
            FileContent::Schema(s) => &s.includes,
            FileContent::Data(d) => &d.includes,
        }
    }
}

#[derive(Deserialize)]
struct Probe {
    format: String,
}

/// Read and parse a schema or data file.
pub fn read_file(path: &Path) -> FileResult<LoadedFile> {
    let bytes = std::fs::read(path).map_err(|e| FileError::io(path, e))?;
    let digest = Digest::of(&bytes);
    let parse_err = |e: serde_json::Error| FileError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let probe: Probe = serde_json::from_slice(&bytes).map_err(parse_err)?;
    let content = match probe.format.as_str() {
        SCHEMA_FORMAT => {
            let text = std::str::from_utf8(&bytes).map_err(|e| FileError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            FileContent::Schema(SchemaDescriptor::from_json_str(
                &path.display().to_string(),
                text,
            )?)
        }
        DATA_FORMAT => {
            let data: DataFile = serde_json::from_slice(&bytes).map_err(parse_err)?;
            if data.version != DATA_VERSION {
                return Err(FileError::UnsupportedVersion {
                    path: path.to_path_buf(),
                    version: data.version,
                });
            }
            FileContent::Data(data)
        }
        other => {
            return Err(FileError::UnknownFormat {
                path: path.to_path_buf(),
                format: other.to_string(),
            })
        }
    };
    debug!(path = %path.display(), digest = ?digest, "file read");
    Ok(LoadedFile {
        path: path.to_path_buf(),
        digest,
        content,
    })
}
