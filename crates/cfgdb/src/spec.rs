//! Database open specs: `"<backend>"` or `"<backend>:<data-file>"`.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// The file-based backend: JSON schema and data files on a local disk.
pub const JSON_BACKEND: &str = "jsonfile";

/// A parsed open spec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbSpec {
    backend: String,
    data: Option<String>,
}

impl DbSpec {
    /// A spec for the file backend, optionally naming a data file.
    pub fn json(data: Option<&str>) -> Self {
        Self {
            backend: JSON_BACKEND.to_string(),
            data: data.map(str::to_string),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// The data file to load, if the spec names one.
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// The same backend pointed at another data file.
    pub fn with_data(&self, data: &str) -> Self {
        Self {
            backend: self.backend.clone(),
            data: Some(data.to_string()),
        }
    }
}

impl FromStr for DbSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (backend, data) = match s.split_once(':') {
            Some((backend, data)) => (backend, Some(data)),
            None => (s, None),
        };
        if backend != JSON_BACKEND {
            return Err(ConfigError::UnknownBackend(backend.to_string()));
        }
        let data = data.filter(|d| !d.is_empty());
        Ok(Self::json(data))
    }
}

impl fmt::Display for DbSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => write!(f, "{}:{}", self.backend, data),
            None => f.write_str(&self.backend),
        }
    }
}
