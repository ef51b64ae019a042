use crate::domain::HarnessError;
use std::fs;
use std::path::{Path, PathBuf};

/// Catalog parameter value, typed once at load: integer parse first, then
/// floating point, then the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn parse(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            return Self::Int(value);
        }
        if let Ok(value) = raw.parse::<f64>() {
            return Self::Float(value);
        }
        Self::Text(raw.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

/// Ordered key/value view of a catalog template. Keys keep their first
/// insertion position; a repeated key overwrites the value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSpec {
    source_path: PathBuf,
    entries: Vec<(String, ParamValue)>,
}

impl CatalogSpec {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::ReadTemplate {
            path: path.to_path_buf(),
            source,
        })?;

        let mut entries: Vec<(String, ParamValue)> = Vec::new();
        for line in content.lines() {
            let mut tokens = line.split_whitespace();
            let Some(key) = tokens.next() else {
                continue;
            };
            let raw_value = tokens.collect::<Vec<_>>().join(" ");
            let value = ParamValue::parse(&raw_value);
            match entries.iter_mut().find(|(existing, _)| existing == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key.to_string(), value)),
            }
        }

        Ok(Self {
            source_path: path.to_path_buf(),
            entries,
        })
    }

    /// Path of the template this spec was loaded from; catalog emission
    /// copies it verbatim before appending star records.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Numeric lookup accepting either an integer or a floating value.
    pub fn float_value(&self, key: &str) -> Result<f64, CatalogError> {
        match self.get(key) {
            None => Err(CatalogError::MissingKey {
                key: key.to_string(),
            }),
            Some(value) => value.as_f64().ok_or_else(|| CatalogError::NonNumericKey {
                key: key.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog template '{}': {source}", path.display())]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("catalog template is missing required key '{key}'")]
    MissingKey { key: String },
    #[error("catalog value for '{key}' is not numeric")]
    NonNumericKey { key: String },
}

impl From<CatalogError> for HarnessError {
    fn from(error: CatalogError) -> Self {
        let message = error.to_string();
        match error {
            CatalogError::ReadTemplate { .. } => {
                HarnessError::io_system("IO.CATALOG_TEMPLATE", message)
            }
            CatalogError::MissingKey { .. } | CatalogError::NonNumericKey { .. } => {
                HarnessError::config("CONFIG.CATALOG_KEY", message)
            }
        }
    }
}
