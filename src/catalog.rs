//! Read-only evidence catalog loading.
//!
//! The catalog is a JSON array of evidence items. Loading is lenient at the
//! item level: structurally broken entries are skipped with a warning so one
//! bad record cannot take down the whole catalog.

use std::path::Path;

use serde_json::Value;

use crate::error::{CatalogError, Result};
use crate::types::{EvidenceItem, EvidenceTier};

/// Environment variable that points at the catalog file.
pub const CATALOG_ENV_VAR: &str = "DIVERDICT_EVIDENCE_CATALOG";

/// An in-memory, read-only collection of evidence items.
#[derive(Debug, Clone, Default)]
pub struct EvidenceCatalog {
    items: Vec<EvidenceItem>,
}

impl EvidenceCatalog {
    /// Create a catalog from pre-built items.
    #[must_use]
    pub fn new(items: Vec<EvidenceItem>) -> Self {
        Self { items }
    }

    /// Create an empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON file.
    ///
    /// Fails when the file cannot be read or is not a JSON array; individual
    /// malformed items are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Read(format!("{}: {e}", path.display())))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        let Value::Array(entries) = value else {
            return Err(CatalogError::Parse("catalog root must be a JSON array".into()).into());
        };

        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match parse_item(entry) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!("Skipping catalog item {index}: {e}");
                }
            }
        }
        Ok(Self { items })
    }

    /// Load a catalog, degrading to an empty one on any failure.
    #[must_use]
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Evidence catalog unavailable at {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    /// Resolve the catalog path from [`CATALOG_ENV_VAR`] and load it.
    ///
    /// An unset variable or a failed load both yield an empty catalog.
    #[must_use]
    pub fn from_env_or_empty() -> Self {
        match std::env::var(CATALOG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load_or_empty(path),
            _ => {
                tracing::debug!("{CATALOG_ENV_VAR} not set, using empty evidence catalog");
                Self::empty()
            }
        }
    }

    /// All items in catalog order.
    #[must_use]
    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parse one catalog entry.
///
/// `subject` must be a string; `year` accepts both a string and an integer
/// (catalog files produced by hand often carry bare numbers); `source`
/// defaults to empty; an unrecognized `tier` falls back to L3.
fn parse_item(entry: &Value) -> std::result::Result<EvidenceItem, CatalogError> {
    let obj = entry
        .as_object()
        .ok_or_else(|| CatalogError::InvalidItem("entry is not an object".into()))?;

    let subject = obj
        .get("subject")
        .and_then(Value::as_str)
        .ok_or_else(|| CatalogError::InvalidItem("missing string field `subject`".into()))?;
    if subject.trim().is_empty() {
        return Err(CatalogError::InvalidItem("`subject` is empty".into()));
    }

    let year = match obj.get("year") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(CatalogError::InvalidItem("missing `year`".into())),
    };

    let source = obj
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tier = match obj.get("tier").and_then(Value::as_str) {
        Some("L1") => EvidenceTier::L1,
        Some("L2") => EvidenceTier::L2,
        _ => EvidenceTier::L3,
    };

    Ok(EvidenceItem::new(subject, year, source, tier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_catalog() {
        let file = write_catalog(
            r#"[
                {"subject": "X技术专利", "year": "2018", "source": "官方专利公报", "tier": "L1"},
                {"subject": "X技术专利", "year": "2018", "source": "行业白皮书", "tier": "L2"}
            ]"#,
        );
        let catalog = EvidenceCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.items()[0].tier, EvidenceTier::L1);
        assert_eq!(catalog.items()[0].year, "2018");
        assert_eq!(catalog.items()[1].source, "行业白皮书");
    }

    #[test]
    fn test_integer_year_coerced_to_string() {
        let file = write_catalog(
            r#"[{"subject": "X技术专利", "year": 2018, "source": "官方专利公报", "tier": "L1"}]"#,
        );
        let catalog = EvidenceCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.items()[0].year, "2018");
    }

    #[test]
    fn test_unknown_tier_defaults_to_l3() {
        let file = write_catalog(r#"[{"subject": "s", "year": "2001", "tier": "gold"}]"#);
        let catalog = EvidenceCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.items()[0].tier, EvidenceTier::L3);
        assert_eq!(catalog.items()[0].source, "");
    }

    #[test]
    fn test_invalid_items_skipped() {
        let file = write_catalog(
            r#"[
                {"subject": "good", "year": "2001", "source": "s", "tier": "L1"},
                {"year": "2002"},
                {"subject": "", "year": "2003"},
                "not an object"
            ]"#,
        );
        let catalog = EvidenceCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.items()[0].subject, "good");
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let file = write_catalog("{ not json");
        let err = EvidenceCatalog::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse catalog"));
    }

    #[test]
    fn test_non_array_root_is_parse_error() {
        let file = write_catalog(r#"{"subject": "s"}"#);
        let err = EvidenceCatalog::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn test_load_or_empty_degrades() {
        let catalog = EvidenceCatalog::load_or_empty("/nonexistent/catalog.json");
        assert!(catalog.is_empty());

        let file = write_catalog("broken");
        let catalog = EvidenceCatalog::load_or_empty(file.path());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_empty_array_is_valid() {
        let file = write_catalog("[]");
        let catalog = EvidenceCatalog::load(file.path()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
    }
}
