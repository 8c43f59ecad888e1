use crate::domain::field::CanonicalField;
use crate::domain::ports::Storage;
use crate::utils::error::{CheckoutError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Labels for some subset of the canonical fields.
pub type PartialLabels = BTreeMap<CanonicalField, String>;

/// Complete binding of every canonical field to a spreadsheet column label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    labels: BTreeMap<CanonicalField, String>,
}

/// Effective label for one field: override, then mapping file, then the
/// field's own name. Blank overrides count as absent.
pub fn resolve_label(field: CanonicalField, overrides: &PartialLabels, base: &PartialLabels) -> String {
    if let Some(label) = overrides.get(&field).filter(|l| !l.trim().is_empty()) {
        return label.clone();
    }
    if let Some(label) = base.get(&field) {
        return label.clone();
    }
    field.name().to_string()
}

impl FieldMap {
    pub fn build(overrides: &PartialLabels, base: &PartialLabels) -> Self {
        let labels: BTreeMap<CanonicalField, String> = CanonicalField::ALL
            .into_iter()
            .map(|field| (field, resolve_label(field, overrides, base)))
            .collect();

        let map = Self { labels };
        for field in CanonicalField::ALL {
            if let Some(owner) = map.field_of(map.label_of(field)) {
                if owner != field {
                    tracing::warn!(
                        "Column '{}' is bound to both '{}' and '{}'; reverse mapping uses '{}'",
                        map.label_of(field),
                        owner,
                        field,
                        owner
                    );
                }
            }
        }
        map
    }

    /// Defaults overlaid with overrides, for runs without a mapping file.
    pub fn with_overrides(overrides: &PartialLabels) -> Self {
        Self::build(overrides, &PartialLabels::new())
    }

    /// Reads the mapping file at `path` and builds the map from it.
    pub async fn load<S: Storage>(overrides: &PartialLabels, storage: &S, path: &str) -> Result<Self> {
        let mapping_error = |reason: String| CheckoutError::MappingFileError {
            path: path.to_string(),
            reason,
        };
        let bytes = storage
            .read_file(path)
            .await
            .map_err(|e| mapping_error(e.to_string()))?;
        let content = String::from_utf8(bytes).map_err(|e| mapping_error(e.to_string()))?;
        let base = Self::parse_base(&content).map_err(mapping_error)?;
        tracing::debug!("Loaded {} column labels from {}", base.len(), path);
        Ok(Self::build(overrides, &base))
    }

    /// Parses mapping-file content: a JSON object from canonical field name to
    /// column label. Unknown keys are skipped.
    pub fn parse_base(content: &str) -> std::result::Result<PartialLabels, String> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| format!("invalid JSON: {}", e))?;
        let Value::Object(entries) = value else {
            return Err("expected a JSON object of field → column label".to_string());
        };

        let mut labels = PartialLabels::new();
        for (key, value) in entries {
            let Some(field) = CanonicalField::from_name(&key) else {
                tracing::warn!("Ignoring unknown field '{}' in mapping file", key);
                continue;
            };
            match value {
                Value::String(label) => {
                    labels.insert(field, label);
                }
                Value::Null => {}
                other => {
                    return Err(format!(
                        "label for '{}' must be a string, got {}",
                        key, other
                    ))
                }
            }
        }
        Ok(labels)
    }

    pub fn label_of(&self, field: CanonicalField) -> &str {
        self.labels
            .get(&field)
            .map(String::as_str)
            .unwrap_or(field.name())
    }

    /// First field, in canonical order, bound to `label`.
    pub fn field_of(&self, label: &str) -> Option<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .find(|field| self.label_of(*field) == label)
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::build(&PartialLabels::new(), &PartialLabels::new())
    }
}
