use crate::core::field_map::FieldMap;
use crate::domain::field::CanonicalField;
use crate::domain::model::{CanonicalRecord, OutputRow, RawRow, TransformMode};
use crate::domain::ports::RowTransform;
use crate::utils::error::Result;
use serde_json::Value;
use std::sync::Arc;

/// Moves rows between spreadsheet labels and canonical fields.
#[derive(Debug, Clone)]
pub struct RecordMapper {
    field_map: Arc<FieldMap>,
}

impl RecordMapper {
    pub fn new(field_map: Arc<FieldMap>) -> Self {
        Self { field_map }
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn to(&self, rows: &[RawRow]) -> Vec<CanonicalRecord> {
        rows.iter().map(|row| self.to_record(row)).collect()
    }

    /// Canonical fields only; a field whose column is missing or empty stays
    /// absent.
    pub fn to_record(&self, row: &RawRow) -> CanonicalRecord {
        let mut record = CanonicalRecord::new();
        for field in CanonicalField::ALL {
            match row.get(self.field_map.label_of(field)) {
                None | Some(Value::Null) => {}
                Some(value) => record.set(field, value.clone()),
            }
        }
        record
    }

    pub fn from(&self, records: &[CanonicalRecord], labels: &[String]) -> Vec<OutputRow> {
        records
            .iter()
            .map(|record| self.from_record(record, labels))
            .collect()
    }

    /// Emits `labels` in order; labels bound to no canonical field, or to a
    /// field the record lacks, are left out.
    pub fn from_record(&self, record: &CanonicalRecord, labels: &[String]) -> OutputRow {
        let mut row = OutputRow::default();
        for label in labels {
            let Some(field) = self.field_map.field_of(label) else {
                continue;
            };
            if let Some(value) = record.get(field) {
                row.data.insert(label.clone(), value.clone());
            }
        }
        row
    }
}

/// Map mode: the record mapper plus the row's unmapped columns as pass-through.
pub struct MapTransform {
    mapper: RecordMapper,
}

impl MapTransform {
    pub fn new(mapper: RecordMapper) -> Self {
        Self { mapper }
    }
}

impl RowTransform for MapTransform {
    fn mode(&self) -> TransformMode {
        TransformMode::Map
    }

    fn transform(&self, _index: usize, row: &RawRow) -> Result<CanonicalRecord> {
        let mut record = self.mapper.to_record(row);
        for (label, value) in &row.data {
            if self.mapper.field_map().field_of(label).is_none() {
                record.passthrough.insert(label.clone(), value.clone());
            }
        }
        Ok(record)
    }
}
