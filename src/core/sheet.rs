// CSV import/export for the payment sheet.

use crate::domain::model::{OutputRow, RawRow, Sheet};
use crate::utils::error::{CheckoutError, Result};
use serde_json::{Map, Value};

const UTF8_BOM: &str = "\u{feff}";

/// Picks the delimiter that splits the first lines into the most consistent
/// number of fields (more than one). Falls back to a comma.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b';', b',', b'\t'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0usize;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count();
        let score = consistent * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Parses the input sheet. The first line is the header; empty cells become
/// `null`.
pub fn extract(content: &[u8]) -> Result<Sheet> {
    let text = std::str::from_utf8(content).map_err(|e| CheckoutError::InvalidConfigValueError {
        field: "input_path".to_string(),
        value: String::new(),
        reason: format!("input is not valid UTF-8: {}", e),
    })?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let delimiter = sniff_delimiter(text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let column_names: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut data = Map::new();
        for (index, label) in column_names.iter().enumerate() {
            let value = match record.get(index) {
                Some(cell) if !cell.is_empty() => Value::String(cell.to_string()),
                _ => Value::Null,
            };
            data.insert(label.clone(), value);
        }
        rows.push(RawRow { data });
    }

    tracing::debug!(
        "Parsed {} rows with {} columns (delimiter {:?})",
        rows.len(),
        column_names.len(),
        delimiter as char
    );

    Ok(Sheet {
        column_names,
        rows,
        delimiter,
    })
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Serialises `rows` with `column_names` as the header, in that column order.
pub fn build_content(rows: &[OutputRow], column_names: &[String], delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(column_names)?;
    for row in rows {
        writer.write_record(column_names.iter().map(|label| cell_text(row.data.get(label))))?;
    }

    writer.into_inner().map_err(|e| CheckoutError::IoError(e.into_error()))
}
