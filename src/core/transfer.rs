use crate::domain::field::CanonicalField;
use crate::domain::model::{CanonicalRecord, RecurringInfo, TransferRequest};
use crate::utils::error::{CheckoutError, Result};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Redirect targets forwarded with every transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirects {
    pub ok: Option<String>,
    pub nok: Option<String>,
}

/// Reads a numeric cell. Text may use either `,` or `.` as decimal
/// separator, with the other one grouping thousands (`1.000,50`,
/// `1,000.50`). A lone separator followed by exactly three digits
/// (`1,000`) is ambiguous and rejected.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => normalize_amount(s.trim())?
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
        _ => None,
    }
}

fn normalize_amount(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let commas = body.matches(',').count();
    let dots = body.matches('.').count();

    let (integer, fraction, grouping) = match (commas, dots) {
        (0, 0) => return Some(text.to_string()),
        // several of one separator: grouping only
        (n, 0) | (0, n) if n > 1 => {
            let grouping = if commas > 0 { ',' } else { '.' };
            (body, None, Some(grouping))
        }
        (1, 0) | (0, 1) => {
            let decimal = if commas > 0 { ',' } else { '.' };
            let (integer, fraction) = body.split_once(decimal)?;
            if fraction.len() == 3 {
                return None;
            }
            (integer, Some(fraction), None)
        }
        _ => {
            let (decimal, grouping) = if body.rfind(',') > body.rfind('.') {
                (',', '.')
            } else {
                ('.', ',')
            };
            let (integer, fraction) = body.split_once(decimal)?;
            if fraction.contains(grouping) || fraction.contains(decimal) {
                return None;
            }
            (integer, Some(fraction), Some(grouping))
        }
    };

    let integer = match grouping {
        Some(separator) => ungroup(integer, separator)?,
        None => integer.to_string(),
    };
    if !integer.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match fraction {
        Some(fraction) if !fraction.is_empty() && fraction.chars().all(|c| c.is_ascii_digit()) => {
            Some(format!("{}{}.{}", sign, integer, fraction))
        }
        Some(_) => None,
        None if integer.is_empty() => None,
        None => Some(format!("{}{}", sign, integer)),
    }
}

/// `12.345.678` → `12345678`; groups after the first must hold three digits.
fn ungroup(integer: &str, separator: char) -> Option<String> {
    let mut groups = integer.split(separator);
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }
    let mut digits = first.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

pub fn parse_due_date(value: &Value) -> Option<NaiveDate> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

pub fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Recurrence only applies for more than one instalment; the count is floored.
pub fn recurring_info(value: Option<&Value>) -> Option<RecurringInfo> {
    let count = value.and_then(parse_number)?;
    if count > 1.0 {
        Some(RecurringInfo {
            count: count.floor() as u32,
        })
    } else {
        None
    }
}

fn required<'a>(record: &'a CanonicalRecord, row: usize, field: CanonicalField) -> Result<&'a Value> {
    match record.get(field) {
        Some(Value::Null) | None => Err(CheckoutError::InvalidRecordError {
            row,
            field: field.name().to_string(),
            reason: "value is missing".to_string(),
        }),
        Some(value) => Ok(value),
    }
}

fn invalid(row: usize, field: CanonicalField, value: &Value, expected: &str) -> CheckoutError {
    CheckoutError::InvalidRecordError {
        row,
        field: field.name().to_string(),
        reason: format!("expected {}, got {}", expected, value),
    }
}

/// Builds the transfer for the record at input position `row`.
pub fn build_transfer(
    record: &CanonicalRecord,
    row: usize,
    creditor: &str,
    redirects: &Redirects,
) -> Result<TransferRequest> {
    let text = |field: CanonicalField| -> Result<String> {
        let value = required(record, row, field)?;
        parse_text(value).ok_or_else(|| invalid(row, field, value, "text"))
    };

    let amount_value = required(record, row, CanonicalField::Amount)?;
    let amount = parse_number(amount_value)
        .ok_or_else(|| invalid(row, CanonicalField::Amount, amount_value, "a number"))?;

    let date_value = required(record, row, CanonicalField::ExpireDate)?;
    let date = parse_due_date(date_value)
        .ok_or_else(|| invalid(row, CanonicalField::ExpireDate, date_value, "a date"))?;

    Ok(TransferRequest {
        amount,
        creditor: creditor.to_string(),
        creditor_iban: text(CanonicalField::CreditorIban)?,
        debtor: text(CanonicalField::VatCode)?,
        date,
        remittance: text(CanonicalField::Remittance)?,
        recurring_info: recurring_info(record.get(CanonicalField::RecurringInfo)),
        ok_redirect: redirects.ok.clone(),
        nok_redirect: redirects.nok.clone(),
    })
}
