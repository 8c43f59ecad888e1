use crate::core::transfer::{parse_due_date, parse_number};
use crate::domain::field::CanonicalField;
use crate::domain::model::{CanonicalRecord, RawRow, TransformMode};
use crate::domain::ports::{RowTransform, ScriptFunction};
use crate::utils::error::{CheckoutError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const REQUIRED_TEXT: [CanonicalField; 3] = [
    CanonicalField::CreditorIban,
    CanonicalField::VatCode,
    CanonicalField::Remittance,
];

/// Script mode: every row goes through a user supplied function.
pub struct ScriptTransform<F: ScriptFunction> {
    function: F,
    script_name: String,
    creditor_iban: Option<String>,
}

impl<F: ScriptFunction> ScriptTransform<F> {
    pub fn new(function: F, script_name: impl Into<String>) -> Self {
        Self {
            function,
            script_name: script_name.into(),
            creditor_iban: None,
        }
    }

    /// IBAN that replaces whatever the script returns for every row.
    pub fn with_creditor_iban(mut self, iban: Option<String>) -> Self {
        self.creditor_iban = iban.filter(|iban| !iban.trim().is_empty());
        self
    }
}

/// Splits a script result into canonical fields and free-form keys. When a
/// script returns several keys for one field, the best ranked key wins
/// regardless of key order.
pub fn split_script_output(output: Map<String, Value>) -> (BTreeMap<CanonicalField, Value>, Map<String, Value>) {
    let mut ranked: BTreeMap<CanonicalField, (u8, Value)> = BTreeMap::new();
    let mut extra = Map::new();
    for (key, value) in output {
        match CanonicalField::script_key_rank(&key) {
            Some((field, rank)) => {
                if ranked.get(&field).map_or(true, |(best, _)| rank < *best) {
                    ranked.insert(field, (rank, value));
                }
            }
            None => {
                extra.insert(key, value);
            }
        }
    }
    let fields = ranked
        .into_iter()
        .map(|(field, (_, value))| (field, value))
        .collect();
    (fields, extra)
}

/// Checks that a script result carries every field a transfer needs, with
/// usable types.
pub fn assert_script(fields: &BTreeMap<CanonicalField, Value>, row: usize, script: &str) -> Result<()> {
    let violation = |reason: String| CheckoutError::ScriptContractError {
        script: script.to_string(),
        row,
        reason,
    };
    let present = |field: CanonicalField| match fields.get(&field) {
        None | Some(Value::Null) => Err(violation(format!("missing '{}'", field))),
        Some(value) => Ok(value),
    };

    let amount = present(CanonicalField::Amount)?;
    if parse_number(amount).is_none() {
        return Err(violation(format!("'amount' must be a number, got {}", amount)));
    }

    for field in REQUIRED_TEXT {
        match present(field)? {
            Value::String(s) if !s.trim().is_empty() => {}
            other => {
                return Err(violation(format!(
                    "'{}' must be a non-empty string, got {}",
                    field, other
                )))
            }
        }
    }

    let date = present(CanonicalField::ExpireDate)?;
    if parse_due_date(date).is_none() {
        return Err(violation(format!("'expire_date' must be a date, got {}", date)));
    }

    if let Some(recurring) = fields.get(&CanonicalField::RecurringInfo) {
        if !recurring.is_null() && parse_number(recurring).is_none() {
            return Err(violation(format!(
                "'recurring_info' must be a number, got {}",
                recurring
            )));
        }
    }

    Ok(())
}

impl<F: ScriptFunction> RowTransform for ScriptTransform<F> {
    fn mode(&self) -> TransformMode {
        TransformMode::Script
    }

    fn transform(&self, index: usize, row: &RawRow) -> Result<CanonicalRecord> {
        let output = self.function.call(index, row)?;
        let (mut fields, extra) = split_script_output(output);

        if let Some(iban) = &self.creditor_iban {
            fields.insert(CanonicalField::CreditorIban, Value::String(iban.clone()));
        }

        assert_script(&fields, index, &self.script_name)?;

        // Row first, script output on top.
        let mut record = CanonicalRecord::new();
        for (label, value) in &row.data {
            match CanonicalField::from_name(label) {
                Some(field) => record.set(field, value.clone()),
                None => {
                    record.passthrough.insert(label.clone(), value.clone());
                }
            }
        }
        record.fields.extend(fields);
        record.passthrough.extend(extra);

        tracing::debug!("Script '{}' transformed row {}", self.script_name, index);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn valid_output(row: &RawRow) -> Result<Map<String, Value>> {
        Ok(as_map(json!({
            "amount": row.get("Totale").cloned().unwrap_or(json!(0)),
            "creditor": "IT60X0542811101000000123456",
            "debtor": row.get("Cliente").cloned().unwrap_or(json!("")),
            "date": "2024-01-01",
            "remittance": "Fattura",
            "customer_ref": "ref-1"
        })))
    }

    fn input_row() -> RawRow {
        RawRow::new()
            .with("Cliente", "IT123")
            .with("Totale", "150")
            .with("Note", "vip")
    }

    #[test]
    fn test_record_merges_row_under_script_output() {
        let transform = ScriptTransform::new(valid_output, "billing.lua");
        let row = input_row().with("remittance", "from sheet");

        let record = transform.transform(0, &row).unwrap();

        assert_eq!(transform.mode(), TransformMode::Script);
        assert_eq!(record.get(CanonicalField::Amount), Some(&json!("150")));
        assert_eq!(record.get(CanonicalField::VatCode), Some(&json!("IT123")));
        assert_eq!(record.get(CanonicalField::Remittance), Some(&json!("Fattura")));
        assert_eq!(record.passthrough.get("Note"), Some(&json!("vip")));
        assert_eq!(record.passthrough.get("customer_ref"), Some(&json!("ref-1")));
    }

    #[test]
    fn test_global_iban_overrides_script() {
        let transform = ScriptTransform::new(valid_output, "billing.lua")
            .with_creditor_iban(Some("IT02L1234512345123456789012".to_string()));

        let record = transform.transform(0, &input_row()).unwrap();

        assert_eq!(
            record.get(CanonicalField::CreditorIban),
            Some(&json!("IT02L1234512345123456789012"))
        );
    }

    #[test]
    fn test_global_iban_satisfies_contract() {
        let without_iban = |row: &RawRow| -> Result<Map<String, Value>> {
            let mut output = valid_output(row)?;
            output.remove("creditor");
            Ok(output)
        };
        let transform = ScriptTransform::new(without_iban, "billing.lua")
            .with_creditor_iban(Some("IT02L1234512345123456789012".to_string()));

        assert!(transform.transform(0, &input_row()).is_ok());
    }

    #[test]
    fn test_missing_amount_names_row_and_script() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let drops_amount_on_second_row = move |row: &RawRow| -> Result<Map<String, Value>> {
            seen.fetch_add(1, Ordering::SeqCst);
            let mut output = valid_output(row)?;
            if row.get("Cliente") == Some(&json!("IT456")) {
                output.remove("amount");
            }
            Ok(output)
        };
        let transform = ScriptTransform::new(drops_amount_on_second_row, "billing.lua");
        let rows = vec![
            input_row(),
            input_row().with("Cliente", "IT456"),
            input_row(),
        ];

        let result: Result<Vec<CanonicalRecord>> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| transform.transform(i, row))
            .collect();

        match result.unwrap_err() {
            CheckoutError::ScriptContractError { script, row, reason } => {
                assert_eq!(script, "billing.lua");
                assert_eq!(row, 1);
                assert!(reason.contains("amount"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_assert_script_checks_types() {
        let (fields, _) = split_script_output(as_map(json!({
            "amount": "lots",
            "creditor_iban": "IT60X",
            "vat_code": "IT123",
            "expire_date": "2024-01-01",
            "remittance": "x"
        })));
        assert!(assert_script(&fields, 0, "s.lua").is_err());

        let (fields, _) = split_script_output(as_map(json!({
            "amount": 10,
            "creditor_iban": "IT60X",
            "vat_code": 123,
            "expire_date": "2024-01-01",
            "remittance": "x"
        })));
        assert!(assert_script(&fields, 0, "s.lua").is_err());

        let (fields, _) = split_script_output(as_map(json!({
            "amount": 10,
            "creditor_iban": "IT60X",
            "vat_code": "IT123",
            "expire_date": "soon",
            "remittance": "x"
        })));
        assert!(assert_script(&fields, 0, "s.lua").is_err());
    }

    #[test]
    fn test_creditor_iban_key_beats_creditor_in_any_order() {
        for output in [
            json!({"creditor": "IT01234567890", "creditorIBAN": "IT60X0542811101000000123456"}),
            json!({"creditorIBAN": "IT60X0542811101000000123456", "creditor": "IT01234567890"}),
        ] {
            let (fields, _) = split_script_output(as_map(output));
            assert_eq!(
                fields[&CanonicalField::CreditorIban],
                json!("IT60X0542811101000000123456")
            );
        }
    }

    #[test]
    fn test_lua_contract_keys_resolve_to_iban() {
        let source = r#"
return function(row)
  return {
    amount = 10,
    creditor = "IT01234567890",
    creditorIBAN = "IT60X0542811101000000123456",
    debtor = row.Cliente,
    date = "2030-01-31",
    remittance = "Fattura",
  }
end
"#;
        // Lua table iteration order varies between states.
        for _ in 0..10 {
            let script = crate::adapters::lua::LuaScript::from_source(source, "contract.lua").unwrap();
            let transform = ScriptTransform::new(script, "contract.lua");

            let record = transform.transform(0, &input_row()).unwrap();
            assert_eq!(
                record.get(CanonicalField::CreditorIban),
                Some(&json!("IT60X0542811101000000123456"))
            );
            assert_eq!(record.get(CanonicalField::VatCode), Some(&json!("IT123")));
        }
    }

    #[test]
    fn test_exact_names_win_over_aliases() {
        let (fields, extra) = split_script_output(as_map(json!({
            "creditor": "alias",
            "creditor_iban": "exact",
            "date": "2024-01-01"
        })));

        assert_eq!(fields[&CanonicalField::CreditorIban], json!("exact"));
        assert_eq!(fields[&CanonicalField::ExpireDate], json!("2024-01-01"));
        assert!(extra.is_empty());
    }
}
