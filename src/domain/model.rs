use crate::domain::field::CanonicalField;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// One input row keyed by spreadsheet column label, in header order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub data: Map<String, Value>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: &str, value: impl Into<Value>) -> Self {
        self.data.insert(label.to_string(), value.into());
        self
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        self.data.get(label)
    }
}

/// A row expressed in the canonical vocabulary. Columns that are not bound to
/// a canonical field travel alongside in `passthrough` so they survive to the
/// output unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub fields: BTreeMap<CanonicalField, Value>,
    pub passthrough: Map<String, Value>,
}

impl CanonicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: CanonicalField) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn set(&mut self, field: CanonicalField, value: impl Into<Value>) {
        self.fields.insert(field, value.into());
    }

    pub fn remove(&mut self, field: CanonicalField) -> Option<Value> {
        self.fields.remove(&field)
    }
}

/// An output row keyed by column label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub data: Map<String, Value>,
}

/// Tabular content as read from the input spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub column_names: Vec<String>,
    pub rows: Vec<RawRow>,
    pub delimiter: u8,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub rows: Vec<OutputRow>,
    pub column_names: Vec<String>,
    pub delimiter: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Map,
    Script,
}

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

impl AccessToken {
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessIdentity {
    pub tenant_id: String,
    /// VAT country code followed by VAT number, e.g. `IT01234567890`.
    pub vat_identity: String,
}

/// Everything the per-row checkout call needs from the authentication phase.
/// Acquired once per run and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: AccessToken,
    pub tenant_id: String,
    pub creditor: String,
}

impl Session {
    pub fn new(token: AccessToken, identity: BusinessIdentity) -> Self {
        Self {
            token,
            tenant_id: identity.tenant_id,
            creditor: identity.vat_identity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringInfo {
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub amount: f64,
    pub creditor: String,
    pub creditor_iban: String,
    pub debtor: String,
    pub date: NaiveDate,
    pub remittance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_info: Option<RecurringInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok_redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nok_redirect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutResult {
    pub fingerprint: String,
    pub code_invoice: String,
    pub url: String,
}
