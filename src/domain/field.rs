use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed vocabulary the pipeline works in, independent of how the
/// spreadsheet names its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    VatCode,
    CreditorIban,
    Amount,
    ExpireDate,
    Remittance,
    CodeInvoice,
    UrlCheckout,
    RecurringInfo,
    Fingerprint,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 9] = [
        CanonicalField::VatCode,
        CanonicalField::CreditorIban,
        CanonicalField::Amount,
        CanonicalField::ExpireDate,
        CanonicalField::Remittance,
        CanonicalField::CodeInvoice,
        CanonicalField::UrlCheckout,
        CanonicalField::RecurringInfo,
        CanonicalField::Fingerprint,
    ];

    /// Filled in from the checkout response, appended to the output in this order.
    pub const GENERATED: [CanonicalField; 3] = [
        CanonicalField::Fingerprint,
        CanonicalField::CodeInvoice,
        CanonicalField::UrlCheckout,
    ];

    /// Business inputs that script mode drops before writing the output.
    pub const BUSINESS: [CanonicalField; 6] = [
        CanonicalField::RecurringInfo,
        CanonicalField::CreditorIban,
        CanonicalField::VatCode,
        CanonicalField::Amount,
        CanonicalField::Remittance,
        CanonicalField::ExpireDate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::VatCode => "vat_code",
            CanonicalField::CreditorIban => "creditor_iban",
            CanonicalField::Amount => "amount",
            CanonicalField::ExpireDate => "expire_date",
            CanonicalField::Remittance => "remittance",
            CanonicalField::CodeInvoice => "code_invoice",
            CanonicalField::UrlCheckout => "url_checkout",
            CanonicalField::RecurringInfo => "recurring_info",
            CanonicalField::Fingerprint => "fingerprint",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Resolves a key returned by a transform script. Besides the canonical
    /// names, scripts may use the transfer vocabulary (`creditor`, `debtor`,
    /// `date`, camelCase variants).
    pub fn from_script_key(key: &str) -> Option<Self> {
        Self::script_key_rank(key).map(|(field, _)| field)
    }

    /// Field and precedence of a script key; lower ranks win when a script
    /// returns several keys for one field. Canonical names rank 0, camelCase
    /// spellings 1, transfer vocabulary 2.
    pub fn script_key_rank(key: &str) -> Option<(Self, u8)> {
        if let Some(field) = Self::from_name(key) {
            return Some((field, 0));
        }
        match key {
            "creditorIBAN" | "creditorIban" => Some((CanonicalField::CreditorIban, 1)),
            "vatCode" => Some((CanonicalField::VatCode, 1)),
            "expireDate" => Some((CanonicalField::ExpireDate, 1)),
            "recurringInfo" => Some((CanonicalField::RecurringInfo, 1)),
            "codeInvoice" => Some((CanonicalField::CodeInvoice, 1)),
            "urlCheckout" => Some((CanonicalField::UrlCheckout, 1)),
            "creditor" => Some((CanonicalField::CreditorIban, 2)),
            "debtor" => Some((CanonicalField::VatCode, 2)),
            "date" => Some((CanonicalField::ExpireDate, 2)),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
