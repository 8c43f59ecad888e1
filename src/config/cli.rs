use crate::config::toml_config::SettingsFile;
use crate::config::{Endpoints, RunConfig};
use crate::core::field_map::PartialLabels;
use crate::domain::field::CanonicalField;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "checkout-etl")]
#[command(about = "Generate payment checkouts for every row of a CSV file")]
pub struct CliArgs {
    /// CSV file to generate checkouts from
    #[arg(short = 'p', long = "path", env = "CSV_PATH")]
    pub path: Option<String>,

    /// Where to write the generated CSV (default: <input>_generated.csv next to the input)
    #[arg(short = 'o', long = "path-output")]
    pub path_output: Option<String>,

    /// JSON file mapping canonical fields to column labels
    #[arg(short = 'j', long = "path-map", env = "MAP_PATH")]
    pub path_map: Option<String>,

    /// Lua script turning each row into a transfer record
    #[arg(short = 'y', long = "path-script", env = "SCRIPT_PATH")]
    pub path_script: Option<String>,

    /// IBAN used as creditor IBAN for every row in script mode
    #[arg(short = 'k', long = "iban")]
    pub iban: Option<String>,

    /// Redirect URL after a successful checkout
    #[arg(long)]
    pub ok_redirect: Option<String>,

    /// Redirect URL after a failed checkout
    #[arg(short = 'n', long)]
    pub nok_redirect: Option<String>,

    #[arg(short = 'i', long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(short = 's', long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// TOML settings file
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, env = "BASE_URL_OAUTH")]
    pub oauth_url: Option<String>,

    #[arg(long, env = "BASE_URL_OPENID")]
    pub openid_url: Option<String>,

    #[arg(long, env = "BASE_URL_PLATFORM")]
    pub platform_url: Option<String>,

    #[arg(long, env = "BASE_URL_CHECKOUT")]
    pub checkout_url: Option<String>,

    /// Column label of vat_code
    #[arg(short = 'v', long)]
    pub vat_code: Option<String>,

    /// Column label of creditor_iban
    #[arg(short = 'c', long)]
    pub creditor_iban: Option<String>,

    /// Column label of amount
    #[arg(short = 'a', long)]
    pub amount: Option<String>,

    /// Column label of expire_date
    #[arg(short = 'e', long)]
    pub expire_date: Option<String>,

    /// Column label of remittance
    #[arg(short = 'r', long)]
    pub remittance: Option<String>,

    /// Column label of the generated code_invoice
    #[arg(short = 'd', long)]
    pub code_invoice: Option<String>,

    /// Column label of the generated url_checkout
    #[arg(short = 'u', long)]
    pub url_checkout: Option<String>,

    /// Column label of recurring_info
    #[arg(long)]
    pub recurring_info: Option<String>,

    /// Column label of the generated fingerprint
    #[arg(short = 'f', long)]
    pub fingerprint: Option<String>,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliArgs {
    pub fn label_overrides(&self) -> PartialLabels {
        [
            (CanonicalField::VatCode, &self.vat_code),
            (CanonicalField::CreditorIban, &self.creditor_iban),
            (CanonicalField::Amount, &self.amount),
            (CanonicalField::ExpireDate, &self.expire_date),
            (CanonicalField::Remittance, &self.remittance),
            (CanonicalField::CodeInvoice, &self.code_invoice),
            (CanonicalField::UrlCheckout, &self.url_checkout),
            (CanonicalField::RecurringInfo, &self.recurring_info),
            (CanonicalField::Fingerprint, &self.fingerprint),
        ]
        .into_iter()
        .filter_map(|(field, label)| label.clone().map(|label| (field, label)))
        .collect()
    }

    /// Loads the settings file, if any, and merges it under the flags.
    pub fn into_run_config(self) -> Result<RunConfig> {
        let settings = match &self.config {
            Some(path) => SettingsFile::from_file(path)?,
            None => SettingsFile::default(),
        };
        Ok(self.merge(settings))
    }

    pub fn merge(self, settings: SettingsFile) -> RunConfig {
        let label_overrides = self.label_overrides();
        let auth = settings.auth.unwrap_or_default();
        let endpoints = settings.endpoints.unwrap_or_default();
        let files = settings.files.unwrap_or_default();
        let checkout = settings.checkout.unwrap_or_default();
        let defaults = Endpoints::default();

        RunConfig {
            client_id: self.client_id.or(auth.client_id),
            client_secret: self.client_secret.or(auth.client_secret),
            input_path: self.path.or(files.input),
            output_path: self.path_output.or(files.output),
            mapping_path: self.path_map.or(files.mapping),
            script_path: self.path_script.or(files.script),
            creditor_iban: self.iban.or(checkout.creditor_iban),
            ok_redirect: self.ok_redirect.or(checkout.ok_redirect),
            nok_redirect: self.nok_redirect.or(checkout.nok_redirect),
            label_overrides,
            endpoints: Endpoints {
                oauth: self.oauth_url.or(endpoints.oauth).unwrap_or(defaults.oauth),
                openid: self.openid_url.or(endpoints.openid).unwrap_or(defaults.openid),
                platform: self
                    .platform_url
                    .or(endpoints.platform)
                    .unwrap_or(defaults.platform),
                checkout: self
                    .checkout_url
                    .or(endpoints.checkout)
                    .unwrap_or(defaults.checkout),
            },
            show_progress: !self.quiet,
        }
    }
}
