#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::field_map::PartialLabels;
use crate::domain::model::Credentials;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_required_field, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const DEFAULT_OAUTH_URL: &str = "https://core.flowpay.it/api/oauth";
pub const DEFAULT_OPENID_URL: &str = "https://core.flowpay.it/api/openid";
pub const DEFAULT_PLATFORM_URL: &str = "https://app.flowpay.it/api";
pub const DEFAULT_CHECKOUT_URL: &str = "https://checkout.flowpay.it";

/// Base URLs of the payment platform services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub oauth: String,
    pub openid: String,
    pub platform: String,
    pub checkout: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            oauth: DEFAULT_OAUTH_URL.to_string(),
            openid: DEFAULT_OPENID_URL.to_string(),
            platform: DEFAULT_PLATFORM_URL.to_string(),
            checkout: DEFAULT_CHECKOUT_URL.to_string(),
        }
    }
}

/// Everything one run needs, after flags, environment and settings file
/// have been merged.
#[derive(Clone, Default)]
pub struct RunConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub mapping_path: Option<String>,
    pub script_path: Option<String>,
    /// Replaces the script's creditor IBAN on every row.
    pub creditor_iban: Option<String>,
    pub ok_redirect: Option<String>,
    pub nok_redirect: Option<String>,
    pub label_overrides: PartialLabels,
    pub endpoints: Endpoints,
    pub show_progress: bool,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("mapping_path", &self.mapping_path)
            .field("script_path", &self.script_path)
            .field("creditor_iban", &self.creditor_iban)
            .field("ok_redirect", &self.ok_redirect)
            .field("nok_redirect", &self.nok_redirect)
            .field("label_overrides", &self.label_overrides)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl RunConfig {
    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials {
            client_id: validate_required_field("client_id", &self.client_id)?.to_string(),
            client_secret: validate_required_field("client_secret", &self.client_secret)?
                .to_string(),
        })
    }

    pub fn input_path(&self) -> Result<&str> {
        validate_required_field("input_path", &self.input_path)
    }

    /// The explicit output path, or `<stem>_generated.<ext>` next to the input.
    pub fn resolved_output_path(&self) -> Result<String> {
        if let Some(path) = self.output_path.as_deref().filter(|p| !p.trim().is_empty()) {
            return Ok(path.to_string());
        }
        Ok(generated_file_name(self.input_path()?, "generated"))
    }
}

pub fn generated_file_name(input: &str, suffix: &str) -> String {
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.join(file_name).to_string_lossy().to_string(),
        None => file_name,
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validate_required_field("client_id", &self.client_id)?;
        validate_required_field("client_secret", &self.client_secret)?;
        validate_path("input_path", self.input_path()?)?;

        if let Some(path) = &self.output_path {
            validate_path("output_path", path)?;
        }
        if let Some(path) = &self.mapping_path {
            validate_path("mapping_path", path)?;
        }
        if let Some(path) = &self.script_path {
            validate_path("script_path", path)?;
        }

        validate_url("endpoints.oauth", &self.endpoints.oauth)?;
        validate_url("endpoints.openid", &self.endpoints.openid)?;
        validate_url("endpoints.platform", &self.endpoints.platform)?;
        validate_url("endpoints.checkout", &self.endpoints.checkout)?;

        if let Some(url) = &self.ok_redirect {
            validate_url("ok_redirect", url)?;
        }
        if let Some(url) = &self.nok_redirect {
            validate_url("nok_redirect", url)?;
        }

        Ok(())
    }
}
