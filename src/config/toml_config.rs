use crate::utils::error::{CheckoutError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional settings file. Every value may be overridden from the command
/// line or the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    pub auth: Option<AuthSettings>,
    pub endpoints: Option<EndpointSettings>,
    pub files: Option<FileSettings>,
    pub checkout: Option<CheckoutSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointSettings {
    pub oauth: Option<String>,
    pub openid: Option<String>,
    pub platform: Option<String>,
    pub checkout: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSettings {
    pub input: Option<String>,
    pub output: Option<String>,
    pub mapping: Option<String>,
    pub script: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSettings {
    pub creditor_iban: Option<String>,
    pub ok_redirect: Option<String>,
    pub nok_redirect: Option<String>,
}

impl SettingsFile {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CheckoutError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| CheckoutError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${CLIENT_SECRET})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| CheckoutError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}
