use crate::config::Endpoints;
use crate::domain::model::{
    AccessToken, BusinessIdentity, CheckoutResult, Credentials, Session, TransferRequest,
};
use crate::domain::ports::PaymentPlatform;
use crate::utils::error::{CheckoutError, Result};
use reqwest::Client;
use serde::Deserialize;

pub const SCOPE: &str = "transfer:read transfer:write business:read";
pub const GRANT_TYPE: &str = "client_credentials";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    tenant_id: Option<String>,
    business_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BusinessResponse {
    #[serde(rename = "vatCountryID")]
    vat_country_id: String,
    vat_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutResponse {
    fingerprint: String,
    code_invoice: String,
    url: Option<String>,
}

/// `PaymentPlatform` over the platform's REST API.
pub struct HttpPlatform {
    endpoints: Endpoints,
    client: Client,
}

impl HttpPlatform {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            client: Client::new(),
        }
    }

    fn checkout_url(&self, fingerprint: &str) -> String {
        format!(
            "{}/{}",
            self.endpoints.checkout.trim_end_matches('/'),
            fingerprint
        )
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.is_empty() => format!("HTTP {}: {}", status, body),
        _ => format!("HTTP {}", status),
    }
}

#[async_trait::async_trait]
impl PaymentPlatform for HttpPlatform {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken> {
        let url = join(&self.endpoints.oauth, "token");
        tracing::debug!("Requesting access token from {}", url);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("scope", SCOPE),
                ("grant_type", GRANT_TYPE),
            ])
            .send()
            .await
            .map_err(|e| CheckoutError::AuthenticationError {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CheckoutError::AuthenticationError {
                message: error_body(response).await,
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| CheckoutError::AuthenticationError {
                    message: format!("unexpected token response: {}", e),
                })?;

        Ok(AccessToken {
            access_token: token.access_token,
            token_type: token.token_type,
        })
    }

    async fn business_identity(&self, token: &AccessToken) -> Result<BusinessIdentity> {
        let url = join(&self.endpoints.openid, "token/introspection");
        let response = self
            .client
            .post(&url)
            .form(&[("token", token.access_token.as_str())])
            .send()
            .await
            .map_err(|e| CheckoutError::remote("token_introspection", e.to_string()))?;

        if !response.status().is_success() {
            return Err(CheckoutError::remote(
                "token_introspection",
                error_body(response).await,
            ));
        }

        let intro: IntrospectionResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::remote("token_introspection", e.to_string()))?;
        let tenant_id = intro.tenant_id.or(intro.business_id).ok_or_else(|| {
            CheckoutError::remote(
                "token_introspection",
                "response carries neither tenant_id nor business_id",
            )
        })?;

        let url = join(
            &self.endpoints.platform,
            &format!("{}/businesses/current", tenant_id),
        );
        tracing::debug!("Fetching business identity from {}", url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", token.authorization_header())
            .send()
            .await
            .map_err(|e| CheckoutError::remote("business_identity", e.to_string()))?;

        if !response.status().is_success() {
            return Err(CheckoutError::remote(
                "business_identity",
                error_body(response).await,
            ));
        }

        let business: BusinessResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::remote("business_identity", e.to_string()))?;

        Ok(BusinessIdentity {
            tenant_id,
            vat_identity: format!("{}{}", business.vat_country_id, business.vat_code),
        })
    }

    async fn create_checkout(
        &self,
        session: &Session,
        transfer: &TransferRequest,
    ) -> Result<CheckoutResult> {
        let url = join(
            &self.endpoints.platform,
            &format!("{}/transfers", session.tenant_id),
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", session.token.authorization_header())
            .json(transfer)
            .send()
            .await
            .map_err(|e| CheckoutError::remote("create_checkout", e.to_string()))?;

        if !response.status().is_success() {
            return Err(CheckoutError::remote(
                "create_checkout",
                error_body(response).await,
            ));
        }

        let created: CheckoutResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::remote("create_checkout", e.to_string()))?;
        let url = created
            .url
            .unwrap_or_else(|| self.checkout_url(&created.fingerprint));

        Ok(CheckoutResult {
            fingerprint: created.fingerprint,
            code_invoice: created.code_invoice,
            url,
        })
    }
}
