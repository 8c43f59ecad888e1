use crate::domain::model::{
    AccessToken, BusinessIdentity, CanonicalRecord, CheckoutResult, Credentials, RawRow, Session,
    Sheet, TransferRequest, TransformMode, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The remote payment platform: OAuth handshake, business lookup and
/// checkout creation.
#[async_trait]
pub trait PaymentPlatform: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken>;
    async fn business_identity(&self, token: &AccessToken) -> Result<BusinessIdentity>;
    async fn create_checkout(
        &self,
        session: &Session,
        transfer: &TransferRequest,
    ) -> Result<CheckoutResult>;
}

/// Turns one input row into a canonical record. Chosen once per run.
pub trait RowTransform: Send + Sync {
    fn mode(&self) -> TransformMode;
    fn transform(&self, index: usize, row: &RawRow) -> Result<CanonicalRecord>;
}

/// A user supplied per-row function. Returns the object the script produced,
/// keyed however the script likes.
pub trait ScriptFunction: Send + Sync {
    fn call(&self, index: usize, row: &RawRow) -> Result<Map<String, Value>>;
}

impl<F> ScriptFunction for F
where
    F: Fn(&RawRow) -> Result<Map<String, Value>> + Send + Sync,
{
    fn call(&self, _index: usize, row: &RawRow) -> Result<Map<String, Value>> {
        self(row)
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn open_session(&self) -> Result<Session>;
    async fn extract(&self) -> Result<Sheet>;
    async fn transform(&self, session: &Session, sheet: Sheet) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
