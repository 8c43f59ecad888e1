use crate::adapters::lua::LuaScript;
use crate::config::RunConfig;
use crate::core::field_map::FieldMap;
use crate::core::record_mapper::{MapTransform, RecordMapper};
use crate::core::script::ScriptTransform;
use crate::core::sheet;
use crate::core::transfer::{build_transfer, Redirects};
use crate::domain::field::CanonicalField;
use crate::domain::model::{
    CanonicalRecord, OutputRow, Session, Sheet, TransformMode, TransformResult,
};
use crate::domain::ports::{PaymentPlatform, Pipeline, RowTransform, Storage};
use crate::utils::error::Result;
use crate::utils::progress::Progress;
use serde_json::Value;
use std::sync::Arc;

/// Builds the field map from the configured overrides and mapping file.
pub async fn build_field_map<S: Storage>(config: &RunConfig, storage: &S) -> Result<FieldMap> {
    match &config.mapping_path {
        Some(path) => FieldMap::load(&config.label_overrides, storage, path).await,
        None => Ok(FieldMap::with_overrides(&config.label_overrides)),
    }
}

/// Map mode unless a script is configured.
pub async fn select_strategy<S: Storage>(
    config: &RunConfig,
    storage: &S,
    field_map: Arc<FieldMap>,
) -> Result<Box<dyn RowTransform>> {
    match &config.script_path {
        None => {
            tracing::info!("Using column mapping");
            Ok(Box::new(MapTransform::new(RecordMapper::new(field_map))))
        }
        Some(path) => {
            tracing::info!("Loading script '{}'", path);
            let script = LuaScript::load(storage, path).await?;
            let name = script.name().to_string();
            tracing::info!("Script '{}' loaded", name);
            Ok(Box::new(
                ScriptTransform::new(script, name).with_creditor_iban(config.creditor_iban.clone()),
            ))
        }
    }
}

pub struct CheckoutPipeline<S: Storage, P: PaymentPlatform> {
    storage: S,
    platform: P,
    config: RunConfig,
    mapper: RecordMapper,
    strategy: Box<dyn RowTransform>,
}

impl<S: Storage, P: PaymentPlatform> CheckoutPipeline<S, P> {
    /// Runs every local check (mapping file, script) before anything touches
    /// the network.
    pub async fn new(storage: S, platform: P, config: RunConfig) -> Result<Self> {
        let field_map = Arc::new(build_field_map(&config, &storage).await?);
        let strategy = select_strategy(&config, &storage, field_map.clone()).await?;
        Ok(Self::with_strategy(storage, platform, config, field_map, strategy))
    }

    pub fn with_strategy(
        storage: S,
        platform: P,
        config: RunConfig,
        field_map: Arc<FieldMap>,
        strategy: Box<dyn RowTransform>,
    ) -> Self {
        Self {
            storage,
            platform,
            config,
            mapper: RecordMapper::new(field_map),
            strategy,
        }
    }

    pub fn mode(&self) -> TransformMode {
        self.strategy.mode()
    }

    fn redirects(&self) -> Redirects {
        Redirects {
            ok: self.config.ok_redirect.clone(),
            nok: self.config.nok_redirect.clone(),
        }
    }

    /// Original header plus the three generated columns.
    fn output_columns(&self, column_names: &[String]) -> Vec<String> {
        let field_map = self.mapper.field_map();
        column_names
            .iter()
            .cloned()
            .chain(
                CanonicalField::GENERATED
                    .into_iter()
                    .map(|field| field_map.label_of(field).to_string()),
            )
            .collect()
    }

    fn reverse_map(&self, record: &CanonicalRecord, columns: &[String]) -> OutputRow {
        let mapped = self.mapper.from_record(record, columns);
        let mut row = OutputRow::default();
        for label in columns {
            let value = match self.mapper.field_map().field_of(label) {
                Some(_) => mapped.data.get(label),
                None => record.passthrough.get(label),
            };
            if let Some(value) = value {
                row.data.insert(label.clone(), value.clone());
            }
        }
        row
    }
}

#[async_trait::async_trait]
impl<S: Storage, P: PaymentPlatform> Pipeline for CheckoutPipeline<S, P> {
    async fn open_session(&self) -> Result<Session> {
        let credentials = self.config.credentials()?;
        let token = self.platform.authenticate(&credentials).await?;
        tracing::info!("Authenticated against the payment platform");

        let identity = self.platform.business_identity(&token).await?;
        tracing::debug!(
            "Creditor identity {} (tenant {})",
            identity.vat_identity,
            identity.tenant_id
        );
        Ok(Session::new(token, identity))
    }

    async fn extract(&self) -> Result<Sheet> {
        let path = self.config.input_path()?;
        tracing::info!("Reading '{}'", path);
        let content = self.storage.read_file(path).await?;
        let sheet = sheet::extract(&content)?;
        tracing::info!("Read {} rows", sheet.rows.len());
        Ok(sheet)
    }

    async fn transform(&self, session: &Session, sheet: Sheet) -> Result<TransformResult> {
        let mode = self.strategy.mode();

        let records = sheet
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| self.strategy.transform(index, row))
            .collect::<Result<Vec<CanonicalRecord>>>()?;

        // Every row must yield a valid transfer before the first checkout.
        let redirects = self.redirects();
        let transfers = records
            .iter()
            .enumerate()
            .map(|(index, record)| build_transfer(record, index, &session.creditor, &redirects))
            .collect::<Result<Vec<_>>>()?;

        let mut progress = Progress::new(
            records.len(),
            "Generating checkouts: ",
            self.config.show_progress,
        );
        progress.start();

        let mut augmented = Vec::with_capacity(records.len());
        for (index, (mut record, transfer)) in records.into_iter().zip(transfers).enumerate() {
            let checkout = self
                .platform
                .create_checkout(session, &transfer)
                .await
                .map_err(|e| e.at_row(index))?;
            tracing::debug!("Row {}: checkout {} created", index, checkout.code_invoice);

            record.set(CanonicalField::Fingerprint, Value::String(checkout.fingerprint));
            record.set(CanonicalField::CodeInvoice, Value::String(checkout.code_invoice));
            record.set(CanonicalField::UrlCheckout, Value::String(checkout.url));

            if mode == TransformMode::Script {
                for field in CanonicalField::BUSINESS {
                    record.remove(field);
                }
            }

            augmented.push(record);
            progress.advance();
        }
        progress.finish();

        let column_names = self.output_columns(&sheet.column_names);
        let rows = augmented
            .iter()
            .map(|record| self.reverse_map(record, &column_names))
            .collect();

        Ok(TransformResult {
            rows,
            column_names,
            delimiter: sheet.delimiter,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_path = self.config.resolved_output_path()?;
        let content = sheet::build_content(&result.rows, &result.column_names, result.delimiter)?;
        tracing::debug!("Writing {} bytes to {}", content.len(), output_path);
        self.storage.write_file(&output_path, &content).await?;
        Ok(output_path)
    }
}
